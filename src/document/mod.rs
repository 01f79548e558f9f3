//! Document converter and the open-document model.
//!
//! - `rich`: typed rich document tree
//! - `markdown`: Markdown dialect (normalizing, idempotent after one pass)
//! - `plain`: plain/structured dialect (exact round-trip)
//!
//! `dialect_for_path` is the editability gate: it runs on the file name
//! alone, before anything is fetched or decoded.

pub mod markdown;
pub mod plain;
pub mod rich;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::FileContent;
use crate::provider::file_name;

pub use rich::{Block, Inline, RichDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Markdown,
    Plain,
}

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];
const PLAIN_EXTENSIONS: &[&str] = &["txt", "json", "yml", "yaml", "xml"];

/// Picks the dialect from the file extension, case-insensitively.
pub fn dialect_for_path(path: &str) -> Result<Dialect> {
    let name = file_name(path);
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if MARKDOWN_EXTENSIONS.contains(&extension.as_str()) {
        Ok(Dialect::Markdown)
    } else if PLAIN_EXTENSIONS.contains(&extension.as_str()) {
        Ok(Dialect::Plain)
    } else {
        Err(AppError::UnsupportedFileType(name.to_string()))
    }
}

pub fn is_editable(path: &str) -> bool {
    dialect_for_path(path).is_ok()
}

pub fn decode(raw: &str, dialect: Dialect) -> RichDocument {
    match dialect {
        Dialect::Markdown => markdown::decode(raw),
        Dialect::Plain => plain::decode(raw),
    }
}

pub fn encode(doc: &RichDocument, dialect: Dialect) -> String {
    match dialect {
        Dialect::Markdown => markdown::encode(doc),
        Dialect::Plain => plain::encode(doc),
    }
}

/// A file opened for editing.
///
/// Dirtiness is measured against `baseline`, the encoding of the document as
/// it was decoded, not against the raw stored text: Markdown normalization
/// alone (say `*x*` becoming `_x_`) never counts as an edit.
#[derive(Debug, Clone)]
pub struct OpenDocument {
    path: String,
    dialect: Dialect,
    original_raw: String,
    baseline: String,
    version_token: String,
    document: RichDocument,
    last_saved: Option<DateTime<Utc>>,
}

impl OpenDocument {
    /// Builds the document from fetched content. Fails with
    /// `UnsupportedFileType` for extensions outside the gate.
    pub fn open(file: FileContent) -> Result<Self> {
        let dialect = dialect_for_path(&file.path)?;
        let document = decode(&file.content, dialect);
        let baseline = encode(&document, dialect);
        Ok(Self {
            path: file.path,
            dialect,
            original_raw: file.content,
            baseline,
            version_token: file.sha,
            document,
            last_saved: None,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn original_raw(&self) -> &str {
        &self.original_raw
    }

    pub fn version_token(&self) -> &str {
        &self.version_token
    }

    pub fn document(&self) -> &RichDocument {
        &self.document
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    /// Replaces the rich document; returns whether it now differs from the
    /// last saved state.
    pub fn apply(&mut self, document: RichDocument) -> bool {
        self.document = document;
        self.is_dirty()
    }

    pub fn encoded(&self) -> String {
        encode(&self.document, self.dialect)
    }

    pub fn is_dirty(&self) -> bool {
        self.encoded() != self.baseline
    }

    /// Records a successful write of `raw_sent`, which becomes both the
    /// stored text and the dirtiness baseline.
    pub fn mark_saved(&mut self, raw_sent: String, version_token: String, at: DateTime<Utc>) {
        self.baseline = raw_sent.clone();
        self.original_raw = raw_sent;
        self.version_token = version_token;
        self.last_saved = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> FileContent {
        FileContent {
            content: content.to_string(),
            sha: "sha-1".to_string(),
            path: path.to_string(),
            name: file_name(path).to_string(),
            size: content.len() as u64,
        }
    }

    #[test]
    fn gate_by_extension() {
        assert_eq!(dialect_for_path("notes.md").unwrap(), Dialect::Markdown);
        assert_eq!(dialect_for_path("docs/README.MARKDOWN").unwrap(), Dialect::Markdown);
        assert_eq!(dialect_for_path("config/app.Yml").unwrap(), Dialect::Plain);
        assert_eq!(dialect_for_path("data.json").unwrap(), Dialect::Plain);
        assert_eq!(
            dialect_for_path("assets/image.png"),
            Err(AppError::UnsupportedFileType("image.png".to_string()))
        );
        assert!(!is_editable("Makefile"));
        assert!(!is_editable("archive.tar.gz"));
    }

    #[test]
    fn opening_markdown_decodes_heading() {
        let doc = OpenDocument::open(file("notes.md", "# Title")).unwrap();
        assert_eq!(doc.dialect(), Dialect::Markdown);
        assert_eq!(
            doc.document().blocks,
            vec![Block::heading(1, vec![Inline::text("Title")])]
        );
        assert_eq!(doc.encoded(), "# Title");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn normalization_alone_is_not_dirty() {
        let doc = OpenDocument::open(file("notes.md", "*a*\n* b\n\n\n")).unwrap();
        assert_ne!(doc.encoded(), doc.original_raw());
        assert!(!doc.is_dirty());
    }

    #[test]
    fn editing_back_is_clean() {
        let mut doc = OpenDocument::open(file("notes.md", "hello")).unwrap();
        let original = doc.document().clone();

        assert!(doc.apply(markdown::decode("hello world")));
        assert!(!doc.apply(original));
    }

    #[test]
    fn mark_saved_moves_baseline_and_token() {
        let mut doc = OpenDocument::open(file("todo.txt", "a")).unwrap();
        doc.apply(plain::decode("a\nb"));
        assert!(doc.is_dirty());

        let now = Utc::now();
        let sent = doc.encoded();
        doc.mark_saved(sent, "sha-2".to_string(), now);

        assert!(!doc.is_dirty());
        assert_eq!(doc.version_token(), "sha-2");
        assert_eq!(doc.original_raw(), "a\nb");
        assert_eq!(doc.last_saved(), Some(now));
    }

    #[test]
    fn unsupported_files_do_not_open() {
        let err = OpenDocument::open(file("logo.png", "\u{89}PNG")).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));
    }
}
