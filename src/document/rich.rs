//! Rich document tree edited in place of the stored text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichDocument {
    pub blocks: Vec<Block>,
}

impl RichDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Concatenated text content, one line per block (list items one per line).
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            block.collect_plain_lines(&mut lines);
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph { content: Vec<Inline> },
    CodeBlock { language: Option<String>, text: String },
    BlockQuote { blocks: Vec<Block> },
    BulletList { items: Vec<Vec<Inline>> },
    OrderedList { start: u64, items: Vec<Vec<Inline>> },
    /// Verbatim text, exactly as stored.
    Preformatted { text: String },
}

impl Block {
    pub fn heading(level: u8, content: Vec<Inline>) -> Self {
        Block::Heading {
            level: level.clamp(1, 6),
            content,
        }
    }

    pub fn paragraph(content: Vec<Inline>) -> Self {
        Block::Paragraph { content }
    }

    fn collect_plain_lines(&self, lines: &mut Vec<String>) {
        match self {
            Block::Heading { content, .. } | Block::Paragraph { content } => {
                lines.push(inline_plain_text(content));
            }
            Block::CodeBlock { text, .. } | Block::Preformatted { text } => {
                lines.push(text.clone());
            }
            Block::BlockQuote { blocks } => {
                for block in blocks {
                    block.collect_plain_lines(lines);
                }
            }
            Block::BulletList { items } | Block::OrderedList { items, .. } => {
                lines.extend(items.iter().map(|item| inline_plain_text(item)));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text { text: String },
    Strong { content: Vec<Inline> },
    Emphasis { content: Vec<Inline> },
    Code { text: String },
    SoftBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text { text: text.into() }
    }

    pub fn code(text: impl Into<String>) -> Self {
        Inline::Code { text: text.into() }
    }

    pub fn strong(content: Vec<Inline>) -> Self {
        Inline::Strong { content }
    }

    pub fn emphasis(content: Vec<Inline>) -> Self {
        Inline::Emphasis { content }
    }
}

pub fn inline_plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text { text } | Inline::Code { text } => out.push_str(text),
            Inline::Strong { content } | Inline::Emphasis { content } => {
                out.push_str(&inline_plain_text(content));
            }
            Inline::SoftBreak => out.push('\n'),
        }
    }
    out
}
