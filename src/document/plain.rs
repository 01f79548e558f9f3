//! Plain and structured-text dialect (`.txt`, `.json`, `.yml`, `.xml`).
//!
//! The stored text is carried verbatim in a single preformatted block, so an
//! unedited document encodes back to exactly the bytes it was decoded from.

use super::rich::{Block, RichDocument};

pub fn decode(raw: &str) -> RichDocument {
    RichDocument::new(vec![Block::Preformatted {
        text: raw.to_string(),
    }])
}

pub fn encode(doc: &RichDocument) -> String {
    match doc.blocks.as_slice() {
        [Block::Preformatted { text }] => text.clone(),
        [] => String::new(),
        _ => doc.plain_text(),
    }
}
