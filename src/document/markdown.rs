//! Markdown dialect: recursive-descent decoder and tree-walking encoder.
//!
//! Block structure is line oriented and markers are only recognized at
//! column 0. Inline parsing backtracks on unmatched delimiters, which then
//! stay literal text. Strong never nests inside strong and emphasis never
//! nests inside emphasis, so every delimiter the encoder writes has exactly
//! one reading.
//!
//! The encoder writes canonical tokens (`**strong**`, `_emphasis_`, `- `
//! bullets, sequential ordered numbers), escapes every literal `\ * _ ``
//! in text, and escapes the marker of any text line that would otherwise be
//! read back as a block. Together with the nesting rule this makes
//! `decode(encode(decode(x))) == decode(x)`.

use super::rich::{Block, Inline, RichDocument};

const FENCE: &str = "```";
const MAX_HEADING_LEVEL: usize = 6;
const MAX_ORDINAL_DIGITS: usize = 9;
const MAX_ORDINAL: u64 = 999_999_999;

pub fn decode(raw: &str) -> RichDocument {
    let normalized = raw.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    RichDocument::new(parse_blocks(&lines))
}

pub fn encode(doc: &RichDocument) -> String {
    emit_blocks(&doc.blocks)
}

// ---------------------------------------------------------------------------
// Block level
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    Blank,
    Fence { info: &'a str },
    Heading { level: u8, content: &'a str },
    Quote { content: &'a str },
    Bullet { content: &'a str },
    Ordered { number: u64, content: &'a str },
    Text,
}

fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(info) = line.strip_prefix(FENCE) {
        return LineKind::Fence { info: info.trim() };
    }

    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if (1..=MAX_HEADING_LEVEL).contains(&hashes) {
        let rest = &line[hashes..];
        if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
            return LineKind::Heading {
                level: hashes as u8,
                content: rest.trim(),
            };
        }
    }

    if let Some(rest) = line.strip_prefix('>') {
        let content = rest.strip_prefix(' ').unwrap_or(rest);
        return LineKind::Quote { content };
    }

    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return LineKind::Bullet {
            content: rest.trim(),
        };
    }

    let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
    if (1..=MAX_ORDINAL_DIGITS).contains(&digits) {
        let rest = &line[digits..];
        if let Some(after_dot) = rest.strip_prefix('.') {
            if after_dot.is_empty() || after_dot.starts_with(' ') {
                if let Ok(number) = line[..digits].parse::<u64>() {
                    return LineKind::Ordered {
                        number,
                        content: after_dot.trim(),
                    };
                }
            }
        }
    }

    LineKind::Text
}

fn parse_blocks(lines: &[&str]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        match classify(lines[i]) {
            LineKind::Blank => i += 1,
            LineKind::Heading { level, content } => {
                blocks.push(Block::Heading {
                    level,
                    content: parse_inlines(content),
                });
                i += 1;
            }
            LineKind::Fence { info } => {
                i += 1;
                let start = i;
                while i < lines.len() && lines[i].trim() != FENCE {
                    i += 1;
                }
                let text = lines[start..i].join("\n");
                if i < lines.len() {
                    i += 1;
                }
                blocks.push(Block::CodeBlock {
                    language: (!info.is_empty()).then(|| info.to_string()),
                    text,
                });
            }
            LineKind::Quote { .. } => {
                let mut inner = Vec::new();
                while i < lines.len() {
                    match classify(lines[i]) {
                        LineKind::Quote { content } => inner.push(content),
                        _ => break,
                    }
                    i += 1;
                }
                blocks.push(Block::BlockQuote {
                    blocks: parse_blocks(&inner),
                });
            }
            LineKind::Bullet { .. } => {
                let mut items = Vec::new();
                while i < lines.len() {
                    match classify(lines[i]) {
                        LineKind::Bullet { content } => items.push(parse_inlines(content)),
                        _ => break,
                    }
                    i += 1;
                }
                blocks.push(Block::BulletList { items });
            }
            LineKind::Ordered { number, .. } => {
                let start = number;
                let mut items = Vec::new();
                while i < lines.len() {
                    match classify(lines[i]) {
                        LineKind::Ordered { content, .. } => items.push(parse_inlines(content)),
                        _ => break,
                    }
                    i += 1;
                }
                blocks.push(Block::OrderedList { start, items });
            }
            LineKind::Text => {
                let start = i;
                while i < lines.len() && classify(lines[i]) == LineKind::Text {
                    i += 1;
                }
                let text = lines[start..i].join("\n");
                blocks.push(Block::Paragraph {
                    content: parse_inlines(&text),
                });
            }
        }
    }

    blocks
}

fn emit_blocks(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(emit_block)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn emit_block(block: &Block) -> String {
    match block {
        Block::Heading { level, content } => {
            let marker = "#".repeat((*level).clamp(1, MAX_HEADING_LEVEL as u8) as usize);
            let text = emit_inlines(content).replace('\n', " ");
            if text.is_empty() {
                marker
            } else {
                format!("{} {}", marker, text)
            }
        }
        Block::Paragraph { content } => emit_text_lines(&emit_inlines(content)),
        Block::CodeBlock { language, text } => emit_fence(language.as_deref(), text),
        Block::Preformatted { text } => emit_fence(None, text),
        Block::BlockQuote { blocks } => {
            let inner = emit_blocks(blocks);
            if inner.is_empty() {
                return ">".to_string();
            }
            inner
                .split('\n')
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Block::BulletList { items } => items
            .iter()
            .map(|item| format!("- {}", emit_item(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::OrderedList { start, items } => items
            .iter()
            .enumerate()
            .map(|(n, item)| {
                // Only the first ordinal is read back; later ones just have to parse.
                let ordinal = start.saturating_add(n as u64).min(MAX_ORDINAL);
                format!("{}. {}", ordinal, emit_item(item))
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn emit_item(item: &[Inline]) -> String {
    emit_inlines(item).replace('\n', " ").trim().to_string()
}

fn emit_fence(language: Option<&str>, text: &str) -> String {
    let info = language.unwrap_or("");
    if text.is_empty() {
        format!("{}{}\n{}", FENCE, info, FENCE)
    } else {
        format!("{}{}\n{}\n{}", FENCE, info, text, FENCE)
    }
}

/// Paragraph text: every line that would parse as a block marker gets escaped.
fn emit_text_lines(text: &str) -> String {
    text.split('\n')
        .map(escape_line_start)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line_start(line: &str) -> String {
    match classify(line) {
        LineKind::Text | LineKind::Blank => line.to_string(),
        LineKind::Ordered { .. } => {
            let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
            format!("{}\\{}", &line[..digits], &line[digits..])
        }
        _ => format!("\\{}", line),
    }
}

// ---------------------------------------------------------------------------
// Inline level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelimKind {
    Strong,
    Emphasis,
}

#[derive(Debug, Clone, Copy)]
struct Delim {
    kind: DelimKind,
    marker: &'static str,
}

enum Exit {
    Closed,
    Unclosed,
}

#[derive(Default)]
struct InlineBuf {
    nodes: Vec<Inline>,
    text: String,
}

impl InlineBuf {
    fn push_char(&mut self, c: char) {
        self.text.push(c);
    }

    fn push(&mut self, node: Inline) {
        self.flush();
        self.nodes.push(node);
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.nodes.push(Inline::Text {
                text: std::mem::take(&mut self.text),
            });
        }
    }

    fn finish(mut self) -> Vec<Inline> {
        self.flush();
        self.nodes
    }
}

pub(crate) fn parse_inlines(text: &str) -> Vec<Inline> {
    let mut parser = InlineParser::new(text);
    let mut stack = Vec::new();
    let (nodes, _) = parser.parse_sequence(&mut stack);
    nodes
}

struct InlineParser {
    chars: Vec<char>,
    pos: usize,
    last_star: Option<usize>,
    last_underscore: Option<usize>,
}

impl InlineParser {
    fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let last_star = chars.iter().rposition(|c| *c == '*');
        let last_underscore = chars.iter().rposition(|c| *c == '_');
        Self {
            chars,
            pos: 0,
            last_star,
            last_underscore,
        }
    }

    fn starts_with(&self, marker: &str) -> bool {
        let mut i = self.pos;
        for m in marker.chars() {
            if self.chars.get(i) != Some(&m) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn parse_sequence(&mut self, stack: &mut Vec<Delim>) -> (Vec<Inline>, Exit) {
        let mut out = InlineBuf::default();

        while self.pos < self.chars.len() {
            if let Some(idx) = stack.iter().rposition(|d| self.starts_with(d.marker)) {
                if idx + 1 == stack.len() {
                    self.pos += stack[idx].marker.len();
                    return (out.finish(), Exit::Closed);
                }
                return (out.finish(), Exit::Unclosed);
            }

            let c = self.chars[self.pos];
            match c {
                '\\' => match self.chars.get(self.pos + 1) {
                    Some(next) if next.is_ascii_punctuation() => {
                        out.push_char(*next);
                        self.pos += 2;
                    }
                    _ => {
                        out.push_char('\\');
                        self.pos += 1;
                    }
                },
                '\n' => {
                    out.push(Inline::SoftBreak);
                    self.pos += 1;
                }
                '`' => match self.code_span() {
                    Some(code) => out.push(Inline::Code { text: code }),
                    None => {
                        out.push_char('`');
                        self.pos += 1;
                    }
                },
                '*' | '_' => match self.delimited(stack, c) {
                    Some(node) => out.push(node),
                    None => {
                        out.push_char(c);
                        self.pos += 1;
                    }
                },
                _ => {
                    out.push_char(c);
                    self.pos += 1;
                }
            }
        }

        (out.finish(), Exit::Unclosed)
    }

    /// Single-line, non-empty code span starting at the current backtick.
    fn code_span(&mut self) -> Option<String> {
        let start = self.pos + 1;
        let mut i = start;
        while i < self.chars.len() && self.chars[i] != '\n' {
            if self.chars[i] == '`' {
                if i == start {
                    return None;
                }
                let text: String = self.chars[start..i].iter().collect();
                self.pos = i + 1;
                return Some(text);
            }
            i += 1;
        }
        None
    }

    fn delimited(&mut self, stack: &mut Vec<Delim>, c: char) -> Option<Inline> {
        let doubled = self.chars.get(self.pos + 1) == Some(&c);
        let (single, double) = if c == '*' { ("*", "**") } else { ("_", "__") };

        let strong_open = doubled && !stack.iter().any(|d| d.kind == DelimKind::Strong);
        if strong_open {
            if let Some(node) = self.attempt(stack, DelimKind::Strong, double) {
                return Some(node);
            }
        }

        let emphasis_open = !stack.iter().any(|d| d.kind == DelimKind::Emphasis);
        if emphasis_open {
            return self.attempt(stack, DelimKind::Emphasis, single);
        }
        None
    }

    fn attempt(
        &mut self,
        stack: &mut Vec<Delim>,
        kind: DelimKind,
        marker: &'static str,
    ) -> Option<Inline> {
        let start = self.pos;
        let body_start = start + marker.len();

        // A closer needs at least one more marker character after the opener.
        let last = if marker.starts_with('*') {
            self.last_star
        } else {
            self.last_underscore
        };
        if last.is_none_or(|last| last < body_start + marker.len() - 1) {
            return None;
        }

        self.pos = body_start;
        stack.push(Delim { kind, marker });
        let (content, exit) = self.parse_sequence(stack);
        stack.pop();

        match exit {
            Exit::Closed if !content.is_empty() => Some(match kind {
                DelimKind::Strong => Inline::Strong { content },
                DelimKind::Emphasis => Inline::Emphasis { content },
            }),
            _ => {
                self.pos = start;
                None
            }
        }
    }
}

fn emit_inlines(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text { text } => escape_text(text, &mut out),
            Inline::Strong { content } => {
                out.push_str("**");
                out.push_str(&emit_inlines(content));
                out.push_str("**");
            }
            Inline::Emphasis { content } => {
                out.push('_');
                out.push_str(&emit_inlines(content));
                out.push('_');
            }
            Inline::Code { text } => {
                out.push('`');
                out.push_str(text);
                out.push('`');
            }
            Inline::SoftBreak => out.push('\n'),
        }
    }
    out
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
}
