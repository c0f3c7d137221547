/*!
 * Section-aware chunking of protected Markdown.
 *
 * Text is cut into paragraph units at blank lines, each unit keeping its
 * trailing separator, so concatenating the chunk bodies gives back the input
 * exactly. Units longer than the limit are cut again at sentence ends.
 * Placeholder tokens contain neither blank lines nor sentence punctuation,
 * so no cut ever falls inside one.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Section label used before the first heading
pub const DEFAULT_SECTION: &str = "Untitled";

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+|[。！？]\s*").unwrap());

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,3}[ \t]+(.+)$").unwrap());

static SECTION_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[Section: ([^\]\n]*)\]\n\n").unwrap());

/// A translation unit tagged with the heading it falls under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Title of the nearest heading (levels 1-3) at the start of the chunk
    pub section: String,
    /// Chunk text, including its trailing separator
    pub body: String,
}

impl Chunk {
    /// Body prefixed with a human-readable section tag, for logs
    pub fn tagged(&self) -> String {
        format!("[Section: {}]\n\n{}", self.section, self.body)
    }

    /// Length of the body in characters
    pub fn char_len(&self) -> usize {
        self.body.chars().count()
    }
}

/// Split a tagged chunk back into its section and body
pub fn strip_section_tag(text: &str) -> (Option<String>, &str) {
    match SECTION_TAG.captures(text) {
        Some(caps) => {
            let end = caps.get(0).map_or(0, |m| m.end());
            (Some(caps[1].to_string()), &text[end..])
        }
        None => (None, text),
    }
}

/// Split text into chunks of at most `max_size` characters.
///
/// A single sentence longer than `max_size` is kept whole and overflows.
/// A `max_size` of zero is treated as one.
pub fn chunk(text: &str, max_size: usize) -> Vec<Chunk> {
    Chunker::new(max_size).split(text)
}

/// Accumulates pieces into size-bounded chunks
struct Chunker {
    max_size: usize,
    chunks: Vec<Chunk>,
    buffer: String,
    buffer_len: usize,
    buffer_section: String,
    current_section: String,
}

impl Chunker {
    fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            chunks: Vec::new(),
            buffer: String::new(),
            buffer_len: 0,
            buffer_section: DEFAULT_SECTION.to_string(),
            current_section: DEFAULT_SECTION.to_string(),
        }
    }

    fn split(mut self, text: &str) -> Vec<Chunk> {
        for unit in paragraph_units(text) {
            let headings: Vec<(usize, String)> = HEADING
                .captures_iter(unit)
                .filter_map(|caps| caps.get(0).map(|m| (m.start(), heading_title(&caps[1]))))
                .collect();

            // a unit opening with a heading belongs to that heading's section
            if let Some((0, title)) = headings.first() {
                self.current_section = title.clone();
            }

            if unit.chars().count() > self.max_size {
                let mut offset = 0;
                for sentence in sentence_pieces(unit) {
                    if let Some((_, title)) = headings.iter().rev().find(|(start, _)| *start <= offset) {
                        self.current_section = title.clone();
                    }
                    self.push(sentence);
                    offset += sentence.len();
                }
            } else {
                self.push(unit);
            }

            if let Some((_, title)) = headings.last() {
                self.current_section = title.clone();
            }
        }

        self.flush();
        self.chunks
    }

    fn push(&mut self, piece: &str) {
        let piece_len = piece.chars().count();
        if !self.buffer.is_empty() && self.buffer_len + piece_len > self.max_size {
            self.flush();
        }
        if self.buffer.is_empty() {
            self.buffer_section = self.current_section.clone();
        }
        self.buffer.push_str(piece);
        self.buffer_len += piece_len;
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.chunks.push(Chunk {
            section: self.buffer_section.clone(),
            body: std::mem::take(&mut self.buffer),
        });
        self.buffer_len = 0;
    }
}

/// Paragraphs with their trailing blank-line separators attached
fn paragraph_units(text: &str) -> Vec<&str> {
    split_keeping(text, &PARAGRAPH_BREAK)
}

/// Sentences with their trailing punctuation and whitespace attached
fn sentence_pieces(unit: &str) -> Vec<&str> {
    split_keeping(unit, &SENTENCE_END)
}

fn split_keeping<'a>(text: &'a str, separator: &Regex) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for m in separator.find_iter(text) {
        if m.end() > start {
            pieces.push(&text[start..m.end()]);
            start = m.end();
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn heading_title(raw: &str) -> String {
    raw.trim_matches(|c: char| c == '#' || c.is_whitespace()).to_string()
}
