/*!
 * Placeholder tokens and the per-request element map.
 *
 * A protected construct is swapped for a token of the form
 * `MD_<kind>_<8 hex digits>`. The map from token to original text lives
 * for exactly one request and is handed from the protector to the restorer.
 */

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches any placeholder token, tolerating case changes made by a backend.
pub static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)MD_(code_block|inline_code|latex_block|latex_inline|html_tag|table|url)_([0-9a-f]{8})").unwrap()
});

/// Kind of construct hidden behind a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Fenced code block (``` or ~~~)
    CodeBlock,
    /// Inline code span
    InlineCode,
    /// Display math (`$$..$$`, `\[..\]`)
    LatexBlock,
    /// Inline math (`$..$`, `\(..\)`)
    LatexInline,
    /// Raw HTML tag or comment
    HtmlTag,
    /// Pipe table
    Table,
    /// Link or image destination, or a bare URL
    Url,
}

impl ElementKind {
    /// Every kind, in protection priority order
    pub const ALL: [ElementKind; 7] = [
        ElementKind::CodeBlock,
        ElementKind::Table,
        ElementKind::Url,
        ElementKind::InlineCode,
        ElementKind::LatexBlock,
        ElementKind::LatexInline,
        ElementKind::HtmlTag,
    ];

    /// Identifier used inside tokens
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeBlock => "code_block",
            Self::InlineCode => "inline_code",
            Self::LatexBlock => "latex_block",
            Self::LatexInline => "latex_inline",
            Self::HtmlTag => "html_tag",
            Self::Table => "table",
            Self::Url => "url",
        }
    }

    /// Parse a token kind, ignoring case
    pub fn parse(kind: &str) -> Option<Self> {
        let lowered = kind.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|k| k.as_str() == lowered)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build a token from a kind and a 32-bit suffix
pub fn make_token(kind: ElementKind, suffix: u32) -> String {
    format!("MD_{}_{:08x}", kind.as_str(), suffix)
}

/// Normalize a token as it appears in (possibly translated) text.
///
/// Returns `None` when the text is not a token.
pub fn canonical_token(raw: &str) -> Option<String> {
    let caps = TOKEN_RE.captures(raw)?;
    let whole = caps.get(0)?;
    if whole.start() != 0 || whole.end() != raw.len() {
        return None;
    }
    let kind = ElementKind::parse(&caps[1])?;
    Some(format!("MD_{}_{}", kind.as_str(), caps[2].to_ascii_lowercase()))
}

/// One protected construct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedElement {
    /// Placeholder token standing in for the payload
    pub id: String,
    /// What was protected
    pub kind: ElementKind,
    /// The original text the token replaces
    pub payload: String,
}

/// Token to element mapping for a single request
#[derive(Debug, Clone, Default)]
pub struct ElementMap {
    elements: HashMap<String, ProtectedElement>,
}

impl ElementMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an element under its id
    pub fn insert(&mut self, element: ProtectedElement) {
        self.elements.insert(element.id.clone(), element);
    }

    /// Look up an element by token, accepting case-mangled tokens
    pub fn resolve(&self, token: &str) -> Option<&ProtectedElement> {
        if let Some(element) = self.elements.get(token) {
            return Some(element);
        }
        canonical_token(token).and_then(|id| self.elements.get(&id))
    }

    /// Whether the exact token is already taken
    pub fn contains(&self, token: &str) -> bool {
        self.elements.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over all elements in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &ProtectedElement> {
        self.elements.values()
    }

    /// Number of elements per kind
    pub fn count_by_kind(&self) -> BTreeMap<ElementKind, usize> {
        let mut counts = BTreeMap::new();
        for element in self.elements.values() {
            *counts.entry(element.kind).or_insert(0) += 1;
        }
        counts
    }
}
