/*!
 * Element protection.
 *
 * Hides constructs a translator must not touch behind placeholder tokens.
 * Rules run in a fixed priority order; each rule rewrites the text from the
 * last match towards the first so offsets of pending matches stay valid.
 * Opaque rules swap the whole match, partial rules swap one capture group
 * (the destination of a link or image) and leave the rest translatable.
 */

use log::debug;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use super::elements::{make_token, ElementKind, ElementMap, ProtectedElement, TOKEN_RE};

/// How much of a match a rule hides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProtectionMode {
    /// Replace the whole match
    Opaque,
    /// Replace only the given capture group
    Partial { group: usize },
}

/// One entry of the protection table
struct ProtectionRule {
    name: &'static str,
    kind: ElementKind,
    pattern: Regex,
    mode: ProtectionMode,
}

impl ProtectionRule {
    fn new(name: &'static str, kind: ElementKind, pattern: &str, mode: ProtectionMode) -> Self {
        Self {
            name,
            kind,
            pattern: Regex::new(pattern).unwrap(),
            mode,
        }
    }
}

/// Protection rules in priority order
static RULES: Lazy<Vec<ProtectionRule>> = Lazy::new(|| {
    vec![
        ProtectionRule::new(
            "fenced_code",
            ElementKind::CodeBlock,
            r"(?s)```.*?```|~~~.*?~~~",
            ProtectionMode::Opaque,
        ),
        // header row, delimiter row, then any body rows; every row starts at column 0
        ProtectionRule::new(
            "pipe_table",
            ElementKind::Table,
            r"(?m)^\|[^\n]*\|[ \t]*\n\|[ \t]*:?-+:?[ \t]*(?:\|[ \t]*:?-+:?[ \t]*)*\|?[ \t]*(?:\n\|[^\n]*\|[ \t]*)*",
            ProtectionMode::Opaque,
        ),
        ProtectionRule::new(
            "image",
            ElementKind::Url,
            r#"!\[([^\]\n]*)\]\(\s*((?:[^()\s]|\([^()\s]*\))+(?:\s+"[^"\n]*")?)\s*\)"#,
            ProtectionMode::Partial { group: 2 },
        ),
        ProtectionRule::new(
            "link",
            ElementKind::Url,
            r#"\[([^\]\n]*)\]\(\s*((?:[^()\s]|\([^()\s]*\))+(?:\s+"[^"\n]*")?)\s*\)"#,
            ProtectionMode::Partial { group: 2 },
        ),
        ProtectionRule::new(
            "inline_code",
            ElementKind::InlineCode,
            r"``[^\n]+?``|`[^`\n]+`",
            ProtectionMode::Opaque,
        ),
        ProtectionRule::new(
            "display_math",
            ElementKind::LatexBlock,
            r"(?s)\$\$.+?\$\$|\\\[.+?\\\]",
            ProtectionMode::Opaque,
        ),
        // no whitespace just inside the dollars, so "$5 and $10" is left alone
        ProtectionRule::new(
            "inline_math",
            ElementKind::LatexInline,
            r"\$[^\s$](?:[^$\n]*[^\s$])?\$|\\\([^\n]+?\\\)",
            ProtectionMode::Opaque,
        ),
        ProtectionRule::new(
            "html",
            ElementKind::HtmlTag,
            r"(?s)<!--.*?-->|</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>",
            ProtectionMode::Opaque,
        ),
        ProtectionRule::new(
            "bare_url",
            ElementKind::Url,
            r#"https?://[^\s<>()\[\]"'`]*[^\s<>()\[\]"'`.,;:!?]"#,
            ProtectionMode::Opaque,
        ),
    ]
});

/// Result of a protection pass
#[derive(Debug, Clone)]
pub struct ProtectedText {
    /// Text with every protected construct replaced by a token
    pub text: String,
    /// Mapping needed to undo the replacement
    pub elements: ElementMap,
}

/// Applies the protection table to Markdown text
#[derive(Clone)]
pub struct ElementProtector {
    rules: Vec<&'static ProtectionRule>,
}

impl ElementProtector {
    /// Protector running every rule
    pub fn new() -> Self {
        Self {
            rules: RULES.iter().collect(),
        }
    }

    /// Protector restricted to the given kinds, priority order unchanged
    pub fn only(kinds: &[ElementKind]) -> Self {
        Self {
            rules: RULES.iter().filter(|rule| kinds.contains(&rule.kind)).collect(),
        }
    }

    /// Replace protected constructs with fresh tokens.
    ///
    /// Token suffixes are random; a suffix is drawn again if the token is
    /// already in the map or occurs anywhere in the input, so every token in
    /// the output maps back to exactly one element.
    pub fn protect(&self, text: &str) -> ProtectedText {
        let original_lower = text.to_ascii_lowercase();
        let mut elements = ElementMap::new();
        let mut current = text.to_string();
        let mut rng = rand::rng();

        for rule in &self.rules {
            let spans: Vec<(usize, usize)> = rule
                .pattern
                .captures_iter(&current)
                .filter_map(|caps| match rule.mode {
                    ProtectionMode::Opaque => caps.get(0).map(|m| (m.start(), m.end())),
                    ProtectionMode::Partial { group } => caps
                        .get(group)
                        .filter(|dest| !is_whole_token(dest.as_str()))
                        .map(|dest| (dest.start(), dest.end())),
                })
                .collect();

            if spans.is_empty() {
                continue;
            }
            debug!("Protection rule '{}' matched {} time(s)", rule.name, spans.len());

            for (start, end) in spans.into_iter().rev() {
                let id = loop {
                    let candidate = make_token(rule.kind, rng.random::<u32>());
                    if !elements.contains(&candidate) && !original_lower.contains(&candidate.to_ascii_lowercase()) {
                        break candidate;
                    }
                };
                elements.insert(ProtectedElement {
                    id: id.clone(),
                    kind: rule.kind,
                    payload: current[start..end].to_string(),
                });
                current.replace_range(start..end, &id);
            }
        }

        ProtectedText { text: current, elements }
    }
}

impl Default for ElementProtector {
    fn default() -> Self {
        Self::new()
    }
}

/// Protect with the full rule table
pub fn protect(text: &str) -> ProtectedText {
    ElementProtector::new().protect(text)
}

fn is_whole_token(text: &str) -> bool {
    TOKEN_RE
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}
