/*!
 * Element restoration.
 *
 * Puts protected constructs back into translated text. Link and image
 * shapes whose destination is a token are rebuilt first, keeping the
 * translated link text; bare tokens are substituted afterwards. Both passes
 * repeat while a substituted payload itself exposes further tokens.
 */

use std::collections::BTreeSet;

use log::warn;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::elements::{ElementMap, TOKEN_RE};

/// `[text](token)` or `![alt](token)`, whitespace allowed inside the parentheses
static LINK_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(!?)\[([^\]]*)\]\(\s*(MD_url_[0-9a-f]{8})\s*\)").unwrap()
});

/// Nesting depth after which remaining tokens are left alone
const MAX_PASSES: usize = 4;

/// Outcome of a restoration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorationReport {
    /// Text with every resolvable token replaced
    pub text: String,
    /// Number of substitutions performed
    pub restored: usize,
    /// Tokens with no entry in the map, other than those written literally
    /// inside a restored payload
    pub unresolved: Vec<String>,
}

/// Restore tokens and return only the text
pub fn restore(text: &str, elements: &ElementMap) -> String {
    restore_with_report(text, elements).text
}

/// Restore tokens and report what was and was not resolved.
///
/// Unknown tokens stay in the text verbatim and are logged once each.
pub fn restore_with_report(text: &str, elements: &ElementMap) -> RestorationReport {
    let mut current = text.to_string();
    let mut restored = 0;

    if !elements.is_empty() {
        for _ in 0..MAX_PASSES {
            let mut replaced = 0;

            let rebuilt = LINK_TOKEN_RE.replace_all(&current, |caps: &Captures| {
                match elements.resolve(&caps[3]) {
                    Some(element) => {
                        replaced += 1;
                        format!("{}[{}]({})", &caps[1], &caps[2], element.payload)
                    }
                    None => caps[0].to_string(),
                }
            }).into_owned();
            let substituted = TOKEN_RE.replace_all(&rebuilt, |caps: &Captures| {
                match elements.resolve(&caps[0]) {
                    Some(element) => {
                        replaced += 1;
                        element.payload.clone()
                    }
                    None => caps[0].to_string(),
                }
            }).into_owned();
            current = substituted;

            restored += replaced;
            if replaced == 0 {
                break;
            }
        }
    }

    let payloads: Vec<String> = elements.iter().map(|e| e.payload.to_ascii_lowercase()).collect();
    let unresolved: Vec<String> = TOKEN_RE
        .find_iter(&current)
        .map(|m| m.as_str().to_string())
        .filter(|token| {
            let token = token.to_ascii_lowercase();
            !payloads.iter().any(|payload| payload.contains(&token))
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    for token in &unresolved {
        warn!("Unresolved placeholder left in output: {}", token);
    }

    RestorationReport {
        text: current,
        restored,
        unresolved,
    }
}
