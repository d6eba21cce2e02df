//! Table-of-contents extraction from markdown bodies.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A markdown heading usable as an in-page anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub id: String,
    pub text: String,
    /// 1 for `#`, 2 for `##`, 3 for `###`.
    pub level: u8,
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(#{1,3})[ \t]+(.+)$").expect("valid heading regex"))
}

fn anchor_strip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s-]").expect("valid anchor regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Anchor id for a heading text, matching what the client renders.
pub fn heading_anchor(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = anchor_strip_regex().replace_all(&lowered, "");
    whitespace_regex().replace_all(&stripped, "-").into_owned()
}

/// Extract level 1-3 headings in document order.
pub fn extract_headings(content: &str) -> Vec<Heading> {
    heading_regex()
        .captures_iter(content)
        .filter_map(|caps| {
            let text = caps[2].trim();
            (!text.is_empty()).then(|| Heading {
                id: heading_anchor(text),
                level: caps[1].len() as u8,
                text: text.to_string(),
            })
        })
        .collect()
}
