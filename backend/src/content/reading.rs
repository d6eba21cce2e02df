//! Read-time estimation and excerpt fallback.

use crate::api::Article;

/// Words per minute assumed by [`estimate_read_time`].
pub const WORDS_PER_MINUTE: usize = 200;

/// Characters of content used when an article has no excerpt.
pub const DEFAULT_EXCERPT_CHARS: usize = 200;

/// Estimated reading time in whole minutes, never below one.
pub fn estimate_read_time(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}

/// The article's excerpt, or the first [`DEFAULT_EXCERPT_CHARS`] characters
/// of its content followed by `...`.
pub fn excerpt_or_fallback(article: &Article) -> String {
    match article.excerpt.as_deref() {
        Some(excerpt) if !excerpt.trim().is_empty() => excerpt.to_string(),
        _ => {
            let head: String = article.content.chars().take(DEFAULT_EXCERPT_CHARS).collect();
            format!("{}...", head)
        }
    }
}
