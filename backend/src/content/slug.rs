//! Slug generation.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Turn free text into a URL slug.
///
/// Lowercases, strips diacritics (`"Mécanique"` becomes `"mecanique"`),
/// collapses every run of non `[a-z0-9]` characters into a single `-`
/// and trims dashes from both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_strips_accents() {
        assert_eq!(slugify("Mécanique & Maintenance"), "mecanique-maintenance");
        assert_eq!(slugify("Conformité SAAQ"), "conformite-saaq");
    }

    #[test]
    fn test_slugify_trims_and_collapses() {
        assert_eq!(slugify("  --Hello,   World!--  "), "hello-world");
        assert_eq!(slugify("IA 2026"), "ia-2026");
    }

    #[test]
    fn test_slugify_empty_and_symbols_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn test_slugify_apostrophes() {
        assert_eq!(
            slugify("L'Intelligence Artificielle Révolutionne"),
            "l-intelligence-artificielle-revolutionne"
        );
    }
}
