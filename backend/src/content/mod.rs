//! Text helpers applied to article content.
//!
//! - [`slug`]: URL slugs from titles and tag names
//! - [`headings`]: table-of-contents extraction from markdown
//! - [`reading`]: read-time estimates and excerpt fallbacks

pub mod headings;
pub mod reading;
pub mod slug;

pub use headings::{extract_headings, Heading};
pub use reading::{estimate_read_time, excerpt_or_fallback, DEFAULT_EXCERPT_CHARS};
pub use slug::slugify;
