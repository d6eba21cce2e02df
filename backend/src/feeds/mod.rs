//! Syndication documents: RSS feed, sitemap and robots.txt.
//!
//! Rendering is pure; handlers fetch the data through the service layer
//! and pass it in together with the public base URL.

pub mod rss;
pub mod sitemap;

pub use rss::{render_rss, Channel, RSS_CONTENT_TYPE};
pub use sitemap::{render_robots, render_sitemap, STATIC_PAGES};

/// Escape the five XML special characters.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Public base URL for absolute links.
///
/// The configured site URL wins. Otherwise the request's `Host` header is
/// used, over plain http for loopback hosts and https for anything else.
pub fn base_url(site_url: Option<&str>, host: Option<&str>) -> String {
    if let Some(url) = site_url {
        return url.trim_end_matches('/').to_string();
    }
    let host = host.map(str::trim).filter(|h| !h.is_empty()).unwrap_or("localhost");
    let scheme = if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
        "http"
    } else {
        "https"
    };
    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape(r#"Freins & "pneus" <2025>"#),
            "Freins &amp; &quot;pneus&quot; &lt;2025&gt;"
        );
    }

    #[test]
    fn test_base_url_resolution() {
        assert_eq!(
            base_url(Some("https://blog.fleetcrew.ca/"), Some("ignored")),
            "https://blog.fleetcrew.ca"
        );
        assert_eq!(base_url(None, Some("localhost:3000")), "http://localhost:3000");
        assert_eq!(base_url(None, Some("blog.example")), "https://blog.example");
        assert_eq!(base_url(None, None), "http://localhost");
    }
}
