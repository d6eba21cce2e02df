//! Sitemap and robots.txt.

use std::fmt::Write;

use super::xml_escape;
use crate::api::{Article, Category};

/// Pages that exist regardless of content.
pub const STATIC_PAGES: [&str; 5] = ["/", "/articles", "/innovations", "/contact", "/rss"];

fn url_entry(out: &mut String, loc: &str, lastmod: Option<String>) {
    let _ = write!(out, "\n  <url>\n    <loc>{}</loc>", xml_escape(loc));
    if let Some(lastmod) = lastmod {
        let _ = write!(out, "\n    <lastmod>{}</lastmod>", lastmod);
    }
    out.push_str("\n  </url>");
}

pub fn render_sitemap(base_url: &str, categories: &[Category], articles: &[Article]) -> String {
    let mut urls = String::new();
    for page in STATIC_PAGES {
        let loc = if page == "/" {
            format!("{}/", base_url)
        } else {
            format!("{}{}", base_url, page)
        };
        url_entry(&mut urls, &loc, None);
    }
    for category in categories {
        url_entry(
            &mut urls,
            &format!("{}/articles?category={}", base_url, category.slug),
            None,
        );
    }
    for article in articles {
        url_entry(
            &mut urls,
            &format!("{}/articles/{}", base_url, article.slug),
            Some(article.updated_at.format("%Y-%m-%d").to_string()),
        );
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">{}\n</urlset>",
        urls
    )
}

pub fn render_robots(base_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /admin\nDisallow: /api/\n\nSitemap: {}/sitemap.xml\n",
        base_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CategoryId;
    use chrono::Utc;

    #[test]
    fn test_sitemap_escapes_query_ampersands() {
        let category = Category {
            id: CategoryId(1),
            name: "IA & Tech".to_string(),
            slug: "ia".to_string(),
            description: None,
            icon: None,
            color: None,
            created_at: Utc::now(),
        };
        let xml = render_sitemap("https://blog.example?x=1&y=2", &[category], &[]);
        assert!(xml.contains("<loc>https://blog.example?x=1&amp;y=2/articles?category=ia</loc>"));
        assert_eq!(xml.matches("<url>").count(), STATIC_PAGES.len() + 1);
    }

    #[test]
    fn test_robots_points_at_sitemap() {
        let robots = render_robots("https://blog.example");
        assert!(robots.contains("Disallow: /admin\n"));
        assert!(robots.ends_with("Sitemap: https://blog.example/sitemap.xml\n"));
    }
}
