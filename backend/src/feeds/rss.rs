//! RSS 2.0 rendering.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::xml_escape;
use crate::api::Article;
use crate::content::excerpt_or_fallback;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Channel-level metadata.
#[derive(Debug, Clone)]
pub struct Channel<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub language: &'a str,
    /// Absolute site URL without trailing slash.
    pub base_url: &'a str,
}

/// Wrap text in a CDATA section. A literal `]]>` is split across two
/// sections so it cannot terminate the first one early.
pub fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

/// Render the feed. Items without a publication date are dated `now`.
pub fn render_rss(channel: &Channel<'_>, articles: &[Article], now: DateTime<Utc>) -> String {
    let base = xml_escape(channel.base_url);
    let mut items = String::new();
    for article in articles {
        let link = xml_escape(&format!("{}/articles/{}", channel.base_url, article.slug));
        let pub_date = article.published_at.unwrap_or(now).to_rfc2822();
        let _ = write!(
            items,
            "\n    <item>\n      <title>{}</title>\n      <link>{link}</link>\n      <guid isPermaLink=\"true\">{link}</guid>\n      <description>{}</description>\n      <pubDate>{}</pubDate>\n    </item>",
            cdata(&article.title),
            cdata(&excerpt_or_fallback(article)),
            pub_date,
        );
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{title}</title>
    <link>{base}</link>
    <description>{description}</description>
    <language>{language}</language>
    <lastBuildDate>{built}</lastBuildDate>
    <atom:link href="{base}/rss.xml" rel="self" type="application/rss+xml"/>
    <image>
      <url>{base}/fleetcrew-icon.png</url>
      <title>FleetCrew Blog</title>
      <link>{base}</link>
    </image>{items}
  </channel>
</rss>"#,
        title = xml_escape(channel.title),
        description = xml_escape(channel.description),
        language = xml_escape(channel.language),
        built = now.to_rfc2822(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ArticleId, ArticleStatus, CategoryId, UserId};
    use chrono::TimeZone;

    fn channel() -> Channel<'static> {
        Channel {
            title: "FleetCrew Blog",
            description: "Gestion de flottes",
            language: "fr-CA",
            base_url: "https://blog.example",
        }
    }

    fn article(slug: &str, excerpt: Option<&str>) -> Article {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        Article {
            id: ArticleId(1),
            title: "Freins ]]> & pneus".to_string(),
            slug: slug.to_string(),
            excerpt: excerpt.map(str::to_string),
            content: "é".repeat(300),
            cover_image: None,
            category_id: CategoryId(1),
            author_id: UserId(1),
            status: ArticleStatus::Published,
            featured: false,
            read_time: 5,
            view_count: 0,
            like_count: 0,
            published_at: Some(at),
            scheduled_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_cdata_splits_terminator() {
        assert_eq!(cdata("a]]>b"), "<![CDATA[a]]]]><![CDATA[>b]]>");
    }

    #[test]
    fn test_empty_feed_parses_with_no_items() {
        let xml = render_rss(&channel(), &[], Utc::now());
        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert!(feed.entries.is_empty());
        assert_eq!(feed.title.map(|t| t.content).as_deref(), Some("FleetCrew Blog"));
    }

    #[test]
    fn test_items_survive_hostile_titles() {
        let xml = render_rss(&channel(), &[article("freins", None)], Utc::now());
        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.entries.len(), 1);

        assert!(xml.contains("<title><![CDATA[Freins ]]]]><![CDATA[> & pneus]]></title>"));
        assert!(xml.contains("<link>https://blog.example/articles/freins</link>"));
        assert!(xml.contains("Tue, 4 Mar 2025 12:00:00 +0000"));
        let fallback = format!("{}...", "é".repeat(200));
        assert!(xml.contains(&fallback));
    }
}
