//! Cover-image generation for automatically published articles.
//!
//! The generator is an external HTTP service that receives a prompt and
//! answers with the URL of the rendered image. Generation is best-effort:
//! callers log failures and carry on without a cover.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Produces a cover image URL for an article.
#[async_trait]
pub trait CoverImageGenerator: Send + Sync {
    async fn generate_cover(&self, title: &str, excerpt: Option<&str>) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    url: Option<String>,
}

/// Prompt sent to the generator for an article.
pub fn cover_prompt(title: &str, excerpt: Option<&str>) -> String {
    let mut prompt = format!(
        "Image de couverture professionnelle pour un article de blog sur la gestion de flottes au Québec: {}",
        title.trim()
    );
    if let Some(excerpt) = excerpt.map(str::trim).filter(|e| !e.is_empty()) {
        prompt.push_str(". ");
        prompt.push_str(excerpt);
    }
    prompt
}

/// Generator backed by a JSON-over-HTTP image service.
#[derive(Debug, Clone)]
pub struct HttpCoverImageGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpCoverImageGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build image generator HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl CoverImageGenerator for HttpCoverImageGenerator {
    async fn generate_cover(&self, title: &str, excerpt: Option<&str>) -> Result<String> {
        let prompt = cover_prompt(title, excerpt);
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt: &prompt });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Image generator request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("Image generator answered {}", status);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Image generator returned an unreadable body")?;
        match body.url.filter(|u| !u.is_empty()) {
            Some(url) => Ok(url),
            None => bail!("Image generator returned no URL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_title_and_excerpt() {
        let prompt = cover_prompt("Maintenance préventive", Some("Réduire les pannes"));
        assert!(prompt.ends_with("Maintenance préventive. Réduire les pannes"));

        let bare = cover_prompt("Titre", Some("  "));
        assert!(bare.ends_with(": Titre"));
    }
}
