use anyhow::Context as _;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use url::Url;

use crate::config::ApiConfig;
use crate::error::StepError;

const MAX_RENDERED_BODY_CHARS: usize = 2000;

/// Body and declared media type of a fetched resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Fetched {
    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or_default()
    }
}

/// Blocking client for the archive API. Every call runs to completion
/// before the next one starts.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: reqwest::blocking::Client,
    config: ApiConfig,
}

impl ArchiveClient {
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build archive http client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// GET a JSON document. Non-JSON bodies are reported with a readable
    /// rendering of what the server sent instead.
    pub fn get_json(&self, url: &Url) -> Result<Value, StepError> {
        tracing::debug!(%url, "GET json");
        let response = self
            .http
            .get(url.clone())
            .header(USER_AGENT, crate::config::user_agent())
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|err| StepError::transport(url.as_str(), err))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| StepError::transport(url.as_str(), err))?;

        if !status.is_success() {
            return Err(StepError::transport(
                url.as_str(),
                format!("HTTP {status}\n{}", render_body(&body)),
            ));
        }

        serde_json::from_str(&body).map_err(|err| {
            StepError::decode(
                format!("JSON response from {url}"),
                format!("{err}\n{}", render_body(&body)),
            )
        })
    }

    /// GET a resource in full, keeping its declared content type.
    pub fn fetch(&self, url: &str) -> Result<Fetched, StepError> {
        tracing::debug!(url, "GET resource");
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, crate::config::user_agent())
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| StepError::transport(url, err))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .map_err(|err| StepError::transport(url, err))?
            .to_vec();

        Ok(Fetched {
            content_type,
            bytes,
        })
    }
}

/// Renders a response body as readable text for diagnostics.
pub fn render_body(body: &str) -> String {
    let trimmed = body.trim();
    let rendered = if trimmed.starts_with('<') {
        html2md::parse_html(trimmed)
    } else {
        trimmed.to_owned()
    };

    let mut chars = rendered.chars();
    let mut out: String = chars.by_ref().take(MAX_RENDERED_BODY_CHARS).collect();
    if chars.next().is_some() {
        out.push_str("\n[...]");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_body_converts_html_and_truncates() {
        let rendered = render_body("<html><body><h1>Bad Gateway</h1></body></html>");
        assert!(rendered.contains("Bad Gateway"));
        assert!(!rendered.contains("<h1>"));

        let long = "x".repeat(MAX_RENDERED_BODY_CHARS + 10);
        let rendered = render_body(&long);
        assert!(rendered.ends_with("[...]"));
        assert_eq!(rendered.chars().filter(|c| *c == 'x').count(), MAX_RENDERED_BODY_CHARS);
    }
}
