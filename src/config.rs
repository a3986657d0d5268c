use std::time::Duration;

use anyhow::Context as _;
use url::Url;

pub const PRODUCT_NAME: &str = "PPolona";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_URL: &str = "https://polona.pl/api/entities";
pub const DEFAULT_SITE_URL: &str = "https://polona.pl";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Remote endpoints and transport settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Entity endpoint; searches hit `<api>/`, items `<api>/<id>`.
    pub api_url: Url,
    /// Public site; item pages live under `<site>/item/<slug>,<id>/`.
    pub site_url: Url,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            site_url: Url::parse(DEFAULT_SITE_URL).expect("default site url is valid"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url =
            std::env::var("PPOLONA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let site_url =
            std::env::var("PPOLONA_SITE_URL").unwrap_or_else(|_| DEFAULT_SITE_URL.to_owned());
        let timeout = match std::env::var("PPOLONA_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().with_context(|| {
                format!("invalid PPOLONA_HTTP_TIMEOUT_SECS={raw:?}. expected whole seconds")
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Self::new(&api_url, &site_url, Duration::from_secs(timeout))
    }

    pub fn new(api_url: &str, site_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let api_url = parse_base(api_url).context("parse api url")?;
        let site_url = parse_base(site_url).context("parse site url")?;
        Ok(Self {
            api_url,
            site_url,
            timeout,
        })
    }

    pub fn search_endpoint(&self) -> Url {
        self.api_url.clone()
    }

    /// `<api>/<id>`, with the id percent-encoded as one path segment.
    pub fn item_endpoint(&self, id: &str) -> anyhow::Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("api url cannot be a base: {}", self.api_url))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Canonical public page of an item.
    pub fn item_page_url(&self, slug: &str, id: &str) -> String {
        let site = self.site_url.as_str().trim_end_matches('/');
        format!("{site}/item/{slug},{id}/")
    }

    pub fn site_prefix(&self) -> &str {
        self.site_url.as_str().trim_end_matches('/')
    }
}

/// Base URLs always end with `/` so that `join` appends instead of replacing.
fn parse_base(raw: &str) -> anyhow::Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).with_context(|| format!("invalid url: {raw:?}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("url must be http/https: {url}");
    }
    Ok(url)
}

pub fn user_agent() -> String {
    format!("ppolona/{VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_follow_base_urls() -> anyhow::Result<()> {
        let config = ApiConfig::new(
            "http://127.0.0.1:8080/api/entities",
            "http://127.0.0.1:8080",
            Duration::from_secs(5),
        )?;

        assert_eq!(
            config.item_endpoint("abc123")?.as_str(),
            "http://127.0.0.1:8080/api/entities/abc123"
        );
        assert_eq!(
            config.search_endpoint().as_str(),
            "http://127.0.0.1:8080/api/entities/"
        );
        assert_eq!(
            config.item_page_url("kurier-warszawski", "abc123"),
            "http://127.0.0.1:8080/item/kurier-warszawski,abc123/"
        );
        Ok(())
    }

    #[test]
    fn item_ids_stay_inside_the_api_path() -> anyhow::Result<()> {
        let config = ApiConfig::default();
        assert_eq!(
            config.item_endpoint("../../x?y=1#z")?.as_str(),
            "https://polona.pl/api/entities/..%2F..%2Fx%3Fy=1%23z"
        );
        let absolute = config.item_endpoint("https://evil.example/a")?;
        assert_eq!(absolute.host_str(), Some("polona.pl"));
        assert!(absolute.path().starts_with("/api/entities/https:%2F%2F"));
        Ok(())
    }

    #[test]
    fn non_http_base_is_rejected() {
        assert!(ApiConfig::new("ftp://example.com", DEFAULT_SITE_URL, Duration::ZERO).is_err());
    }
}
