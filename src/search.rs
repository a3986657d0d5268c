use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime};
use serde_json::Value;
use url::Url;

use crate::cli::SortKey;
use crate::client::ArchiveClient;
use crate::config::ApiConfig;
use crate::formats::{RawHit, SearchHit, SearchResults};

pub const PAGE_SIZE: u32 = 150;

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub languages: Vec<String>,
    pub sort: SortKey,
    pub advanced: bool,
}

/// Runs one search. A failed or undecodable response is logged and yields
/// an empty result set.
pub fn search(client: &ArchiveClient, query: &SearchQuery) -> SearchResults {
    let url = search_url(client.config(), query);
    match client.get_json(&url) {
        Ok(body) => parse_hits(client.config(), &body),
        Err(err) => {
            tracing::error!(error = %err, "search failed");
            SearchResults::default()
        }
    }
}

pub fn search_url(config: &ApiConfig, query: &SearchQuery) -> Url {
    let mut url = config.search_endpoint();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("query", &query.terms.join(" "));
        pairs.append_pair("sort", query.sort.as_query_value());
        pairs.append_pair("size", &PAGE_SIZE.to_string());
        if query.advanced {
            pairs.append_pair("advanced", "1");
        }
        pairs.append_pair("filters[public]", "1");
        for language in &query.languages {
            pairs.append_pair("filters[language][]", language);
        }
    }
    url
}

pub fn parse_hits(config: &ApiConfig, body: &Value) -> SearchResults {
    let Some(raw_hits) = body.get("hits").and_then(Value::as_array) else {
        tracing::warn!("search response has no hits array");
        return SearchResults::default();
    };

    let mut results = SearchResults::default();
    for (index, raw) in raw_hits.iter().enumerate() {
        let raw: RawHit = match serde_json::from_value(raw.clone()) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping malformed search hit");
                continue;
            }
        };
        let Some(id) = raw.id.filter(|id| !id.trim().is_empty()) else {
            tracing::warn!(index, "skipping search hit without id");
            continue;
        };

        let slug = raw.slug.unwrap_or_default();
        let hit = SearchHit {
            url: config.item_page_url(&slug, &id),
            year: raw.date.as_deref().and_then(parse_year),
            title: raw.title.unwrap_or_default(),
            slug,
            id,
        };
        let id = hit.id.clone();
        if !results.push(hit) {
            tracing::warn!(%id, "duplicate search hit ignored");
        }
    }
    results
}

/// Year of a loosely formatted archive date, if it can be parsed.
pub fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.year());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.year());
        }
    }
    for format in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.year());
        }
    }

    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    let rest = &raw[digits.len()..];
    if digits.len() == 4 && (rest.is_empty() || rest.starts_with(['-', '/', '.', ' '])) {
        return digits.parse().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig::default()
    }

    #[test]
    fn search_url_carries_params_then_filters() {
        let query = SearchQuery {
            terms: vec!["kurier".to_owned(), "warszawski".to_owned()],
            languages: vec!["polski".to_owned(), "niemiecki".to_owned()],
            sort: SortKey::DateDesc,
            advanced: true,
        };
        let url = search_url(&config(), &query);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let expected = [
            ("query", "kurier warszawski"),
            ("sort", "date desc"),
            ("size", "150"),
            ("advanced", "1"),
            ("filters[public]", "1"),
            ("filters[language][]", "polski"),
            ("filters[language][]", "niemiecki"),
        ];
        assert_eq!(pairs.len(), expected.len());
        for ((k, v), (ek, ev)) in pairs.iter().zip(expected) {
            assert_eq!((k.as_str(), v.as_str()), (ek, ev));
        }
    }

    #[test]
    fn plain_search_omits_advanced_flag() {
        let query = SearchQuery {
            terms: vec!["warszawa".to_owned()],
            languages: Vec::new(),
            sort: SortKey::ScoreDesc,
            advanced: false,
        };
        let url = search_url(&config(), &query);
        assert!(!url.query_pairs().any(|(k, _)| k == "advanced"));
        assert!(!url.query_pairs().any(|(k, _)| k == "filters[language][]"));
    }

    #[test]
    fn hits_keep_server_order_and_drop_missing_ids() {
        let body = serde_json::json!({
            "hits": [
                {"id": "zz9", "title": "Later", "slug": "later", "date": "1931-02-03"},
                {"title": "No id", "slug": "nothing"},
                {"id": "aa1", "title": "Earlier", "slug": "earlier", "date": "not a date"},
                {"id": "zz9", "title": "Duplicate", "slug": "dup"},
            ]
        });
        let results = parse_hits(&config(), &body);

        assert_eq!(results.ids(), vec!["zz9", "aa1"]);
        let first = &results.hits()[0];
        assert_eq!(first.year, Some(1931));
        assert_eq!(first.url, "https://polona.pl/item/later,zz9/");
        assert_eq!(first.title, "Later");
        assert_eq!(results.hits()[1].year, None);
    }

    #[test]
    fn missing_hits_array_is_empty() {
        let results = parse_hits(&config(), &serde_json::json!({"error": "nope"}));
        assert!(results.is_empty());
    }

    #[test]
    fn parse_year_accepts_common_shapes() {
        assert_eq!(parse_year("1920"), Some(1920));
        assert_eq!(parse_year("1920-05-01"), Some(1920));
        assert_eq!(parse_year("1920-05-01T10:00:00Z"), Some(1920));
        assert_eq!(parse_year("1920-05-01 10:00:00"), Some(1920));
        assert_eq!(parse_year("1920-1925"), Some(1920));
        assert_eq!(parse_year("ca. 1920"), None);
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("19201"), None);
    }
}
