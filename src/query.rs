use regex::Regex;

use crate::cli::Cli;
use crate::client::ArchiveClient;
use crate::config::ApiConfig;
use crate::formats::SearchResults;
use crate::search::SearchQuery;

/// What the user asked for, as given on the command line.
#[derive(Debug, Clone)]
pub enum Query {
    Urls(Vec<String>),
    Ids(Vec<String>),
    Search(SearchQuery),
}

impl Query {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.ids {
            Self::Ids(cli.query.clone())
        } else if cli.search || cli.advanced {
            Self::Search(SearchQuery {
                terms: cli.query.clone(),
                languages: cli.search_languages.clone(),
                sort: cli.sort,
                advanced: cli.advanced,
            })
        } else {
            Self::Urls(cli.query.clone())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub ids: Vec<String>,
    /// Present only when the ids came from a search.
    pub hits: Option<SearchResults>,
}

pub fn resolve(client: &ArchiveClient, query: &Query) -> anyhow::Result<Resolution> {
    Ok(match query {
        Query::Ids(ids) => Resolution {
            ids: ids.clone(),
            hits: None,
        },
        Query::Urls(urls) => Resolution {
            ids: ids_from_urls(client.config(), urls)?,
            hits: None,
        },
        Query::Search(search) => {
            let hits = crate::search::search(client, search);
            tracing::info!(hits = hits.len(), "search finished");
            Resolution {
                ids: hits.ids(),
                hits: Some(hits),
            }
        }
    })
}

pub fn item_url_pattern(config: &ApiConfig) -> anyhow::Result<Regex> {
    let site = regex::escape(config.site_prefix());
    Ok(Regex::new(&format!(r"^{site}/item/.*?,([A-Za-z0-9]+)/"))?)
}

/// Extracts item ids from site URLs. Anything else is dropped with a warning.
pub fn ids_from_urls(config: &ApiConfig, urls: &[String]) -> anyhow::Result<Vec<String>> {
    let pattern = item_url_pattern(config)?;
    let mut ids = Vec::with_capacity(urls.len());
    for url in urls {
        match pattern.captures(url).and_then(|caps| caps.get(1)) {
            Some(id) => ids.push(id.as_str().to_owned()),
            None => tracing::warn!(%url, "not a Polona item URL; ignoring"),
        }
    }
    Ok(ids)
}
