use crate::client::ArchiveClient;
use crate::config::ApiConfig;
use crate::error::StepError;
use crate::formats::Item;
use crate::search::parse_year;

const SLUG_PREFIX_CHARS: usize = 64;

/// Fetches one item and fills in its derived fields. `Ok(None)` means the
/// record had no usable identifier and was skipped.
pub fn resolve(client: &ArchiveClient, id: &str) -> Result<Option<Item>, StepError> {
    let url = client
        .config()
        .item_endpoint(id)
        .map_err(|err| StepError::transport(id, format!("{err:#}")))?;
    let body = client.get_json(&url)?;

    let mut item: Item = serde_json::from_value(body.clone())
        .map_err(|err| StepError::decode(format!("item record {id}"), err))?;
    if item.id().is_none() {
        tracing::warn!(%id, record = %truncate(&body.to_string(), 300), "item record has no id; skipping");
        return Ok(None);
    }

    derive(client.config(), &mut item);
    classify_resources(client, &mut item);
    Ok(Some(item))
}

/// Fills in `year`, `subdir` and `url`.
pub fn derive(config: &ApiConfig, item: &mut Item) {
    let id = item.id().unwrap_or_default().to_owned();
    let slug = item.slug.clone().unwrap_or_default();

    item.year = item.date.as_deref().and_then(parse_year);
    item.subdir = subdir(item.year, &slug, &id);
    item.url = config.item_page_url(&slug, &id);
}

/// `<year>-<slug prefix>-<id>`, the year part only when known.
pub fn subdir(year: Option<i32>, slug: &str, id: &str) -> String {
    let mut out = String::new();
    if let Some(year) = year {
        out.push_str(&format!("{year}-"));
    }
    out.extend(slug.chars().take(SLUG_PREFIX_CHARS));
    out.push('-');
    out.push_str(id);
    out
}

/// Picks the text PDF and harvests descriptive metadata from the item's
/// declared resources.
pub fn classify_resources(client: &ArchiveClient, item: &mut Item) {
    if !item.has_resources() {
        tracing::debug!(id = item.id().unwrap_or_default(), "item declares no resources");
        return;
    }

    for resource in item.resources.clone() {
        if resource.url.is_empty() {
            continue;
        }
        if crate::mime::is_pdf(&resource.mime) {
            item.textpdf_url = Some(resource.url.clone());
        }
        if crate::mime::is_xml(&resource.mime) {
            item.dc_url = Some(resource.url.clone());
            match crate::harvest::harvest(client, &resource.url) {
                Ok(Some(dc)) => item.dc = Some(dc),
                Ok(None) => {}
                Err(err) => tracing::error!(
                    id = item.id().unwrap_or_default(),
                    error = %err,
                    "cannot harvest descriptive metadata"
                ),
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
