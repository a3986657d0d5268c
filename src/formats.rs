use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One search result, as exported by `--format yaml|json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub url: String,
}

/// Hits in server order. Serializes as a mapping keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    hits: Vec<SearchHit>,
}

impl SearchResults {
    /// Appends a hit unless its id is already present. Returns whether it was added.
    pub fn push(&mut self, hit: SearchHit) -> bool {
        if self.hits.iter().any(|existing| existing.id == hit.id) {
            return false;
        }
        self.hits.push(hit);
        true
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn ids(&self) -> Vec<String> {
        self.hits.iter().map(|hit| hit.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl FromIterator<SearchHit> for SearchResults {
    fn from_iter<T: IntoIterator<Item = SearchHit>>(iter: T) -> Self {
        let mut results = Self::default();
        for hit in iter {
            results.push(hit);
        }
        results
    }
}

impl Serialize for SearchResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.hits.iter().map(|hit| (hit.id.as_str(), hit)))
    }
}

/// Raw hit as returned by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHit {
    #[serde(default, deserialize_with = "opt_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, deserialize_with = "text")]
    pub url: String,
    #[serde(default, deserialize_with = "text")]
    pub mime: String,
}

/// One page of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    #[serde(default, deserialize_with = "list")]
    pub resources: Vec<Resource>,
}

impl Scan {
    /// The authoritative page image: the first `image/jpeg` resource.
    pub fn jpeg(&self) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|resource| resource.mime == "image/jpeg")
    }
}

/// Authoritative record of one archive document plus the fields derived
/// while resolving it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, deserialize_with = "opt_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub date_descriptive: Option<String>,

    #[serde(default, deserialize_with = "list")]
    pub scans: Vec<Scan>,
    #[serde(default, deserialize_with = "list")]
    pub resources: Vec<Resource>,

    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub contributor: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub rights: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub subject: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub metatypes: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub imprint: Option<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub publish_place: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub country: Vec<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub press_title: Option<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub physical_description: Vec<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub issn: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub academica_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub oclc_no: Option<String>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub call_no: Vec<String>,

    // Derived by the item resolver.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_deserializing)]
    pub subdir: String,
    #[serde(skip_deserializing)]
    pub url: String,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub textpdf_url: Option<String>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub dc_url: Option<String>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub dc: Option<DescriptiveMetadata>,
}

impl Item {
    /// The identifier, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn has_scans(&self) -> bool {
        !self.scans.is_empty()
    }

    pub fn has_resources(&self) -> bool {
        !self.resources.is_empty()
    }
}

/// Flattened projection of the item's Dublin Core `Description` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DescriptiveMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub language: Vec<DcNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub country: Vec<DcNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributor: Vec<DcNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creator: Vec<DcNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subject: Vec<DcNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<DcNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<DcNode>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl DescriptiveMetadata {
    /// Builds the typed view from a projected `Description` mapping.
    pub fn from_projection(mut map: serde_json::Map<String, Value>) -> Self {
        let mut take_list = |key: &str| -> Vec<DcNode> {
            match map.remove(key) {
                Some(Value::Array(values)) => values.into_iter().map(DcNode::from_value).collect(),
                Some(value) => vec![DcNode::from_value(value)],
                None => Vec::new(),
            }
        };

        let language = take_list("language");
        let country = take_list("country");
        let contributor = take_list("contributor");
        let creator = take_list("creator");
        let subject = take_list("subject");
        let tags = take_list("tags");
        let frequency = match map.remove("frequency") {
            Some(Value::Array(values)) => values.into_iter().next().map(DcNode::from_value),
            Some(value) => Some(DcNode::from_value(value)),
            None => None,
        };

        Self {
            language,
            country,
            contributor,
            creator,
            subject,
            tags,
            frequency,
            other: map.into_iter().collect(),
        }
    }

    pub fn language_texts(&self) -> impl Iterator<Item = &str> {
        self.language.iter().filter_map(DcNode::text)
    }

    pub fn tag_texts(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().filter_map(DcNode::text)
    }

    pub fn frequency_text(&self) -> Option<&str> {
        self.frequency.as_ref().and_then(DcNode::text)
    }
}

/// One projected XML element: its text plus attributes and nested elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DcNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

impl DcNode {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => {
                let text = map.remove("text").and_then(value_to_text);
                Self {
                    text,
                    rest: map.into_iter().collect(),
                }
            }
            other => Self {
                text: value_to_text(other),
                rest: BTreeMap::new(),
            },
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.trim().is_empty())
    }
}

/// Coerces a JSON scalar to text. Numbers and booleans are stringified;
/// `null` and empty strings are absent.
pub fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other @ (Value::Array(_) | Value::Object(_)) => Some(other.to_string()),
    }
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_text))
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_text(deserializer)?.unwrap_or_default())
}

fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => values.into_iter().filter_map(value_to_text).collect(),
        Some(value) => value_to_text(value).into_iter().collect(),
    })
}

fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let values = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(values)) => values,
        Some(value) => vec![value],
    };
    values
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(serde::de::Error::custom))
        .collect()
}
