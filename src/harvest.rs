//! Dublin Core harvesting from an item's XML metadata resource.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::client::ArchiveClient;
use crate::error::StepError;
use crate::formats::DescriptiveMetadata;

/// Elements that always project to a list, however many times they occur.
pub const ALWAYS_LIST: &[&str] = &["language", "country", "contributor", "creator", "subject", "tags"];

const DESCRIPTION: &str = "Description";

/// Fetches and projects the descriptive metadata document. Returns `None`
/// when the feed is not XML or carries no usable `Description`.
pub fn harvest(client: &ArchiveClient, url: &str) -> Result<Option<DescriptiveMetadata>, StepError> {
    let fetched = client.fetch(url)?;
    if !crate::mime::is_xml(fetched.content_type()) {
        tracing::warn!(
            url,
            content_type = fetched.content_type(),
            "metadata feed is not XML; ignoring"
        );
        return Ok(None);
    }

    let xml = std::str::from_utf8(&fetched.bytes)
        .map_err(|err| StepError::decode(format!("metadata XML from {url}"), err))?;
    project_description(xml).map_err(|err| StepError::decode(format!("metadata XML from {url}"), err))
}

pub fn project_description(xml: &str) -> Result<Option<DescriptiveMetadata>, String> {
    let root = parse_tree(xml)?;
    let Some(first) = root.children.first() else {
        return Ok(None);
    };

    let mut wrapper = Map::new();
    wrapper.insert(first.name.clone(), first.project());
    match wrapper.remove(DESCRIPTION) {
        Some(Value::Object(map)) if !map.is_empty() => {
            Ok(Some(DescriptiveMetadata::from_projection(map)))
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| err.to_string())?;
            if attr.key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    fn project(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.attributes {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        let text = self.text.trim();
        if !text.is_empty() {
            map.insert("text".to_owned(), Value::String(text.to_owned()));
        }

        for child in &self.children {
            let body = child.project();
            let always_list = ALWAYS_LIST.contains(&child.name.as_str());
            match map.get_mut(&child.name) {
                Some(Value::Array(values)) if always_list => values.push(body),
                Some(existing) => {
                    let merged = match existing.take() {
                        Value::Array(mut values) => {
                            values.push(body);
                            values
                        }
                        previous => vec![previous, body],
                    };
                    *existing = Value::Array(merged);
                }
                None if always_list => {
                    map.insert(child.name.clone(), Value::Array(vec![body]));
                }
                None => {
                    map.insert(child.name.clone(), body);
                }
            }
        }
        Value::Object(map)
    }
}

fn parse_tree(xml: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| format!("at byte {}: {err}", reader.buffer_position()))?;
        match event {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unexpected closing tag".to_owned())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text.unescape().map_err(|err| err.to_string())?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_owned());
    }
    root.ok_or_else(|| "document has no root element".to_owned())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err("document has more than one root element".to_owned()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <rdf:Description rdf:about="https://polona.pl/item/abc">
    <dc:title>Kurier Warszawski</dc:title>
    <dc:language> polski </dc:language>
    <dc:tags>prasa</dc:tags>
    <dc:tags>Warszawa</dc:tags>
    <dc:frequency>dziennik</dc:frequency>
    <dc:relation rdf:resource="https://polona.pl/x"/>
  </rdf:Description>
</rdf:RDF>"#;

    #[test]
    fn projects_description_with_always_lists() -> anyhow::Result<()> {
        let dc = project_description(SAMPLE)
            .map_err(anyhow::Error::msg)?
            .ok_or_else(|| anyhow::anyhow!("expected a description"))?;

        assert_eq!(dc.language_texts().collect::<Vec<_>>(), vec!["polski"]);
        assert_eq!(dc.tag_texts().collect::<Vec<_>>(), vec!["prasa", "Warszawa"]);
        assert_eq!(dc.frequency_text(), Some("dziennik"));
        assert_eq!(dc.other["title"]["text"], "Kurier Warszawski");
        assert_eq!(dc.other["relation"]["resource"], "https://polona.pl/x");
        assert_eq!(dc.other["about"], "https://polona.pl/item/abc");
        Ok(())
    }

    #[test]
    fn single_occurrence_of_always_list_field_is_a_list() -> anyhow::Result<()> {
        let root = parse_tree(
            "<r><Description><language>pl</language><title>t</title></Description></r>",
        )
        .map_err(anyhow::Error::msg)?;
        let projected = root.children[0].project();
        assert!(projected["language"].is_array());
        assert!(projected["title"].is_object());
        Ok(())
    }

    #[test]
    fn repeated_plain_fields_become_lists() -> anyhow::Result<()> {
        let root = parse_tree("<r><d><note>a</note><note>b</note><note>c</note></d></r>")
            .map_err(anyhow::Error::msg)?;
        let projected = root.children[0].project();
        assert_eq!(projected["note"].as_array().map(Vec::len), Some(3));
        Ok(())
    }

    #[test]
    fn missing_or_empty_description_yields_none() -> anyhow::Result<()> {
        assert!(project_description("<r><Other><a>1</a></Other></r>").map_err(anyhow::Error::msg)?.is_none());
        assert!(project_description("<r><Description/></r>").map_err(anyhow::Error::msg)?.is_none());
        Ok(())
    }

    #[test]
    fn childless_root_yields_none() -> anyhow::Result<()> {
        assert!(project_description("<r/>").map_err(anyhow::Error::msg)?.is_none());
        assert!(project_description("<r>only text</r>").map_err(anyhow::Error::msg)?.is_none());
        Ok(())
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(project_description("<r><Description><a>1</b></Description></r>").is_err());
        assert!(project_description("<r><Description>").is_err());
        assert!(project_description("").is_err());
    }
}
