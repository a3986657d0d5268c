//! Mapping of item bibliography onto PDF (XMP) metadata properties.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::error::StepError;
use crate::formats::Item;

const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
const NS_XMP_RIGHTS: &str = "http://ns.adobe.com/xap/1.0/rights/";
const NS_PDF: &str = "http://ns.adobe.com/pdf/1.3/";
const NS_PRISM2: &str = "http://prismstandard.org/namespaces/basic/2.0/";

/// Every property this tool writes. Empty values are left out of the packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetadata {
    pub creator_tool: String,
    pub identifier: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub identifiers: Vec<String>,
    pub title: Option<String>,
    pub date: Vec<String>,
    pub time_period: Vec<String>,
    pub source: Option<String>,
    pub url: Option<String>,
    pub creator: Vec<String>,
    pub contributor: Vec<String>,
    pub language: Vec<String>,
    pub rights: Option<String>,
    pub web_statement: Option<String>,
    pub types: Vec<String>,
    pub content_type: Option<String>,
    pub subject: Vec<String>,
    pub keywords: Option<String>,
    pub publisher: Vec<String>,
    pub location: Option<String>,
    pub series_title: Option<String>,
    pub publishing_frequency: Option<String>,
    pub publication_name: Option<String>,
    pub description: Option<String>,
}

impl PdfMetadata {
    pub fn from_item(item: &Item) -> Self {
        let mut meta = Self {
            creator_tool: format!("{} {}", crate::config::PRODUCT_NAME, crate::config::VERSION),
            ..Self::default()
        };

        meta.identifier = present(item.id.as_deref());
        meta.isbn = present(item.isbn.as_deref());
        meta.issn = present(item.issn.as_deref());
        meta.identifiers = dedup(
            [&item.id, &item.isbn, &item.issn, &item.academica_id, &item.oclc_no]
                .into_iter()
                .flatten()
                .chain(&item.call_no)
                .cloned(),
        );

        meta.title = present(item.title.as_deref());
        meta.date = present(item.date.as_deref()).into_iter().collect();
        meta.time_period = present(item.date_descriptive.as_deref()).into_iter().collect();
        meta.source = present(Some(item.url.as_str()));
        meta.url = meta.source.clone();

        meta.contributor = dedup(item.contributor.iter().cloned());
        let author = present(item.creator_name.as_deref())
            .or_else(|| present(item.creator.as_deref()))
            .or_else(|| item.contributor.iter().find_map(|c| present(Some(c.as_str()))));
        meta.creator = author
            .map(|author| normalize_author(&author))
            .filter(|author| !author.is_empty())
            .into_iter()
            .collect();

        if let Some(dc) = &item.dc {
            meta.language = dedup(dc.language_texts().map(|text| text.trim().to_owned()));
        }

        if !item.rights.is_empty() {
            let rights = item.rights.join(";");
            meta.rights = Some(rights.clone());
            meta.web_statement = Some(rights);
        }

        if !item.categories.is_empty() {
            meta.types = dedup(item.categories.iter().cloned());
            meta.content_type = Some(item.categories.join("; "));
        }

        let dc_tags = item
            .dc
            .iter()
            .flat_map(|dc| dc.tag_texts())
            .map(str::to_owned);
        let keywords: BTreeSet<String> = item
            .subject
            .iter()
            .chain(&item.keywords)
            .chain(&item.metatypes)
            .chain(&item.projects)
            .cloned()
            .chain(dc_tags)
            .filter(|keyword| !keyword.trim().is_empty())
            .collect();
        if !keywords.is_empty() {
            meta.subject = keywords.into_iter().collect();
            meta.keywords = Some(meta.subject.join("; "));
        }

        meta.publisher = dedup(
            [&item.publisher, &item.imprint]
                .into_iter()
                .flatten()
                .cloned(),
        );

        let location: Vec<&str> = item
            .publish_place
            .iter()
            .chain(&item.country)
            .map(String::as_str)
            .collect();
        if !location.is_empty() {
            meta.location = Some(location.join(", "));
        }

        let mut description: Vec<String> = Vec::new();
        if let Some(series) = verbatim(item.series.as_deref()) {
            meta.series_title = Some(series.clone());
            description.push(series);
        }
        if let Some(frequency) = item.dc.as_ref().and_then(|dc| dc.frequency_text()) {
            meta.publishing_frequency = Some(frequency.to_owned());
            description.push(frequency.to_owned());
        }
        if let Some(press_title) = verbatim(item.press_title.as_deref()) {
            meta.publication_name = Some(press_title.clone());
            description.push(press_title);
        }
        description.extend(
            item.notes
                .iter()
                .chain(&item.physical_description)
                .chain(&item.sources)
                .chain(&item.projects)
                .filter_map(|part| verbatim(Some(part.as_str()))),
        );
        if !description.is_empty() {
            meta.description = Some(description.join("; "));
        }

        meta
    }

    /// Single author string for the document information dictionary.
    pub fn author(&self) -> Option<String> {
        (!self.creator.is_empty()).then(|| self.creator.join("; "))
    }

    /// Serializes the properties as a complete XMP packet.
    pub fn to_xmp(&self) -> String {
        let mut props = String::new();

        simple(&mut props, "xmp:CreatorTool", Some(&self.creator_tool));
        simple(&mut props, "dc:identifier", self.identifier.as_deref());
        simple(&mut props, "prism2:isbn", self.isbn.as_deref());
        simple(&mut props, "prism2:issn", self.issn.as_deref());
        array(&mut props, "xmp:Identifier", "Bag", &self.identifiers);
        lang_alt(&mut props, "dc:title", self.title.as_deref());
        array(&mut props, "dc:date", "Seq", &self.date);
        array(&mut props, "prism2:timePeriod", "Bag", &self.time_period);
        simple(&mut props, "dc:source", self.source.as_deref());
        simple(&mut props, "prism2:url", self.url.as_deref());
        array(&mut props, "dc:creator", "Seq", &self.creator);
        array(&mut props, "dc:contributor", "Bag", &self.contributor);
        array(&mut props, "dc:language", "Bag", &self.language);
        lang_alt(&mut props, "dc:rights", self.rights.as_deref());
        simple(&mut props, "xmpRights:WebStatement", self.web_statement.as_deref());
        array(&mut props, "dc:type", "Bag", &self.types);
        simple(&mut props, "prism2:contentType", self.content_type.as_deref());
        array(&mut props, "dc:subject", "Bag", &self.subject);
        simple(&mut props, "pdf:Keywords", self.keywords.as_deref());
        array(&mut props, "dc:publisher", "Bag", &self.publisher);
        simple(&mut props, "prism2:location", self.location.as_deref());
        simple(&mut props, "prism2:seriesTitle", self.series_title.as_deref());
        simple(
            &mut props,
            "prism2:publishingFrequency",
            self.publishing_frequency.as_deref(),
        );
        simple(
            &mut props,
            "prism2:publicationName",
            self.publication_name.as_deref(),
        );
        lang_alt(&mut props, "dc:description", self.description.as_deref());

        format!(
            "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n\
<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n\
 <rdf:RDF xmlns:rdf=\"{NS_RDF}\">\n\
  <rdf:Description rdf:about=\"\"\n\
    xmlns:dc=\"{NS_DC}\"\n\
    xmlns:xmp=\"{NS_XMP}\"\n\
    xmlns:xmpRights=\"{NS_XMP_RIGHTS}\"\n\
    xmlns:pdf=\"{NS_PDF}\"\n\
    xmlns:prism2=\"{NS_PRISM2}\">\n\
{props}  </rdf:Description>\n\
 </rdf:RDF>\n\
</x:xmpmeta>\n\
<?xpacket end=\"w\"?>"
        )
    }
}

/// Maps the item onto the PDF at `path`, rewriting it in place.
pub fn apply(path: &Path, item: &Item) -> Result<(), StepError> {
    let meta = PdfMetadata::from_item(item);
    crate::pdf::write_metadata(path, &meta)
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Description parts are kept as written; blank ones are dropped.
fn verbatim(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(str::to_owned)
}

/// Drops empties and repeats, keeping first-seen order.
fn dedup(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// Commas become spaces; runs of spaces collapse to one.
fn normalize_author(author: &str) -> String {
    author
        .replace(',', " ")
        .split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

fn simple(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        out.push_str(&format!("   <{name}>{}</{name}>\n", escape(value)));
    }
}

fn lang_alt(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        out.push_str(&format!(
            "   <{name}><rdf:Alt><rdf:li xml:lang=\"x-default\">{}</rdf:li></rdf:Alt></{name}>\n",
            escape(value)
        ));
    }
}

fn array(out: &mut String, name: &str, kind: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    out.push_str(&format!("   <{name}><rdf:{kind}>"));
    for value in values {
        out.push_str(&format!("<rdf:li>{}</rdf:li>", escape(value)));
    }
    out.push_str(&format!("</rdf:{kind}></{name}>\n"));
}
