//! Raster PDF assembly from JPEG pages and in-place metadata rewriting.

use std::path::Path;

use anyhow::Context as _;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use crate::error::StepError;
use crate::pdf_meta::PdfMetadata;

const DEFAULT_DPI: f32 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JpegInfo {
    pub width: u32,
    pub height: u32,
    pub components: u8,
    pub dpi: Option<(f32, f32)>,
}

impl JpegInfo {
    fn color_space(&self) -> &'static str {
        match self.components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        }
    }

    /// Page size in points at the image's own density.
    fn page_size(&self) -> (f32, f32) {
        let (x_dpi, y_dpi) = self.dpi.unwrap_or((DEFAULT_DPI, DEFAULT_DPI));
        (
            self.width as f32 * 72.0 / x_dpi,
            self.height as f32 * 72.0 / y_dpi,
        )
    }
}

/// Encodes JPEG pages, in order, into a single PDF. The JPEG data is
/// embedded unchanged.
pub fn images_to_pdf(jpegs: &[Vec<u8>]) -> anyhow::Result<Vec<u8>> {
    if jpegs.is_empty() {
        anyhow::bail!("cannot build a PDF without pages");
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(jpegs.len());

    for (index, jpeg) in jpegs.iter().enumerate() {
        let info = jpeg_info(jpeg).with_context(|| format!("read JPEG header of page {}", index + 1))?;
        let (width, height) = info.page_size();

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => info.width as i64,
                "Height" => info.height as i64,
                "ColorSpace" => info.color_space(),
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.clone(),
        )
        .with_compression(false);
        let image_id = doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().context("encode page content")?,
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).context("serialize PDF")?;
    Ok(out)
}

/// Reads dimensions, component count and JFIF density from a JPEG header.
pub fn jpeg_info(bytes: &[u8]) -> anyhow::Result<JpegInfo> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        anyhow::bail!("missing JPEG start-of-image marker");
    }

    let mut dpi = None;
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            anyhow::bail!("corrupt JPEG marker at byte {pos}");
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0xD8 || (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }
        if marker == 0xD9 || marker == 0xDA {
            break;
        }

        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        let segment_end = pos + 2 + length;
        if length < 2 || segment_end > bytes.len() {
            anyhow::bail!("truncated JPEG segment at byte {pos}");
        }
        let segment = &bytes[pos + 4..segment_end];

        match marker {
            0xE0 if segment.len() >= 12 && segment.starts_with(b"JFIF\0") => {
                let units = segment[7];
                let x = u16::from_be_bytes([segment[8], segment[9]]) as f32;
                let y = u16::from_be_bytes([segment[10], segment[11]]) as f32;
                if x > 0.0 && y > 0.0 {
                    dpi = match units {
                        1 => Some((x, y)),
                        2 => Some((x * 2.54, y * 2.54)),
                        _ => dpi,
                    };
                }
            }
            // SOF0..SOF15, excluding DHT (C4), JPG (C8) and DAC (CC).
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                if segment.len() < 6 {
                    anyhow::bail!("truncated JPEG frame header");
                }
                let height = u16::from_be_bytes([segment[1], segment[2]]) as u32;
                let width = u16::from_be_bytes([segment[3], segment[4]]) as u32;
                let components = segment[5];
                if width == 0 || height == 0 {
                    anyhow::bail!("JPEG frame has zero size");
                }
                return Ok(JpegInfo {
                    width,
                    height,
                    components,
                    dpi,
                });
            }
            _ => {}
        }
        pos = segment_end;
    }

    anyhow::bail!("no JPEG frame header found")
}

/// Replaces the document XMP packet and mirrors the main fields into the
/// document information dictionary, saving over the original file.
pub fn write_metadata(path: &Path, meta: &PdfMetadata) -> Result<(), StepError> {
    let mut doc = Document::load(path).map_err(|err| StepError::pdf(path, format!("open: {err}")))?;
    set_metadata(&mut doc, meta).map_err(|err| StepError::pdf(path, format!("edit: {err:#}")))?;
    doc.save(path)
        .map_err(|err| StepError::pdf(path, format!("save: {err}")))?;
    Ok(())
}

fn set_metadata(doc: &mut Document, meta: &PdfMetadata) -> anyhow::Result<()> {
    let xmp = Stream::new(
        dictionary! {
            "Type" => "Metadata",
            "Subtype" => "XML",
        },
        meta.to_xmp().into_bytes(),
    )
    .with_compression(false);
    let xmp_id = doc.add_object(xmp);

    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .context("locate document catalog")?;
    doc.get_object_mut(catalog_id)
        .and_then(Object::as_dict_mut)
        .context("open document catalog")?
        .set("Metadata", xmp_id);

    let info_id = info_dictionary(doc)?;
    let info = doc
        .get_object_mut(info_id)
        .and_then(Object::as_dict_mut)
        .context("open document info")?;
    set_text(info, "Creator", Some(meta.creator_tool.as_str()));
    set_text(info, "Title", meta.title.as_deref());
    set_text(info, "Author", meta.author().as_deref());
    set_text(info, "Subject", meta.description.as_deref());
    set_text(info, "Keywords", meta.keywords.as_deref());
    Ok(())
}

fn info_dictionary(doc: &mut Document) -> anyhow::Result<ObjectId> {
    if let Ok(id) = doc.trailer.get(b"Info").and_then(Object::as_reference)
        && doc.get_object(id).and_then(Object::as_dict).is_ok()
    {
        return Ok(id);
    }
    let id = doc.add_object(Dictionary::new());
    doc.trailer.set("Info", id);
    Ok(id)
}

fn set_text(dict: &mut Dictionary, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        dict.set(key, text_string(value));
    }
}

/// PDF text string: literal when ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest byte sequence this module accepts as a JPEG.
    pub(crate) fn tiny_jpeg(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend_from_slice(&[
            0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x01, 0x00, 0x48,
            0x00, 0x48, 0x00, 0x00,
        ]);
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn reads_jpeg_header() -> anyhow::Result<()> {
        let info = jpeg_info(&tiny_jpeg(144, 72))?;
        assert_eq!((info.width, info.height, info.components), (144, 72, 3));
        assert_eq!(info.dpi, Some((72.0, 72.0)));
        assert_eq!(info.page_size(), (144.0, 72.0));
        Ok(())
    }

    #[test]
    fn rejects_non_jpeg() {
        assert!(jpeg_info(b"%PDF-1.4").is_err());
        assert!(jpeg_info(&[0xFF, 0xD8, 0xFF, 0xD9]).is_err());
    }

    #[test]
    fn builds_one_page_per_image() -> anyhow::Result<()> {
        let bytes = images_to_pdf(&[tiny_jpeg(10, 20), tiny_jpeg(30, 40), tiny_jpeg(5, 5)])?;
        let doc = Document::load_mem(&bytes)?;
        assert_eq!(doc.get_pages().len(), 3);
        Ok(())
    }

    #[test]
    fn empty_page_list_is_an_error() {
        assert!(images_to_pdf(&[]).is_err());
    }

    #[test]
    fn metadata_is_written_in_place() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("doc.pdf");
        std::fs::write(&path, images_to_pdf(&[tiny_jpeg(8, 8)])?)?;

        let meta = PdfMetadata {
            creator_tool: "PPolona test".to_owned(),
            title: Some("Gazeta Świąteczna".to_owned()),
            keywords: Some("a; b".to_owned()),
            ..PdfMetadata::default()
        };
        write_metadata(&path, &meta)?;

        let doc = Document::load(&path)?;
        assert_eq!(doc.get_pages().len(), 1);
        let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
        let xmp_id = doc.get_dictionary(catalog_id)?.get(b"Metadata")?.as_reference()?;
        let xmp = doc.get_object(xmp_id)?.as_stream()?;
        let packet = String::from_utf8(xmp.content.clone())?;
        assert!(packet.contains("Gazeta Świąteczna"));
        assert!(packet.contains("<pdf:Keywords>a; b</pdf:Keywords>"));

        let info_id = doc.trailer.get(b"Info")?.as_reference()?;
        let info = doc.get_dictionary(info_id)?;
        assert_eq!(info.get(b"Keywords")?.as_str()?, b"a; b");
        assert!(info.get(b"Title")?.as_str()?.starts_with(&[0xFE, 0xFF]));
        Ok(())
    }

    #[test]
    fn corrupt_pdf_is_a_pdf_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf")?;
        let err = write_metadata(&path, &PdfMetadata::default());
        assert!(matches!(err, Err(StepError::Pdf { .. })));
        Ok(())
    }
}
