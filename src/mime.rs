//! Media type to file extension resolution for the handful of types the
//! archive serves.

/// Known extensions for a media type. Parameters (`; charset=...`) and case
/// are ignored; unknown types resolve to nothing.
pub fn extensions(media_type: &str) -> &'static [&'static str] {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/pdf" | "application/x-pdf" => &[".pdf"],
        "text/xml" => &[".xml"],
        "application/xml" => &[".xml", ".xsl"],
        "image/jpeg" => &[".jpg", ".jpe", ".jpeg"],
        "image/pjpeg" => &[".jpg", ".jpeg"],
        "image/png" => &[".png"],
        "image/tiff" => &[".tif", ".tiff"],
        "application/json" => &[".json"],
        "text/html" => &[".html", ".htm"],
        _ => &[],
    }
}

pub fn resolves_to(media_type: &str, extension: &str) -> bool {
    extensions(media_type).contains(&extension)
}

pub fn is_pdf(media_type: &str) -> bool {
    resolves_to(media_type, ".pdf")
}

pub fn is_xml(media_type: &str) -> bool {
    resolves_to(media_type, ".xml")
}

pub fn is_jpeg(media_type: &str) -> bool {
    resolves_to(media_type, ".jpg") || resolves_to(media_type, ".jpeg")
}

/// JPEG byte signature: SOI at the start, EOI at the end.
pub fn has_jpeg_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes.starts_with(&[0xFF, 0xD8]) && bytes.ends_with(&[0xFF, 0xD9])
}

pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}
