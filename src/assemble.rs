//! Turns a resolved item into files on disk: a folder of page images or a
//! raster PDF, a YAML sidecar, and optionally the archive's text PDF.

use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::client::ArchiveClient;
use crate::error::StepError;
use crate::formats::Item;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Write page JPEGs into a folder instead of building a PDF.
    pub images: bool,
    /// Process at most this many pages (0: all).
    pub max_pages: usize,
    /// Leave existing artifacts alone instead of overwriting them.
    pub skip_existing: bool,
    pub skip_text_pdf: bool,
}

impl From<&Cli> for AssembleOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            images: cli.images,
            max_pages: cli.max_pages,
            skip_existing: cli.skip,
            skip_text_pdf: cli.textpdf_skip,
        }
    }
}

/// Where an item's artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Page folder in images mode, `<subdir>.pdf` otherwise.
    pub main: PathBuf,
    pub yaml: PathBuf,
    pub text_pdf: Option<PathBuf>,
}

impl DownloadTarget {
    pub fn new(root: &Path, item: &Item, images: bool) -> Self {
        let id = item.id().unwrap_or_default();
        let base = root.join(&item.subdir);
        let has_text_pdf = item.textpdf_url.is_some();

        if images {
            Self {
                yaml: base.join(format!("{id}.yaml")),
                text_pdf: has_text_pdf.then(|| base.join(format!("{id}_text.pdf"))),
                main: base,
            }
        } else {
            Self {
                main: with_suffix(&base, ".pdf"),
                yaml: with_suffix(&base, ".yaml"),
                text_pdf: has_text_pdf.then(|| with_suffix(&base, "_text.pdf")),
            }
        }
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug)]
pub enum StepOutcome {
    Written,
    /// Left alone because it already exists.
    Skipped,
    /// Nothing to do for this step.
    NotApplicable,
    Failed(Vec<StepError>),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    fn from_errors(errors: Vec<StepError>) -> Self {
        if errors.is_empty() {
            Self::Written
        } else {
            Self::Failed(errors)
        }
    }
}

#[derive(Debug)]
pub struct ItemReport {
    pub id: String,
    pub target: DownloadTarget,
    pub pages_planned: usize,
    pub pages_written: usize,
    pub main: StepOutcome,
    pub text_pdf: StepOutcome,
}

impl ItemReport {
    pub fn success(&self) -> bool {
        self.main.is_success() && self.text_pdf.is_success()
    }
}

pub struct Assembler<'a> {
    client: &'a ArchiveClient,
    root: &'a Path,
    options: AssembleOptions,
}

impl<'a> Assembler<'a> {
    pub fn new(client: &'a ArchiveClient, root: &'a Path, options: AssembleOptions) -> Self {
        Self {
            client,
            root,
            options,
        }
    }

    pub fn assemble(&self, item: &Item, progress: &str) -> ItemReport {
        let target = DownloadTarget::new(self.root, item, self.options.images);
        let declared = item.scans.len();
        let pages_planned = match self.options.max_pages {
            0 => declared,
            cap => cap.min(declared),
        };
        let subdir_preview: String = item.subdir.chars().take(40).collect();
        tracing::info!(
            "{progress}: Downloading {pages_planned}/{declared} pages into {subdir_preview}..."
        );

        let (main, pages_written) = self.main_step(item, &target, pages_planned, progress);
        let text_pdf = self.text_pdf_step(item, &target);

        ItemReport {
            id: item.id().unwrap_or_default().to_owned(),
            target,
            pages_planned,
            pages_written,
            main,
            text_pdf,
        }
    }

    fn main_step(
        &self,
        item: &Item,
        target: &DownloadTarget,
        pages_planned: usize,
        progress: &str,
    ) -> (StepOutcome, usize) {
        let kind = if self.options.images { "folder" } else { "PDF" };
        let mut overwrite = true;
        if target.main.exists() {
            if self.options.skip_existing {
                overwrite = false;
                tracing::info!("Skipping {kind} {}", target.main.display());
            } else {
                tracing::warn!("Overwriting {kind} {}", target.main.display());
            }
        }

        if self.options.images
            && let Err(err) =
                create_dir(&target.main).and_then(|()| write_yaml(&target.yaml, item))
        {
            tracing::error!(error = %err, "cannot write item sidecar");
            return (StepOutcome::Failed(vec![err]), 0);
        }

        if !overwrite {
            return (StepOutcome::Skipped, 0);
        }

        let mut errors = Vec::new();
        let mut collected: Vec<Vec<u8>> = Vec::new();
        let id = item.id().unwrap_or_default();

        for (index, scan) in item.scans.iter().take(pages_planned).enumerate() {
            let page = index + 1;
            tracing::info!("{progress} [page {page:03}/{pages_planned:03}]: downloading");

            let Some(resource) = scan.jpeg() else {
                tracing::warn!(%id, page, "page has no JPEG resource");
                continue;
            };
            let bytes = match fetch_scan(self.client, &resource.url) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::error!(%id, page, error = %err, "Cannot download {}", resource.url);
                    errors.push(err);
                    continue;
                }
            };

            if self.options.images {
                let path = target.main.join(format!("{id}-{page:04}.jpg"));
                if let Err(err) = std::fs::write(&path, &bytes) {
                    let err = StepError::filesystem(&path, err);
                    tracing::error!(error = %err, "cannot write page image");
                    errors.push(err);
                    continue;
                }
            }
            collected.push(bytes);
        }

        let pages_written = collected.len();
        if !self.options.images
            && let Err(err) = self.write_pdf(item, target, &collected, pages_planned)
        {
            tracing::error!(error = %err, "cannot save image PDF");
            errors.push(err);
        }

        (StepOutcome::from_errors(errors), pages_written)
    }

    fn write_pdf(
        &self,
        item: &Item,
        target: &DownloadTarget,
        pages: &[Vec<u8>],
        pages_planned: usize,
    ) -> Result<(), StepError> {
        if pages.is_empty() {
            if pages_planned > 0 {
                return Err(StepError::NoPages {
                    path: target.main.clone(),
                });
            }
            return Ok(());
        }

        write_yaml(&target.yaml, item)?;
        tracing::info!("Saving {}", target.main.display());
        let bytes = crate::pdf::images_to_pdf(pages)
            .map_err(|err| StepError::pdf(&target.main, format!("{err:#}")))?;
        if let Some(parent) = target.main.parent() {
            create_dir(parent)?;
        }
        std::fs::write(&target.main, bytes)
            .map_err(|err| StepError::filesystem(&target.main, err))?;
        crate::pdf_meta::apply(&target.main, item)?;
        tracing::info!("Saved high-res image PDF to file://{}", target.main.display());
        Ok(())
    }

    fn text_pdf_step(&self, item: &Item, target: &DownloadTarget) -> StepOutcome {
        let (Some(url), Some(path)) = (item.textpdf_url.as_deref(), target.text_pdf.as_deref())
        else {
            return StepOutcome::NotApplicable;
        };
        if self.options.skip_text_pdf {
            return StepOutcome::NotApplicable;
        }
        if path.exists() && self.options.skip_existing {
            tracing::info!("Skipping existing text PDF {}", path.display());
            return StepOutcome::Skipped;
        }

        let result = fetch_text_pdf(self.client, url).and_then(|bytes| {
            if let Some(parent) = path.parent() {
                create_dir(parent)?;
            }
            std::fs::write(path, bytes).map_err(|err| StepError::filesystem(path, err))?;
            crate::pdf_meta::apply(path, item)
        });

        match result {
            Ok(()) => {
                tracing::info!("Saved searchable text PDF to file://{}", path.display());
                StepOutcome::Written
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot save text PDF");
                StepOutcome::Failed(vec![err])
            }
        }
    }
}

/// Downloads one page image, insisting on JPEG content.
pub fn fetch_scan(client: &ArchiveClient, url: &str) -> Result<Vec<u8>, StepError> {
    let fetched = client.fetch(url)?;
    let content_type = fetched.content_type();
    if crate::mime::is_jpeg(content_type)
        || content_type.contains("image/jpeg")
        || crate::mime::has_jpeg_signature(&fetched.bytes)
    {
        return Ok(fetched.bytes);
    }
    Err(StepError::decode(
        format!("scan {url}"),
        format!("content type is not JPEG: {content_type:?}"),
    ))
}

/// Downloads the archive's text PDF, rejecting anything that is not a PDF.
pub fn fetch_text_pdf(client: &ArchiveClient, url: &str) -> Result<Vec<u8>, StepError> {
    let fetched = client.fetch(url)?;
    let content_type = fetched.content_type();
    let lowered = content_type.to_ascii_lowercase();

    if crate::mime::is_pdf(content_type) || lowered.contains("application/pdf") {
        return Ok(fetched.bytes);
    }
    if lowered.starts_with("image/jpeg")
        || lowered.starts_with("image/pjpeg")
        || crate::mime::has_jpeg_signature(&fetched.bytes)
    {
        return Err(StepError::decode(
            format!("text PDF {url}"),
            "server sent a JPEG image instead of a PDF",
        ));
    }
    if crate::mime::extensions(content_type).is_empty()
        && crate::mime::has_pdf_signature(&fetched.bytes)
    {
        return Ok(fetched.bytes);
    }
    tracing::warn!(url, content_type, "text PDF content type is not PDF");
    Err(StepError::decode(
        format!("text PDF {url}"),
        format!("content type is not PDF: {content_type:?}"),
    ))
}

fn create_dir(path: &Path) -> Result<(), StepError> {
    std::fs::create_dir_all(path).map_err(|err| StepError::filesystem(path, err))
}

fn write_yaml(path: &Path, item: &Item) -> Result<(), StepError> {
    let yaml = serde_yaml::to_string(item)
        .map_err(|err| StepError::decode(format!("sidecar for {}", path.display()), err))?;
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    std::fs::write(path, yaml).map_err(|err| StepError::filesystem(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(textpdf: bool) -> Item {
        Item {
            id: Some("ID7".to_owned()),
            subdir: "1901-slug-ID7".to_owned(),
            textpdf_url: textpdf.then(|| "http://x/text.pdf".to_owned()),
            ..Item::default()
        }
    }

    #[test]
    fn pdf_mode_artifacts_share_a_base_name() {
        let target = DownloadTarget::new(Path::new("/dl"), &item(true), false);
        assert_eq!(target.main, PathBuf::from("/dl/1901-slug-ID7.pdf"));
        assert_eq!(target.yaml, PathBuf::from("/dl/1901-slug-ID7.yaml"));
        assert_eq!(
            target.text_pdf,
            Some(PathBuf::from("/dl/1901-slug-ID7_text.pdf"))
        );
    }

    #[test]
    fn images_mode_puts_sidecars_in_the_folder() {
        let target = DownloadTarget::new(Path::new("/dl"), &item(true), true);
        assert_eq!(target.main, PathBuf::from("/dl/1901-slug-ID7"));
        assert_eq!(target.yaml, PathBuf::from("/dl/1901-slug-ID7/ID7.yaml"));
        assert_eq!(
            target.text_pdf,
            Some(PathBuf::from("/dl/1901-slug-ID7/ID7_text.pdf"))
        );
    }

    #[test]
    fn no_text_pdf_path_without_a_text_pdf_resource() {
        let target = DownloadTarget::new(Path::new("/dl"), &item(false), false);
        assert_eq!(target.text_pdf, None);
    }

    #[test]
    fn report_success_is_the_and_of_attempted_steps() {
        let report = |main, text_pdf| ItemReport {
            id: "x".to_owned(),
            target: DownloadTarget::new(Path::new("/dl"), &item(false), false),
            pages_planned: 0,
            pages_written: 0,
            main,
            text_pdf,
        };
        assert!(report(StepOutcome::Skipped, StepOutcome::NotApplicable).success());
        assert!(report(StepOutcome::Written, StepOutcome::Skipped).success());
        assert!(
            !report(
                StepOutcome::Written,
                StepOutcome::Failed(vec![StepError::decode("x", "y")])
            )
            .success()
        );
    }
}
