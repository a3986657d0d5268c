use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::cli::ExportFormat;
use crate::formats::SearchResults;

pub fn render(results: &SearchResults, format: ExportFormat) -> anyhow::Result<String> {
    Ok(match format {
        ExportFormat::Ids => results.ids().join(" "),
        ExportFormat::Urls => results
            .hits()
            .iter()
            .map(|hit| hit.url.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        ExportFormat::Yaml => {
            serde_yaml::to_string(results).context("serialize search results yaml")?
        }
        ExportFormat::Json => {
            serde_json::to_string(results).context("serialize search results json")?
        }
    })
}

/// Writes the rendered results to `out`, or to stdout followed by a newline.
pub fn run(
    results: &SearchResults,
    format: ExportFormat,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let rendered = render(results, format)?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create results dir: {}", parent.display()))?;
            }
            std::fs::write(path, rendered.as_bytes())
                .with_context(|| format!("write search results: {}", path.display()))?;
            tracing::info!("Search results saved in: file://{}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .context("write search results to stdout")?;
            stdout.write_all(b"\n").context("write stdout newline")?;
            stdout.flush().context("flush stdout")?;
        }
    }

    Ok(())
}
