use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::assemble::{AssembleOptions, Assembler};
use crate::cli::Cli;
use crate::client::ArchiveClient;
use crate::config::ApiConfig;
use crate::query::Query;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub resolved: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub fn run(cli: &Cli, api: ApiConfig) -> anyhow::Result<RunSummary> {
    let client = ArchiveClient::new(api).context("create http client")?;
    let query = Query::from_cli(cli);
    let resolution = crate::query::resolve(&client, &query).context("resolve query")?;

    let mut summary = RunSummary {
        resolved: resolution.ids.len(),
        ..RunSummary::default()
    };

    if let Some(hits) = &resolution.hits
        && (!cli.download || cli.output.is_some())
    {
        crate::export::run(hits, cli.format, cli.output.as_deref()).context("export results")?;
    }

    if !cli.download {
        return Ok(summary);
    }

    let root = absolute(&cli.download_root());
    if !resolution.ids.is_empty() {
        download_all(&client, &root, cli, &resolution.ids, &mut summary);
    }

    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Finished downloading into file://{}",
        root.display()
    );
    Ok(summary)
}

fn download_all(
    client: &ArchiveClient,
    root: &Path,
    cli: &Cli,
    ids: &[String],
    summary: &mut RunSummary,
) {
    if let Err(err) = std::fs::create_dir_all(root) {
        tracing::error!(error = %err, "Cannot create download folder {}", root.display());
        summary.failed = ids.len();
        return;
    }

    let assembler = Assembler::new(client, root, AssembleOptions::from(cli));
    let total = ids.len();
    for (index, id) in ids.iter().enumerate() {
        let progress = format!("[doc {:03}/{total:03}]", index + 1);
        if download_one(client, &assembler, id, &progress) {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }
}

fn download_one(client: &ArchiveClient, assembler: &Assembler<'_>, id: &str, progress: &str) -> bool {
    let item = match crate::item::resolve(client, id) {
        Ok(Some(item)) => item,
        Ok(None) => return false,
        Err(err) => {
            tracing::error!(%id, error = %err, "{progress}: cannot resolve item");
            return false;
        }
    };

    if !item.has_scans() {
        tracing::info!(%id, "{progress}: nothing to download");
        return true;
    }

    let report = assembler.assemble(&item, progress);
    if report.success() {
        tracing::info!("{progress}: {id} processed");
    } else {
        tracing::warn!(
            %id,
            pages_planned = report.pages_planned,
            pages_written = report.pages_written,
            "{progress}: finished with errors"
        );
    }
    report.success()
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
