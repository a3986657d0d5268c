use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

/// Search in and download from Polona.pl.
#[derive(Debug, Clone, Parser)]
#[command(name = "ppolona", author, version, about)]
#[command(group(ArgGroup::new("query_type").args(["search", "advanced", "ids"])))]
pub struct Cli {
    /// Polona.pl item URLs, unless --search, --advanced or --ids is given.
    #[arg(required = true, num_args = 1.., value_name = "QUERY")]
    pub query: Vec<String>,

    /// Query is a search query.
    #[arg(short = 'S', long)]
    pub search: bool,

    /// Query is an advanced search query.
    #[arg(short = 'A', long)]
    pub advanced: bool,

    /// Query is a list of Polona IDs.
    #[arg(short = 'I', long)]
    pub ids: bool,

    /// Download the found documents.
    #[arg(short = 'D', long)]
    pub download: bool,

    /// Download JPEGs into subfolders instead of a PDF.
    #[arg(short = 'i', long)]
    pub images: bool,

    /// Restrict search to these languages (e.g. polski,angielski).
    #[arg(short = 'l', long = "lang", value_name = "LANGUAGE", value_delimiter = ',')]
    pub search_languages: Vec<String>,

    /// Sort search results.
    #[arg(short = 's', long, value_enum, default_value_t = SortKey::ScoreDesc)]
    pub sort: SortKey,

    /// Output format for search results.
    #[arg(short = 'f', long, value_enum, default_value_t = ExportFormat::Ids)]
    pub format: ExportFormat,

    /// Save search results to this file instead of stdout.
    #[arg(short = 'o', long, value_name = "RESULTS_FILE")]
    pub output: Option<PathBuf>,

    /// Save downloaded documents in this folder (default: Desktop/polona).
    #[arg(short = 'd', long, value_name = "DOWNLOAD_FOLDER")]
    pub download_dir: Option<PathBuf>,

    /// Download at most this many pages per document (0: all).
    #[arg(short = 'M', long, value_name = "NUM_PAGES", default_value_t = 0)]
    pub max_pages: usize,

    /// Skip downloading searchable text PDFs.
    #[arg(short = 'T', long = "no-text-pdf")]
    pub textpdf_skip: bool,

    /// Skip existing subfolders/PDFs.
    #[arg(short = 'O', long = "no-overwrite")]
    pub skip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    #[value(name = "score desc")]
    ScoreDesc,
    #[value(name = "date desc")]
    DateDesc,
    #[value(name = "date asc")]
    DateAsc,
    #[value(name = "title asc")]
    TitleAsc,
    #[value(name = "creator asc")]
    CreatorAsc,
}

impl SortKey {
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::ScoreDesc => "score desc",
            Self::DateDesc => "date desc",
            Self::DateAsc => "date asc",
            Self::TitleAsc => "title asc",
            Self::CreatorAsc => "creator asc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Ids,
    Urls,
    Yaml,
    Json,
}

impl Cli {
    pub fn download_root(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(default_download_dir)
    }
}

fn default_download_dir() -> PathBuf {
    if let Some(dirs) = directories::UserDirs::new() {
        let base = dirs
            .desktop_dir()
            .map(PathBuf::from)
            .unwrap_or_else(|| dirs.home_dir().to_path_buf());
        return base.join("polona");
    }
    PathBuf::from("polona")
}
