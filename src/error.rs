use std::path::{Path, PathBuf};

/// Failure of a single pipeline sub-step. These never escape the per-item
/// boundary: callers log them and fold them into an item report.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("request failed: {url}: {message}")]
    Transport { url: String, message: String },

    #[error("cannot decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pdf error for {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },

    #[error("no pages collected for {}", path.display())]
    NoPages { path: PathBuf },
}

impl StepError {
    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn filesystem(path: &Path, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn pdf(path: &Path, message: impl ToString) -> Self {
        Self::Pdf {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}
