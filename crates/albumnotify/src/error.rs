//! Error kinds shared by the cache, fetcher and metadata clients.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Every attempt allowed by the retry policy ended without a 200 response.
    #[error("can't fetch url {url} after {attempts} attempts (last status: {})", fmt_status(*last_status))]
    FetchExhausted {
        url: String,
        attempts: u32,
        last_status: Option<u16>,
    },

    #[error("cache io {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache bucket directory alone is too long to hold any file name.
    #[error("cache path too long: {path:?}")]
    PathTooLong { path: PathBuf },

    #[error("parse {what}: {message}")]
    Parse { what: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(what: &'static str, message: impl ToString) -> Self {
        Error::Parse {
            what,
            message: message.to_string(),
        }
    }
}

fn fmt_status(status: Option<u16>) -> String {
    status
        .map(|code| code.to_string())
        .unwrap_or_else(|| "none".to_string())
}
