//! Day-bucketed on-disk cache of raw HTTP response bodies.
//!
//! Each URL maps to one file under `<root>/cache<YYYY-MM-DD>/`. The file name is
//! the form-encoded URL plus `.txt`, shortened so the absolute path never exceeds
//! [`MAX_PATH_LEN`] characters. Entries are written once and never touched again;
//! a new run date starts a new bucket.

use std::fs;
use std::path::{Path, PathBuf};

use time::Date;

use crate::error::{Error, Result};
use crate::html::{iso_date, quote_plus};

pub const MAX_PATH_LEN: usize = 240;
const SUFFIX: &str = ".txt";

#[derive(Debug, Clone)]
pub struct CacheStore {
    bucket: PathBuf,
}

impl CacheStore {
    /// Cache rooted at `root` for responses fetched on `date`.
    pub fn new(root: &Path, date: Date) -> Result<Self> {
        let root = std::path::absolute(root).map_err(|err| Error::io(root, err))?;
        Ok(Self {
            bucket: root.join(format!("cache{}", iso_date(date))),
        })
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket
    }

    /// File that holds (or will hold) the body for `url`.
    pub fn path_for(&self, url: &str) -> Result<PathBuf> {
        let mut stem = quote_plus(url);
        let full_len = self.bucket.join(format!("{stem}{SUFFIX}")).as_os_str().len();
        if full_len > MAX_PATH_LEN {
            let excess = full_len - MAX_PATH_LEN;
            if excess >= stem.len() {
                return Err(Error::PathTooLong {
                    path: self.bucket.clone(),
                });
            }
            stem.truncate(stem.len() - excess);
        }
        Ok(self.bucket.join(format!("{stem}{SUFFIX}")))
    }

    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(url)?;
        if !path.is_file() {
            return Ok(None);
        }
        fs::read(&path).map(Some).map_err(|err| Error::io(&path, err))
    }

    pub fn put(&self, url: &str, body: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(url)?;
        fs::create_dir_all(&self.bucket).map_err(|err| Error::io(&self.bucket, err))?;
        fs::write(&path, body).map_err(|err| Error::io(&path, err))?;
        Ok(path)
    }
}

#[cfg(test)]
pub(crate) fn temp_root(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "albumnotify-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}
