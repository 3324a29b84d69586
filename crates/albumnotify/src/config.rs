//! Configuration loading and parsing.
//!
//! Defines the TOML schema and resolves it into [`Settings`] with defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::fetch::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "albumnotify/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/albumnotify/albumnotify )"
);
const DEFAULT_MB_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const DEFAULT_MB_SITE_URL: &str = "https://musicbrainz.org";
const DEFAULT_MIN_SCORE: u32 = 85;
const DEFAULT_LASTFM_BASE_URL: &str = "https://www.last.fm";
pub const DEFAULT_LISTEN_COUNT_SELECTOR: &str = "div.header-metadata-global-stats abbr";
const DEFAULT_TORRENT_SEARCH: &str = "http://rutracker.org/forum/tracker.php?max=1&nm={query}";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct ReportConfig {
    /// Directory holding the dated `cacheYYYY-MM-DD` buckets.
    pub cache_root: Option<String>,
    /// Directory the HTML report is written to.
    pub output_dir: Option<String>,
    /// User-Agent sent with every request (MusicBrainz asks for contact info).
    pub user_agent: Option<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    pub musicbrainz: Option<MusicBrainzConfig>,
    pub lastfm: Option<LastFmConfig>,
    pub retry: Option<RetryConfig>,
    pub links: Option<LinksConfig>,
}

/// MusicBrainz configuration.
#[derive(Debug, Default, Deserialize)]
pub struct MusicBrainzConfig {
    /// Web service base (defaults to https://musicbrainz.org/ws/2).
    pub base_url: Option<String>,
    /// Human-facing site used for links in the report.
    pub site_url: Option<String>,
    /// Minimum search score for an artist candidate (default: 85).
    pub min_score: Option<u32>,
}

/// Last.fm configuration.
#[derive(Debug, Default, Deserialize)]
pub struct LastFmConfig {
    pub base_url: Option<String>,
    /// CSS selector of the element whose `title` holds the listen count.
    pub listen_count_selector: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub multiplier: Option<f64>,
    pub max_elapsed_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinksConfig {
    /// Torrent search URL; `{query}` is replaced with the encoded artist name.
    pub torrent_search: Option<String>,
}

/// Fully resolved settings used by the report pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_root: PathBuf,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub musicbrainz_base_url: String,
    pub musicbrainz_site_url: String,
    pub min_score: u32,
    pub lastfm_base_url: String,
    pub listen_count_selector: String,
    pub torrent_search_url: String,
}

impl ReportConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<ReportConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }

    /// Resolve every optional field against its default.
    pub fn resolve(&self) -> Settings {
        let mb = self.musicbrainz.as_ref();
        let lastfm = self.lastfm.as_ref();
        let retry = self.retry.as_ref();
        let defaults = RetryPolicy::default();

        Settings {
            cache_root: non_empty_path(self.cache_root.as_deref()),
            output_dir: non_empty_path(self.output_dir.as_deref()),
            user_agent: self
                .user_agent
                .clone()
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            request_timeout: Duration::from_millis(
                self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            ),
            retry: RetryPolicy {
                max_attempts: retry
                    .and_then(|r| r.max_attempts)
                    .unwrap_or(defaults.max_attempts),
                base_delay: retry
                    .and_then(|r| r.base_delay_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.base_delay),
                multiplier: retry
                    .and_then(|r| r.multiplier)
                    .unwrap_or(defaults.multiplier),
                max_elapsed: retry
                    .and_then(|r| r.max_elapsed_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.max_elapsed),
            },
            musicbrainz_base_url: base_url(
                mb.and_then(|m| m.base_url.as_deref()),
                DEFAULT_MB_BASE_URL,
            ),
            musicbrainz_site_url: base_url(
                mb.and_then(|m| m.site_url.as_deref()),
                DEFAULT_MB_SITE_URL,
            ),
            min_score: mb.and_then(|m| m.min_score).unwrap_or(DEFAULT_MIN_SCORE),
            lastfm_base_url: base_url(
                lastfm.and_then(|l| l.base_url.as_deref()),
                DEFAULT_LASTFM_BASE_URL,
            ),
            listen_count_selector: lastfm
                .and_then(|l| l.listen_count_selector.clone())
                .unwrap_or_else(|| DEFAULT_LISTEN_COUNT_SELECTOR.to_string()),
            torrent_search_url: self
                .links
                .as_ref()
                .and_then(|l| l.torrent_search.clone())
                .unwrap_or_else(|| DEFAULT_TORRENT_SEARCH.to_string()),
        }
    }
}

fn base_url(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

fn non_empty_path(value: Option<&str>) -> PathBuf {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
