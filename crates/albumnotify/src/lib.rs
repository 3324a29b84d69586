//! albumnotify: watchlist-driven release and listen-count report.
//!
//! For each artist in the watchlist the catalog (MusicBrainz) provides the release
//! groups and the listen-count site (Last.fm) the cumulative scrobbles. Every
//! response goes through a day-bucketed file cache, so re-running on the same day
//! replays previous answers without touching the network.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod html;
pub mod lastfm;
pub mod musicbrainz;
pub mod report;
pub mod watchlist;

use anyhow::{Context, Result};
use time::Date;

use crate::cache::CacheStore;
use crate::config::Settings;
use crate::fetch::{CachedFetcher, UreqTransport};
use crate::lastfm::{LastFmClient, ListenCountExtractor};
use crate::musicbrainz::MusicBrainzClient;
use crate::report::ReportBuilder;
use crate::watchlist::WatchlistEntry;

/// Run the full pipeline against the live services and return the HTML page.
pub fn generate_report(settings: &Settings, entries: &[WatchlistEntry], today: Date) -> Result<String> {
    let cache = CacheStore::new(&settings.cache_root, today)
        .with_context(|| format!("open cache under {:?}", settings.cache_root))?;
    tracing::info!(dir = %cache.bucket_dir().display(), "response cache");

    let transport = UreqTransport::new(&settings.user_agent, settings.request_timeout);
    let fetcher = CachedFetcher::new(Box::new(transport), cache, settings.retry.clone());
    let extractor = ListenCountExtractor::new(&settings.listen_count_selector)
        .context("listen_count_selector")?;

    let builder = ReportBuilder::new(
        MusicBrainzClient::new(
            &fetcher,
            &settings.musicbrainz_base_url,
            &settings.musicbrainz_site_url,
            settings.min_score,
        ),
        LastFmClient::new(&fetcher, &settings.lastfm_base_url, extractor),
        &settings.torrent_search_url,
        today,
    );
    let html = builder.build(entries);

    tracing::info!(
        network_calls = fetcher.network_calls(),
        cache_hits = fetcher.cache_hits(),
        "fetch summary"
    );
    Ok(html)
}

/// Today's date in local time, UTC when the local offset is unavailable.
pub fn run_date() -> Date {
    time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
        .date()
}
