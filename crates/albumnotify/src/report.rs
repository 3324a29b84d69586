//! Report assembly: walks the watchlist and renders one self-contained HTML page.
//!
//! Page layout, top to bottom: stylesheet, artist count, header index of anchors,
//! this year's releases across all artists, one section per artist, and the
//! listen-count leaderboard.

use std::collections::HashSet;

use time::Date;

use crate::error::Result;
use crate::html::{
    YearClass, anchor_for, escape_html, iso_date, number_format, quote_plus, release_type_class,
};
use crate::lastfm::LastFmClient;
use crate::musicbrainz::{MusicBrainzClient, Release};
use crate::watchlist::WatchlistEntry;

const STYLESHEET: &str = r#"<style>
body, table { font: 11px 'tahoma'; }
h1 { display: inline; font: 18px 'trebuchet ms'; font-weight: normal; }
table td { vertical-align: top; }
.index a { margin-right: 6px; }
.index .skipped { color: gray; text-decoration: line-through; margin-right: 6px; }
.year { width: 30px; }
.album-type { font-size: smaller; width: 100px; }
.this-year .year, .index a.this-year { color: red; }
.prev-year .year, .index a.prev-year { color: orange; }
.unworthy { color: gray; }
.artist { margin-top: 8px; }
</style>"#;

pub fn report_file_name(date: Date) -> String {
    format!("albumnotify.report.{}.html", iso_date(date))
}

pub struct ReportBuilder<'a> {
    musicbrainz: MusicBrainzClient<'a>,
    lastfm: LastFmClient<'a>,
    torrent_search_url: String,
    today: Date,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        musicbrainz: MusicBrainzClient<'a>,
        lastfm: LastFmClient<'a>,
        torrent_search_url: &str,
        today: Date,
    ) -> Self {
        Self {
            musicbrainz,
            lastfm,
            torrent_search_url: torrent_search_url.to_string(),
            today,
        }
    }

    /// Process every entry in order and render the page. A failing artist is
    /// logged and left out; it never aborts the run.
    pub fn build(&self, entries: &[WatchlistEntry]) -> String {
        let mut state = ReportState::default();
        let mut seen = HashSet::new();
        for (idx, entry) in entries.iter().enumerate() {
            // Section ids and leaderboard rows are keyed by name.
            if !seen.insert(entry.name.as_str()) {
                tracing::warn!(artist = %entry.name, "duplicate watchlist entry ignored");
                continue;
            }
            tracing::info!(
                artist = %entry.name,
                pinned = entry.pinned_id.is_some(),
                "artist {}/{}",
                idx + 1,
                entries.len()
            );
            if let Err(err) = self.add_artist(&mut state, entry) {
                tracing::warn!(artist = %entry.name, error = %err, "artist skipped");
                state.header_links.push(format!(
                    "<span class=\"skipped\">{}</span>",
                    escape_html(&entry.name)
                ));
            }
        }
        state.render(seen.len(), self.today)
    }

    fn add_artist(&self, state: &mut ReportState, entry: &WatchlistEntry) -> Result<()> {
        let name = entry.name.as_str();
        let artist_id = self
            .musicbrainz
            .resolve_artist(name, entry.pinned_id.as_deref())?;
        if artist_id.is_none() {
            tracing::info!(artist = name, "no confident catalog match");
        }

        let listens = self.lastfm.listen_count(name)?;
        state.record_listen_count(name, listens);

        let releases = match artist_id.as_deref() {
            Some(id) => Some(self.musicbrainz.releases(id)?),
            None => None,
        };

        let anchor = anchor_for(name);
        let latest = releases
            .iter()
            .flatten()
            .map(|release| release.year.as_str())
            .filter(|year| !year.is_empty())
            .max()
            .map(|year| YearClass::of(year, self.today))
            .unwrap_or(YearClass::Neutral);
        state.header_links.push(format!(
            "<a href=\"#{}\" class=\"{}\">{}</a>",
            escape_html(&anchor),
            latest.css(),
            escape_html(name)
        ));

        let mut section = String::new();
        section.push_str(&format!(
            "<div class=\"artist\" id=\"{}\">",
            escape_html(&anchor)
        ));
        let identity_url = match artist_id.as_deref() {
            Some(id) => self.musicbrainz.artist_page_url(id),
            None => self.musicbrainz.search_page_url(name),
        };
        section.push_str(&format!(
            "<h1><a href=\"{}\">{}</a></h1> (<a href=\"{}\">{}</a> plays) \
             <small>[<a href=\"{}\" target=\"_blank\">torrents</a>]</small><br>",
            escape_html(&identity_url),
            escape_html(name),
            escape_html(&self.lastfm.profile_url(name)),
            number_format(listens),
            escape_html(&self.torrent_search_url(name)),
        ));

        if let Some(releases) = releases.as_deref() {
            section.push_str("<table>");
            for release in releases {
                let year_class = YearClass::of(&release.year, self.today);
                section.push_str(&release_row(release, year_class, None));
                if year_class == YearClass::ThisYear {
                    state
                        .recent_rows
                        .push(release_row(release, year_class, Some((name, anchor.as_str()))));
                }
            }
            section.push_str("</table>");
        }
        section.push_str("</div>");
        state.sections.push(section);
        Ok(())
    }

    fn torrent_search_url(&self, name: &str) -> String {
        self.torrent_search_url.replace("{query}", &quote_plus(name))
    }
}

fn release_row(release: &Release, year_class: YearClass, artist: Option<(&str, &str)>) -> String {
    let artist_cell = artist
        .map(|(name, anchor)| {
            format!(
                "<td><a href=\"#{}\">{}</a>",
                escape_html(anchor),
                escape_html(name)
            )
        })
        .unwrap_or_default();
    format!(
        "<tr class=\"{} {}\"><td class=\"year\">{}<td class=\"album-type\">{}{}<td>{}</tr>",
        year_class.css(),
        release_type_class(&release.kind),
        escape_html(&release.year),
        escape_html(&release.kind),
        artist_cell,
        escape_html(&release.title)
    )
}

/// Accumulated output of one run; the only mutable state of the pipeline.
#[derive(Debug, Default)]
struct ReportState {
    listen_counts: Vec<(String, u64)>,
    header_links: Vec<String>,
    recent_rows: Vec<String>,
    sections: Vec<String>,
}

impl ReportState {
    fn record_listen_count(&mut self, name: &str, count: u64) {
        match self.listen_counts.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = count,
            None => self.listen_counts.push((name.to_string(), count)),
        }
    }

    fn render(mut self, artist_count: usize, today: Date) -> String {
        let mut html = Vec::new();
        html.push(format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
             <title>albumnotify {}</title>\n{STYLESHEET}\n</head><body>\n",
            iso_date(today)
        ));
        html.push(format!("Artists: {artist_count}<hr>\n"));

        html.push("<div class=\"index\">".to_string());
        html.push(self.header_links.join("\n"));
        html.push("</div><hr>\n".to_string());

        html.push(format!("<h1>New in {}</h1>\n<table class=\"recent\">", today.year()));
        html.extend(self.recent_rows.drain(..));
        html.push("</table><hr>\n".to_string());

        for section in self.sections.drain(..) {
            html.push(section);
            html.push("\n".to_string());
        }

        html.push("<hr>\n<h1>Last.fm rating</h1>\n<table class=\"rating\">".to_string());
        // Stable sort: equal counts keep watchlist order.
        self.listen_counts.sort_by(|a, b| b.1.cmp(&a.1));
        for (name, count) in &self.listen_counts {
            html.push(format!(
                "<tr><td align=\"right\">{}<td>{}</tr>",
                number_format(*count),
                escape_html(name)
            ));
        }
        html.push("</table>\n</body></html>\n".to_string());
        html.concat()
    }
}
