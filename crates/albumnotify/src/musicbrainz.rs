//! MusicBrainz lookups: artist search and release-group listing.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fetch::CachedFetcher;
use crate::html::quote_plus;

const BROWSE_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistCandidate {
    pub id: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub title: String,
    /// Four-digit year of the first release, empty when unknown.
    pub year: String,
    /// Space-joined lowercase type tags, e.g. `album`, `ep`, `live`, `compilation live`.
    pub kind: String,
}

pub struct MusicBrainzClient<'a> {
    fetcher: &'a CachedFetcher,
    base_url: String,
    site_url: String,
    min_score: u32,
}

impl<'a> MusicBrainzClient<'a> {
    pub fn new(fetcher: &'a CachedFetcher, base_url: &str, site_url: &str, min_score: u32) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
            min_score,
        }
    }

    pub fn search_url(&self, name: &str) -> String {
        format!("{}/artist/?query={}&fmt=json", self.base_url, quote_plus(name))
    }

    pub fn release_groups_url(&self, artist_id: &str, offset: usize) -> String {
        format!(
            "{}/release-group?artist={}&limit={BROWSE_PAGE_SIZE}&offset={offset}&fmt=json",
            self.base_url,
            urlencoding::encode(artist_id)
        )
    }

    /// Human search page, linked from the report when no artist id is known.
    pub fn search_page_url(&self, name: &str) -> String {
        format!(
            "{}/search?query={}&type=artist&method=indexed",
            self.site_url,
            quote_plus(name)
        )
    }

    pub fn artist_page_url(&self, artist_id: &str) -> String {
        format!("{}/artist/{}", self.site_url, urlencoding::encode(artist_id))
    }

    /// Candidates scoring at least `min_score`, in response order.
    pub fn search_artists(&self, name: &str) -> Result<Vec<ArtistCandidate>> {
        let body = self.fetcher.get_or_fetch(&self.search_url(name))?;
        parse_artist_search(&body, self.min_score)
    }

    /// Pinned id when given, otherwise the first good search candidate.
    pub fn resolve_artist(&self, name: &str, pinned: Option<&str>) -> Result<Option<String>> {
        if let Some(id) = pinned {
            return Ok(Some(id.to_string()));
        }
        Ok(self
            .search_artists(name)?
            .into_iter()
            .next()
            .map(|candidate| candidate.id))
    }

    /// Every release group of the artist, oldest first.
    pub fn releases(&self, artist_id: &str) -> Result<Vec<Release>> {
        let mut groups = Vec::new();
        let mut offset = 0usize;
        loop {
            let body = self
                .fetcher
                .get_or_fetch(&self.release_groups_url(artist_id, offset))?;
            let page: ReleaseGroupPage = serde_json::from_slice(&body)
                .map_err(|err| Error::parse("musicbrainz release groups", err))?;
            let received = page.release_groups.len();
            groups.extend(page.release_groups);
            offset += received;
            let done = match page.release_group_count {
                Some(total) => offset as u64 >= total,
                None => received < BROWSE_PAGE_SIZE,
            };
            if received == 0 || done {
                break;
            }
        }
        Ok(releases_from_groups(groups))
    }
}

fn parse_artist_search(body: &[u8], min_score: u32) -> Result<Vec<ArtistCandidate>> {
    let resp: ArtistSearchResponse = serde_json::from_slice(body)
        .map_err(|err| Error::parse("musicbrainz artist search", err))?;
    Ok(resp
        .artists
        .into_iter()
        .map(|artist| ArtistCandidate {
            score: artist.score.value(),
            id: artist.id,
        })
        .filter(|candidate| candidate.score >= min_score)
        .collect())
}

fn releases_from_groups(mut groups: Vec<ReleaseGroup>) -> Vec<Release> {
    groups.sort_by(|a, b| a.first_release_date.cmp(&b.first_release_date));
    groups
        .into_iter()
        .map(|group| Release {
            year: release_year(&group.first_release_date),
            kind: release_kind(group.primary_type.as_deref(), &group.secondary_types),
            title: group.title,
        })
        .collect()
}

fn release_year(date: &str) -> String {
    match date.get(..4) {
        Some(year) if year.bytes().all(|b| b.is_ascii_digit()) => year.to_string(),
        _ => String::new(),
    }
}

/// `Album` + `[Live]` → `live`; `Album` alone → `album`; `Single` → `single`.
pub fn release_kind(primary: Option<&str>, secondary: &[String]) -> String {
    let mut tags: Vec<String> = primary
        .into_iter()
        .chain(secondary.iter().map(String::as_str))
        .map(str::to_lowercase)
        .filter(|tag| !tag.is_empty())
        .collect();
    if tags.len() > 1 && tags[0] == "album" {
        tags.remove(0);
    }
    tags.join(" ")
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<ArtistResult>,
}

#[derive(Debug, Deserialize)]
struct ArtistResult {
    id: String,
    #[serde(default)]
    score: Score,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Score {
    Number(i64),
    Text(String),
}

impl Default for Score {
    fn default() -> Self {
        Score::Number(0)
    }
}

impl Score {
    fn value(&self) -> u32 {
        let raw = match self {
            Score::Number(n) => *n,
            Score::Text(s) => s.trim().parse().unwrap_or(0),
        };
        raw.clamp(0, 100) as u32
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseGroupPage {
    #[serde(rename = "release-group-count")]
    release_group_count: Option<u64>,
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<ReleaseGroup>,
}

#[derive(Debug, Deserialize)]
struct ReleaseGroup {
    title: String,
    #[serde(rename = "first-release-date", default, deserialize_with = "null_as_empty")]
    first_release_date: String,
    #[serde(rename = "primary-type", default)]
    primary_type: Option<String>,
    #[serde(rename = "secondary-types", default, deserialize_with = "null_as_vec")]
    secondary_types: Vec<String>,
}

fn null_as_empty<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

fn null_as_vec<'de, D>(de: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(de)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use time::macros::date;

    use super::*;
    use crate::cache::{CacheStore, temp_root};
    use crate::fetch::testing::{StubTransport, instant_policy};

    const BASE: &str = "http://mb.test/ws/2";

    fn fetcher(stub: &Rc<StubTransport>, label: &str) -> CachedFetcher {
        let cache = CacheStore::new(&temp_root(label), date!(2024 - 05 - 01)).unwrap();
        CachedFetcher::new(Box::new(stub.clone()), cache, instant_policy(2))
    }

    #[test]
    fn release_kind_drops_leading_album_only_with_other_tags() {
        assert_eq!(release_kind(Some("Album"), &["Live".to_string()]), "live");
        assert_eq!(release_kind(Some("Album"), &[]), "album");
        assert_eq!(
            release_kind(Some("Album"), &["Compilation".to_string(), "Live".to_string()]),
            "compilation live"
        );
        assert_eq!(release_kind(Some("EP"), &["Remix".to_string()]), "ep remix");
        assert_eq!(release_kind(None, &["Soundtrack".to_string()]), "soundtrack");
        assert_eq!(release_kind(None, &[]), "");
    }

    #[test]
    fn search_keeps_only_high_scores_in_order() {
        let body = br#"{"artists":[
            {"id":"aaa","score":100},
            {"id":"bbb","score":"84"},
            {"id":"ccc","score":"90"}
        ]}"#;
        let found = parse_artist_search(body, 85).unwrap();
        let ids: Vec<&str> = found.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["aaa", "ccc"]);
        assert_eq!(found[1].score, 90);
    }

    #[test]
    fn search_reports_malformed_json() {
        let err = parse_artist_search(b"<html>", 85).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn releases_sorted_by_raw_date_with_years() {
        let groups: Vec<ReleaseGroup> = serde_json::from_str(
            r#"[
                {"title":"Third","first-release-date":"2010-05","primary-type":"Album","secondary-types":[]},
                {"title":"Unknown","first-release-date":"","primary-type":"Single","secondary-types":null},
                {"title":"First","first-release-date":"1999-01-02","primary-type":"Album","secondary-types":["Live"]},
                {"title":"Second","first-release-date":"2010","primary-type":null}
            ]"#,
        )
        .unwrap();
        let releases = releases_from_groups(groups);
        let titles: Vec<&str> = releases.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Unknown", "First", "Second", "Third"]);
        assert_eq!(releases[0].year, "");
        assert_eq!(releases[1].year, "1999");
        assert_eq!(releases[1].kind, "live");
        assert_eq!(releases[2].kind, "");
        assert_eq!(releases[3].kind, "album");
    }

    #[test]
    fn release_year_requires_four_digits() {
        assert_eq!(release_year("2001-04-01"), "2001");
        assert_eq!(release_year("20"), "");
        assert_eq!(release_year("????"), "");
    }

    #[test]
    fn pinned_id_skips_search() {
        let stub = Rc::new(StubTransport::default());
        let fetcher = fetcher(&stub, "mb-pinned");
        let client = MusicBrainzClient::new(&fetcher, BASE, "http://mb.test", 85);

        let id = client.resolve_artist("Foo", Some("ab12")).unwrap();
        assert_eq!(id.as_deref(), Some("ab12"));
        assert!(stub.calls.borrow().is_empty());
    }

    #[test]
    fn resolve_uses_first_surviving_candidate() {
        let stub = Rc::new(StubTransport::default());
        let fetcher = fetcher(&stub, "mb-search");
        let client = MusicBrainzClient::new(&fetcher, BASE, "http://mb.test", 85);
        stub.respond(
            &client.search_url("Foo Bar"),
            200,
            r#"{"artists":[{"id":"low","score":40},{"id":"good","score":88}]}"#,
        );

        let id = client.resolve_artist("Foo Bar", None).unwrap();
        assert_eq!(id.as_deref(), Some("good"));
        assert_eq!(
            client.search_url("Foo Bar"),
            "http://mb.test/ws/2/artist/?query=Foo+Bar&fmt=json"
        );
    }

    #[test]
    fn releases_follow_browse_pages() {
        let stub = Rc::new(StubTransport::default());
        let fetcher = fetcher(&stub, "mb-pages");
        let client = MusicBrainzClient::new(&fetcher, BASE, "http://mb.test", 85);

        let first_page: Vec<String> = (0..100)
            .map(|i| {
                format!(
                    r#"{{"title":"R{i}","first-release-date":"2000-01-{:02}","primary-type":"Single"}}"#,
                    i % 28 + 1
                )
            })
            .collect();
        stub.respond(
            &client.release_groups_url("xyz", 0),
            200,
            &format!(
                r#"{{"release-group-count":101,"release-groups":[{}]}}"#,
                first_page.join(",")
            ),
        );
        stub.respond(
            &client.release_groups_url("xyz", 100),
            200,
            r#"{"release-group-count":101,"release-groups":[
                {"title":"Oldest","first-release-date":"1990","primary-type":"Album"}
            ]}"#,
        );

        let releases = client.releases("xyz").unwrap();
        assert_eq!(releases.len(), 101);
        assert_eq!(releases[0].title, "Oldest");
        assert!(stub.calls_to(&client.release_groups_url("xyz", 200)) == 0);
    }

    #[test]
    fn link_urls_point_at_site() {
        let stub = Rc::new(StubTransport::default());
        let fetcher = fetcher(&stub, "mb-links");
        let client = MusicBrainzClient::new(&fetcher, BASE, "https://musicbrainz.org/", 85);
        assert_eq!(
            client.search_page_url("Foo Bar"),
            "https://musicbrainz.org/search?query=Foo+Bar&type=artist&method=indexed"
        );
        assert_eq!(
            client.artist_page_url("ab-12"),
            "https://musicbrainz.org/artist/ab-12"
        );
    }
}
