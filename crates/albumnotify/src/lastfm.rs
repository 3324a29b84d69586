//! Last.fm profile scraping for an artist's cumulative listen count.
//!
//! Site markup changes from time to time, so the element holding the number is a
//! configurable CSS selector and all extraction goes through [`ListenCountExtractor`].

use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::fetch::CachedFetcher;
use crate::html::quote_plus;

#[derive(Debug, Clone)]
pub struct ListenCountExtractor {
    selector: Selector,
}

impl ListenCountExtractor {
    pub fn new(selector: &str) -> Result<Self> {
        let selector = Selector::parse(selector)
            .map_err(|err| Error::parse("listen count selector", format!("{selector:?}: {err:?}")))?;
        Ok(Self { selector })
    }

    /// Digits of the first matching element's `title`, or 0 when the markup is absent.
    pub fn extract(&self, page: &str) -> u64 {
        let document = Html::parse_document(page);
        document
            .select(&self.selector)
            .find_map(|element| element.value().attr("title"))
            .and_then(parse_digits)
            .unwrap_or(0)
    }
}

fn parse_digits(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

pub struct LastFmClient<'a> {
    fetcher: &'a CachedFetcher,
    base_url: String,
    extractor: ListenCountExtractor,
}

impl<'a> LastFmClient<'a> {
    pub fn new(fetcher: &'a CachedFetcher, base_url: &str, extractor: ListenCountExtractor) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            extractor,
        }
    }

    pub fn profile_url(&self, name: &str) -> String {
        format!("{}/music/{}", self.base_url, quote_plus(name))
    }

    pub fn listen_count(&self, name: &str) -> Result<u64> {
        let page = self.fetcher.get_text(&self.profile_url(name))?;
        let count = self.extractor.extract(&page);
        if count == 0 {
            tracing::debug!(artist = name, "no listen count in profile markup");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use time::macros::date;

    use super::*;
    use crate::cache::{CacheStore, temp_root};
    use crate::config::DEFAULT_LISTEN_COUNT_SELECTOR;
    use crate::fetch::testing::{StubTransport, instant_policy};

    const PROFILE: &str = r#"
        <html><body>
          <div class="header-metadata-global-stats">
            <span>Scrobbles</span>
            <abbr class="intabbr" title="12,345,678">12.3M</abbr>
            <abbr class="intabbr" title="456,789">456K</abbr>
          </div>
        </body></html>"#;

    fn default_extractor() -> ListenCountExtractor {
        ListenCountExtractor::new(DEFAULT_LISTEN_COUNT_SELECTOR).unwrap()
    }

    #[test]
    fn extracts_first_abbr_title() {
        assert_eq!(default_extractor().extract(PROFILE), 12_345_678);
    }

    #[test]
    fn missing_markup_yields_zero() {
        let page = r#"<html><body><div class="other"><abbr title="99">99</abbr></div></body></html>"#;
        assert_eq!(default_extractor().extract(page), 0);
        assert_eq!(default_extractor().extract(""), 0);
    }

    #[test]
    fn title_without_digits_yields_zero() {
        let page = r#"<div class="header-metadata-global-stats"><abbr title="n/a">?</abbr></div>"#;
        assert_eq!(default_extractor().extract(page), 0);
    }

    #[test]
    fn custom_selector_follows_new_markup() {
        let page = r#"
            <ul class="header-new-stats">
              <li><abbr title="1,024">1K</abbr></li>
            </ul>"#;
        let extractor = ListenCountExtractor::new("ul.header-new-stats abbr").unwrap();
        assert_eq!(extractor.extract(page), 1024);
        assert_eq!(default_extractor().extract(page), 0);
    }

    #[test]
    fn invalid_selector_is_a_parse_error() {
        let err = ListenCountExtractor::new("div[").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn listen_count_fetches_profile_page() {
        let stub = Rc::new(StubTransport::default());
        let cache = CacheStore::new(&temp_root("lastfm"), date!(2024 - 05 - 01)).unwrap();
        let fetcher = CachedFetcher::new(Box::new(stub.clone()), cache, instant_policy(2));
        let client = LastFmClient::new(&fetcher, "http://lastfm.test/", default_extractor());
        assert_eq!(client.profile_url("Foo Bar"), "http://lastfm.test/music/Foo+Bar");
        stub.respond(&client.profile_url("Foo Bar"), 200, PROFILE);

        assert_eq!(client.listen_count("Foo Bar").unwrap(), 12_345_678);
    }
}
