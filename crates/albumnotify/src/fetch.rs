//! HTTP GET with bounded exponential backoff, memoized through [`CacheStore`].

use std::cell::Cell;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::cache::CacheStore;
use crate::error::{Error, Result};

const MAX_BODY_BYTES: u64 = 20_000_000;

/// Raw response as seen by the retry loop.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One blocking GET. Errors are transport failures; HTTP statuses come back as `Ok`.
pub trait Transport {
    fn get(&self, url: &str) -> anyhow::Result<HttpResponse>;
}

/// `ureq` agent that reports every status instead of failing on 4xx/5xx.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .user_agent(user_agent)
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> anyhow::Result<HttpResponse> {
        let resp = match self.agent.get(url).call() {
            Ok(resp) => resp,
            Err(err) => bail!("request failed (transport) url={url}: {err}"),
        };
        let status = resp.status().as_u16();
        let body = resp
            .into_body()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .with_context(|| format!("response read failed url={url}"))?;
        Ok(HttpResponse { status, body })
    }
}

/// Exponential backoff: the n-th attempt (0-based) waits `base_delay * multiplier^n`
/// first. The first attempt is always made; a retry is dropped once the summed
/// waits would pass `max_elapsed`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            multiplier: 1.9,
            max_elapsed: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt as i32);
        self.base_delay.mul_f64(factor)
    }

    /// Delays actually slept before each permitted attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut waited = Duration::ZERO;
        let mut out = Vec::new();
        for attempt in 0..self.max_attempts.max(1) {
            let delay = self.delay_for(attempt);
            if attempt > 0 && waited + delay > self.max_elapsed {
                break;
            }
            waited += delay;
            out.push(delay);
        }
        out
    }
}

pub struct CachedFetcher {
    transport: Box<dyn Transport>,
    cache: CacheStore,
    policy: RetryPolicy,
    network_calls: Cell<u64>,
    cache_hits: Cell<u64>,
}

impl CachedFetcher {
    pub fn new(transport: Box<dyn Transport>, cache: CacheStore, policy: RetryPolicy) -> Self {
        Self {
            transport,
            cache,
            policy,
            network_calls: Cell::new(0),
            cache_hits: Cell::new(0),
        }
    }

    /// Cached body for `url`, fetching and storing it on a miss.
    pub fn get_or_fetch(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(body) = self.cache.get(url)? {
            self.cache_hits.set(self.cache_hits.get() + 1);
            tracing::debug!(url, "cache hit");
            return Ok(body);
        }
        let body = self.fetch(url)?;
        self.cache.put(url, &body)?;
        Ok(body)
    }

    /// Same as [`Self::get_or_fetch`] but decoded as (lossy) UTF-8.
    pub fn get_text(&self, url: &str) -> Result<String> {
        let body = self.get_or_fetch(url)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Network fetch honouring the retry policy; bypasses the cache.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let schedule = self.policy.schedule();
        let total = schedule.len();
        let mut last_status = None;
        for (attempt, delay) in schedule.into_iter().enumerate() {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            self.network_calls.set(self.network_calls.get() + 1);
            match self.transport.get(url) {
                Ok(resp) if resp.status == 200 => return Ok(resp.body),
                Ok(resp) => {
                    last_status = Some(resp.status);
                    tracing::warn!(
                        url,
                        status = resp.status,
                        attempt = attempt + 1,
                        attempts = total,
                        "unexpected status, retrying"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        url,
                        error = %err,
                        attempt = attempt + 1,
                        attempts = total,
                        "request failed, retrying"
                    );
                }
            }
        }
        Err(Error::FetchExhausted {
            url: url.to_string(),
            attempts: total as u32,
            last_status,
        })
    }

    pub fn network_calls(&self) -> u64 {
        self.network_calls.get()
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.get()
    }
}
