//! Page fetching. Anything that can turn a URL into page text implements
//! [`Fetch`]; the pipeline never touches the network directly.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use url::Url;

use crate::config::BlogConfig;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(StatusCode),
}

/// A GET that either yields the whole body or fails. No partial content.
pub trait Fetch: Sync {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

impl<T> Fetch for T
where
    T: Fn(&Url) -> Result<String, FetchError> + Sync,
{
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self(url)
    }
}

pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(cfg: &BlogConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            user_agent: cfg.user_agent.clone(),
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }

        let body = resp.text()?;
        debug!(url = %url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

/// Keeps successful bodies for `ttl`, keyed by URL. Failures are never cached,
/// so the next call after an error goes back to the network.
pub struct CachingFetcher<F> {
    inner: F,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl<F: Fetch> CachingFetcher<F> {
    pub fn new(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|(at, _)| at.elapsed() <= self.ttl)
            .map(|(_, body)| body.clone())
    }
}

impl<F: Fetch> Fetch for CachingFetcher<F> {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        if let Some(body) = self.cached(url.as_str()) {
            trace!(url = %url, "cache hit");
            return Ok(body);
        }
        let body = self.inner.fetch(url)?;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.as_str().to_string(), (Instant::now(), body.clone()));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cache_serves_fresh_entries_and_skips_failures() {
        let calls = AtomicUsize::new(0);
        let inner = |u: &Url| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if u.path() == "/down" {
                Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
            } else {
                Ok(format!("body {n}"))
            }
        };
        let cache = CachingFetcher::new(inner, Duration::from_secs(60));
        let up = Url::parse("https://www.voxitec.com/blog").unwrap();
        let down = Url::parse("https://www.voxitec.com/down").unwrap();

        assert_eq!(cache.fetch(&up).unwrap(), "body 0");
        assert_eq!(cache.fetch(&up).unwrap(), "body 0");
        assert!(cache.fetch(&down).is_err());
        assert!(cache.fetch(&down).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn zero_ttl_always_revalidates() {
        let calls = AtomicUsize::new(0);
        let inner = |_: &Url| Ok::<_, FetchError>(calls.fetch_add(1, Ordering::SeqCst).to_string());
        let cache = CachingFetcher::new(inner, Duration::ZERO);
        let u = Url::parse("https://www.voxitec.com/blog").unwrap();
        cache.fetch(&u).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        cache.fetch(&u).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
