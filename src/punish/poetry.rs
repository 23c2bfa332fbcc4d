//! Random poetry links from stihi.ru.
//!
//! A candidate path is built from a random date and poem number. Most such
//! paths do not exist, so every candidate is fetched before it is used.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Text stihi.ru renders on its "page not found" page.
pub const NOT_FOUND_MARKER: &str = "404:";

/// Candidate components, as half-open ranges.
const YEARS: std::ops::Range<u32> = 2008..2018;
const MONTHS: std::ops::Range<u32> = 1..12;
const DAYS: std::ops::Range<u32> = 1..30;
const POEM_IDS: std::ops::Range<u32> = 10..4100;

/// Returned when no candidate passed the liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No live poetry link found after {attempts} attempts")]
pub struct LinkGenerationFailed {
    pub attempts: u32,
}

/// Decides whether a link points at real content.
#[async_trait]
pub trait LinkChecker: Send + Sync {
    async fn is_live(&self, url: &str) -> bool;
}

/// Fetches the page and looks for the not-found marker.
#[derive(Debug, Clone)]
pub struct HttpLinkChecker {
    http: reqwest::Client,
    not_found_marker: String,
}

impl HttpLinkChecker {
    /// Creates a checker whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            not_found_marker: NOT_FOUND_MARKER.to_owned(),
        })
    }
}

#[async_trait]
impl LinkChecker for HttpLinkChecker {
    async fn is_live(&self, url: &str) -> bool {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Poetry link {} unreachable: {}", url, e);
                return false;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            debug!("Poetry link {} returned {}", url, response.status());
            return false;
        }

        match response.text().await {
            Ok(body) => !body.contains(&self.not_found_marker),
            Err(e) => {
                debug!("Failed to read poetry page {}: {}", url, e);
                false
            }
        }
    }
}

/// Builds one candidate link.
pub fn candidate_link<R: Rng + ?Sized>(rng: &mut R) -> String {
    let year = rng.gen_range(YEARS);
    let month = rng.gen_range(MONTHS);
    let day = rng.gen_range(DAYS);
    let id = rng.gen_range(POEM_IDS);
    format!("https://www.stihi.ru/{year:04}/{month:02}/{day:02}/{id}")
}

/// Produces verified poetry links with a bounded number of attempts.
#[derive(Clone)]
pub struct PoetryLinkGenerator {
    checker: Arc<dyn LinkChecker>,
    max_attempts: u32,
}

impl PoetryLinkGenerator {
    #[must_use]
    pub fn new(checker: Arc<dyn LinkChecker>, max_attempts: u32) -> Self {
        Self {
            checker,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Returns the first candidate that passes the liveness check.
    pub async fn generate(&self, rng: &Mutex<StdRng>) -> Result<String, LinkGenerationFailed> {
        for attempt in 1..=self.max_attempts {
            let link = candidate_link(&mut *rng.lock().await);
            if self.checker.is_live(&link).await {
                debug!("Poetry link {} accepted on attempt {}", link, attempt);
                return Ok(link);
            }
        }

        warn!("Gave up on poetry links after {} attempts", self.max_attempts);
        Err(LinkGenerationFailed {
            attempts: self.max_attempts,
        })
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl std::fmt::Debug for PoetryLinkGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoetryLinkGenerator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
