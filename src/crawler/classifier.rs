//! Content-type classification of candidate resources
//!
//! Each candidate image URL is probed at most once per crawl at a time:
//! concurrent requests for a URL already being checked wait for that
//! result, finished checks are answered from cache.

use crate::crawler::fetcher::probe_content_type;
use crate::crawler::frontier::{Frontier, ImageClaim};
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

/// Decides whether candidate URLs serve the expected content type
pub struct ResourceClassifier {
    client: Client,
    gate: Arc<Semaphore>,
    frontier: Arc<Frontier>,
    timeout: Duration,
    expected: Regex,
}

impl ResourceClassifier {
    /// Creates a classifier for image resources
    ///
    /// `slots` bounds the number of probes in flight across the whole crawl.
    /// The gate is separate from the page gate so a page holding its slot
    /// never waits on another page for a probe slot.
    pub fn for_images(
        client: Client,
        frontier: Arc<Frontier>,
        slots: usize,
        timeout: Duration,
    ) -> crate::Result<Self> {
        let expected = Regex::new("^image/")
            .map_err(|e| crate::ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            client,
            gate: Arc::new(Semaphore::new(slots.max(1))),
            frontier,
            timeout,
            expected,
        })
    }

    /// Returns true if `url` answers 200 with a matching Content-Type
    ///
    /// The timeout covers both waiting for a probe slot and the request.
    /// Timeouts and transport failures are negative and are not cached.
    /// A URL another page is already checking waits, under the same
    /// timeout, for that result.
    pub async fn classify(&self, url: &str) -> bool {
        let ticket = match self.frontier.claim_image(url) {
            ImageClaim::Known(accepted) => return accepted,
            ImageClaim::Pending(waiter) => {
                tracing::debug!("Image {} is already being checked, waiting", url);
                return self.await_result(url, waiter).await;
            }
            ImageClaim::Claimed(ticket) => ticket,
        };

        let probe = async {
            let _permit = self.gate.acquire().await.ok()?;
            Some(probe_content_type(&self.client, url, &self.expected).await)
        };

        match tokio::time::timeout(self.timeout, probe).await {
            Ok(Some(accepted)) => {
                ticket.complete(accepted);
                accepted
            }
            Ok(None) => false,
            Err(_) => {
                tracing::warn!("Probe for {} timed out after {:?}", url, self.timeout);
                false
            }
        }
    }

    async fn await_result(&self, url: &str, mut waiter: watch::Receiver<Option<bool>>) -> bool {
        let wait = async {
            loop {
                let current = *waiter.borrow_and_update();
                if let Some(accepted) = current {
                    return accepted;
                }
                if waiter.changed().await.is_err() {
                    // Abandoned checks close the channel without a result
                    let last = *waiter.borrow();
                    return last.unwrap_or(false);
                }
            }
        };

        match tokio::time::timeout(self.timeout, wait).await {
            Ok(accepted) => accepted,
            Err(_) => {
                tracing::warn!("Waiting on check of {} timed out after {:?}", url, self.timeout);
                false
            }
        }
    }
}
