//! Crawl frontier: the queued / in-flight / done sets
//!
//! This module handles:
//! - Deduplicating discovered URLs before any work is spawned
//! - Moving each URL through `Queued -> InFlight -> Done` atomically
//! - Tracking outstanding worker tasks so the end of the crawl is detected
//!   without timing guesses
//! - Bookkeeping for image checks (pending set, waiters and cached results)
//!
//! Every mutation happens under one mutex and never spans an `.await`.
//! Work and probe membership are held by ticket objects whose `Drop`
//! releases them, so every exit path of a worker (success, error, panic,
//! cancellation) leaves the sets consistent.

use crate::state::{CrawlEntry, UrlState};
use crate::SitemapError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Notify};

/// Snapshot of the frontier sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierCounts {
    pub queued: usize,
    pub in_flight: usize,
    pub done: usize,
    /// Done entries whose fetch succeeded
    pub ok: usize,
    pub pending_images: usize,
    /// Worker tasks that have not yet exited
    pub active_tasks: usize,
}

#[derive(Debug, Default)]
struct FrontierState {
    queued: HashSet<String>,
    in_flight: HashSet<String>,
    done: BTreeMap<String, CrawlEntry>,
    pending_images: HashMap<String, watch::Sender<Option<bool>>>,
    probed_images: HashMap<String, bool>,
    active_tasks: usize,
}

impl FrontierState {
    fn state_of(&self, url: &str) -> Option<UrlState> {
        if self.done.contains_key(url) {
            Some(UrlState::Done)
        } else if self.in_flight.contains(url) {
            Some(UrlState::InFlight)
        } else if self.queued.contains(url) {
            Some(UrlState::Queued)
        } else {
            None
        }
    }

    fn is_quiescent(&self) -> bool {
        self.queued.is_empty() && self.in_flight.is_empty() && self.active_tasks == 0
    }

    fn check_transition(&self, url: &str, to: UrlState) -> Result<Option<UrlState>, SitemapError> {
        let from = self.state_of(url);
        if UrlState::can_transition(from, to) {
            Ok(from)
        } else {
            Err(SitemapError::InvalidTransition {
                url: url.to_string(),
                from,
                to,
            })
        }
    }

    fn leave(&mut self, url: &str, from: Option<UrlState>) {
        match from {
            Some(UrlState::Queued) => {
                self.queued.remove(url);
            }
            Some(UrlState::InFlight) => {
                self.in_flight.remove(url);
            }
            _ => {}
        }
    }

    fn complete(&mut self, url: &str, entry: CrawlEntry) -> Result<(), SitemapError> {
        let from = self.check_transition(url, UrlState::Done)?;
        self.leave(url, from);
        self.done.insert(url.to_string(), entry);
        Ok(())
    }
}

/// Shared frontier for one crawl
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    idle: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accepts a URL into the queued set
    ///
    /// Returns `None` if the URL is already queued, in flight or done.
    /// Otherwise the URL is queued and the returned ticket counts as one
    /// outstanding task until it is dropped; the caller hands it to the
    /// worker it spawns.
    pub fn try_enqueue(self: &Arc<Self>, url: String) -> Option<WorkTicket> {
        let mut state = self.lock();
        let from = state.check_transition(&url, UrlState::Queued).ok()?;
        state.leave(&url, from);
        state.queued.insert(url.clone());
        state.active_tasks += 1;

        Some(WorkTicket {
            frontier: Arc::clone(self),
            url,
            finished: false,
        })
    }

    /// Returns which set the URL is in, if any
    pub fn state_of(&self, url: &str) -> Option<UrlState> {
        self.lock().state_of(url)
    }

    /// True once nothing is queued, nothing is in flight and every worker
    /// task has exited
    pub fn is_quiescent(&self) -> bool {
        self.lock().is_quiescent()
    }

    /// True if the three URL sets are pairwise disjoint
    pub fn is_consistent(&self) -> bool {
        let state = self.lock();
        state.queued.is_disjoint(&state.in_flight)
            && state.queued.iter().all(|u| !state.done.contains_key(u))
            && state.in_flight.iter().all(|u| !state.done.contains_key(u))
    }

    /// Waits until the frontier is quiescent
    ///
    /// Workers enqueue discovered links before their own ticket is released,
    /// so the outstanding count can only reach zero once no more work can
    /// appear.
    pub async fn wait_until_quiescent(&self) {
        loop {
            let notified = self.idle.notified();
            if self.is_quiescent() {
                return;
            }
            notified.await;
        }
    }

    pub fn counts(&self) -> FrontierCounts {
        let state = self.lock();
        FrontierCounts {
            queued: state.queued.len(),
            in_flight: state.in_flight.len(),
            done: state.done.len(),
            ok: state.done.values().filter(|e| e.ok).count(),
            pending_images: state.pending_images.len(),
            active_tasks: state.active_tasks,
        }
    }

    /// Removes and returns the done map
    pub fn take_done(&self) -> BTreeMap<String, CrawlEntry> {
        std::mem::take(&mut self.lock().done)
    }

    /// Claims an image URL for probing
    ///
    /// A URL already probed in this crawl returns its cached result; a URL
    /// currently being checked elsewhere returns `Pending` with a receiver
    /// that sees the result once that check ends.
    pub fn claim_image(self: &Arc<Self>, url: &str) -> ImageClaim {
        let mut state = self.lock();

        if let Some(&accepted) = state.probed_images.get(url) {
            return ImageClaim::Known(accepted);
        }
        if let Some(sender) = state.pending_images.get(url) {
            return ImageClaim::Pending(sender.subscribe());
        }
        let (sender, _) = watch::channel(None);
        state.pending_images.insert(url.to_string(), sender);

        ImageClaim::Claimed(ProbeTicket {
            frontier: Arc::clone(self),
            url: url.to_string(),
            outcome: None,
        })
    }
}

/// Ownership of one queued URL, held by its worker
///
/// Dropping a ticket that was never finished records a failed entry for
/// the URL. Dropping any ticket releases its outstanding-task count.
#[derive(Debug)]
pub struct WorkTicket {
    frontier: Arc<Frontier>,
    url: String,
    finished: bool,
}

impl WorkTicket {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Moves the URL from queued to in-flight
    ///
    /// Call only while holding a concurrency slot.
    pub fn start(&mut self) -> Result<(), SitemapError> {
        let mut state = self.frontier.lock();
        let from = state.check_transition(&self.url, UrlState::InFlight)?;
        state.leave(&self.url, from);
        state.in_flight.insert(self.url.clone());
        Ok(())
    }

    /// Records the outcome and moves the URL to done
    pub fn finish(mut self, entry: CrawlEntry) {
        if let Err(e) = self.frontier.lock().complete(&self.url, entry) {
            tracing::warn!("Dropping duplicate outcome: {}", e);
        }
        self.finished = true;
    }
}

impl Drop for WorkTicket {
    fn drop(&mut self) {
        let quiescent = {
            let mut state = self.frontier.lock();
            if !self.finished && state.state_of(&self.url).is_some_and(|s| s.is_active()) {
                tracing::warn!("Worker for {} exited without an outcome", self.url);
                if let Err(e) = state.complete(&self.url, CrawlEntry::failed()) {
                    tracing::warn!("{}", e);
                }
            }
            state.active_tasks = state.active_tasks.saturating_sub(1);
            state.is_quiescent()
        };

        if quiescent {
            self.frontier.idle.notify_one();
        }
    }
}

/// Result of claiming an image URL
#[derive(Debug)]
pub enum ImageClaim {
    /// Already probed during this crawl
    Known(bool),

    /// Another page is probing it right now
    ///
    /// The receiver yields `Some(result)` when that check completes. If it
    /// is abandoned the sender is dropped without a result.
    Pending(watch::Receiver<Option<bool>>),

    /// The caller must probe it
    Claimed(ProbeTicket),
}

/// Membership of one image URL in the pending set
///
/// Dropping the ticket (after completion, on timeout or on error) always
/// removes the URL from the pending set and wakes its waiters; only
/// completed probes are cached.
#[derive(Debug)]
pub struct ProbeTicket {
    frontier: Arc<Frontier>,
    url: String,
    outcome: Option<bool>,
}

impl ProbeTicket {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Records the probe result
    pub fn complete(mut self, accepted: bool) {
        self.outcome = Some(accepted);
    }
}

impl Drop for ProbeTicket {
    fn drop(&mut self) {
        let mut state = self.frontier.lock();
        let waiters = state.pending_images.remove(&self.url);
        if let Some(accepted) = self.outcome {
            state.probed_images.insert(self.url.clone(), accepted);
            if let Some(waiters) = waiters {
                waiters.send_replace(Some(accepted));
            }
        }
    }
}
