//! Crawl frontier: the shared queue of URLs and their lifecycle
//!
//! This module handles:
//! - At-most-once admission of every normalized URL
//! - Atomic claiming, so two workers never fetch the same URL
//! - Completion detection (queue empty and nothing in flight)
//! - The page and depth safety bounds
//! - Cancellation, which drops everything still queued
//!
//! Every URL has exactly one `PageState`, so a URL can never be queued and
//! visited at the same time.

use crate::state::PageState;
use crate::url::PageUrl;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// A URL claimed or waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    pub url: PageUrl,
    /// Link distance from the seed (seed = 0)
    pub depth: u32,
}

/// Illegal lifecycle updates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontierError {
    #[error("{url} was never admitted to the frontier")]
    Unknown { url: String },

    #[error("{url}: cannot move from {from} to {to}")]
    InvalidTransition {
        url: String,
        from: PageState,
        to: PageState,
    },
}

/// Safety bounds applied by the frontier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierLimits {
    /// Maximum number of URLs ever claimed
    pub max_pages: Option<u32>,
    /// URLs deeper than this are never admitted
    pub max_depth: Option<u32>,
}

/// Point-in-time counts by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub queued: usize,
    pub in_flight: usize,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub abandoned: usize,
    /// Links refused for exceeding `max_depth`
    pub depth_pruned: usize,
}

impl FrontierStats {
    /// Pages that reached `Processed` or `Failed`
    pub fn finished(&self) -> usize {
        self.processed + self.failed
    }

    /// Every URL ever admitted
    pub fn discovered(&self) -> usize {
        self.queued + self.in_flight + self.processed + self.failed + self.skipped + self.abandoned
    }
}

enum Poll {
    Claim(QueuedUrl),
    Wait,
    Done,
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<QueuedUrl>,
    states: HashMap<PageUrl, PageState>,
    in_flight: usize,
    claimed: u32,
    depth_pruned: usize,
    closed: bool,
}

impl FrontierInner {
    fn page_budget_spent(&self, limits: &FrontierLimits) -> bool {
        limits.max_pages.is_some_and(|max| self.claimed >= max)
    }

    fn skip_queued(&mut self) {
        for queued in self.queue.drain(..) {
            self.states.insert(queued.url, PageState::Skipped);
        }
    }

    fn claim(&mut self, limits: &FrontierLimits) -> Option<QueuedUrl> {
        if self.closed {
            return None;
        }

        if self.page_budget_spent(limits) {
            self.skip_queued();
            return None;
        }

        let queued = self.queue.pop_front()?;
        self.states.insert(queued.url.clone(), PageState::InFlight);
        self.in_flight += 1;
        self.claimed += 1;
        Some(queued)
    }

    fn poll(&mut self, limits: &FrontierLimits) -> Poll {
        if let Some(queued) = self.claim(limits) {
            return Poll::Claim(queued);
        }

        if self.closed || self.in_flight == 0 {
            self.closed = true;
            Poll::Done
        } else {
            Poll::Wait
        }
    }
}

/// Shared crawl frontier
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
    limits: FrontierLimits,
}

impl Frontier {
    pub fn new(limits: FrontierLimits) -> Self {
        Self {
            inner: Mutex::new(FrontierInner::default()),
            notify: Notify::new(),
            limits,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admits URLs never seen before, in the given order
    ///
    /// URLs already queued, in flight or finished are ignored, as is
    /// everything once the frontier is closed. Returns how many were added.
    pub fn enqueue<I>(&self, urls: I, depth: u32) -> usize
    where
        I: IntoIterator<Item = PageUrl>,
    {
        let added = {
            let mut inner = self.lock();
            if inner.closed {
                return 0;
            }

            if self.limits.max_depth.is_some_and(|max| depth > max) {
                let pruned: HashSet<PageUrl> = urls
                    .into_iter()
                    .filter(|url| !inner.states.contains_key(url))
                    .collect();
                inner.depth_pruned += pruned.len();
                return 0;
            }

            let mut added = 0;
            for url in urls {
                if inner.states.contains_key(&url) {
                    continue;
                }
                inner.states.insert(url.clone(), PageState::Queued);
                inner.queue.push_back(QueuedUrl { url, depth });
                added += 1;
            }
            added
        };

        if added > 0 {
            self.notify.notify_waiters();
        }
        added
    }

    /// Claims the next queued URL, if any, marking it in flight
    pub fn dequeue(&self) -> Option<QueuedUrl> {
        self.lock().claim(&self.limits)
    }

    /// Waits for the next URL to process
    ///
    /// Returns `None` once the crawl is complete (nothing queued, nothing in
    /// flight) or `cancel` fires.
    pub async fn next(&self, cancel: &CancellationToken) -> Option<QueuedUrl> {
        loop {
            // Registered before checking state so a wakeup in between is not lost
            let notified = self.notify.notified();

            if cancel.is_cancelled() {
                self.cancel();
                return None;
            }

            let poll = self.lock().poll(&self.limits);
            match poll {
                Poll::Claim(queued) => return Some(queued),
                Poll::Done => {
                    self.notify.notify_waiters();
                    return None;
                }
                Poll::Wait => {}
            }

            tokio::select! {
                _ = notified => {}
                _ = cancel.cancelled() => {
                    self.cancel();
                    return None;
                }
            }
        }
    }

    /// Records the outcome of a claimed URL
    pub fn mark_done(&self, url: &PageUrl, outcome: PageState) -> Result<(), FrontierError> {
        {
            let mut inner = self.lock();
            let current = *inner.states.get(url).ok_or_else(|| FrontierError::Unknown {
                url: url.to_string(),
            })?;

            if current != PageState::InFlight || !current.can_transition_to(outcome) {
                return Err(FrontierError::InvalidTransition {
                    url: url.to_string(),
                    from: current,
                    to: outcome,
                });
            }

            inner.states.insert(url.clone(), outcome);
            inner.in_flight -= 1;
        }

        self.notify.notify_waiters();
        Ok(())
    }

    /// True once nothing is queued and nothing is in flight, or after cancel
    pub fn is_complete(&self) -> bool {
        let inner = self.lock();
        inner.closed || (inner.queue.is_empty() && inner.in_flight == 0)
    }

    /// Closes the frontier; queued URLs become `Skipped`
    ///
    /// URLs already in flight keep their claim until `mark_done`.
    pub fn cancel(&self) {
        {
            let mut inner = self.lock();
            inner.closed = true;
            inner.skip_queued();
        }
        self.notify.notify_waiters();
    }

    pub fn state_of(&self, url: &PageUrl) -> Option<PageState> {
        self.lock().states.get(url).copied()
    }

    pub fn stats(&self) -> FrontierStats {
        let inner = self.lock();
        let mut stats = FrontierStats {
            depth_pruned: inner.depth_pruned,
            ..FrontierStats::default()
        };

        for state in inner.states.values() {
            match state {
                PageState::Queued => stats.queued += 1,
                PageState::InFlight => stats.in_flight += 1,
                PageState::Processed => stats.processed += 1,
                PageState::Failed => stats.failed += 1,
                PageState::Skipped => stats.skipped += 1,
                PageState::Abandoned => stats.abandoned += 1,
            }
        }

        stats
    }

    /// URLs currently in `state`, sorted
    pub fn urls_in(&self, state: PageState) -> Vec<PageUrl> {
        let mut urls: Vec<PageUrl> = self
            .lock()
            .states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }
}
