use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::request::Request;

/// In-memory request queue, deduplicated on [`Request::unique_key`].
#[derive(Debug, Default)]
pub struct RequestQueue {
    name: Option<String>,
    state: Mutex<QueueState>,
    handled: AtomicUsize,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Request>,
    seen: HashSet<String>,
    in_progress: usize,
}

impl RequestQueue {
    pub fn open(name: Option<&str>) -> Self {
        Self {
            name: name.map(String::from),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("default")
    }

    /// Returns `false` when a request with the same unique key was already added.
    pub fn add_request(&self, request: Request) -> bool {
        let mut state = self.lock();
        if !state.seen.insert(request.unique_key.clone()) {
            log::debug!("Skipping duplicate request: {}", request.url);
            return false;
        }
        state.pending.push_back(request);
        true
    }

    pub fn add_requests_batched<I>(&self, requests: I) -> usize
    where
        I: IntoIterator<Item = Request>,
    {
        requests
            .into_iter()
            .map(|request| self.add_request(request))
            .filter(|added| *added)
            .count()
    }

    pub fn fetch_next(&self) -> Option<Request> {
        let mut state = self.lock();
        let request = state.pending.pop_front()?;
        state.in_progress += 1;
        Some(request)
    }

    /// Gives a fetched request back for another attempt.
    pub fn reclaim(&self, request: Request) {
        let mut state = self.lock();
        state.in_progress = state.in_progress.saturating_sub(1);
        state.pending.push_back(request);
    }

    /// Marks a fetched request as done, whether it succeeded or ran out of retries.
    pub fn mark_handled(&self) {
        let mut state = self.lock();
        state.in_progress = state.in_progress.saturating_sub(1);
        self.handled.fetch_add(1, Ordering::SeqCst);
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn handled_count(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.in_progress == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        // The state stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
