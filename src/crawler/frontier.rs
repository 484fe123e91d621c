//! The URL frontier: pending work plus the seen set
//!
//! The frontier owns two pieces of run-wide state under a single lock: the
//! ordered `pending` queue of `(url, remaining_depth)` items and the `seen`
//! set of dispatched URL strings. URLs enter `seen` at dispatch time, not at
//! enqueue time, so identical links may briefly coexist in `pending`; the
//! dispatch batch discards those duplicates before they reach a worker.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// One unit of crawl work
#[derive(Debug, Clone)]
pub struct FrontierItem {
    /// The absolute URL to fetch
    pub url: Url,

    /// How many more recursion hops are allowed; 0 = fetch but do not recurse
    pub remaining_depth: u32,
}

#[derive(Debug, Default)]
struct FrontierState {
    pending: VecDeque<FrontierItem>,
    seen: HashSet<String>,
    requeued: HashSet<String>,
}

/// Thread-safe frontier with configurable insertion order
///
/// Tail insertion gives breadth-first traversal, head insertion depth-first.
/// With concurrent workers these are preference orders, not guarantees.
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    depth_first: bool,
    max_depth: u32,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// `max_depth` is the remaining depth assigned when `submit` is called
    /// without an explicit depth (i.e. for seeds).
    pub fn new(depth_first: bool, max_depth: u32) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            depth_first,
            max_depth,
        }
    }

    fn locked(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().expect("frontier lock poisoned")
    }

    /// Inserts a URL into the pending queue
    ///
    /// A `None` depth means the configured maximum; a negative depth is
    /// rejected. Returns true when the item was enqueued.
    pub fn submit(&self, url: Url, depth: Option<i64>) -> bool {
        let depth = depth.unwrap_or(self.max_depth as i64);
        if depth < 0 {
            return false;
        }

        let item = FrontierItem {
            url,
            remaining_depth: depth as u32,
        };

        let mut state = self.locked();
        if self.depth_first {
            state.pending.push_front(item);
        } else {
            state.pending.push_back(item);
        }
        true
    }

    /// Atomically swaps out the pending queue and returns it
    pub fn drain(&self) -> VecDeque<FrontierItem> {
        std::mem::take(&mut self.locked().pending)
    }

    /// Pulls up to `n` dispatchable items, marking each as seen
    ///
    /// Items whose URL is already in the seen set are duplicates left over
    /// from discovery-time races; they are dropped here, which is what keeps
    /// the fetcher invoked at most once per URL.
    pub fn next_batch(&self, n: usize) -> Vec<FrontierItem> {
        let mut state = self.locked();
        let mut batch = Vec::new();

        while batch.len() < n {
            let Some(item) = state.pending.pop_front() else {
                break;
            };
            if state.seen.insert(item.url.as_str().to_string()) {
                batch.push(item);
            }
        }

        batch
    }

    /// Membership test against the seen set
    pub fn is_seen(&self, url: &str) -> bool {
        self.locked().seen.contains(url)
    }

    /// Re-enqueues a dispatched item and forgets it was seen
    ///
    /// Used for Cloudflare-challenged URLs. At most one requeue is granted
    /// per distinct URL so a persistent challenge cannot loop forever; a
    /// second request returns false and the caller drops the URL.
    pub fn requeue(&self, item: FrontierItem) -> bool {
        let mut state = self.locked();
        if !state.requeued.insert(item.url.as_str().to_string()) {
            return false;
        }

        state.seen.remove(item.url.as_str());
        if self.depth_first {
            state.pending.push_front(item);
        } else {
            state.pending.push_back(item);
        }
        true
    }

    /// Drops all pending work; in-flight work is unaffected
    pub fn clear_pending(&self) {
        self.locked().pending.clear();
    }

    /// Number of items waiting in the pending queue
    pub fn pending_len(&self) -> usize {
        self.locked().pending.len()
    }

    /// True when nothing is waiting to be dispatched
    pub fn is_empty(&self) -> bool {
        self.locked().pending.is_empty()
    }

    /// Number of URLs ever dispatched
    pub fn seen_len(&self) -> usize {
        self.locked().seen.len()
    }
}
