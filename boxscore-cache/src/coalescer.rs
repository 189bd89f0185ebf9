//! Per-key request coalescing.
//!
//! At most one holder per key at a time. Callers that arrive while a key is
//! held queue up and are admitted strictly in arrival order as each holder
//! releases. Distinct keys never wait on each other.
//!
//! Releasing is tied to [`CoalesceGuard`]'s `Drop`, so a holder that returns
//! early, errors out or is cancelled mid-await still hands the key on. A
//! waiter that is cancelled before it is admitted leaves the queue; one that
//! is cancelled after being admitted but before observing it passes the key
//! straight to the next waiter.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

struct Waiter {
    ticket: u64,
    grant: oneshot::Sender<()>,
}

/// Queue for one held key. The group's presence in the map means "held".
#[derive(Default)]
struct Group {
    waiters: VecDeque<Waiter>,
}

/// Registry of held keys and their waiter queues.
#[derive(Default)]
pub struct Coalescer {
    groups: Mutex<HashMap<String, Group>>,
    next_ticket: AtomicU64,
}

impl std::fmt::Debug for Coalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("active_groups", &self.active_groups())
            .finish()
    }
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until this caller is the holder of `key`.
    ///
    /// Acquiring a key the current task already holds never completes.
    pub async fn acquire(&self, key: &str) -> CoalesceGuard<'_> {
        loop {
            let mut pending = match self.try_enter(key) {
                Ok(guard) => return guard,
                Err(pending) => pending,
            };

            match (&mut pending.rx).await {
                Ok(()) => {
                    pending.settled = true;
                    return CoalesceGuard {
                        coalescer: self,
                        key: key.to_string(),
                    };
                }
                // Sender dropped without granting; look again.
                Err(_) => {
                    pending.settled = true;
                }
            }
        }
    }

    /// Whether some caller currently holds `key`.
    pub fn is_held(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of callers queued behind the holder of `key`.
    pub fn waiting(&self, key: &str) -> usize {
        self.lock()
            .get(key)
            .map(|group| group.waiters.len())
            .unwrap_or(0)
    }

    /// Number of keys currently held.
    pub fn active_groups(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Group>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take `key` if free, otherwise join the back of its queue.
    fn try_enter(&self, key: &str) -> Result<CoalesceGuard<'_>, PendingAcquire<'_>> {
        let mut groups = self.lock();
        match groups.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Group::default());
                Ok(CoalesceGuard {
                    coalescer: self,
                    key: key.to_string(),
                })
            }
            Entry::Occupied(mut slot) => {
                let (grant, rx) = oneshot::channel();
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                slot.get_mut().waiters.push_back(Waiter { ticket, grant });
                Err(PendingAcquire {
                    coalescer: self,
                    key: key.to_string(),
                    ticket,
                    rx,
                    settled: false,
                })
            }
        }
    }

    /// Hand `key` to the oldest live waiter, or free it if none remain.
    fn release(&self, key: &str) {
        let mut groups = self.lock();
        let Some(group) = groups.get_mut(key) else {
            return;
        };
        while let Some(waiter) = group.waiters.pop_front() {
            if waiter.grant.send(()).is_ok() {
                return;
            }
        }
        groups.remove(key);
    }
}

/// Proof of holding a key. Dropping it releases the key.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct CoalesceGuard<'a> {
    coalescer: &'a Coalescer,
    key: String,
}

impl CoalesceGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for CoalesceGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalesceGuard").field("key", &self.key).finish()
    }
}

impl Drop for CoalesceGuard<'_> {
    fn drop(&mut self) {
        self.coalescer.release(&self.key);
    }
}

/// A queued acquire that has not yet observed its outcome.
struct PendingAcquire<'a> {
    coalescer: &'a Coalescer,
    key: String,
    ticket: u64,
    rx: oneshot::Receiver<()>,
    settled: bool,
}

impl Drop for PendingAcquire<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let granted = {
            let mut groups = self.coalescer.lock();
            match self.rx.try_recv() {
                Ok(()) => true,
                Err(oneshot::error::TryRecvError::Empty) => {
                    if let Some(group) = groups.get_mut(&self.key) {
                        group.waiters.retain(|w| w.ticket != self.ticket);
                    }
                    false
                }
                Err(oneshot::error::TryRecvError::Closed) => false,
            }
        };

        if granted {
            self.coalescer.release(&self.key);
        }
    }
}
