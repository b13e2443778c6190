//! Group registry and fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::member::{Member, MemberId};
use crate::observability::metrics;

/// Default per-member queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Errors returned by group operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GroupError {
    /// The group was closed during shutdown.
    #[error("group is closed")]
    Closed,
}

/// Snapshot of group counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub members: usize,
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
}

struct Registry<T> {
    members: HashMap<MemberId, mpsc::Sender<Arc<T>>>,
    closed: bool,
}

pub(crate) struct Shared<T> {
    registry: Mutex<Registry<T>>,
    capacity: usize,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        // Registry updates never panic midway, so a poisoned lock still holds a valid map.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn remove(&self, id: MemberId) -> bool {
        let mut registry = self.lock();
        let removed = registry.members.remove(&id).is_some();
        if removed {
            metrics::set_group_members(registry.members.len());
        }
        removed
    }
}

/// Broadcast group delivering every published record to each current member.
///
/// Cloning a `Group` yields another handle to the same registry.
pub struct Group<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Group<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Group<T> {
    /// Create a group whose members each buffer up to `capacity` records.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry {
                    members: HashMap::new(),
                    closed: false,
                }),
                capacity: capacity.max(1),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new member with an empty queue.
    pub fn join(&self) -> Result<Member<T>, GroupError> {
        let mut registry = self.shared.lock();
        if registry.closed {
            return Err(GroupError::Closed);
        }

        let id = MemberId::next();
        let (tx, rx) = mpsc::channel(self.shared.capacity);
        registry.members.insert(id, tx);
        let count = registry.members.len();
        drop(registry);

        metrics::set_group_members(count);
        tracing::debug!(member = %id, members = count, "Member joined");
        Ok(Member::new(id, rx, Arc::downgrade(&self.shared)))
    }

    /// Deregister `member`.
    ///
    /// Returns `false` when the member had already left or belongs to another
    /// group. Safe to call any number of times.
    pub fn leave(&self, member: &Member<T>) -> bool {
        if !member.belongs_to(&self.shared) {
            tracing::debug!(member = %member.id(), "Leave ignored: member of another group");
            return false;
        }

        let removed = self.shared.remove(member.id());
        if removed {
            tracing::debug!(member = %member.id(), "Member left");
        } else {
            tracing::debug!(member = %member.id(), "Leave ignored: member not registered");
        }
        removed
    }

    /// Deliver `record` to every member joined at this moment.
    pub fn publish(&self, record: T) {
        self.publish_arc(Arc::new(record));
    }

    /// Deliver an already shared record.
    ///
    /// Never waits. A member whose queue is full misses this record; a member
    /// whose receiver is gone is pruned.
    pub fn publish_arc(&self, record: Arc<T>) {
        let mut registry = self.shared.lock();
        if registry.closed {
            return;
        }

        let mut delivered = 0u64;
        let mut dropped = 0u64;
        registry.members.retain(|id, tx| match tx.try_send(Arc::clone(&record)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                dropped += 1;
                tracing::trace!(member = %id, "Queue full, record dropped");
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(member = %id, "Pruning member with closed queue");
                false
            }
        });
        let members = registry.members.len();
        drop(registry);

        self.shared.published.fetch_add(1, Ordering::Relaxed);
        self.shared.delivered.fetch_add(delivered, Ordering::Relaxed);
        self.shared.dropped.fetch_add(dropped, Ordering::Relaxed);
        metrics::record_published(dropped);
        metrics::set_group_members(members);
    }

    /// Close the group.
    ///
    /// Further joins fail with [`GroupError::Closed`], further publishes are
    /// ignored, and every member sees the end of its queue after reading what
    /// was already delivered.
    pub fn close(&self) {
        let mut registry = self.shared.lock();
        if registry.closed {
            return;
        }
        registry.closed = true;
        let released = registry.members.len();
        registry.members.clear();
        drop(registry);

        metrics::set_group_members(0);
        tracing::info!(members = released, "Broadcast group closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Number of currently joined members.
    pub fn member_count(&self) -> usize {
        self.shared.lock().members.len()
    }

    /// Configured per-member queue capacity.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Current counters.
    pub fn stats(&self) -> GroupStats {
        GroupStats {
            members: self.member_count(),
            published: self.shared.published.load(Ordering::Relaxed),
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }
}

impl<T> Default for Group<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl<T> std::fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("capacity", &self.shared.capacity)
            .field("members", &self.member_count())
            .finish()
    }
}
