//! Subscription handles returned by [`Group::join`](super::Group::join).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

use super::group::Shared;

/// Global atomic counter for member IDs.
static MEMBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(u64);

impl MemberId {
    pub(crate) fn next() -> Self {
        Self(MEMBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "member-{}", self.0)
    }
}

/// A subscription to a [`Group`](super::Group).
///
/// Owns the receiving end of its delivery queue. The group only keeps the
/// sending end, keyed by [`MemberId`]. Dropping a member removes it from the
/// group, so a consumer cannot leak its registration on any exit path.
pub struct Member<T> {
    id: MemberId,
    rx: mpsc::Receiver<Arc<T>>,
    group: Weak<Shared<T>>,
}

impl<T> Member<T> {
    pub(crate) fn new(id: MemberId, rx: mpsc::Receiver<Arc<T>>, group: Weak<Shared<T>>) -> Self {
        Self { id, rx, group }
    }

    /// This member's identity.
    pub fn id(&self) -> MemberId {
        self.id
    }

    /// Wait for the next record.
    ///
    /// Returns `None` once the member has left or the group was closed and
    /// everything queued before that point has been read.
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        self.rx.recv().await
    }

    /// Take the next queued record without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<T>> {
        self.rx.try_recv().ok()
    }

    /// Leave the group explicitly.
    pub fn leave(self) {
        drop(self);
    }

    pub(crate) fn belongs_to(&self, shared: &Arc<Shared<T>>) -> bool {
        std::ptr::eq(self.group.as_ptr(), Arc::as_ptr(shared))
    }
}

impl<T> std::fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member").field("id", &self.id).finish()
    }
}

impl<T> Drop for Member<T> {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(shared) = self.group.upgrade() {
            shared.remove(self.id);
        }
        tracing::trace!(member = %self.id, "Member dropped");
    }
}
