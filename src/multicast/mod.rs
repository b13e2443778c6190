//! Broadcast fan-out subsystem.
//!
//! # Data Flow
//! ```text
//! producer (capture handler)
//!     → Group::publish (one pass over the registry, try_send per member)
//!     → Member queue (bounded mpsc, one per subscriber)
//!     → consumer drains at its own pace (log sink, websocket session)
//! ```
//!
//! # Design Decisions
//! - Only membership is serialized; each member queue synchronizes itself
//! - Publish never waits: a full queue drops the newest record for that member
//! - Members leave on drop, so every exit path of a consumer releases its queue
//! - Payloads are shared as `Arc<T>`; no consumer owns a record exclusively

pub mod group;
pub mod member;

pub use group::{Group, GroupError, GroupStats, DEFAULT_QUEUE_CAPACITY};
pub use member::{Member, MemberId};
