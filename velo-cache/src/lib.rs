//! # velo-cache
//!
//! Admission-controlled, budget-bounded store of prefetch candidates,
//! scored and evicted by probability and recency.
//!
//! The store is single-writer: every mutating operation takes `&mut self`,
//! and the engine serializes access behind one lock so concurrent
//! admissions cannot overshoot the byte budget. Decision paths never block
//! and never perform I/O; the actual fetch happens in worker task bodies.

pub mod entry;
pub mod score;
pub mod snapshot;
pub mod store;

pub use entry::{CacheEntry, EntryState};
pub use store::{
    AdmissionOutcome, CacheCandidate, CacheStats, LookupOutcome, PredictiveCache, RejectReason,
};
