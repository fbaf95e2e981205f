//! Integer-keyed hash table tuned for request/response correlation.
//!
//! [`IntMap`] maps `u64` keys to values using separate chaining over an odd-sized bucket array.
//! Slots live in a single arena and are linked by index, so removing an entry pushes its slot onto
//! a free list instead of releasing memory. Later inserts reuse those slots before the arena is
//! extended, which keeps create/remove churn at O(1) without per-entry allocation.
//!
//! * [`IntMap`]: the table itself.
//! * [`Cursor`]: a detached, version-checked enumeration that reports
//!   [`MapError::IterationInvalidated`] instead of yielding stale entries.

#![warn(missing_docs)]

mod cursor;
mod error;
mod map;

pub use cursor::Cursor;
pub use error::MapError;
pub use map::{Drain, IntMap, Iter, MIN_BUCKETS};
