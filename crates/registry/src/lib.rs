//! Correlation registry for out-of-band replies.
//!
//! A caller dispatches work to some remote executor and later has to pair the reply, which
//! arrives on an arbitrary thread and in arbitrary order, with the request that caused it. The
//! [`CorrelationRegistry`] issues a 64-bit [`CorrelationId`] per outstanding entry and resolves it
//! back when the reply shows up:
//! * [`CorrelationRegistry::create_pending`]: one-shot reply slot, optionally expiring through a
//!   [`TimeoutGuard`].
//! * [`CorrelationRegistry::register_receiver`]: long-lived [`CallbackTarget`] that may be
//!   delivered to many times.
//! * [`CorrelationRegistry::route`]: classifies an inbound id with [`kind_of`] and hands the
//!   payload to the matching entry.
//!
//! Bit 0 of every id tells the two kinds apart, so a transport can pick the right table without
//! touching either lock.

#![warn(missing_docs)]

mod config;
mod guard;
pub mod id;
mod pending;
mod receiver;
mod registry;
mod route;

pub use config::RegistryConfig;
pub use courier_worker::{ManualTimer, Timer, TokioTimer};
pub use guard::TimeoutGuard;
pub use id::{CorrelationId, EntryKind, IdAllocator, kind_of};
pub use pending::{PendingResult, Settlement};
pub use receiver::{BoundId, CallbackTarget};
pub use registry::CorrelationRegistry;
pub use route::Routed;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Protocol-level failures surfaced by the strict delivery helpers.
///
/// Ordinary lookups report absence as `None`/`false` instead, since replies legitimately race
/// with local removal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// No live entry carries this id.
	#[error("unknown correlation id {0}")]
	UnknownCorrelation(CorrelationId),
	/// The id's discriminator bit names the other table.
	#[error("correlation id {id} is a {actual} id, expected {expected}")]
	WrongKind {
		/// The offending id.
		id: CorrelationId,
		/// The kind the operation requires.
		expected: EntryKind,
		/// The kind encoded in the id.
		actual: EntryKind,
	},
}
