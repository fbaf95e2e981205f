//! Correlation identifiers and their allocator.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Which table a correlation id belongs to, encoded in bit 0 of the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
	/// One-shot reply slot; bit 0 clear.
	PendingResult,
	/// Long-lived callback target; bit 0 set.
	Receiver,
}

impl EntryKind {
	/// The discriminator bit for this kind.
	pub const fn bit(self) -> u64 {
		match self {
			Self::PendingResult => 0,
			Self::Receiver => 1,
		}
	}

	/// Classifies a raw id by its low bit.
	pub const fn of(raw: u64) -> Self {
		if raw & 1 == 0 { Self::PendingResult } else { Self::Receiver }
	}

	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::PendingResult => "pending",
			Self::Receiver => "receiver",
		}
	}
}

impl fmt::Display for EntryKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Classifies a raw id as carried on the wire. Pure function of bit 0.
pub const fn kind_of(raw: u64) -> EntryKind {
	EntryKind::of(raw)
}

/// 64-bit correlation identifier: bit 0 is the [`EntryKind`], bits 1..63 a sequence number.
///
/// Serializes as the bare integer so ids round-trip through protocol messages unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
	/// The "no correlation" sentinel. Never issued by an [`IdAllocator`].
	pub const NONE: Self = Self(0);

	/// Wraps a raw id received from a peer.
	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// Raw id for the wire.
	pub const fn get(self) -> u64 {
		self.0
	}

	/// Entry kind encoded in bit 0.
	pub const fn kind(self) -> EntryKind {
		EntryKind::of(self.0)
	}

	/// Sequence number without the discriminator bit.
	pub const fn sequence(self) -> u64 {
		self.0 >> 1
	}

	/// Returns true for [`Self::NONE`].
	pub const fn is_none(self) -> bool {
		self.0 == 0
	}
}

impl From<u64> for CorrelationId {
	fn from(raw: u64) -> Self {
		Self(raw)
	}
}

impl From<CorrelationId> for u64 {
	fn from(id: CorrelationId) -> Self {
		id.0
	}
}

impl fmt::Display for CorrelationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Lock-free source of strictly increasing correlation ids.
///
/// Both kinds draw from one counter, so ids are unique across tables. Sequence numbers start at 1,
/// so the very first id is 2 or 3 depending on its kind and 0 stays free as a sentinel.
#[derive(Debug, Default)]
pub struct IdAllocator {
	last: AtomicU64,
}

impl IdAllocator {
	/// Creates an allocator that has issued nothing.
	pub const fn new() -> Self {
		Self { last: AtomicU64::new(0) }
	}

	/// Issues the next id tagged with `kind`.
	#[allow(clippy::should_implement_trait, reason = "takes the kind to tag; not an Iterator")]
	pub fn next(&self, kind: EntryKind) -> CorrelationId {
		let seq = self.last.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
		CorrelationId((seq << 1) | kind.bit())
	}

	/// Number of ids issued so far.
	pub fn issued(&self) -> u64 {
		self.last.load(Ordering::Acquire)
	}
}
