//! Long-lived callback targets registered with
//! [`CorrelationRegistry::register_receiver`](crate::CorrelationRegistry::register_receiver).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::CorrelationId;

/// Object that may receive any number of deliveries under one correlation id.
///
/// The registry only stores and returns receivers; invoking [`CallbackTarget::deliver`] is up to
/// the transport (or [`CorrelationRegistry::route`](crate::CorrelationRegistry::route)), which
/// calls it with no registry lock held.
pub trait CallbackTarget<T>: Send + Sync {
	/// Records the id assigned at registration so the receiver can identify itself in later
	/// protocol messages.
	fn bind(&self, id: CorrelationId);

	/// Handles one delivery. May be called concurrently if the transport does so.
	fn deliver(&self, payload: T);
}

/// Atomic cell for a receiver's bound id, for use inside [`CallbackTarget::bind`].
#[derive(Debug, Default)]
pub struct BoundId(AtomicU64);

impl BoundId {
	/// Creates an unbound cell.
	pub const fn new() -> Self {
		Self(AtomicU64::new(0))
	}

	/// Stores `id`.
	pub fn set(&self, id: CorrelationId) {
		self.0.store(id.get(), Ordering::Release);
	}

	/// Returns the bound id, or `None` before [`CallbackTarget::bind`] ran.
	pub fn get(&self) -> Option<CorrelationId> {
		let id = CorrelationId::from_raw(self.0.load(Ordering::Acquire));
		(!id.is_none()).then_some(id)
	}
}
