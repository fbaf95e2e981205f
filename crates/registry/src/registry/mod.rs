use std::sync::{Arc, Weak};
use std::time::Duration;

use courier_intmap::IntMap;
use courier_worker::{Timer, TokioTimer};
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::pending::PendingSlot;
use crate::{CallbackTarget, CorrelationId, EntryKind, IdAllocator, PendingResult, RegistryConfig, Settlement, TimeoutGuard};

/// Thread-safe map from correlation ids to pending results and receivers.
///
/// Each kind has its own table behind its own lock; ids come from one lock-free counter. Locks
/// are held only for the table operation itself, never while a result is settled or a receiver
/// is invoked. Removal from a table is the serialization point: whichever of reply, timeout or
/// cancellation removes a pending entry first settles it, and everyone else sees "not found".
///
/// Cloning shares the same registry.
pub struct CorrelationRegistry<T, R: ?Sized = dyn CallbackTarget<T>> {
	inner: Arc<Shared<T, R>>,
}

struct Shared<T, R: ?Sized> {
	ids: IdAllocator,
	pending: Mutex<IntMap<PendingSlot<T>>>,
	receivers: Mutex<IntMap<Arc<R>>>,
	timer: Arc<dyn Timer>,
	config: RegistryConfig,
}

impl<T, R: ?Sized> Clone for CorrelationRegistry<T, R> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T, R> Default for CorrelationRegistry<T, R>
where
	T: Send + 'static,
	R: CallbackTarget<T> + ?Sized + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<T, R> CorrelationRegistry<T, R>
where
	T: Send + 'static,
	R: CallbackTarget<T> + ?Sized + 'static,
{
	/// Creates a registry with default configuration and [`TokioTimer::global`].
	pub fn new() -> Self {
		Self::with_config(RegistryConfig::default())
	}

	/// Creates a registry with `config` and [`TokioTimer::global`].
	///
	/// Expiry runs on the process-wide runtime, so deadlines still fire after the runtime that
	/// created an entry has shut down.
	pub fn with_config(config: RegistryConfig) -> Self {
		Self::with_timer(config, Arc::new(TokioTimer::global()))
	}

	/// Creates a registry that schedules expiry on `timer`.
	pub fn with_timer(config: RegistryConfig, timer: Arc<dyn Timer>) -> Self {
		Self {
			inner: Arc::new(Shared {
				ids: IdAllocator::new(),
				pending: Mutex::new(IntMap::with_capacity(config.initial_capacity)),
				receivers: Mutex::new(IntMap::with_capacity(config.initial_capacity)),
				timer,
				config,
			}),
		}
	}

	/// Classifies a raw id by its discriminator bit.
	pub const fn kind_of(raw: u64) -> EntryKind {
		EntryKind::of(raw)
	}

	/// The configuration this registry was built with.
	pub fn config(&self) -> &RegistryConfig {
		&self.inner.config
	}

	/// Opens a pending result and returns its id together with the caller's handle.
	///
	/// With a timeout (explicit, or [`RegistryConfig::default_timeout`] when `None` is passed) a
	/// [`TimeoutGuard`] is armed that settles the entry with [`Settlement::TimedOut`] unless a
	/// reply removes it first. Never blocks.
	pub fn create_pending(&self, timeout: Option<Duration>) -> (CorrelationId, PendingResult<T>) {
		let id = self.inner.ids.next(EntryKind::PendingResult);
		let (slot, handle) = PendingSlot::channel(id);
		insert_fresh(&self.inner.pending, id, slot);

		let timeout = timeout.or(self.inner.config.default_timeout);
		if let Some(after) = timeout {
			let weak = Arc::downgrade(&self.inner);
			let guard = TimeoutGuard::schedule(self.inner.timer.as_ref(), id, after, Box::new(move || expire(&weak, id)));
			// The guard may already have fired, in which case the entry is gone and the guard
			// is dropped here.
			if let Some(slot) = self.inner.pending.lock().get_mut(id.get()) {
				slot.guard = Some(guard);
			}
		}

		trace!(id = id.get(), timeout_ms = timeout.map(|t| t.as_millis() as u64), "registry.pending.create");
		(id, handle)
	}

	/// Settles a pending result with `payload`.
	///
	/// Returns false, discarding the payload, if the id is unknown, already resolved, cancelled,
	/// or timed out.
	pub fn resolve_pending(&self, id: impl Into<CorrelationId>, payload: T) -> bool {
		let id = id.into();
		match self.take_pending(id) {
			Some(slot) => {
				let delivered = slot.settle(Settlement::Resolved(payload));
				trace!(id = id.get(), delivered, "registry.pending.resolve");
				true
			}
			None => {
				debug!(id = id.get(), "registry.pending.unknown");
				false
			}
		}
	}

	/// Settles a pending result with [`Settlement::Cancelled`]. Returns false if it was no longer
	/// pending.
	pub fn cancel_pending(&self, id: impl Into<CorrelationId>) -> bool {
		let id = id.into();
		let Some(slot) = self.take_pending(id) else {
			return false;
		};
		slot.settle(Settlement::Cancelled);
		debug!(id = id.get(), "registry.pending.cancel");
		true
	}

	/// Cancels every pending result, returning how many were settled.
	pub fn cancel_all_pending(&self) -> usize {
		let slots: Vec<_> = self.inner.pending.lock().drain().collect();
		let count = slots.len();
		for (_, slot) in slots {
			slot.settle(Settlement::Cancelled);
		}
		if count > 0 {
			debug!(count, "registry.pending.cancel_all");
		}
		count
	}

	/// Number of unsettled pending results.
	pub fn pending_count(&self) -> usize {
		self.inner.pending.lock().count()
	}

	/// Registers `receiver`, binds the new id onto it and returns the id.
	pub fn register_receiver(&self, receiver: Arc<R>) -> CorrelationId {
		let id = self.inner.ids.next(EntryKind::Receiver);
		receiver.bind(id);
		insert_fresh(&self.inner.receivers, id, receiver);
		trace!(id = id.get(), "registry.receiver.register");
		id
	}

	/// Removes and returns a receiver. Later deliveries for `id` are unknown correlations.
	pub fn unregister_receiver(&self, id: impl Into<CorrelationId>) -> Option<Arc<R>> {
		let id = id.into();
		let removed = self.inner.receivers.lock().remove(id.get());
		trace!(id = id.get(), found = removed.is_some(), "registry.receiver.unregister");
		removed
	}

	/// Looks up a receiver without removing it.
	pub fn receiver(&self, id: impl Into<CorrelationId>) -> Option<Arc<R>> {
		self.inner.receivers.lock().get(id.into().get()).cloned()
	}

	/// Number of registered receivers.
	pub fn receiver_count(&self) -> usize {
		self.inner.receivers.lock().count()
	}

	fn take_pending(&self, id: CorrelationId) -> Option<PendingSlot<T>> {
		self.inner.pending.lock().remove(id.get())
	}
}

/// Timeout path: same remove-then-settle as a reply, so only one of them acts.
fn expire<T, R: ?Sized>(shared: &Weak<Shared<T, R>>, id: CorrelationId) {
	let Some(shared) = shared.upgrade() else {
		return;
	};
	let slot = shared.pending.lock().remove(id.get());
	if let Some(slot) = slot {
		debug!(id = id.get(), "registry.pending.timeout");
		slot.settle(Settlement::TimedOut);
	}
}

/// Inserts under an id just issued by the allocator. A collision means the allocator is broken.
fn insert_fresh<V>(table: &Mutex<IntMap<V>>, id: CorrelationId, value: V) {
	let result = table.lock().insert_new(id.get(), value);
	if let Err(err) = result {
		error!(id = id.get(), error = %err, "registry.allocator.reissued");
		panic!("correlation id {id} issued twice: {err}");
	}
}

impl<T, R: ?Sized> std::fmt::Debug for CorrelationRegistry<T, R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CorrelationRegistry")
			.field("issued", &self.inner.ids.issued())
			.field("pending", &self.inner.pending.lock().count())
			.field("receivers", &self.inner.receivers.lock().count())
			.finish()
	}
}

#[cfg(test)]
mod tests;
