use std::sync::Arc;
use std::time::Duration;

use courier_worker::ManualTimer;
use parking_lot::Mutex;

use super::*;
use crate::{BoundId, Error, Routed};

#[derive(Default)]
struct Recorder {
	bound: BoundId,
	seen: Mutex<Vec<u32>>,
}

impl CallbackTarget<u32> for Recorder {
	fn bind(&self, id: CorrelationId) {
		self.bound.set(id);
	}

	fn deliver(&self, payload: u32) {
		self.seen.lock().push(payload);
	}
}

type Registry = CorrelationRegistry<u32, Recorder>;

fn manual(config: RegistryConfig) -> (Registry, Arc<ManualTimer>) {
	let timer = Arc::new(ManualTimer::new());
	(Registry::with_timer(config, timer.clone()), timer)
}

const MS: Duration = Duration::from_millis(1);

#[test]
fn resolve_delivers_once() {
	let (reg, _timer) = manual(RegistryConfig::default());
	let (id, mut handle) = reg.create_pending(None);
	assert_eq!(id.kind(), EntryKind::PendingResult);
	assert_eq!(handle.id(), id);
	assert_eq!(reg.pending_count(), 1);

	assert!(reg.resolve_pending(id, 7));
	assert!(!reg.resolve_pending(id, 8), "second resolve must report not found");
	assert_eq!(handle.try_settlement(), Some(Settlement::Resolved(7)));
	assert_eq!(reg.pending_count(), 0);
}

#[test]
fn resolve_unknown_id_is_not_found() {
	let (reg, _timer) = manual(RegistryConfig::default());
	assert!(!reg.resolve_pending(CorrelationId::from_raw(9_998), 1));
	assert!(!reg.resolve_pending(0u64, 1));
}

#[test]
fn timeout_settles_timed_out() {
	let (reg, timer) = manual(RegistryConfig::default());
	let (id, mut handle) = reg.create_pending(Some(50 * MS));

	assert_eq!(timer.advance(49 * MS), 0);
	assert_eq!(handle.try_settlement(), None);

	assert_eq!(timer.advance(MS), 1);
	assert_eq!(handle.try_settlement(), Some(Settlement::TimedOut));
	assert_eq!(reg.pending_count(), 0);
	assert!(!reg.resolve_pending(id, 1), "late reply must be discarded");
}

#[test]
fn early_reply_cancels_timeout() {
	let (reg, timer) = manual(RegistryConfig::default());
	let (id, mut handle) = reg.create_pending(Some(50 * MS));

	timer.advance(10 * MS);
	assert!(reg.resolve_pending(id, 42));
	assert_eq!(timer.pending(), 0, "guard should be cancelled by the reply");
	assert_eq!(timer.advance(100 * MS), 0);
	assert_eq!(handle.try_settlement(), Some(Settlement::Resolved(42)));
}

#[test]
fn config_default_timeout_applies_without_explicit_one() {
	let (reg, timer) = manual(RegistryConfig::new().default_timeout(20 * MS));
	let (_, mut defaulted) = reg.create_pending(None);
	let (_, mut explicit) = reg.create_pending(Some(100 * MS));

	timer.advance(20 * MS);
	assert_eq!(defaulted.try_settlement(), Some(Settlement::TimedOut));
	assert_eq!(explicit.try_settlement(), None);
	timer.advance(80 * MS);
	assert_eq!(explicit.try_settlement(), Some(Settlement::TimedOut));
}

#[test]
fn without_timeout_entry_waits_forever() {
	let (reg, timer) = manual(RegistryConfig::default());
	let (_, mut handle) = reg.create_pending(None);
	assert_eq!(timer.pending(), 0);
	timer.advance(Duration::from_secs(3_600));
	assert_eq!(handle.try_settlement(), None);
	assert_eq!(reg.pending_count(), 1);
}

#[test]
fn cancel_pending_wins_over_later_timeout() {
	let (reg, timer) = manual(RegistryConfig::default());
	let (id, mut handle) = reg.create_pending(Some(5 * MS));
	assert!(reg.cancel_pending(id));
	assert!(!reg.cancel_pending(id));
	assert_eq!(timer.advance(10 * MS), 0);
	assert_eq!(handle.try_settlement(), Some(Settlement::Cancelled));
}

#[test]
fn cancel_all_pending_settles_everything() {
	let (reg, timer) = manual(RegistryConfig::default());
	let mut handles: Vec<_> = (0..5).map(|_| reg.create_pending(Some(MS)).1).collect();
	assert_eq!(reg.cancel_all_pending(), 5);
	assert_eq!(reg.pending_count(), 0);
	assert_eq!(timer.advance(MS), 0);
	for handle in &mut handles {
		assert_eq!(handle.try_settlement(), Some(Settlement::Cancelled));
	}
}

#[test]
fn dropping_registry_cancels_waiters() {
	let (reg, timer) = manual(RegistryConfig::default());
	let (_, mut handle) = reg.create_pending(Some(10 * MS));
	drop(reg);
	assert_eq!(handle.try_settlement(), Some(Settlement::Cancelled));
	assert_eq!(timer.advance(10 * MS), 0);
}

#[test]
fn expiry_after_registry_drop_is_harmless() {
	let timer = Arc::new(ManualTimer::new());
	let reg = Registry::with_timer(RegistryConfig::default(), timer.clone());
	let (_, handle) = reg.create_pending(Some(MS));
	// Leak the guard's cancellation so the action is still queued when the registry is gone.
	let leaked = reg.inner.pending.lock().get_mut(handle.id().get()).and_then(|slot| slot.guard.take());
	std::mem::forget(leaked);
	drop(reg);

	assert_eq!(timer.advance(MS), 1, "orphaned expiry still runs");
	assert_eq!(timer.pending(), 0);
}

#[test]
fn receiver_lifecycle() {
	let (reg, _timer) = manual(RegistryConfig::default());
	let receiver = Arc::new(Recorder::default());
	let id = reg.register_receiver(Arc::clone(&receiver));

	assert_eq!(id.kind(), EntryKind::Receiver);
	assert_eq!(Registry::kind_of(id.get()), EntryKind::Receiver);
	assert_eq!(receiver.bound.get(), Some(id));
	assert_eq!(reg.receiver_count(), 1);
	assert!(reg.receiver(id).is_some_and(|r| Arc::ptr_eq(&r, &receiver)));

	let removed = reg.unregister_receiver(id).expect("registered");
	assert!(Arc::ptr_eq(&removed, &receiver));
	assert!(reg.unregister_receiver(id).is_none());
	assert!(reg.receiver(id).is_none());
	assert_eq!(reg.receiver_count(), 0);
}

#[test]
fn ids_never_collide_across_tables() {
	let (reg, _timer) = manual(RegistryConfig::default());
	let pending = reg.create_pending(None).0;
	let receiver = reg.register_receiver(Arc::new(Recorder::default()));
	let next = reg.create_pending(None).0;
	assert!(pending < receiver && receiver < next);
	assert!(reg.receiver(pending).is_none());
	assert!(!reg.resolve_pending(receiver, 0));
	assert!(reg.unregister_receiver(next).is_none());
}

#[test]
fn route_dispatches_by_kind() {
	let (reg, _timer) = manual(RegistryConfig::default());
	let (pending, mut handle) = reg.create_pending(None);
	let receiver = Arc::new(Recorder::default());
	let rid = reg.register_receiver(Arc::clone(&receiver));

	assert_eq!(reg.route(pending, 1), Routed::Resolved);
	assert_eq!(reg.route(pending, 2), Routed::Unknown(EntryKind::PendingResult));
	assert_eq!(reg.route(rid, 3), Routed::Delivered);
	assert_eq!(reg.route(rid.get(), 4), Routed::Delivered);

	reg.unregister_receiver(rid);
	assert_eq!(reg.route(rid, 5), Routed::Unknown(EntryKind::Receiver));

	assert_eq!(handle.try_settlement(), Some(Settlement::Resolved(1)));
	assert_eq!(*receiver.seen.lock(), vec![3, 4]);
}

#[test]
fn strict_helpers_report_protocol_errors() {
	let (reg, _timer) = manual(RegistryConfig::default());
	let (pending, _handle) = reg.create_pending(None);
	let rid = reg.register_receiver(Arc::new(Recorder::default()));

	assert_eq!(
		reg.try_resolve(rid, 1),
		Err(Error::WrongKind {
			id: rid,
			expected: EntryKind::PendingResult,
			actual: EntryKind::Receiver,
		})
	);
	assert_eq!(
		reg.deliver(pending, 1),
		Err(Error::WrongKind {
			id: pending,
			expected: EntryKind::Receiver,
			actual: EntryKind::PendingResult,
		})
	);
	assert_eq!(reg.deliver(rid, 1), Ok(()));
	assert_eq!(reg.try_resolve(pending, 1), Ok(()));
	assert_eq!(reg.try_resolve(pending, 1), Err(Error::UnknownCorrelation(pending)));
	reg.unregister_receiver(rid);
	assert_eq!(reg.deliver(rid, 1), Err(Error::UnknownCorrelation(rid)));
}

#[test]
fn trait_object_receivers() {
	let timer = Arc::new(ManualTimer::new());
	let reg: CorrelationRegistry<u32> = CorrelationRegistry::with_timer(RegistryConfig::default(), timer);
	let concrete = Arc::new(Recorder::default());
	let id = reg.register_receiver(concrete.clone());
	assert_eq!(reg.route(id, 11), Routed::Delivered);
	assert_eq!(*concrete.seen.lock(), vec![11]);
}

#[test]
fn initial_capacity_presizes_tables() {
	let (reg, _timer) = manual(RegistryConfig::new().initial_capacity(300));
	assert_eq!(reg.config().initial_capacity, 300);
	assert!(reg.inner.pending.lock().capacity() >= 300);
	assert!(reg.inner.receivers.lock().capacity() >= 300);
}

#[test]
fn clones_share_state() {
	let (reg, _timer) = manual(RegistryConfig::default());
	let other = reg.clone();
	let (id, mut handle) = reg.create_pending(None);
	assert!(other.resolve_pending(id, 5));
	assert_eq!(handle.try_settlement(), Some(Settlement::Resolved(5)));
}
