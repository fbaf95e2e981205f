//! Inbound routing helpers for transports.

use tracing::{trace, warn};

use crate::{CallbackTarget, CorrelationId, CorrelationRegistry, EntryKind, Error, Result};

/// Where [`CorrelationRegistry::route`] sent an inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
	/// A pending result was settled.
	Resolved,
	/// A registered receiver was invoked.
	Delivered,
	/// No live entry matched; the payload was dropped.
	Unknown(EntryKind),
}

impl<T, R> CorrelationRegistry<T, R>
where
	T: Send + 'static,
	R: CallbackTarget<T> + ?Sized + 'static,
{
	/// Hands an inbound payload to whichever entry `id` names.
	///
	/// Pending ids are resolved (at most once); receiver ids are looked up and delivered to with
	/// no lock held. Unknown ids are a normal outcome since replies race with timeouts and
	/// unregistration.
	pub fn route(&self, id: impl Into<CorrelationId>, payload: T) -> Routed {
		let id = id.into();
		match id.kind() {
			EntryKind::PendingResult => {
				if self.resolve_pending(id, payload) {
					Routed::Resolved
				} else {
					Routed::Unknown(EntryKind::PendingResult)
				}
			}
			EntryKind::Receiver => match self.receiver(id) {
				Some(receiver) => {
					receiver.deliver(payload);
					trace!(id = id.get(), "registry.receiver.deliver");
					Routed::Delivered
				}
				None => {
					warn!(id = id.get(), "registry.receiver.unknown");
					Routed::Unknown(EntryKind::Receiver)
				}
			},
		}
	}

	/// Strict form of [`Self::resolve_pending`] for transports that treat stray replies as
	/// protocol errors.
	///
	/// # Errors
	///
	/// - [`Error::WrongKind`] if `id` is a receiver id.
	/// - [`Error::UnknownCorrelation`] if no pending result carries `id`.
	pub fn try_resolve(&self, id: impl Into<CorrelationId>, payload: T) -> Result<()> {
		let id = id.into();
		expect_kind(id, EntryKind::PendingResult)?;
		if self.resolve_pending(id, payload) {
			Ok(())
		} else {
			Err(Error::UnknownCorrelation(id))
		}
	}

	/// Delivers `payload` to the receiver registered under `id`.
	///
	/// # Errors
	///
	/// - [`Error::WrongKind`] if `id` is a pending-result id.
	/// - [`Error::UnknownCorrelation`] if no receiver carries `id`.
	pub fn deliver(&self, id: impl Into<CorrelationId>, payload: T) -> Result<()> {
		let id = id.into();
		expect_kind(id, EntryKind::Receiver)?;
		let receiver = self.receiver(id).ok_or(Error::UnknownCorrelation(id))?;
		receiver.deliver(payload);
		Ok(())
	}
}

fn expect_kind(id: CorrelationId, expected: EntryKind) -> Result<()> {
	let actual = id.kind();
	if actual == expected {
		Ok(())
	} else {
		Err(Error::WrongKind { id, expected, actual })
	}
}
