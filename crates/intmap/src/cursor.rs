use crate::{IntMap, MapError};

/// Detached enumeration over an [`IntMap`].
///
/// Unlike [`IntMap::iter`] a cursor does not borrow the map between steps, so it can be advanced
/// across lock releases. Any insert of a new key, removal, grow, or clear since the cursor was
/// created makes the next step fail with [`MapError::IterationInvalidated`]. Overwriting an
/// existing key with [`IntMap::set`] is not a structural change.
#[derive(Debug, Clone)]
pub struct Cursor {
	version: u64,
	position: usize,
}

impl Cursor {
	pub(crate) fn new(version: u64) -> Self {
		Self { version, position: 0 }
	}

	/// Yields the next live entry, or `None` once the map is exhausted.
	///
	/// # Errors
	///
	/// [`MapError::IterationInvalidated`] if `map` changed structurally since [`IntMap::cursor`].
	#[allow(clippy::should_implement_trait, reason = "steps need the map passed in")]
	pub fn next<'a, V>(&mut self, map: &'a IntMap<V>) -> Result<Option<(u64, &'a V)>, MapError> {
		if map.version() != self.version {
			return Err(MapError::IterationInvalidated);
		}
		match map.next_occupied(self.position) {
			Some((idx, key, value)) => {
				self.position = idx + 1;
				Ok(Some((key, value)))
			}
			None => {
				self.position = map.allocated();
				Ok(None)
			}
		}
	}
}
