/// Failures reported by [`IntMap`](crate::IntMap) operations.
///
/// Both variants signal a caller bug rather than a runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum MapError {
	/// [`IntMap::insert_new`](crate::IntMap::insert_new) found the key already present.
	#[error("key {key} is already present")]
	DuplicateKey {
		/// The offending key.
		key: u64,
	},
	/// The map was structurally modified while a [`Cursor`](crate::Cursor) was enumerating it.
	#[error("map was modified during iteration")]
	IterationInvalidated,
}
