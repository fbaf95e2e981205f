use std::fmt;
use std::mem;

use crate::{Cursor, MapError};

/// Smallest bucket count a table is sized to.
pub const MIN_BUCKETS: usize = 7;

/// Scanned chain length past which an insert grows the table even with free capacity left.
const MAX_CHAIN: usize = 16;

/// One arena slot. Occupied slots are threaded through bucket chains, vacant ones through the
/// free list; both links are arena indices.
enum Slot<V> {
	Occupied { key: u64, next: Option<usize>, value: V },
	Vacant { next_free: Option<usize> },
}

/// Hash table from `u64` keys to `V` with an index-linked slot arena and free list.
///
/// Capacity only grows. Removed slots are recycled by later inserts before the arena is extended,
/// so the arena never holds more slots than the peak number of live entries.
pub struct IntMap<V> {
	buckets: Box<[Option<usize>]>,
	slots: Vec<Slot<V>>,
	free_head: Option<usize>,
	free_len: usize,
	/// Bumped on every structural change; checked by [`Cursor`].
	version: u64,
}

impl<V> Default for IntMap<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> IntMap<V> {
	/// Creates an empty map sized to the minimum bucket count.
	pub fn new() -> Self {
		Self::with_capacity(0)
	}

	/// Creates an empty map able to hold `capacity` entries before growing.
	pub fn with_capacity(capacity: usize) -> Self {
		let buckets = odd_at_least(capacity);
		Self {
			buckets: vec![None; buckets].into_boxed_slice(),
			slots: Vec::with_capacity(buckets),
			free_head: None,
			free_len: 0,
			version: 0,
		}
	}

	/// Number of live entries.
	pub fn count(&self) -> usize {
		self.slots.len() - self.free_len
	}

	/// Alias of [`Self::count`].
	pub fn len(&self) -> usize {
		self.count()
	}

	/// Returns `true` when no entries are live.
	pub fn is_empty(&self) -> bool {
		self.count() == 0
	}

	/// Number of entries the map holds before the next capacity-triggered grow.
	pub fn capacity(&self) -> usize {
		self.buckets.len()
	}

	/// Number of arena slots ever handed out, live and free. This is the high-water mark of
	/// concurrently live entries.
	pub fn allocated(&self) -> usize {
		self.slots.len()
	}

	/// Inserts `value` under a key that must not be present yet.
	///
	/// # Errors
	///
	/// Returns [`MapError::DuplicateKey`] and leaves the map untouched if `key` is already live.
	pub fn insert_new(&mut self, key: u64, value: V) -> Result<(), MapError> {
		let (found, scanned) = self.probe(key);
		if found.is_some() {
			return Err(MapError::DuplicateKey { key });
		}
		self.push_entry(key, value, scanned);
		Ok(())
	}

	/// Inserts or overwrites, returning the previous value when one was replaced.
	pub fn set(&mut self, key: u64, value: V) -> Option<V> {
		let (found, scanned) = self.probe(key);
		match found {
			Some(idx) => Some(mem::replace(self.value_mut(idx), value)),
			None => {
				self.push_entry(key, value, scanned);
				None
			}
		}
	}

	/// Returns a reference to the value stored under `key`.
	pub fn get(&self, key: u64) -> Option<&V> {
		let idx = self.probe(key).0?;
		match &self.slots[idx] {
			Slot::Occupied { value, .. } => Some(value),
			Slot::Vacant { .. } => None,
		}
	}

	/// Returns a mutable reference to the value stored under `key`.
	pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
		let idx = self.probe(key).0?;
		Some(self.value_mut(idx))
	}

	/// Returns `true` if `key` is live.
	pub fn contains_key(&self, key: u64) -> bool {
		self.probe(key).0.is_some()
	}

	/// Removes `key` and hands back its value. Unknown keys yield `None`.
	pub fn remove(&mut self, key: u64) -> Option<V> {
		let bucket = bucket_of(key, self.buckets.len());
		let mut prev = None;
		let mut cursor = self.buckets[bucket];

		while let Some(idx) = cursor {
			let (slot_key, next) = self.link(idx);
			if slot_key != key {
				prev = Some(idx);
				cursor = next;
				continue;
			}

			match prev {
				None => self.buckets[bucket] = next,
				Some(p) => {
					if let Slot::Occupied { next: link, .. } = &mut self.slots[p] {
						*link = next;
					}
				}
			}

			let slot = mem::replace(&mut self.slots[idx], Slot::Vacant { next_free: self.free_head });
			self.free_head = Some(idx);
			self.free_len += 1;
			self.bump();
			return match slot {
				Slot::Occupied { value, .. } => Some(value),
				Slot::Vacant { .. } => None,
			};
		}
		None
	}

	/// Removes every entry. Bucket capacity is kept.
	pub fn clear(&mut self) {
		self.buckets.fill(None);
		self.slots.clear();
		self.free_head = None;
		self.free_len = 0;
		self.bump();
	}

	/// Removes every entry, yielding them in arena order. Bucket capacity is kept.
	pub fn drain(&mut self) -> Drain<V> {
		let slots = mem::replace(&mut self.slots, Vec::with_capacity(self.buckets.len()));
		let remaining = slots.len() - self.free_len;
		self.buckets.fill(None);
		self.free_head = None;
		self.free_len = 0;
		self.bump();
		Drain {
			inner: slots.into_iter(),
			remaining,
		}
	}

	/// Iterates live `(key, &value)` pairs in arena order.
	///
	/// Mutation while the iterator is alive is rejected at compile time; use [`Self::cursor`] to
	/// enumerate across points where the map may be mutated.
	pub fn iter(&self) -> Iter<'_, V> {
		Iter {
			inner: self.slots.iter(),
			remaining: self.count(),
		}
	}

	/// Iterates live keys in arena order.
	pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
		self.iter().map(|(key, _)| key)
	}

	/// Starts a detached enumeration that fails once the map is structurally modified.
	pub fn cursor(&self) -> Cursor {
		Cursor::new(self.version)
	}

	pub(crate) fn version(&self) -> u64 {
		self.version
	}

	/// First live entry at or after arena index `from`.
	pub(crate) fn next_occupied(&self, from: usize) -> Option<(usize, u64, &V)> {
		self.slots.get(from..)?.iter().enumerate().find_map(|(offset, slot)| match slot {
			Slot::Occupied { key, value, .. } => Some((from + offset, *key, value)),
			Slot::Vacant { .. } => None,
		})
	}

	/// Walks the chain for `key`, returning the matching slot and how many slots were scanned.
	fn probe(&self, key: u64) -> (Option<usize>, usize) {
		let mut cursor = self.buckets[bucket_of(key, self.buckets.len())];
		let mut scanned = 0;
		while let Some(idx) = cursor {
			let (slot_key, next) = self.link(idx);
			if slot_key == key {
				return (Some(idx), scanned);
			}
			scanned += 1;
			cursor = next;
		}
		(None, scanned)
	}

	fn link(&self, idx: usize) -> (u64, Option<usize>) {
		match &self.slots[idx] {
			Slot::Occupied { key, next, .. } => (*key, *next),
			Slot::Vacant { .. } => unreachable!("bucket chain reached vacant slot {idx}"),
		}
	}

	fn value_mut(&mut self, idx: usize) -> &mut V {
		match &mut self.slots[idx] {
			Slot::Occupied { value, .. } => value,
			Slot::Vacant { .. } => unreachable!("bucket chain reached vacant slot {idx}"),
		}
	}

	fn push_entry(&mut self, key: u64, value: V, scanned: usize) {
		let idx = match self.free_head {
			Some(idx) => {
				self.free_head = match &self.slots[idx] {
					Slot::Vacant { next_free } => *next_free,
					Slot::Occupied { .. } => unreachable!("free list reached occupied slot {idx}"),
				};
				self.free_len -= 1;
				idx
			}
			None => {
				if self.slots.len() == self.buckets.len() {
					self.resize(self.buckets.len() * 2 + 1);
				}
				self.slots.push(Slot::Vacant { next_free: None });
				self.slots.len() - 1
			}
		};

		let bucket = bucket_of(key, self.buckets.len());
		self.slots[idx] = Slot::Occupied {
			key,
			next: self.buckets[bucket],
			value,
		};
		self.buckets[bucket] = Some(idx);
		self.bump();

		if scanned > MAX_CHAIN {
			tracing::debug!(key, scanned, buckets = self.buckets.len(), "intmap.chain_overflow");
			let len = self.buckets.len();
			self.resize(len + len / 4);
		}
	}

	/// Rebuilds bucket chains over `len` buckets. Vacant slots and the free list are untouched.
	fn resize(&mut self, len: usize) {
		let len = odd_at_least(len);
		let mut buckets = vec![None; len].into_boxed_slice();
		for (idx, slot) in self.slots.iter_mut().enumerate() {
			if let Slot::Occupied { key, next, .. } = slot {
				let bucket = bucket_of(*key, len);
				*next = buckets[bucket];
				buckets[bucket] = Some(idx);
			}
		}
		self.buckets = buckets;
		self.slots.reserve_exact(len - self.slots.len());
		self.bump();
		tracing::trace!(buckets = len, live = self.count(), "intmap.grow");
	}

	fn bump(&mut self) {
		self.version = self.version.wrapping_add(1);
	}
}

impl<V: fmt::Debug> fmt::Debug for IntMap<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

impl<'a, V> IntoIterator for &'a IntMap<V> {
	type Item = (u64, &'a V);
	type IntoIter = Iter<'a, V>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Borrowing iterator over live entries, see [`IntMap::iter`].
pub struct Iter<'a, V> {
	inner: std::slice::Iter<'a, Slot<V>>,
	remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
	type Item = (u64, &'a V);

	fn next(&mut self) -> Option<Self::Item> {
		for slot in self.inner.by_ref() {
			if let Slot::Occupied { key, value, .. } = slot {
				self.remaining -= 1;
				return Some((*key, value));
			}
		}
		None
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// Owning iterator returned by [`IntMap::drain`].
pub struct Drain<V> {
	inner: std::vec::IntoIter<Slot<V>>,
	remaining: usize,
}

impl<V> Iterator for Drain<V> {
	type Item = (u64, V);

	fn next(&mut self) -> Option<Self::Item> {
		for slot in self.inner.by_ref() {
			if let Slot::Occupied { key, value, .. } = slot {
				self.remaining -= 1;
				return Some((key, value));
			}
		}
		None
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<V> ExactSizeIterator for Drain<V> {}

/// Masks off the sign bit and reduces modulo the (odd) bucket count. Correlation ids share their
/// low bit within a table, so an even modulus would leave half the buckets empty.
fn bucket_of(key: u64, buckets: usize) -> usize {
	((key & i64::MAX as u64) % buckets as u64) as usize
}

fn odd_at_least(n: usize) -> usize {
	n.max(MIN_BUCKETS) | 1
}
