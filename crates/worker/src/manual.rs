use std::time::Duration;

use parking_lot::Mutex;

use crate::{Timer, TimerAction, TimerHandle};

struct Scheduled {
	deadline: Duration,
	seq: u64,
	handle: TimerHandle,
	action: TimerAction,
}

#[derive(Default)]
struct ManualState {
	now: Duration,
	next_seq: u64,
	queue: Vec<Scheduled>,
}

/// [`Timer`] driven by explicit [`ManualTimer::advance`] calls instead of wall-clock time.
///
/// Actions run on the thread calling `advance`, in deadline order (ties in scheduling order),
/// with the internal lock released. Cancelled entries are discarded without running, both when
/// time advances and whenever a new action is scheduled.
#[derive(Default)]
pub struct ManualTimer {
	state: Mutex<ManualState>,
}

impl ManualTimer {
	/// Creates a timer at virtual time zero.
	pub fn new() -> Self {
		Self::default()
	}

	/// Current virtual time.
	pub fn now(&self) -> Duration {
		self.state.lock().now
	}

	/// Number of scheduled actions that have neither fired nor been cancelled.
	pub fn pending(&self) -> usize {
		self.state.lock().queue.iter().filter(|s| !s.handle.is_cancelled()).count()
	}

	/// Moves virtual time forward by `by`, running every action that falls due. Returns how many
	/// actions ran.
	pub fn advance(&self, by: Duration) -> usize {
		let target = {
			let mut state = self.state.lock();
			state.now += by;
			state.now
		};

		let mut fired = 0;
		while let Some(action) = self.pop_due(target) {
			action();
			fired += 1;
		}
		fired
	}

	fn pop_due(&self, target: Duration) -> Option<TimerAction> {
		let mut state = self.state.lock();
		state.queue.retain(|s| !s.handle.is_cancelled());
		let idx = state
			.queue
			.iter()
			.enumerate()
			.filter(|(_, s)| s.deadline <= target)
			.min_by_key(|(_, s)| (s.deadline, s.seq))
			.map(|(idx, _)| idx)?;
		Some(state.queue.swap_remove(idx).action)
	}
}

impl Timer for ManualTimer {
	fn schedule(&self, after: Duration, action: TimerAction) -> TimerHandle {
		let handle = TimerHandle::new();
		let mut state = self.state.lock();
		state.queue.retain(|s| !s.handle.is_cancelled());
		let seq = state.next_seq;
		state.next_seq += 1;
		let deadline = state.now + after;
		state.queue.push(Scheduled {
			deadline,
			seq,
			handle: handle.clone(),
			action,
		});
		handle
	}
}

impl std::fmt::Debug for ManualTimer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("ManualTimer")
			.field("now", &state.now)
			.field("queued", &state.queue.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> TimerAction) {
		let log = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&log);
		let make = move |n: u32| -> TimerAction {
			let sink = Arc::clone(&sink);
			Box::new(move || sink.lock().push(n))
		};
		(log, make)
	}

	#[test]
	fn fires_in_deadline_order() {
		let timer = ManualTimer::new();
		let (log, action) = recorder();
		timer.schedule(Duration::from_millis(30), action(3));
		timer.schedule(Duration::from_millis(10), action(1));
		timer.schedule(Duration::from_millis(20), action(2));

		assert_eq!(timer.advance(Duration::from_millis(15)), 1);
		assert_eq!(*log.lock(), vec![1]);
		assert_eq!(timer.advance(Duration::from_millis(100)), 2);
		assert_eq!(*log.lock(), vec![1, 2, 3]);
		assert_eq!(timer.pending(), 0);
	}

	#[test]
	fn cancelled_entries_are_skipped() {
		let timer = ManualTimer::new();
		let (log, action) = recorder();
		let handle = timer.schedule(Duration::from_millis(10), action(1));
		timer.schedule(Duration::from_millis(10), action(2));
		handle.cancel();

		assert_eq!(timer.pending(), 1);
		assert_eq!(timer.advance(Duration::from_millis(10)), 1);
		assert_eq!(*log.lock(), vec![2]);
	}

	#[test]
	fn actions_may_schedule_more_work() {
		let timer = Arc::new(ManualTimer::new());
		let (log, action) = recorder();
		let inner = Arc::clone(&timer);
		let follow_up = action(2);
		timer.schedule(
			Duration::from_millis(5),
			Box::new(move || {
				inner.schedule(Duration::ZERO, follow_up);
			}),
		);
		timer.schedule(Duration::from_millis(5), action(1));

		assert_eq!(timer.advance(Duration::from_millis(5)), 3);
		assert_eq!(*log.lock(), vec![1, 2]);
	}

	#[test]
	fn scheduling_prunes_cancelled_entries() {
		let timer = ManualTimer::new();
		let (_log, action) = recorder();
		for n in 0..100 {
			timer.schedule(Duration::from_secs(1), action(n)).cancel();
		}
		timer.schedule(Duration::from_secs(1), action(100));

		assert_eq!(timer.state.lock().queue.len(), 1);
		assert_eq!(timer.pending(), 1);
	}
}
