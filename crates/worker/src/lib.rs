//! Runtime plumbing shared by the correlation crates.
//!
//! * [`spawn`]: task spawning that works with or without an ambient Tokio runtime.
//! * [`Timer`]: the deferred-action facility, with [`TokioTimer`] as the production
//!   implementation and [`ManualTimer`] for deterministic tests.
//! * [`TimerHandle`]: cancellation handle for one scheduled action.

#![warn(missing_docs)]

mod manual;
mod spawn;
mod timer;
mod token;

pub use manual::ManualTimer;
pub use spawn::{global_handle, runtime_handle, spawn};
pub use timer::{Timer, TimerAction, TokioTimer};
pub use token::{TimerGuard, TimerHandle};
