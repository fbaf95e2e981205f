//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Tunables for a [`CorrelationRegistry`](crate::CorrelationRegistry).
///
/// Deserializes from e.g. `{ "default_timeout_ms": 30000, "initial_capacity": 256 }`; missing
/// fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
	/// Timeout applied when `create_pending` is called without one. `None` means such entries
	/// never expire.
	#[serde(rename = "default_timeout_ms", deserialize_with = "millis")]
	pub default_timeout: Option<Duration>,
	/// Pre-size hint for both tables.
	pub initial_capacity: usize,
}

impl RegistryConfig {
	/// Creates the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the fallback timeout for pending results.
	pub fn default_timeout(mut self, timeout: Duration) -> Self {
		self.default_timeout = Some(timeout);
		self
	}

	/// Set the table pre-size hint.
	pub fn initial_capacity(mut self, capacity: usize) -> Self {
		self.initial_capacity = capacity;
		self
	}
}

fn millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}
