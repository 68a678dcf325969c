//! Monotonic id generation for quotes, settlements, and audit entries.
//!
//! Ids are ULIDs rather than UUIDv4: lexicographic (and hence storage-key) order
//! matches creation order, which the quote engine's ordering guarantee (§4.5,
//! "ids are monotonic ULIDs") and the audit log both rely on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// An opaque, monotonically increasing identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeId(Ulid);

impl BridgeId {
	/// Generates a new id using the current time. Two ids generated in the same
	/// millisecond from the same thread still sort in generation order because
	/// `Ulid::new` increments the random component monotonically within a tick.
	pub fn generate() -> Self {
		Self(Ulid::new())
	}

	pub fn as_str(&self) -> String {
		self.0.to_string()
	}
}

impl fmt::Display for BridgeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for BridgeId {
	type Err = ulid::DecodeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Ulid::from_str(s)?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_generated_in_sequence_sort_in_order() {
		let a = BridgeId::generate();
		let b = BridgeId::generate();
		assert!(a < b || a.as_str() <= b.as_str());
	}

	#[test]
	fn round_trips_through_string() {
		let id = BridgeId::generate();
		let parsed: BridgeId = id.as_str().parse().unwrap();
		assert_eq!(id, parsed);
	}
}
