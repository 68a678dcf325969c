//! Chain-facing primitive types shared by every bridge crate.

use serde::{Deserialize, Serialize};

/// A destination-chain account address. Re-exported from `alloy_primitives` so the
/// representation matches what the RLP encoder and signer operate on directly.
pub type Address = alloy_primitives::Address;

/// A chain id, e.g. `84532` for Base Sepolia.
pub type ChainId = u64;

/// A 32-byte keccak256 transaction hash, as returned by `eth_sendRawTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(#[serde(with = "hex_bytes32")] pub [u8; 32]);

impl TransactionHash {
	pub fn new(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}
}

impl std::fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

/// An ECDSA signature in the `(r, s, recovery_id)` form produced by the threshold
/// signer, already low-s normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
	#[serde(with = "hex_bytes32")]
	pub r: [u8; 32],
	#[serde(with = "hex_bytes32")]
	pub s: [u8; 32],
	pub recovery_id: u8,
}

impl Signature {
	/// The EIP-1559 `y_parity` value, equal to the recovery id (0 or 1).
	pub fn y_parity(&self) -> u8 {
		self.recovery_id
	}
}

/// A chain-observed transaction receipt, as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub transaction_hash: TransactionHash,
	pub block_number: u64,
	pub status: bool,
	pub gas_used: u64,
	pub effective_gas_price: u64,
}

mod hex_bytes32 {
	use serde::{de::Error, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		let trimmed = s.strip_prefix("0x").unwrap_or(&s);
		let decoded = hex::decode(trimmed).map_err(D::Error::custom)?;
		decoded
			.try_into()
			.map_err(|_| D::Error::custom("expected 32 bytes"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transaction_hash_round_trips_through_json() {
		let hash = TransactionHash::new([0x11; 32]);
		let json = serde_json::to_string(&hash).unwrap();
		let back: TransactionHash = serde_json::from_str(&json).unwrap();
		assert_eq!(hash, back);
	}

	#[test]
	fn transaction_hash_display_has_0x_prefix() {
		let hash = TransactionHash::new([0u8; 32]);
		assert!(hash.to_string().starts_with("0x"));
	}
}
