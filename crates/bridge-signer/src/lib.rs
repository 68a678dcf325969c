//! Threshold signer oracle interface. The oracle interface is intentionally
//! narrow (`public_key`, `ethereum_address`, `sign`) since a production
//! deployment would back it with a host threshold-ECDSA subsystem; this
//! crate ships one concrete implementation, a deterministic `k256`-backed
//! local signer, as the stand-in for that subsystem, wrapped in a thin
//! service layer.

use async_trait::async_trait;
use bridge_types::{Address, SignerError};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

pub mod implementations {
	pub mod local;
}

pub type SignerFactory = fn(&toml::Value) -> Result<Box<dyn SignerInterface>, SignerError>;

pub trait SignerRegistry: bridge_types::ImplementationRegistry<Factory = SignerFactory> {}

/// Registered signer providers, following the same factory-map pattern as
/// `bridge-storage`/`bridge-price`. Only the local deterministic signer
/// ships today; a host threshold-ECDSA provider would register here too.
pub fn get_all_implementations() -> Vec<(&'static str, SignerFactory)> {
	use bridge_types::ImplementationRegistry;
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Oracle interface for the threshold signer, per §4.8: address discovery
/// plus a single `sign` operation over a prehashed digest, with low-s
/// normalization applied by the implementation.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// The uncompressed SEC1 public key backing this signer.
	fn public_key(&self) -> Vec<u8>;

	/// The Ethereum address derived from `public_key` (last 20 bytes of the
	/// Keccak256 hash of the uncompressed public key, minus the 0x04 prefix).
	fn ethereum_address(&self) -> Address;

	/// Signs a 32-byte digest and returns a low-s normalized signature with
	/// its recovery id.
	async fn sign(&self, digest: [u8; 32]) -> Result<bridge_types::Signature, SignerError>;
}

pub struct SignerService {
	implementation: Box<dyn SignerInterface>,
}

impl SignerService {
	pub fn new(implementation: Box<dyn SignerInterface>) -> Self {
		Self { implementation }
	}

	pub fn ethereum_address(&self) -> Address {
		self.implementation.ethereum_address()
	}

	pub fn public_key(&self) -> Vec<u8> {
		self.implementation.public_key()
	}

	pub async fn sign(&self, digest: [u8; 32]) -> Result<bridge_types::Signature, SignerError> {
		self.implementation.sign(digest).await
	}
}

/// Derives the Ethereum address for a SEC1-encoded verifying key, shared by
/// every signer implementation.
pub(crate) fn address_from_verifying_key(key: &VerifyingKey) -> Address {
	let encoded = key.to_encoded_point(false);
	let bytes = encoded.as_bytes();
	// Drop the leading 0x04 uncompressed-point tag before hashing.
	let hash = Keccak256::digest(&bytes[1..]);
	Address::from_slice(&hash[12..])
}

/// Signs a digest with `signing_key`, normalizing to low-s per EIP-2 and
/// returning the recovery id alongside `(r, s)`.
pub(crate) fn sign_prehash(
	signing_key: &SigningKey,
	digest: [u8; 32],
) -> Result<([u8; 32], [u8; 32], u8), SignerError> {
	let (signature, recid): (K256Signature, RecoveryId) = signing_key
		.sign_prehash_recoverable(&digest)
		.map_err(|_| SignerError::Rejected)?;

	let signature = signature.normalize_s().unwrap_or(signature);
	let bytes = signature.to_bytes();
	let mut r = [0u8; 32];
	let mut s = [0u8; 32];
	r.copy_from_slice(&bytes[..32]);
	s.copy_from_slice(&bytes[32..]);

	Ok((r, s, recid.to_byte()))
}

#[cfg(test)]
mod tests {
	use super::implementations::local::LocalSigner;
	use super::*;

	#[tokio::test]
	async fn signs_and_reports_a_stable_address() {
		let signer = LocalSigner::from_bytes([7u8; 32]).unwrap();
		let address_a = signer.ethereum_address();
		let signature = signer.sign([1u8; 32]).await.unwrap();
		let address_b = signer.ethereum_address();
		assert_eq!(address_a, address_b);
		assert_ne!(signature.r, [0u8; 32]);
	}

	#[tokio::test]
	async fn signing_is_deterministic() {
		let signer = LocalSigner::from_bytes([9u8; 32]).unwrap();
		let sig_a = signer.sign([2u8; 32]).await.unwrap();
		let sig_b = signer.sign([2u8; 32]).await.unwrap();
		assert_eq!(sig_a.r, sig_b.r);
		assert_eq!(sig_a.s, sig_b.s);
	}
}
