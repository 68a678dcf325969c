//! Deterministic local signer: a `k256`-backed `SigningKey` held in process
//! memory, standing in for a host threshold-ECDSA subsystem. Construction
//! accepts a raw 32-byte seed via `SecretString` so it slots into config
//! loading the same way any other provider does.

use async_trait::async_trait;
use bridge_types::{Address, ConfigSchema, SecretString, Signature, SignerError, ValidationError};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};

use crate::{address_from_verifying_key, sign_prehash, SignerInterface};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSignerConfig {
	/// Hex-encoded 32-byte private key, with or without a 0x prefix.
	pub private_key: String,
}

impl ConfigSchema for LocalSignerConfig {
	fn validate(&self, _config: &toml::value::Value) -> Result<(), ValidationError> {
		let trimmed = self.private_key.trim_start_matches("0x");
		if hex::decode(trimmed).map(|b| b.len()) != Ok(32) {
			return Err(ValidationError::InvalidValue {
				field: "private_key".to_string(),
				message: "must be a 32-byte hex string".to_string(),
			});
		}
		Ok(())
	}
}

pub struct LocalSigner {
	signing_key: SigningKey,
	address: Address,
}

impl LocalSigner {
	pub fn from_bytes(seed: [u8; 32]) -> Result<Self, SignerError> {
		let signing_key = SigningKey::from_bytes((&seed).into()).map_err(|_| SignerError::Rejected)?;
		let verifying_key = VerifyingKey::from(&signing_key);
		let address = address_from_verifying_key(&verifying_key);
		Ok(Self {
			signing_key,
			address,
		})
	}

	pub fn from_secret(secret: &SecretString) -> Result<Self, SignerError> {
		let trimmed = secret.expose_secret().trim_start_matches("0x").to_string();
		let bytes = hex::decode(trimmed).map_err(|_| SignerError::Rejected)?;
		let seed: [u8; 32] = bytes.try_into().map_err(|_| SignerError::Rejected)?;
		Self::from_bytes(seed)
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn public_key(&self) -> Vec<u8> {
		VerifyingKey::from(&self.signing_key)
			.to_encoded_point(false)
			.as_bytes()
			.to_vec()
	}

	fn ethereum_address(&self) -> Address {
		self.address
	}

	async fn sign(&self, digest: [u8; 32]) -> Result<Signature, SignerError> {
		let (r, s, recovery_id) = sign_prehash(&self.signing_key, digest)?;
		Ok(Signature { r, s, recovery_id })
	}
}

pub struct Registry;

impl bridge_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = fn(&toml::Value) -> Result<Box<dyn SignerInterface>, SignerError>;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn SignerInterface>, SignerError> {
			let parsed: LocalSignerConfig = config.clone().try_into().map_err(|_| SignerError::Rejected)?;
			let signer = LocalSigner::from_secret(&SecretString::new(parsed.private_key))?;
			Ok(Box::new(signer))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn config_rejects_malformed_private_key() {
		let config = LocalSignerConfig {
			private_key: "not-hex".to_string(),
		};
		assert!(config.validate(&toml::Value::from(0)).is_err());
	}

	#[test]
	fn config_accepts_32_byte_hex_key() {
		let config = LocalSignerConfig {
			private_key: format!("0x{}", hex::encode([7u8; 32])),
		};
		assert!(config.validate(&toml::Value::from(0)).is_ok());
	}
}
