//! EIP-1559 transaction builder: encodes the typed-transaction envelope,
//! computes the Keccak256 signing preimage, and reassembles the signed
//! transaction with `(v, r, s)`. Encoded directly with
//! `alloy-rlp`/`alloy-primitives`/`sha3` since the RPC client, not this
//! crate, owns the actual broadcast.

use alloy_primitives::{Address, Bytes, U256};
use alloy_rlp::{BufMut, Encodable, Header};
use bridge_types::{Signature, TransactionHash};
use sha3::{Digest, Keccak256};

const EIP1559_TX_TYPE: u8 = 0x02;

/// The fields of one dynamic-fee transaction, prior to signing.
#[derive(Debug, Clone)]
pub struct Eip1559Transaction {
	pub chain_id: u64,
	pub nonce: u64,
	pub max_priority_fee_per_gas: u128,
	pub max_fee_per_gas: u128,
	pub gas_limit: u64,
	pub to: Address,
	pub value: U256,
	pub data: Bytes,
}

impl Eip1559Transaction {
	/// RLP-encodes the 9 unsigned fields (with an empty access list) and
	/// prefixes the EIP-2718 type byte, per EIP-1559 §"Transaction Signature".
	fn encode_unsigned(&self) -> Vec<u8> {
		let mut payload = Vec::new();
		self.chain_id.encode(&mut payload);
		self.nonce.encode(&mut payload);
		self.max_priority_fee_per_gas.encode(&mut payload);
		self.max_fee_per_gas.encode(&mut payload);
		self.gas_limit.encode(&mut payload);
		self.to.encode(&mut payload);
		self.value.encode(&mut payload);
		self.data.encode(&mut payload);
		payload.put_u8(0xc0); // empty access list

		let mut out = vec![EIP1559_TX_TYPE];
		Header {
			list: true,
			payload_length: payload.len(),
		}
		.encode(&mut out);
		out.extend_from_slice(&payload);
		out
	}

	/// The 32-byte digest the signer must sign: Keccak256 of the unsigned
	/// envelope.
	pub fn signing_preimage(&self) -> [u8; 32] {
		Keccak256::digest(self.encode_unsigned()).into()
	}

	/// Reassembles the signed transaction: unsigned fields plus
	/// `(y_parity, r, s)`, and derives the final transaction hash from the
	/// resulting bytes.
	pub fn finalize(&self, signature: Signature) -> (Vec<u8>, TransactionHash) {
		let mut payload = Vec::new();
		self.chain_id.encode(&mut payload);
		self.nonce.encode(&mut payload);
		self.max_priority_fee_per_gas.encode(&mut payload);
		self.max_fee_per_gas.encode(&mut payload);
		self.gas_limit.encode(&mut payload);
		self.to.encode(&mut payload);
		self.value.encode(&mut payload);
		self.data.encode(&mut payload);
		payload.put_u8(0xc0); // empty access list

		(signature.y_parity() as u64).encode(&mut payload);
		U256::from_be_bytes(signature.r).encode(&mut payload);
		U256::from_be_bytes(signature.s).encode(&mut payload);

		let mut out = vec![EIP1559_TX_TYPE];
		Header {
			list: true,
			payload_length: payload.len(),
		}
		.encode(&mut out);
		out.extend_from_slice(&payload);

		let hash: [u8; 32] = Keccak256::digest(&out).into();
		(out, TransactionHash::new(hash))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_tx() -> Eip1559Transaction {
		Eip1559Transaction {
			chain_id: 1,
			nonce: 0,
			max_priority_fee_per_gas: 1_000_000_000,
			max_fee_per_gas: 50_000_000_000,
			gas_limit: 21_000,
			to: Address::repeat_byte(0x11),
			value: U256::from(1_000_000_000_000_000_000u128),
			data: Bytes::new(),
		}
	}

	#[test]
	fn preimage_is_deterministic() {
		let tx = sample_tx();
		assert_eq!(tx.signing_preimage(), tx.signing_preimage());
	}

	#[test]
	fn different_nonces_produce_different_preimages() {
		let tx_a = sample_tx();
		let mut tx_b = sample_tx();
		tx_b.nonce = 1;
		assert_ne!(tx_a.signing_preimage(), tx_b.signing_preimage());
	}

	#[test]
	fn finalize_produces_a_type_2_envelope() {
		let tx = sample_tx();
		let signature = Signature {
			r: [1u8; 32],
			s: [2u8; 32],
			recovery_id: 0,
		};
		let (bytes, hash) = tx.finalize(signature);
		assert_eq!(bytes[0], EIP1559_TX_TYPE);
		assert_ne!(hash.as_bytes(), &[0u8; 32]);
	}
}
