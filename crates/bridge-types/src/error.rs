//! Stable error enumeration, folded into one top-level `BridgeError` for the
//! API surface: per-component error types underneath, one dispatch-facing
//! error on top.

use crate::domain::{QuoteStatus, SettlementStatus};
use thiserror::Error;

/// Bad input at the API boundary: address format, amount range, unsupported chain.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
	#[error("invalid destination address: {0}")]
	InvalidAddress(String),
	#[error("amount {amount} out of range [{min}, {max}]")]
	AmountOutOfRange { amount: u64, min: u64, max: u64 },
	#[error("unsupported destination chain: {0}")]
	UnsupportedChain(String),
}

/// Errors from the Reserve Manager (C4, §4.4).
#[derive(Debug, Clone, Error)]
pub enum ReserveError {
	#[error("insufficient reserve: requested {requested}, available {available}")]
	Insufficient { requested: u64, available: u64 },
	#[error("reserve is paused")]
	Paused,
	#[error("daily limit exceeded: used {used} + {requested} > limit {limit}")]
	DailyLimitExceeded {
		used: u64,
		requested: u64,
		limit: u64,
	},
}

/// Errors from the Quote Engine (C5, §4.5).
#[derive(Debug, Clone, Error)]
pub enum QuoteError {
	#[error("quote not found: {0}")]
	NotFound(String),
	#[error("quote {0} expired")]
	Expired(String),
	#[error("quote {0} already settled")]
	AlreadySettled(String),
	#[error("quote {id} is not active (status {status:?})")]
	NotActive { id: String, status: QuoteStatus },
}

/// Errors from the Payment Verifier (C6, §4.6).
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
	#[error("payment proof not found: {0}")]
	NotFound(String),
	#[error("payment amount mismatch: paid {paid}, required {required}")]
	AmountMismatch { paid: u64, required: u64 },
	#[error("payment proof already used: {0}")]
	AlreadyUsed(String),
	#[error("payment not yet finalised: {0}")]
	NotFinal(String),
}

/// Errors from the RPC Client (C1, §4.1).
#[derive(Debug, Clone, Error)]
pub enum RpcError {
	#[error("request timed out")]
	Timeout,
	#[error("all endpoints down")]
	AllEndpointsDown,
	#[error("malformed response: {0}")]
	BadResponse(String),
	#[error("upstream revert: {0}")]
	UpstreamRevert(String),
	#[error("rpc error {code}: {message}")]
	Code { code: i64, message: String },
}

impl RpcError {
	/// C9 retries transient RPC errors; anything else is terminal (§7).
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			RpcError::Timeout
				| RpcError::AllEndpointsDown
				| RpcError::Code { code: -32005, .. }
		)
	}
}

/// Errors from the Threshold Signer (C8, §4.8).
#[derive(Debug, Clone, Error)]
pub enum SignerError {
	#[error("signer unavailable")]
	Unavailable,
	#[error("signing request rejected")]
	Rejected,
}

/// Errors from the Price Feed (C2, §4.2).
#[derive(Debug, Clone, Error)]
pub enum PriceError {
	#[error("no price available for {0}")]
	Unavailable(String),
	#[error("price for {0} is stale")]
	Stale(String),
}

/// Admin-only operation attempted by a non-admin caller (§4.4, §4.11).
#[derive(Debug, Clone, Error)]
pub enum AdminError {
	#[error("caller is not an admin")]
	NotAdmin,
}

/// Configuration load/validation failure (ambient, `BridgeConfig`).
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
	#[error("failed to read config file: {0}")]
	Io(String),
	#[error("failed to parse config: {0}")]
	Parse(String),
	#[error("config validation failed: {0}")]
	Validation(String),
}

/// The stable, top-level error enumeration from §7. Every component error
/// variant above folds into this for the API surface (C11).
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
	#[error(transparent)]
	Validation(#[from] ValidationError),
	#[error(transparent)]
	Reserve(#[from] ReserveError),
	#[error(transparent)]
	Quote(#[from] QuoteError),
	#[error(transparent)]
	Payment(#[from] PaymentError),
	#[error(transparent)]
	Rpc(#[from] RpcError),
	#[error(transparent)]
	Signer(#[from] SignerError),
	#[error(transparent)]
	Price(#[from] PriceError),
	#[error(transparent)]
	Admin(#[from] AdminError),
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error("settlement {id} is not in a state that allows this operation (status {status:?})")]
	SettlementNotPending {
		id: String,
		status: SettlementStatus,
	},
	#[error("internal error: {0}")]
	Internal(String),
}

impl BridgeError {
	/// Short, classified string for the user-visible error surface; details go
	/// to the audit log only (§7 propagation policy).
	pub fn error_code(&self) -> &'static str {
		match self {
			BridgeError::Validation(_) => "validation_error",
			BridgeError::Reserve(ReserveError::Insufficient { .. }) => "reserve_insufficient",
			BridgeError::Reserve(ReserveError::Paused) => "reserve_paused",
			BridgeError::Reserve(ReserveError::DailyLimitExceeded { .. }) => "daily_limit_exceeded",
			BridgeError::Quote(QuoteError::NotFound(_)) => "quote_not_found",
			BridgeError::Quote(QuoteError::Expired(_)) => "quote_expired",
			BridgeError::Quote(QuoteError::AlreadySettled(_)) => "quote_already_settled",
			BridgeError::Quote(QuoteError::NotActive { .. }) => "quote_not_active",
			BridgeError::Payment(PaymentError::NotFound(_)) => "payment_not_found",
			BridgeError::Payment(PaymentError::AmountMismatch { .. }) => "payment_amount_mismatch",
			BridgeError::Payment(PaymentError::AlreadyUsed(_)) => "payment_already_used",
			BridgeError::Payment(PaymentError::NotFinal(_)) => "payment_not_final",
			BridgeError::Rpc(RpcError::Timeout) => "rpc_timeout",
			BridgeError::Rpc(RpcError::AllEndpointsDown) => "rpc_all_endpoints_down",
			BridgeError::Rpc(RpcError::BadResponse(_)) => "rpc_bad_response",
			BridgeError::Rpc(RpcError::UpstreamRevert(_)) => "rpc_upstream_revert",
			BridgeError::Rpc(RpcError::Code { .. }) => "rpc_error",
			BridgeError::Signer(SignerError::Unavailable) => "signer_unavailable",
			BridgeError::Signer(SignerError::Rejected) => "signer_rejected",
			BridgeError::Price(PriceError::Unavailable(_)) => "price_unavailable",
			BridgeError::Price(PriceError::Stale(_)) => "price_stale",
			BridgeError::Admin(AdminError::NotAdmin) => "not_admin",
			BridgeError::Config(_) => "config_error",
			BridgeError::SettlementNotPending { .. } => "settlement_not_pending",
			BridgeError::Internal(_) => "internal_error",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rpc_timeout_is_transient() {
		assert!(RpcError::Timeout.is_transient());
	}

	#[test]
	fn rpc_bad_response_is_terminal() {
		assert!(!RpcError::BadResponse("malformed json".into()).is_transient());
	}

	#[test]
	fn error_code_maps_reserve_insufficient() {
		let err: BridgeError = ReserveError::Insufficient {
			requested: 10,
			available: 5,
		}
		.into();
		assert_eq!(err.error_code(), "reserve_insufficient");
	}
}
