//! Shared domain types, errors, and ids for the gasless cross-chain settlement bridge.
//!
//! Every other crate in the workspace depends on this one. It defines the
//! persisted data model, the stable error enumeration, the ULID-based id
//! scheme, and the configuration-validation and secret-handling framework.

/// HTTP-facing error shape for the API surface.
pub mod api;
/// Core data model: Quote, Settlement, UserTransaction, Reserve, PriceSample,
/// RpcEndpoint, AuditEntry, PriceData, ReserveHealth.
pub mod domain;
/// Stable error enumeration, folding into one top-level `BridgeError`.
pub mod error;
/// Monotonic ULID-based id generation.
pub mod ids;
/// Chain-facing primitive types (addresses, hashes, signatures).
pub mod primitives;
/// Base trait for self-registering implementations (storage/price/signer factories).
pub mod registry;
/// Zeroize-backed secret wrapper for signer key material.
pub mod secret_string;
/// Storage namespaces for the persisted maps.
pub mod storage_keys;
/// Utility functions for common type conversions and formatting.
pub mod utils;
/// Configuration validation framework (`Schema`/`Field`/`ConfigSchema`).
pub mod validation;

pub use api::{ApiError, ErrorResponse};
pub use domain::{
	AuditEntry, PriceData, PriceSample, Quote, QuoteStatus, Reserve, ReserveHealth, RpcEndpoint,
	Settlement, SettlementStatus, UserTransaction, UserTransactionStatus,
};
pub use error::{
	AdminError, BridgeError, ConfigError, PaymentError, PriceError, QuoteError, ReserveError,
	RpcError, SignerError, ValidationError,
};
pub use ids::BridgeId;
pub use primitives::{Address, ChainId, Signature, TransactionHash, TransactionReceipt};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage_keys::StorageKey;
pub use utils::current_timestamp;
pub use validation::{ConfigSchema, Field, FieldType, Schema};
