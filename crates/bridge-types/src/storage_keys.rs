//! Storage namespaces for the bridge's persisted maps.

/// Namespace for a stable, persisted map. Replaces string literals with a
/// strongly typed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	Quotes,
	Settlements,
	UserTransactions,
	ReserveState,
	AuditLog,
	RpcCacheMeta,
	Admins,
	Config,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Quotes => "quotes",
			StorageKey::Settlements => "settlements",
			StorageKey::UserTransactions => "user_transactions",
			StorageKey::ReserveState => "reserve_state",
			StorageKey::AuditLog => "audit_log",
			StorageKey::RpcCacheMeta => "rpc_cache_meta",
			StorageKey::Admins => "admins",
			StorageKey::Config => "config",
		}
	}

	/// All namespaces, for building per-namespace TTL configuration.
	pub fn all() -> [StorageKey; 8] {
		[
			StorageKey::Quotes,
			StorageKey::Settlements,
			StorageKey::UserTransactions,
			StorageKey::ReserveState,
			StorageKey::AuditLog,
			StorageKey::RpcCacheMeta,
			StorageKey::Admins,
			StorageKey::Config,
		]
	}
}

impl std::str::FromStr for StorageKey {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		StorageKey::all()
			.into_iter()
			.find(|k| k.as_str() == s)
			.ok_or_else(|| format!("unknown storage namespace: {}", s))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn as_str_matches_namespace_names() {
		assert_eq!(StorageKey::Quotes.as_str(), "quotes");
		assert_eq!(StorageKey::AuditLog.as_str(), "audit_log");
	}
}
