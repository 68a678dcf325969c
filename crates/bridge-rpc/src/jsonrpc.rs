//! JSON-RPC 2.0 envelope over HTTPS, posting raw envelopes with `reqwest`
//! instead of going through a full node-provider stack; dispatch, caching,
//! and failover across endpoints is this crate's job, not a node SDK's.

use bridge_types::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
	pub jsonrpc: &'static str,
	pub id: u64,
	pub method: &'a str,
	pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
	#[allow(dead_code)]
	pub jsonrpc: Option<String>,
	pub id: Option<u64>,
	pub result: Option<Value>,
	pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorObject {
	pub code: i64,
	pub message: String,
}

/// Posts a single JSON-RPC call against `url` and classifies the outcome per §4.1:
/// timeout, non-2xx/malformed body, or an RPC error object all surface as a
/// classified `RpcError` rather than panicking.
pub async fn call(
	client: &reqwest::Client,
	url: &str,
	method: &str,
	params: Value,
	timeout: std::time::Duration,
) -> Result<Value, RpcError> {
	let request = JsonRpcRequest {
		jsonrpc: "2.0",
		id: 1,
		method,
		params,
	};

	let response = client
		.post(url)
		.json(&request)
		.timeout(timeout)
		.send()
		.await
		.map_err(|e| {
			if e.is_timeout() {
				RpcError::Timeout
			} else {
				RpcError::BadResponse(e.to_string())
			}
		})?;

	if !response.status().is_success() {
		return Err(RpcError::BadResponse(format!(
			"http status {}",
			response.status()
		)));
	}

	let body: JsonRpcResponse = response
		.json()
		.await
		.map_err(|e| RpcError::BadResponse(e.to_string()))?;

	if let Some(err) = body.error {
		return Err(RpcError::Code {
			code: err.code,
			message: err.message,
		});
	}

	body.result
		.ok_or_else(|| RpcError::BadResponse("missing result field".into()))
}
