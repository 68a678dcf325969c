//! Endpoint pool with health tracking, weighting, and cooldown, scoped to a
//! single chain's RPC endpoints.

use std::time::{Duration, Instant};

use bridge_types::RpcEndpoint as EndpointState;

const MIN_COOLDOWN: Duration = Duration::from_secs(1);
const MAX_COOLDOWN: Duration = Duration::from_secs(60);

/// One configured RPC endpoint plus its runtime health state. `EndpointState`
/// (from `bridge-types`) carries the serializable snapshot used in `stats()`;
/// the `Instant`-based cooldown lives here since wall-clock timestamps aren't
/// meaningful across process restarts.
pub struct Endpoint {
	pub url: String,
	pub weight: u32,
	healthy: bool,
	failure_count: u32,
	last_latency: Option<Duration>,
	cooldown_until: Option<Instant>,
}

impl Endpoint {
	pub fn new(url: String, weight: u32) -> Self {
		Self {
			url,
			weight,
			healthy: true,
			failure_count: 0,
			last_latency: None,
			cooldown_until: None,
		}
	}

	fn is_available(&self, now: Instant) -> bool {
		match self.cooldown_until {
			Some(until) => now >= until,
			None => true,
		}
	}

	fn record_success(&mut self, latency: Duration) {
		self.healthy = true;
		self.failure_count = 0;
		self.last_latency = Some(latency);
		self.cooldown_until = None;
	}

	fn record_failure(&mut self, now: Instant) {
		self.failure_count += 1;
		self.healthy = self.failure_count < 3;
		let backoff = MIN_COOLDOWN
			.saturating_mul(1 << self.failure_count.min(6))
			.min(MAX_COOLDOWN);
		self.cooldown_until = Some(now + backoff);
	}

	pub fn snapshot(&self) -> EndpointState {
		let mut state = EndpointState::new(self.url.clone(), self.weight);
		state.healthy = self.healthy;
		state.last_latency_ms = self.last_latency.map(|d| d.as_millis() as u64);
		state.failure_count = self.failure_count;
		state.cooldown_until = None;
		state
	}
}

/// Selects endpoints in order of (available, healthy, weight desc, latency asc)
/// and records the outcome of each attempt back onto the pool.
pub struct EndpointPool {
	endpoints: Vec<Endpoint>,
}

impl EndpointPool {
	pub fn new(urls: impl IntoIterator<Item = String>) -> Self {
		let mut endpoints: Vec<Endpoint> = urls
			.into_iter()
			.enumerate()
			.map(|(i, url)| {
				// First configured URL is the primary; weight it higher so ties
				// in health and latency still prefer it.
				let weight = if i == 0 { 100 } else { 50 };
				Endpoint::new(url, weight)
			})
			.collect();
		endpoints.sort_by(|a, b| b.weight.cmp(&a.weight));
		Self { endpoints }
	}

	/// Ordered list of endpoint indices to try this call, available ones first.
	fn candidate_order(&self, now: Instant) -> Vec<usize> {
		let mut indices: Vec<usize> = (0..self.endpoints.len()).collect();
		indices.sort_by(|&a, &b| {
			let ea = &self.endpoints[a];
			let eb = &self.endpoints[b];
			let avail_a = ea.is_available(now);
			let avail_b = eb.is_available(now);
			avail_b
				.cmp(&avail_a)
				.then(ea.healthy.cmp(&eb.healthy).reverse())
				.then(eb.weight.cmp(&ea.weight))
				.then(ea.last_latency.cmp(&eb.last_latency))
		});
		indices
	}

	pub fn len(&self) -> usize {
		self.endpoints.len()
	}

	pub fn is_empty(&self) -> bool {
		self.endpoints.is_empty()
	}

	pub fn url(&self, index: usize) -> &str {
		&self.endpoints[index].url
	}

	pub fn order(&self) -> Vec<usize> {
		self.candidate_order(Instant::now())
	}

	pub fn record_success(&mut self, index: usize, latency: Duration) {
		self.endpoints[index].record_success(latency);
	}

	pub fn record_failure(&mut self, index: usize) {
		self.endpoints[index].record_failure(Instant::now());
	}

	pub fn snapshot(&self) -> Vec<EndpointState> {
		self.endpoints.iter().map(Endpoint::snapshot).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn primary_is_tried_first_when_all_healthy() {
		let pool = EndpointPool::new(vec!["https://a".into(), "https://b".into()]);
		let order = pool.order();
		assert_eq!(pool.url(order[0]), "https://a");
	}

	#[test]
	fn failing_endpoint_drops_to_the_back() {
		let mut pool = EndpointPool::new(vec!["https://a".into(), "https://b".into()]);
		pool.record_failure(0);
		pool.record_failure(0);
		pool.record_failure(0);
		let order = pool.order();
		assert_eq!(pool.url(order[0]), "https://b");
	}

	#[test]
	fn success_clears_unhealthy_state() {
		let mut pool = EndpointPool::new(vec!["https://a".into()]);
		pool.record_failure(0);
		pool.record_success(0, Duration::from_millis(10));
		let snap = pool.snapshot();
		assert!(snap[0].healthy);
		assert_eq!(snap[0].failure_count, 0);
	}
}
