//! Search orchestration: canonical-key encoding, cache consultation and
//! stale-response suppression in front of the remote search endpoint.

use std::sync::atomic::Ordering;

use time::{Duration, OffsetDateTime};

use lens_domain::{QueryState, SearchPage, codec};
use lens_remote::search as remote_search;
use lens_store::CacheWrite;

use crate::{LensService, ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
	/// Served from the local cache without a network call.
	Cached(SearchPage),
	/// Fetched from the API, and cached unless the store declined the
	/// write.
	Fetched(SearchPage),
	/// A newer search was issued while this one was in flight; the late
	/// response is discarded, not cached, and must not be rendered.
	Superseded,
}

impl LensService {
	/// Runs one search for the given query state.
	///
	/// `mature: None` resolves against the session's stored sensitive-media
	/// preference before the canonical key is computed, so the same intent
	/// maps to the same cache entry for the same viewer settings.
	pub async fn search(&self, state: &QueryState) -> ServiceResult<SearchOutcome> {
		if state.search_value.trim().is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Search term must not be empty.".to_string(),
			});
		}

		let resolved =
			state.clone().with_mature_default(self.session.preferences().show_sensitive);
		let key = codec::encode(&resolved);
		let now = OffsetDateTime::now_utc();

		if self.cfg.cache.enabled
			&& let Some(page) = self.store.cached_search(&key, now)?
		{
			tracing::info!(cache_key_prefix = %key_prefix(&key), hit = true, "Search cache hit.");

			return Ok(SearchOutcome::Cached(page));
		}

		tracing::info!(cache_key_prefix = %key_prefix(&key), hit = false, "Search cache miss.");

		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let page = remote_search::search(&self.remote, &key).await?;

		if self.generation.load(Ordering::SeqCst) != generation {
			tracing::debug!(
				cache_key_prefix = %key_prefix(&key),
				"Discarding superseded search response."
			);

			return Ok(SearchOutcome::Superseded);
		}

		if self.cfg.cache.enabled {
			match self.store.cache_search(&key, &page, now, self.cache_ttl()) {
				Ok(CacheWrite::Stored { bytes, .. }) => {
					tracing::info!(
						cache_key_prefix = %key_prefix(&key),
						payload_bytes = bytes,
						"Search results cached."
					);
				},
				Ok(CacheWrite::SkippedEmpty) => {
					tracing::debug!(
						cache_key_prefix = %key_prefix(&key),
						"Empty result page was not cached."
					);
				},
				Err(err) => {
					tracing::warn!(
						cache_key_prefix = %key_prefix(&key),
						error = %err,
						"Search cache write failed, returning results uncached."
					);
				},
			}
		}

		Ok(SearchOutcome::Fetched(page))
	}

	fn cache_ttl(&self) -> Duration {
		Duration::minutes(self.cfg.cache.ttl_minutes)
	}
}

/// Truncates a canonical key for log lines. Canonical keys are
/// form-urlencoded ASCII, so byte slicing cannot split a character.
fn key_prefix(key: &str) -> &str {
	&key[..key.len().min(32)]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn key_prefix_truncates_long_keys() {
		let key = "query=galaxy&extension=jpg%2Cpng&license=by";

		assert_eq!(key_prefix(key), "query=galaxy&extension=jpg%2Cpng");
		assert_eq!(key_prefix("query=a"), "query=a");
	}
}
