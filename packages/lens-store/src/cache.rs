use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use lens_domain::SearchPage;

use crate::{
	error::{Error, Result},
	store::ClientStore,
};

const SEARCH_PREFIX: &str = "search:";

/// On-disk shape of one cached result page.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope {
	data: SearchPage,
	#[serde(with = "lens_domain::time_serde")]
	cached_at: OffsetDateTime,
	#[serde(with = "lens_domain::time_serde")]
	expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
	Stored { bytes: u64, evicted: Option<String> },
	/// Empty result lists are never cached: a transient empty page must not
	/// mask a later non-empty one for the rest of the TTL window.
	SkippedEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
	pub entries: usize,
	pub bytes: u64,
}

impl ClientStore {
	/// Returns the cached page for a canonical query key, or `None`.
	/// Expired and undecodable entries are removed on the way out and
	/// reported as a miss.
	pub fn cached_search(&self, key: &str, now: OffsetDateTime) -> Result<Option<SearchPage>> {
		let full = search_key(key);
		let Some(bytes) = self.read(&full)? else {
			return Ok(None);
		};
		let envelope: CacheEnvelope = match serde_json::from_slice(&bytes) {
			Ok(envelope) => envelope,
			Err(err) => {
				tracing::warn!(error = %err, "Removing undecodable search cache entry.");

				self.remove(&full)?;

				return Ok(None);
			},
		};

		if now >= envelope.expires_at {
			self.remove(&full)?;

			return Ok(None);
		}

		Ok(Some(envelope.data))
	}

	/// Writes a page under the canonical query key. When the write would
	/// push the search namespace over its byte quota, the single entry with
	/// the oldest `cachedAt` is evicted and the budget is checked once
	/// more; a write that still does not fit is abandoned with
	/// [`Error::QuotaExceeded`].
	pub fn cache_search(
		&self,
		key: &str,
		page: &SearchPage,
		now: OffsetDateTime,
		ttl: Duration,
	) -> Result<CacheWrite> {
		if page.results.is_empty() {
			return Ok(CacheWrite::SkippedEmpty);
		}

		let full = search_key(key);
		let envelope =
			CacheEnvelope { data: page.clone(), cached_at: now, expires_at: now + ttl };
		let bytes = serde_json::to_vec(&envelope)?;
		let size = bytes.len() as u64;
		let mut evicted = None;

		if self.cache_bytes_excluding(&full)? + size > self.cache_quota_bytes {
			evicted = self.evict_oldest()?;

			if self.cache_bytes_excluding(&full)? + size > self.cache_quota_bytes {
				return Err(Error::QuotaExceeded {
					quota: self.cache_quota_bytes,
					attempted: size,
				});
			}
		}

		self.write(&full, &bytes)?;

		Ok(CacheWrite::Stored { bytes: size, evicted })
	}

	pub fn purge_expired(&self, now: OffsetDateTime) -> Result<usize> {
		let mut purged = Vec::new();

		for (key, value) in self.scan(SEARCH_PREFIX)? {
			let expired = serde_json::from_slice::<CacheEnvelope>(&value)
				.map(|envelope| now >= envelope.expires_at)
				.unwrap_or(true);

			if expired {
				purged.push(key);
			}
		}

		self.remove_all(&purged)?;

		Ok(purged.len())
	}

	pub fn clear_search_cache(&self) -> Result<usize> {
		let keys: Vec<String> =
			self.scan(SEARCH_PREFIX)?.into_iter().map(|(key, _)| key).collect();

		self.remove_all(&keys)?;

		Ok(keys.len())
	}

	pub fn cache_stats(&self) -> Result<CacheStats> {
		let entries = self.scan(SEARCH_PREFIX)?;

		Ok(CacheStats {
			entries: entries.len(),
			bytes: entries.iter().map(|(_, value)| value.len() as u64).sum(),
		})
	}

	/// Bytes currently used by the search namespace, not counting the key
	/// about to be overwritten, so rewriting an existing entry never
	/// triggers a spurious quota failure.
	fn cache_bytes_excluding(&self, excluded: &str) -> Result<u64> {
		Ok(self
			.scan(SEARCH_PREFIX)?
			.iter()
			.filter(|(key, _)| key.as_str() != excluded)
			.map(|(_, value)| value.len() as u64)
			.sum())
	}

	/// Removes the entry with the smallest `cachedAt` and returns its
	/// storage key. Entries that no longer decode are skipped here; the
	/// read path reclaims them.
	fn evict_oldest(&self) -> Result<Option<String>> {
		let mut oldest: Option<(String, OffsetDateTime)> = None;

		for (key, value) in self.scan(SEARCH_PREFIX)? {
			let Ok(envelope) = serde_json::from_slice::<CacheEnvelope>(&value) else {
				continue;
			};

			if oldest.as_ref().map(|(_, at)| envelope.cached_at < *at).unwrap_or(true) {
				oldest = Some((key, envelope.cached_at));
			}
		}

		let Some((key, _)) = oldest else {
			return Ok(None);
		};

		self.remove(&key)?;

		tracing::debug!(cache_key = %key, "Evicted oldest search cache entry.");

		Ok(Some(key))
	}
}

fn search_key(key: &str) -> String {
	format!("{SEARCH_PREFIX}{key}")
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use lens_domain::{MediaItem, MediaType};

	use super::*;

	const T0: OffsetDateTime = datetime!(2026-01-01 00:00:00 UTC);
	const T1: OffsetDateTime = datetime!(2026-01-01 00:01:00 UTC);
	const T2: OffsetDateTime = datetime!(2026-01-01 00:02:00 UTC);
	const T3: OffsetDateTime = datetime!(2026-01-01 00:03:00 UTC);

	fn item(id: &str) -> MediaItem {
		MediaItem {
			id: id.to_string(),
			title: Some("Fixture".to_string()),
			indexed_on: None,
			foreign_landing_url: None,
			url: None,
			creator: None,
			creator_url: None,
			license: None,
			license_version: None,
			license_url: None,
			attribution: None,
			category: None,
			source: None,
			file_size: None,
			file_type: None,
			mature: false,
			thumbnail_url: None,
			height: None,
			width: None,
			duration: None,
			media_type: MediaType::Image,
		}
	}

	fn page(id: &str) -> SearchPage {
		SearchPage {
			results: vec![item(id)],
			page: 1,
			page_size: 18,
			total_count: 1,
			total_pages: 1,
		}
	}

	fn empty_page() -> SearchPage {
		SearchPage { results: Vec::new(), page: 1, page_size: 18, total_count: 0, total_pages: 0 }
	}

	fn open_with_quota(dir: &tempfile::TempDir, quota: u64) -> ClientStore {
		let cfg = lens_config::Storage {
			path: dir.path().join("client.redb").to_string_lossy().into_owned(),
			cache_quota_bytes: quota,
		};

		ClientStore::open(&cfg).expect("store should open")
	}

	/// Every fixture page serializes to the same length as long as ids and
	/// timestamps keep their widths, which lets quota tests size budgets in
	/// whole entries.
	fn entry_size(dir: &tempfile::TempDir) -> u64 {
		let store = open_with_quota(dir, u64::MAX);
		let written = store
			.cache_search("probe", &page("p-0"), T0, Duration::minutes(15))
			.expect("probe write should succeed");
		let CacheWrite::Stored { bytes, .. } = written else {
			panic!("probe write should be stored");
		};

		store.clear_search_cache().expect("probe cleanup should succeed");

		bytes
	}

	#[test]
	fn fresh_entry_hits() {
		let dir = tempfile::tempdir().expect("tempdir");
		let store = open_with_quota(&dir, 1024 * 1024);

		store
			.cache_search("query=galaxy", &page("m-1"), T0, Duration::minutes(15))
			.expect("write should succeed");

		let hit = store.cached_search("query=galaxy", T1).expect("read should succeed");

		assert_eq!(hit.expect("entry should be fresh").results[0].id, "m-1");
	}

	#[test]
	fn zero_ttl_is_an_immediate_miss() {
		let dir = tempfile::tempdir().expect("tempdir");
		let store = open_with_quota(&dir, 1024 * 1024);

		store
			.cache_search("query=galaxy", &page("m-1"), T0, Duration::ZERO)
			.expect("write should succeed");

		assert!(store.cached_search("query=galaxy", T0).expect("read").is_none());
	}

	#[test]
	fn expired_entries_are_evicted_on_read() {
		let dir = tempfile::tempdir().expect("tempdir");
		let store = open_with_quota(&dir, 1024 * 1024);

		store
			.cache_search("query=galaxy", &page("m-1"), T0, Duration::minutes(1))
			.expect("write should succeed");

		assert!(store.cached_search("query=galaxy", T2).expect("read").is_none());
		assert_eq!(store.cache_stats().expect("stats").entries, 0);
	}

	#[test]
	fn empty_pages_are_never_cached() {
		let dir = tempfile::tempdir().expect("tempdir");
		let store = open_with_quota(&dir, 1024 * 1024);
		let written = store
			.cache_search("query=void", &empty_page(), T0, Duration::minutes(15))
			.expect("write should be accepted");

		assert_eq!(written, CacheWrite::SkippedEmpty);
		assert!(store.cached_search("query=void", T0).expect("read").is_none());
	}

	#[test]
	fn quota_failure_evicts_exactly_the_oldest_entry() {
		let dir = tempfile::tempdir().expect("tempdir");
		let size = entry_size(&dir);
		let store = open_with_quota(&dir, size * 3);
		let ttl = Duration::minutes(15);

		store.cache_search("query=a-0", &page("m-0"), T0, ttl).expect("write a");
		store.cache_search("query=a-1", &page("m-1"), T1, ttl).expect("write b");
		store.cache_search("query=a-2", &page("m-2"), T2, ttl).expect("write c");

		let written =
			store.cache_search("query=a-3", &page("m-3"), T3, ttl).expect("write d");

		assert_eq!(
			written,
			CacheWrite::Stored { bytes: size, evicted: Some("search:query=a-0".to_string()) }
		);
		assert!(store.cached_search("query=a-0", T3).expect("read").is_none());
		assert!(store.cached_search("query=a-1", T3).expect("read").is_some());
		assert!(store.cached_search("query=a-2", T3).expect("read").is_some());
		assert!(store.cached_search("query=a-3", T3).expect("read").is_some());
	}

	#[test]
	fn oversized_write_is_abandoned_after_one_eviction() {
		let dir = tempfile::tempdir().expect("tempdir");
		let size = entry_size(&dir);
		let store = open_with_quota(&dir, size);
		let ttl = Duration::minutes(15);

		store.cache_search("query=a-0", &page("m-0"), T0, ttl).expect("write a");

		let big = SearchPage {
			results: (0..64).map(|i| item(&format!("m-{i:03}"))).collect(),
			page: 1,
			page_size: 64,
			total_count: 64,
			total_pages: 1,
		};
		let err = store
			.cache_search("query=big", &big, T1, ttl)
			.expect_err("oversized write should be abandoned");

		assert!(matches!(err, Error::QuotaExceeded { .. }));
		assert!(store.cached_search("query=big", T1).expect("read").is_none());
		// The eviction that made room is not rolled back.
		assert!(store.cached_search("query=a-0", T1).expect("read").is_none());
	}

	#[test]
	fn rewriting_a_key_does_not_count_its_old_entry_against_the_quota() {
		let dir = tempfile::tempdir().expect("tempdir");
		let size = entry_size(&dir);
		let store = open_with_quota(&dir, size);
		let ttl = Duration::minutes(15);

		store.cache_search("query=a-0", &page("m-0"), T0, ttl).expect("first write");

		let written = store
			.cache_search("query=a-0", &page("m-9"), T1, ttl)
			.expect("rewrite should succeed");

		assert_eq!(written, CacheWrite::Stored { bytes: size, evicted: None });
	}

	#[test]
	fn purge_expired_removes_only_stale_entries() {
		let dir = tempfile::tempdir().expect("tempdir");
		let store = open_with_quota(&dir, 1024 * 1024);

		store
			.cache_search("query=stale", &page("m-0"), T0, Duration::minutes(1))
			.expect("write stale");
		store
			.cache_search("query=fresh", &page("m-1"), T2, Duration::minutes(30))
			.expect("write fresh");

		assert_eq!(store.purge_expired(T3).expect("purge"), 1);
		assert!(store.cached_search("query=fresh", T3).expect("read").is_some());
	}

	#[test]
	fn clear_search_cache_reports_removed_entries() {
		let dir = tempfile::tempdir().expect("tempdir");
		let store = open_with_quota(&dir, 1024 * 1024);
		let ttl = Duration::minutes(15);

		store.cache_search("query=a-0", &page("m-0"), T0, ttl).expect("write a");
		store.cache_search("query=a-1", &page("m-1"), T1, ttl).expect("write b");

		assert_eq!(store.clear_search_cache().expect("clear"), 2);
		assert_eq!(store.cache_stats().expect("stats").entries, 0);
	}
}
