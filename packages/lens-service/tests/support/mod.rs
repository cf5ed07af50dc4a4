// Shared by several test binaries; not every binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use lens_config::{Api, Cache, Client, Config, Search, Storage};
use lens_remote::AuthClient;
use lens_service::LensService;
use lens_store::ClientStore;
use lens_testkit::TestApi;

/// One fake API plus a service wired against it, backed by a temporary
/// store. The tempdir guard keeps the database alive for the test's
/// lifetime.
pub struct Harness {
	pub api: TestApi,
	pub service: Arc<LensService>,
	_dir: TempDir,
}

pub async fn harness() -> Harness {
	harness_with(|_| {}).await
}

pub async fn harness_with(tweak: impl FnOnce(&mut Config)) -> Harness {
	let api = TestApi::spawn().await.expect("test API should start");
	let dir = tempfile::tempdir().expect("tempdir should be created");
	let mut config = Config {
		client: Client { user_agent: None, log_level: "warn".to_string() },
		api: Api { base_url: api.base_url().to_string(), timeout_ms: 5_000 },
		storage: Storage {
			path: dir.path().join("client.redb").to_string_lossy().into_owned(),
			cache_quota_bytes: 1024 * 1024,
		},
		cache: Cache { enabled: true, ttl_minutes: 15 },
		search: Search { page_size: 18 },
	};

	tweak(&mut config);

	let store = Arc::new(ClientStore::open(&config.storage).expect("store should open"));
	let remote =
		Arc::new(AuthClient::new(&config, store.clone()).expect("HTTP client should build"));
	let service = Arc::new(LensService::new(config, store, remote));

	Harness { api, service, _dir: dir }
}

impl Harness {
	/// A second service over the same store and remote, as if the process
	/// had restarted.
	pub fn restarted(&self) -> LensService {
		LensService::new(
			self.service.cfg.clone(),
			self.service.store.clone(),
			self.service.remote.clone(),
		)
	}

	pub async fn sign_in(&self, username: &str, password: &str) {
		self.api.add_account(username, password);
		self.service.session.sign_in(username, password).await.expect("sign-in should succeed");
	}
}
