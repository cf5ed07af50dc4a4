use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub client: Client,
	pub api: Api,
	pub storage: Storage,
	pub cache: Cache,
	pub search: Search,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Client {
	/// Optional. Sent as the User-Agent header on every request.
	pub user_agent: Option<String>,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
	pub base_url: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub path: String,
	pub cache_quota_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
	pub enabled: bool,
	/// Zero is legal and means entries expire the moment they are written.
	pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	#[serde(default = "default_page_size")]
	pub page_size: u32,
}

fn default_page_size() -> u32 {
	18
}
