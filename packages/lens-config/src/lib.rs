mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Api, Cache, Client, Config, Search, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.api.base_url.trim().is_empty() {
		return Err(Error::Validation { message: "api.base_url must be non-empty.".to_string() });
	}

	let base = url::Url::parse(&cfg.api.base_url)
		.map_err(|_| Error::Validation { message: "api.base_url must be a valid URL.".to_string() })?;

	if !matches!(base.scheme(), "http" | "https") {
		return Err(Error::Validation {
			message: "api.base_url must use the http or https scheme.".to_string(),
		});
	}
	if cfg.api.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "api.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.path.trim().is_empty() {
		return Err(Error::Validation { message: "storage.path must be non-empty.".to_string() });
	}
	if cfg.storage.cache_quota_bytes == 0 {
		return Err(Error::Validation {
			message: "storage.cache_quota_bytes must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.ttl_minutes < 0 {
		return Err(Error::Validation {
			message: "cache.ttl_minutes must be zero or greater.".to_string(),
		});
	}
	if cfg.search.page_size == 0 {
		return Err(Error::Validation {
			message: "search.page_size must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	while cfg.api.base_url.ends_with('/') {
		cfg.api.base_url.pop();
	}

	if cfg.client.user_agent.as_deref().map(|agent| agent.trim().is_empty()).unwrap_or(false) {
		cfg.client.user_agent = None;
	}
}
