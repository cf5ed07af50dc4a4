use redb::{Database, TableDefinition};

use lens_domain::SessionCredentials;

use crate::error::Result;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("lens");
const ACCESS_KEY: &str = "auth:access";
const REFRESH_KEY: &str = "auth:refresh";

/// The client's one durable store: an embedded single-file database holding
/// the credential pair under two fixed keys and the search result cache
/// under a `search:` key family.
pub struct ClientStore {
	db: Database,
	pub(crate) cache_quota_bytes: u64,
}

impl ClientStore {
	pub fn open(cfg: &lens_config::Storage) -> Result<Self> {
		let db = Database::create(&cfg.path)?;

		// Create the table up front so the first read transaction cannot
		// fail on a missing table.
		let txn = db.begin_write()?;
		{
			let _table = txn.open_table(TABLE)?;
		}
		txn.commit()?;

		Ok(Self { db, cache_quota_bytes: cfg.cache_quota_bytes })
	}

	pub fn access_token(&self) -> Result<Option<String>> {
		self.read_text(ACCESS_KEY)
	}

	pub fn refresh_token(&self) -> Result<Option<String>> {
		self.read_text(REFRESH_KEY)
	}

	/// Replaces both credential slots wholesale in one transaction. A pair
	/// without a refresh token clears the refresh slot rather than keeping
	/// a stale one behind a fresh access token.
	pub fn store_credentials(&self, credentials: &SessionCredentials) -> Result<()> {
		let txn = self.db.begin_write()?;
		{
			let mut table = txn.open_table(TABLE)?;

			table.insert(ACCESS_KEY, credentials.access.as_bytes())?;

			match credentials.refresh.as_deref() {
				Some(refresh) => {
					table.insert(REFRESH_KEY, refresh.as_bytes())?;
				},
				None => {
					table.remove(REFRESH_KEY)?;
				},
			}
		}
		txn.commit()?;

		Ok(())
	}

	pub fn clear_credentials(&self) -> Result<()> {
		let txn = self.db.begin_write()?;
		{
			let mut table = txn.open_table(TABLE)?;

			table.remove(ACCESS_KEY)?;
			table.remove(REFRESH_KEY)?;
		}
		txn.commit()?;

		Ok(())
	}

	fn read_text(&self, key: &str) -> Result<Option<String>> {
		let Some(bytes) = self.read(key)? else {
			return Ok(None);
		};

		Ok(Some(String::from_utf8(bytes).map_err(|_| crate::Error::Storage {
			message: format!("Value under {key} is not valid UTF-8."),
		})?))
	}

	pub(crate) fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
		let txn = self.db.begin_read()?;
		let table = txn.open_table(TABLE)?;

		Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
	}

	pub(crate) fn write(&self, key: &str, value: &[u8]) -> Result<()> {
		let txn = self.db.begin_write()?;
		{
			let mut table = txn.open_table(TABLE)?;

			table.insert(key, value)?;
		}
		txn.commit()?;

		Ok(())
	}

	pub(crate) fn remove(&self, key: &str) -> Result<()> {
		let txn = self.db.begin_write()?;
		{
			let mut table = txn.open_table(TABLE)?;

			table.remove(key)?;
		}
		txn.commit()?;

		Ok(())
	}

	pub(crate) fn remove_all(&self, keys: &[String]) -> Result<()> {
		let txn = self.db.begin_write()?;
		{
			let mut table = txn.open_table(TABLE)?;

			for key in keys {
				table.remove(key.as_str())?;
			}
		}
		txn.commit()?;

		Ok(())
	}

	pub(crate) fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
		let txn = self.db.begin_read()?;
		let table = txn.open_table(TABLE)?;
		let mut entries = Vec::new();

		for entry in table.range(prefix..)? {
			let (key, value) = entry?;
			let key = key.value().to_string();

			if !key.starts_with(prefix) {
				break;
			}

			entries.push((key, value.value().to_vec()));
		}

		Ok(entries)
	}
}
