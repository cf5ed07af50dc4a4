use lens_domain::{HistoryEntry, HistoryPage};
use lens_remote::search as remote_search;

use crate::{LensService, ServiceResult};

impl LensService {
	pub async fn history(&self, page: u32) -> ServiceResult<HistoryPage> {
		Ok(remote_search::history(&self.remote, page).await?)
	}

	pub async fn history_preview(&self, limit: u32) -> ServiceResult<Vec<HistoryEntry>> {
		Ok(remote_search::history_preview(&self.remote, limit).await?)
	}

	pub async fn delete_history_entry(&self, id: i64) -> ServiceResult<()> {
		Ok(remote_search::delete_history_entry(&self.remote, id).await?)
	}

	pub async fn clear_history(&self) -> ServiceResult<()> {
		Ok(remote_search::clear_history(&self.remote).await?)
	}
}
