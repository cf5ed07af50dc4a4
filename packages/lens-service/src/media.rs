use lens_domain::{FilterOptions, MediaItem};
use lens_remote::media as remote_media;

use crate::{LensService, ServiceResult};

impl LensService {
	/// Fetches one media record; an unknown id surfaces as
	/// [`crate::ServiceError::NotFound`].
	pub async fn media_detail(&self, id: &str) -> ServiceResult<MediaItem> {
		Ok(remote_media::media_detail(&self.remote, id).await?)
	}

	pub async fn filter_tags(&self) -> ServiceResult<Vec<String>> {
		Ok(remote_media::filter_tags(&self.remote).await?)
	}

	pub async fn filter_sources(&self) -> ServiceResult<Vec<String>> {
		Ok(remote_media::filter_sources(&self.remote).await?)
	}

	/// The full filter catalogue, for populating filter pickers in one go.
	pub async fn filter_options(&self) -> ServiceResult<FilterOptions> {
		Ok(FilterOptions {
			tags: self.filter_tags().await?,
			sources: self.filter_sources().await?,
		})
	}
}
