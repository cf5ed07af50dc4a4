use lens_domain::MediaItem;
use lens_remote::{accounts, media};

use crate::{LensService, ServiceResult};

impl LensService {
	pub async fn favourite(&self, id: &str) -> ServiceResult<()> {
		Ok(media::favourite(&self.remote, id).await?)
	}

	pub async fn unfavourite(&self, id: &str) -> ServiceResult<()> {
		Ok(media::unfavourite(&self.remote, id).await?)
	}

	pub async fn is_favourite(&self, id: &str) -> ServiceResult<bool> {
		Ok(media::is_favourite(&self.remote, id).await?)
	}

	/// Lists the signed-in user's favourites. A failing list call degrades
	/// to an empty list so callers can always render the page.
	pub async fn favourites(&self, limit: u32) -> ServiceResult<Vec<MediaItem>> {
		let username = self.session.require_username()?;

		match accounts::favourites(&self.remote, &username, limit).await {
			Ok(items) => Ok(items),
			Err(err) => {
				tracing::warn!(error = %err, "Favourites list failed, returning an empty list.");

				Ok(Vec::new())
			},
		}
	}
}
