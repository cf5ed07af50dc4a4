//! HTTP surface of the media API with transparent token refresh.

pub mod accounts;
pub mod media;
pub mod search;

mod client;
pub use client::AuthClient;

mod error;
pub use error::{Error, Result};

use reqwest::Response;
use serde_json::Value;

/// Collapses a non-2xx response into [`Error::Status`], carrying the
/// `detail` message the API puts in error bodies when one is present.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
	let status = response.status();

	if status.is_success() {
		return Ok(response);
	}

	let detail = response
		.json::<Value>()
		.await
		.ok()
		.as_ref()
		.and_then(|body| body.get("detail"))
		.and_then(Value::as_str)
		.map(str::to_string)
		.unwrap_or_else(|| {
			status.canonical_reason().unwrap_or("Request failed.").to_string()
		});

	Err(Error::Status { status: status.as_u16(), detail })
}
