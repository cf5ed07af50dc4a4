//! Search and search-history endpoints.

use reqwest::Method;

use lens_domain::{HistoryEntry, HistoryPage, SearchPage};

use crate::{AuthClient, Result};

/// Runs a search for an already-canonical query string. Goes through the
/// authenticated path so the server can apply account-level result gating
/// and record history; degrades to an anonymous call when no credentials
/// are stored.
pub async fn search(client: &AuthClient, canonical: &str) -> Result<SearchPage> {
	let path = format!("/api/search/?{canonical}");
	let response = client.send(Method::GET, &path, None).await?;

	Ok(crate::ensure_success(response).await?.json().await?)
}

pub async fn history(client: &AuthClient, page: u32) -> Result<HistoryPage> {
	let path = format!("/api/search/history/?page={page}");
	let response = client.send(Method::GET, &path, None).await?;

	Ok(crate::ensure_success(response).await?.json().await?)
}

pub async fn history_preview(client: &AuthClient, limit: u32) -> Result<Vec<HistoryEntry>> {
	let path = format!("/api/search/history/preview/?limit={limit}");
	let response = client.send(Method::GET, &path, None).await?;
	let body: PreviewBody = crate::ensure_success(response).await?.json().await?;

	Ok(body.results)
}

pub async fn delete_history_entry(client: &AuthClient, id: i64) -> Result<()> {
	let path = format!("/api/search/history/{id}/");
	let response = client.send(Method::DELETE, &path, None).await?;

	crate::ensure_success(response).await?;

	Ok(())
}

pub async fn clear_history(client: &AuthClient) -> Result<()> {
	let response = client.send(Method::POST, "/api/search/history/clear/", None).await?;

	crate::ensure_success(response).await?;

	Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct PreviewBody {
	results: Vec<HistoryEntry>,
}
