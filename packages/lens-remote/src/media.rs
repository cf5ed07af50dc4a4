//! Media detail, favourite and filter-option endpoints.

use reqwest::Method;

use lens_domain::MediaItem;

use crate::{AuthClient, Result};

pub async fn media_detail(client: &AuthClient, id: &str) -> Result<MediaItem> {
	let path = format!("/api/media/{id}/");
	let response = client.send(Method::GET, &path, None).await?;

	Ok(crate::ensure_success(response).await?.json().await?)
}

pub async fn is_favourite(client: &AuthClient, id: &str) -> Result<bool> {
	let path = format!("/api/media/{id}/favourite/");
	let response = client.send(Method::GET, &path, None).await?;
	let body: FavouriteBody = crate::ensure_success(response).await?.json().await?;

	Ok(body.favourite)
}

pub async fn favourite(client: &AuthClient, id: &str) -> Result<()> {
	let path = format!("/api/media/{id}/favourite/");
	let response = client.send(Method::POST, &path, None).await?;

	crate::ensure_success(response).await?;

	Ok(())
}

pub async fn unfavourite(client: &AuthClient, id: &str) -> Result<()> {
	let path = format!("/api/media/{id}/favourite/");
	let response = client.send(Method::DELETE, &path, None).await?;

	crate::ensure_success(response).await?;

	Ok(())
}

pub async fn filter_tags(client: &AuthClient) -> Result<Vec<String>> {
	let response = client.send(Method::GET, "/api/media/filters/tags/", None).await?;
	let body: TagsBody = crate::ensure_success(response).await?.json().await?;

	Ok(body.tags)
}

pub async fn filter_sources(client: &AuthClient) -> Result<Vec<String>> {
	let response = client.send(Method::GET, "/api/media/filters/sources/", None).await?;
	let body: SourcesBody = crate::ensure_success(response).await?.json().await?;

	Ok(body.sources)
}

#[derive(Debug, serde::Deserialize)]
struct FavouriteBody {
	favourite: bool,
}

#[derive(Debug, serde::Deserialize)]
struct TagsBody {
	tags: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct SourcesBody {
	sources: Vec<String>,
}
