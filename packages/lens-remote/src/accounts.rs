//! Account and session endpoints.

use reqwest::{Method, StatusCode};

use lens_domain::{
	MediaItem, NewAccount, PreferencePatch, ProfileView, SessionCredentials, User,
	UserPreferences,
};

use crate::{AuthClient, Result};

/// Exchanges a username/password pair for session credentials.
pub async fn issue_token(
	client: &AuthClient,
	username: &str,
	password: &str,
) -> Result<SessionCredentials> {
	let body = serde_json::json!({ "username": username, "password": password });
	let response =
		client.send_plain(Method::POST, "/api/accounts/token/", Some(&body)).await?;

	Ok(crate::ensure_success(response).await?.json().await?)
}

pub async fn register(client: &AuthClient, account: &NewAccount) -> Result<User> {
	let body = serde_json::to_value(account)?;
	let response =
		client.send_plain(Method::POST, "/api/accounts/register/", Some(&body)).await?;

	Ok(crate::ensure_success(response).await?.json().await?)
}

/// Asks the server to invalidate a refresh token. Callers treat failures as
/// best effort.
pub async fn logout(client: &AuthClient, refresh: &str) -> Result<()> {
	let body = serde_json::json!({ "refresh": refresh });
	let response = client.send(Method::POST, "/api/accounts/logout/", Some(&body)).await?;

	crate::ensure_success(response).await?;

	Ok(())
}

pub async fn me(client: &AuthClient) -> Result<User> {
	let response = client.send(Method::GET, "/api/accounts/users/me/", None).await?;

	Ok(crate::ensure_success(response).await?.json().await?)
}

/// Fetches a public profile. A 403 is the server's way of saying the
/// profile exists but is not public, so it decodes to a typed view instead
/// of an error.
pub async fn profile(client: &AuthClient, username: &str) -> Result<ProfileView> {
	let path = format!("/api/accounts/users/{username}/");
	let response = client.send(Method::GET, &path, None).await?;

	if response.status() == StatusCode::FORBIDDEN {
		return Ok(ProfileView::Private);
	}

	Ok(ProfileView::Public(crate::ensure_success(response).await?.json().await?))
}

pub async fn update_preferences(
	client: &AuthClient,
	username: &str,
	patch: &PreferencePatch,
) -> Result<UserPreferences> {
	let path = format!("/api/accounts/users/{username}/preferences/");
	let body = serde_json::to_value(patch)?;
	let response = client.send(Method::PATCH, &path, Some(&body)).await?;

	Ok(crate::ensure_success(response).await?.json().await?)
}

pub async fn change_password(
	client: &AuthClient,
	username: &str,
	current: &str,
	next: &str,
) -> Result<()> {
	let path = format!("/api/accounts/users/{username}/password/");
	let body = serde_json::json!({ "old_password": current, "new_password": next });
	let response = client.send(Method::PUT, &path, Some(&body)).await?;

	crate::ensure_success(response).await?;

	Ok(())
}

pub async fn delete_account(client: &AuthClient, username: &str) -> Result<()> {
	let path = format!("/api/accounts/users/{username}/");
	let response = client.send(Method::DELETE, &path, None).await?;

	crate::ensure_success(response).await?;

	Ok(())
}

pub async fn favourites(
	client: &AuthClient,
	username: &str,
	limit: u32,
) -> Result<Vec<MediaItem>> {
	let path = format!("/api/accounts/users/{username}/favourites/?limit={limit}");
	let response = client.send(Method::GET, &path, None).await?;
	let body: FavouritesBody = crate::ensure_success(response).await?.json().await?;

	Ok(body.results)
}

#[derive(Debug, serde::Deserialize)]
struct FavouritesBody {
	results: Vec<MediaItem>,
}
