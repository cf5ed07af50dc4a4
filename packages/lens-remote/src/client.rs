use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use lens_domain::SessionCredentials;
use lens_store::ClientStore;

use crate::error::Result;

/// Upper bound on refresh exchanges a single logical request may spend
/// before the latest 401 response is surfaced to the caller.
const MAX_REFRESH_ATTEMPTS: usize = 5;

/// HTTP client that attaches the stored access token to every request and
/// replays a request once per successful token refresh when the API answers
/// 401.
pub struct AuthClient {
	http: Client,
	base: String,
	store: Arc<ClientStore>,
}

impl AuthClient {
	pub fn new(cfg: &lens_config::Config, store: Arc<ClientStore>) -> Result<Self> {
		let mut builder = Client::builder().timeout(Duration::from_millis(cfg.api.timeout_ms));

		if let Some(user_agent) = &cfg.client.user_agent {
			builder = builder.user_agent(user_agent.clone());
		}

		Ok(Self { http: builder.build()?, base: cfg.api.base_url.clone(), store })
	}

	/// Sends an authenticated request. On 401 the stored refresh token is
	/// exchanged for a fresh access token and the request is replayed, at
	/// most [`MAX_REFRESH_ATTEMPTS`] times; when the refresh itself is
	/// rejected, or the bound is reached, the 401 response is returned
	/// as-is for the caller to interpret.
	pub async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<&Value>,
	) -> Result<Response> {
		let url = format!("{}{path}", self.base);
		let mut refreshes = 0;

		loop {
			// Re-read on every attempt so a replay picks up the token the
			// refresh exchange just stored.
			let mut request = self.http.request(method.clone(), url.as_str());

			if let Some(token) = self.store.access_token()? {
				request = request.bearer_auth(token);
			}
			if let Some(body) = body {
				request = request.json(body);
			}

			let response = request.send().await?;

			if response.status() != StatusCode::UNAUTHORIZED
				|| refreshes >= MAX_REFRESH_ATTEMPTS
			{
				return Ok(response);
			}
			if !self.try_refresh().await? {
				return Ok(response);
			}

			refreshes += 1;
		}
	}

	/// Sends a request without credentials and without the refresh loop.
	/// Sign-in, registration and the refresh exchange itself go through
	/// here.
	pub async fn send_plain(
		&self,
		method: Method,
		path: &str,
		body: Option<&Value>,
	) -> Result<Response> {
		let url = format!("{}{path}", self.base);
		let mut request = self.http.request(method, url.as_str());

		if let Some(body) = body {
			request = request.json(body);
		}

		Ok(request.send().await?)
	}

	/// Exchanges the stored refresh token for a new access token.
	/// `Ok(false)` means the session cannot be refreshed right now; only
	/// storage failures surface as errors.
	async fn try_refresh(&self) -> Result<bool> {
		// TODO: coalesce concurrent refreshes behind a shared in-flight
		// future so parallel 401s do not each spend a refresh exchange.
		let Some(refresh) = self.store.refresh_token()? else {
			tracing::debug!("No refresh token stored, session cannot be refreshed.");

			return Ok(false);
		};
		let body = serde_json::json!({ "refresh": refresh });
		let response = match self
			.send_plain(Method::POST, "/api/accounts/token/refresh/", Some(&body))
			.await
		{
			Ok(response) => response,
			Err(err) => {
				tracing::warn!(error = %err, "Token refresh request failed.");

				return Ok(false);
			},
		};

		if !response.status().is_success() {
			tracing::warn!(status = %response.status(), "Token refresh was rejected.");

			return Ok(false);
		}

		let refreshed = match response.json::<RefreshedTokens>().await {
			Ok(refreshed) => refreshed,
			Err(err) => {
				tracing::warn!(error = %err, "Token refresh response could not be decoded.");

				return Ok(false);
			},
		};
		// An exchange that does not rotate the refresh token keeps the old
		// one alive.
		let next_refresh = refreshed.refresh.unwrap_or(refresh);

		self.store.store_credentials(&SessionCredentials {
			access: refreshed.access,
			refresh: Some(next_refresh),
		})?;

		tracing::debug!("Access token refreshed.");

		Ok(true)
	}
}

#[derive(Debug, Deserialize)]
struct RefreshedTokens {
	access: String,
	refresh: Option<String>,
}
