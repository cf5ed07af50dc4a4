//! In-process fake of the media API for integration tests: the real
//! route shapes, per-route hit counters and switchable failure modes,
//! served from a background task on an ephemeral port.

mod error;

pub use error::{Error, Result};

use std::{
	collections::{BTreeSet, HashMap},
	net::Ipv4Addr,
	sync::{Arc, Mutex, MutexGuard},
	time::Duration,
};

use axum::{
	Json, Router,
	extract::{Path, RawQuery, State},
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{delete, get, patch, post, put},
};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio::{net::TcpListener, task::JoinHandle};
use uuid::Uuid;

use lens_domain::{
	HistoryEntry, HistoryPage, MediaItem, MediaType, NewAccount, PreferencePatch, SearchPage,
	User, UserPreferences,
};

type Shared = Arc<Mutex<ApiState>>;

/// One fake API instance. Dropping it aborts the server task.
pub struct TestApi {
	base_url: String,
	state: Shared,
	handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct ApiState {
	accounts: HashMap<String, AccountRecord>,
	access_tokens: HashMap<String, String>,
	refresh_tokens: HashMap<String, String>,
	rotate_refresh: bool,
	refuse_refresh: bool,
	always_unauthorized: bool,
	fail_preferences: bool,
	fail_logout: bool,
	search_results: HashMap<String, Vec<MediaItem>>,
	search_delays: HashMap<String, Duration>,
	favourites: HashMap<String, BTreeSet<String>>,
	history: Vec<(String, HistoryEntry)>,
	next_history_id: i64,
	media: HashMap<String, MediaItem>,
	filter_tags: Vec<String>,
	filter_sources: Vec<String>,
	hits: HashMap<&'static str, usize>,
}

#[derive(Debug)]
struct AccountRecord {
	password: String,
	user: User,
}

impl TestApi {
	/// Binds an ephemeral loopback port and serves the fake API from a
	/// spawned task.
	pub async fn spawn() -> Result<Self> {
		let state = Arc::new(Mutex::new(ApiState::default()));
		let app = router(state.clone());
		let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
		let addr = listener.local_addr()?;
		let handle = tokio::spawn(async move {
			if let Err(err) = axum::serve(listener, app).await {
				eprintln!("Test API server stopped: {err}.");
			}
		});

		Ok(Self { base_url: format!("http://{addr}"), state, handle })
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub fn add_account(&self, username: &str, password: &str) {
		self.lock().accounts.insert(username.to_string(), AccountRecord {
			password: password.to_string(),
			user: User {
				username: username.to_string(),
				email: Some(format!("{username}@example.org")),
				first_name: None,
				last_name: None,
				preferences: Some(UserPreferences::default()),
			},
		});
	}

	pub fn set_preferences(&self, username: &str, prefs: UserPreferences) {
		if let Some(record) = self.lock().accounts.get_mut(username) {
			record.user.preferences = Some(prefs);
		}
	}

	pub fn seed_search(&self, term: &str, items: Vec<MediaItem>) {
		self.lock().search_results.insert(term.to_string(), items);
	}

	pub fn delay_search(&self, term: &str, delay: Duration) {
		self.lock().search_delays.insert(term.to_string(), delay);
	}

	pub fn seed_media(&self, item: MediaItem) {
		self.lock().media.insert(item.id.clone(), item);
	}

	pub fn seed_filters(&self, tags: Vec<String>, sources: Vec<String>) {
		let mut state = self.lock();
		state.filter_tags = tags;
		state.filter_sources = sources;
	}

	/// Invalidates every issued access token while leaving refresh tokens
	/// alive, forcing the next authenticated call through the refresh
	/// exchange.
	pub fn expire_access_tokens(&self) {
		self.lock().access_tokens.clear();
	}

	pub fn set_refuse_refresh(&self, refuse: bool) {
		self.lock().refuse_refresh = refuse;
	}

	pub fn set_rotate_refresh(&self, rotate: bool) {
		self.lock().rotate_refresh = rotate;
	}

	/// Makes every token-guarded route answer 401 regardless of the token
	/// presented, while the refresh exchange keeps working.
	pub fn set_always_unauthorized(&self, value: bool) {
		self.lock().always_unauthorized = value;
	}

	pub fn set_fail_preferences(&self, value: bool) {
		self.lock().fail_preferences = value;
	}

	pub fn set_fail_logout(&self, value: bool) {
		self.lock().fail_logout = value;
	}

	pub fn hits(&self, route: &str) -> usize {
		self.lock().hits.get(route).copied().unwrap_or(0)
	}

	fn lock(&self) -> MutexGuard<'_, ApiState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}

impl Drop for TestApi {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

/// A minimal media record for seeding searches and detail lookups.
pub fn media_fixture(id: &str, title: &str) -> MediaItem {
	MediaItem {
		id: id.to_string(),
		title: Some(title.to_string()),
		indexed_on: None,
		foreign_landing_url: None,
		url: Some(format!("https://media.example.org/{id}.jpg")),
		creator: Some("Fixture Creator".to_string()),
		creator_url: None,
		license: Some("by".to_string()),
		license_version: Some("4.0".to_string()),
		license_url: None,
		attribution: None,
		category: None,
		source: Some("flickr".to_string()),
		file_size: None,
		file_type: None,
		mature: false,
		thumbnail_url: None,
		height: None,
		width: None,
		duration: None,
		media_type: MediaType::Image,
	}
}

fn router(state: Shared) -> Router {
	Router::new()
		.route("/api/accounts/token/", post(issue_token))
		.route("/api/accounts/token/refresh/", post(refresh_token))
		.route("/api/accounts/register/", post(register))
		.route("/api/accounts/logout/", post(logout))
		.route("/api/accounts/users/me/", get(me))
		.route("/api/accounts/users/{username}/", get(profile).delete(delete_account))
		.route("/api/accounts/users/{username}/preferences/", patch(update_preferences))
		.route("/api/accounts/users/{username}/password/", put(change_password))
		.route("/api/accounts/users/{username}/favourites/", get(list_favourites))
		.route("/api/search/", get(search))
		.route("/api/search/history/", get(history))
		.route("/api/search/history/preview/", get(history_preview))
		.route("/api/search/history/clear/", post(clear_history))
		.route("/api/search/history/{id}/", delete(delete_history_entry))
		.route("/api/media/filters/tags/", get(filter_tags))
		.route("/api/media/filters/sources/", get(filter_sources))
		.route("/api/media/{id}/", get(media_detail))
		.route(
			"/api/media/{id}/favourite/",
			get(favourite_status).post(add_favourite).delete(remove_favourite),
		)
		.with_state(state)
}

async fn issue_token(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
	let mut state = lock(&state);

	state.hit("token");

	let username = body.get("username").and_then(Value::as_str).unwrap_or_default().to_string();
	let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
	let known = state
		.accounts
		.get(&username)
		.map(|record| record.password == password)
		.unwrap_or(false);

	if !known {
		return detail(
			StatusCode::UNAUTHORIZED,
			"No active account found with the given credentials.",
		);
	}

	let access = new_token();
	let refresh = new_token();

	state.access_tokens.insert(access.clone(), username.clone());
	state.refresh_tokens.insert(refresh.clone(), username);

	Json(json!({ "access": access, "refresh": refresh })).into_response()
}

async fn refresh_token(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
	let mut state = lock(&state);

	state.hit("token_refresh");

	if state.refuse_refresh {
		return detail(StatusCode::UNAUTHORIZED, "Token is blacklisted.");
	}

	let refresh = body.get("refresh").and_then(Value::as_str).unwrap_or_default().to_string();
	let Some(username) = state.refresh_tokens.get(&refresh).cloned() else {
		return detail(StatusCode::UNAUTHORIZED, "Token is invalid or expired.");
	};
	let access = new_token();

	state.access_tokens.insert(access.clone(), username.clone());

	if state.rotate_refresh {
		let rotated = new_token();

		state.refresh_tokens.remove(&refresh);
		state.refresh_tokens.insert(rotated.clone(), username);

		return Json(json!({ "access": access, "refresh": rotated })).into_response();
	}

	Json(json!({ "access": access })).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<NewAccount>) -> Response {
	let mut state = lock(&state);

	state.hit("register");

	if state.accounts.contains_key(&body.username) {
		return detail(StatusCode::BAD_REQUEST, "A user with that username already exists.");
	}

	let user = User {
		username: body.username.clone(),
		email: Some(body.email.clone()),
		first_name: body.first_name.clone(),
		last_name: body.last_name.clone(),
		preferences: Some(UserPreferences::default()),
	};

	state.accounts.insert(body.username.clone(), AccountRecord {
		password: body.password.clone(),
		user: user.clone(),
	});

	(StatusCode::CREATED, Json(user)).into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
	let mut state = lock(&state);

	state.hit("logout");

	if let Err(response) = require_auth(&state, &headers) {
		return response;
	}
	if state.fail_logout {
		return detail(StatusCode::INTERNAL_SERVER_ERROR, "Logout is unavailable.");
	}

	let refresh = body.get("refresh").and_then(Value::as_str).unwrap_or_default().to_string();

	state.refresh_tokens.remove(&refresh);

	StatusCode::RESET_CONTENT.into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
	let mut state = lock(&state);

	state.hit("me");

	let username = match require_auth(&state, &headers) {
		Ok(username) => username,
		Err(response) => return response,
	};

	match state.accounts.get(&username) {
		Some(record) => Json(record.user.clone()).into_response(),
		None => detail(StatusCode::NOT_FOUND, "User not found."),
	}
}

async fn profile(State(state): State<Shared>, Path(username): Path<String>) -> Response {
	let mut state = lock(&state);

	state.hit("profile");

	let Some(record) = state.accounts.get(&username) else {
		return detail(StatusCode::NOT_FOUND, "User not found.");
	};
	let public = record.user.preferences.as_ref().map(|prefs| prefs.public_profile).unwrap_or(true);

	if !public {
		return detail(StatusCode::FORBIDDEN, "This profile is private.");
	}

	Json(record.user.clone()).into_response()
}

async fn delete_account(
	State(state): State<Shared>,
	Path(username): Path<String>,
	headers: HeaderMap,
) -> Response {
	let mut state = lock(&state);

	state.hit("delete_account");

	let viewer = match require_auth(&state, &headers) {
		Ok(viewer) => viewer,
		Err(response) => return response,
	};

	if viewer != username {
		return detail(StatusCode::FORBIDDEN, "You may only delete your own account.");
	}

	state.accounts.remove(&username);
	state.access_tokens.retain(|_, owner| owner != &username);
	state.refresh_tokens.retain(|_, owner| owner != &username);

	StatusCode::NO_CONTENT.into_response()
}

async fn update_preferences(
	State(state): State<Shared>,
	Path(username): Path<String>,
	headers: HeaderMap,
	Json(patch): Json<PreferencePatch>,
) -> Response {
	let mut state = lock(&state);

	state.hit("preferences_update");

	if let Err(response) = require_self(&state, &headers, &username) {
		return response;
	}
	if state.fail_preferences {
		return detail(StatusCode::INTERNAL_SERVER_ERROR, "Preference update failed.");
	}

	let Some(record) = state.accounts.get_mut(&username) else {
		return detail(StatusCode::NOT_FOUND, "User not found.");
	};
	let prefs = record.user.preferences.get_or_insert_with(UserPreferences::default);

	patch.apply(prefs);

	Json(prefs.clone()).into_response()
}

async fn change_password(
	State(state): State<Shared>,
	Path(username): Path<String>,
	headers: HeaderMap,
	Json(body): Json<Value>,
) -> Response {
	let mut state = lock(&state);

	state.hit("password");

	if let Err(response) = require_self(&state, &headers, &username) {
		return response;
	}

	let current = body.get("old_password").and_then(Value::as_str).unwrap_or_default();
	let next = body.get("new_password").and_then(Value::as_str).unwrap_or_default().to_string();
	let Some(record) = state.accounts.get_mut(&username) else {
		return detail(StatusCode::NOT_FOUND, "User not found.");
	};

	if record.password != current {
		return detail(StatusCode::BAD_REQUEST, "Old password is incorrect.");
	}

	record.password = next;

	StatusCode::NO_CONTENT.into_response()
}

async fn list_favourites(
	State(state): State<Shared>,
	Path(username): Path<String>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
) -> Response {
	let mut state = lock(&state);

	state.hit("favourites_list");

	if let Err(response) = require_self(&state, &headers, &username) {
		return response;
	}

	let limit = query_param(query.as_deref(), "limit")
		.and_then(|value| value.parse::<usize>().ok())
		.unwrap_or(20);
	let ids = state.favourites.get(&username).cloned().unwrap_or_default();
	let results: Vec<MediaItem> = ids
		.iter()
		.filter_map(|id| state.media.get(id).cloned())
		.take(limit)
		.collect();

	Json(json!({ "results": results })).into_response()
}

async fn search(
	State(state): State<Shared>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
) -> Response {
	let canonical = query.unwrap_or_default();
	let (results, delay) = {
		let mut state = lock(&state);

		state.hit("search");

		let viewer = match optional_auth(&state, &headers) {
			Ok(viewer) => viewer,
			Err(response) => return response,
		};
		let term = search_term(&canonical);
		let results = state.search_results.get(&term).cloned().unwrap_or_default();
		let delay = state.search_delays.get(&term).copied();

		if let Some(username) = viewer {
			state.record_history(&username, &canonical);
		}

		(results, delay)
	};

	// Sleeps happen outside the state lock so a delayed search never blocks
	// the rest of the fake API.
	if let Some(delay) = delay {
		tokio::time::sleep(delay).await;
	}

	let page = query_param(Some(&canonical), "page")
		.and_then(|value| value.parse::<u32>().ok())
		.unwrap_or(1);
	let page_size = query_param(Some(&canonical), "page_size")
		.and_then(|value| value.parse::<u32>().ok())
		.unwrap_or(lens_domain::DEFAULT_PAGE_SIZE);
	let total = results.len() as u64;

	Json(SearchPage {
		results,
		page,
		page_size,
		total_count: total,
		total_pages: if total == 0 { 0 } else { 1 },
	})
	.into_response()
}

async fn history(
	State(state): State<Shared>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
) -> Response {
	let mut state = lock(&state);

	state.hit("history");

	let username = match require_auth(&state, &headers) {
		Ok(username) => username,
		Err(response) => return response,
	};
	let page = query_param(query.as_deref(), "page")
		.and_then(|value| value.parse::<u32>().ok())
		.unwrap_or(1);
	let results: Vec<HistoryEntry> = state
		.history
		.iter()
		.rev()
		.filter(|(owner, _)| owner == &username)
		.map(|(_, entry)| entry.clone())
		.collect();
	let total_pages = if results.is_empty() { 0 } else { 1 };

	Json(HistoryPage { results, page, total_pages }).into_response()
}

async fn history_preview(
	State(state): State<Shared>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
) -> Response {
	let mut state = lock(&state);

	state.hit("history_preview");

	let username = match require_auth(&state, &headers) {
		Ok(username) => username,
		Err(response) => return response,
	};
	let limit = query_param(query.as_deref(), "limit")
		.and_then(|value| value.parse::<usize>().ok())
		.unwrap_or(5);
	let results: Vec<HistoryEntry> = state
		.history
		.iter()
		.rev()
		.filter(|(owner, _)| owner == &username)
		.map(|(_, entry)| entry.clone())
		.take(limit)
		.collect();

	Json(json!({ "results": results })).into_response()
}

async fn delete_history_entry(
	State(state): State<Shared>,
	Path(id): Path<i64>,
	headers: HeaderMap,
) -> Response {
	let mut state = lock(&state);

	state.hit("history_delete");

	let username = match require_auth(&state, &headers) {
		Ok(username) => username,
		Err(response) => return response,
	};
	let before = state.history.len();

	state.history.retain(|(owner, entry)| owner != &username || entry.id != id);

	if state.history.len() == before {
		return detail(StatusCode::NOT_FOUND, "History entry not found.");
	}

	StatusCode::NO_CONTENT.into_response()
}

async fn clear_history(State(state): State<Shared>, headers: HeaderMap) -> Response {
	let mut state = lock(&state);

	state.hit("history_clear");

	let username = match require_auth(&state, &headers) {
		Ok(username) => username,
		Err(response) => return response,
	};

	state.history.retain(|(owner, _)| owner != &username);

	StatusCode::NO_CONTENT.into_response()
}

async fn media_detail(State(state): State<Shared>, Path(id): Path<String>) -> Response {
	let mut state = lock(&state);

	state.hit("media_detail");

	match state.media.get(&id) {
		Some(item) => Json(item.clone()).into_response(),
		None => detail(StatusCode::NOT_FOUND, "Media not found."),
	}
}

async fn favourite_status(
	State(state): State<Shared>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Response {
	let mut state = lock(&state);

	state.hit("favourite_status");

	let username = match require_auth(&state, &headers) {
		Ok(username) => username,
		Err(response) => return response,
	};
	let favourite =
		state.favourites.get(&username).map(|ids| ids.contains(&id)).unwrap_or(false);

	Json(json!({ "favourite": favourite })).into_response()
}

async fn add_favourite(
	State(state): State<Shared>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Response {
	let mut state = lock(&state);

	state.hit("favourite_add");

	let username = match require_auth(&state, &headers) {
		Ok(username) => username,
		Err(response) => return response,
	};

	state.favourites.entry(username).or_default().insert(id);

	StatusCode::CREATED.into_response()
}

async fn remove_favourite(
	State(state): State<Shared>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Response {
	let mut state = lock(&state);

	state.hit("favourite_remove");

	let username = match require_auth(&state, &headers) {
		Ok(username) => username,
		Err(response) => return response,
	};

	if let Some(ids) = state.favourites.get_mut(&username) {
		ids.remove(&id);
	}

	StatusCode::NO_CONTENT.into_response()
}

async fn filter_tags(State(state): State<Shared>) -> Response {
	let mut state = lock(&state);

	state.hit("filters_tags");

	Json(json!({ "tags": state.filter_tags })).into_response()
}

async fn filter_sources(State(state): State<Shared>) -> Response {
	let mut state = lock(&state);

	state.hit("filters_sources");

	Json(json!({ "sources": state.filter_sources })).into_response()
}

impl ApiState {
	fn hit(&mut self, route: &'static str) {
		*self.hits.entry(route).or_default() += 1;
	}

	fn record_history(&mut self, username: &str, query: &str) {
		self.next_history_id += 1;
		self.history.push((username.to_string(), HistoryEntry {
			id: self.next_history_id,
			query: query.to_string(),
			searched_at: OffsetDateTime::now_utc(),
		}));
	}
}

fn lock(state: &Shared) -> MutexGuard<'_, ApiState> {
	state.lock().unwrap_or_else(|err| err.into_inner())
}

fn new_token() -> String {
	Uuid::new_v4().simple().to_string()
}

fn detail(status: StatusCode, message: &str) -> Response {
	(status, Json(json!({ "detail": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
	headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "))
}

fn require_auth(state: &ApiState, headers: &HeaderMap) -> Result<String, Response> {
	match bearer(headers) {
		Some(token) => validate_token(state, token),
		None =>
			Err(detail(StatusCode::UNAUTHORIZED, "Authentication credentials were not provided.")),
	}
}

fn require_self(state: &ApiState, headers: &HeaderMap, username: &str) -> Result<(), Response> {
	let viewer = require_auth(state, headers)?;

	if viewer != username {
		return Err(detail(StatusCode::FORBIDDEN, "You may only manage your own account."));
	}

	Ok(())
}

fn optional_auth(state: &ApiState, headers: &HeaderMap) -> Result<Option<String>, Response> {
	match bearer(headers) {
		Some(token) => validate_token(state, token).map(Some),
		None => Ok(None),
	}
}

fn validate_token(state: &ApiState, token: &str) -> Result<String, Response> {
	if state.always_unauthorized {
		return Err(detail(StatusCode::UNAUTHORIZED, "Given token not valid for any token type."));
	}

	match state.access_tokens.get(token) {
		Some(username) => Ok(username.clone()),
		None =>
			Err(detail(StatusCode::UNAUTHORIZED, "Given token not valid for any token type.")),
	}
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
	url::form_urlencoded::parse(query?.as_bytes())
		.find(|(key, _)| key == name)
		.map(|(_, value)| value.into_owned())
}

/// The active search term of a canonical query string: the first pair whose
/// key is one of the search-field keys.
fn search_term(canonical: &str) -> String {
	const FIELD_KEYS: [&str; 4] = ["query", "title", "tag", "creator"];

	url::form_urlencoded::parse(canonical.as_bytes())
		.find(|(key, _)| FIELD_KEYS.contains(&key.as_ref()))
		.map(|(_, value)| value.into_owned())
		.unwrap_or_default()
}
