//! Session lifecycle: a state machine over `SignedOut`, `Hydrating` and
//! `SignedIn`, owning the last-known-good user and preference copies.

use std::sync::{Arc, RwLock};

use lens_domain::{NewAccount, PreferencePatch, ProfileView, User, UserPreferences};
use lens_remote::{AuthClient, accounts};
use lens_store::ClientStore;

use crate::{ServiceError, ServiceResult, lock_read, lock_write, optimistic_commit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
	#[default]
	SignedOut,
	Hydrating,
	SignedIn,
}

#[derive(Debug, Default)]
struct SessionInner {
	phase: SessionPhase,
	user: Option<User>,
}

pub struct Session {
	store: Arc<ClientStore>,
	remote: Arc<AuthClient>,
	inner: RwLock<SessionInner>,
	prefs: RwLock<UserPreferences>,
}

impl Session {
	pub(crate) fn new(store: Arc<ClientStore>, remote: Arc<AuthClient>) -> Self {
		Self {
			store,
			remote,
			inner: RwLock::new(SessionInner::default()),
			prefs: RwLock::new(UserPreferences::default()),
		}
	}

	/// Restores a signed-in session from durable credentials. Returns
	/// `Ok(false)` when no credentials exist or they no longer authenticate;
	/// in the latter case the stored pair is purged so the next start skips
	/// straight to signed-out.
	pub async fn hydrate(&self) -> ServiceResult<bool> {
		if self.store.access_token()?.is_none() {
			return Ok(false);
		}

		self.set_phase(SessionPhase::Hydrating);

		match accounts::me(&self.remote).await {
			Ok(user) => {
				self.install_user(user);

				Ok(true)
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Session hydration failed, purging stored credentials."
				);

				self.store.clear_credentials()?;
				self.reset();

				Ok(false)
			},
		}
	}

	/// Exchanges a username/password pair for credentials and loads the
	/// account's profile. Rejected credentials surface the server's detail
	/// message; nothing is persisted unless the whole exchange succeeds.
	pub async fn sign_in(&self, username: &str, password: &str) -> ServiceResult<()> {
		let credentials = match accounts::issue_token(&self.remote, username, password).await {
			Ok(credentials) => credentials,
			Err(lens_remote::Error::Status { status: 400 | 401, detail }) =>
				return Err(ServiceError::InvalidCredentials { message: detail }),
			Err(err) => return Err(err.into()),
		};

		self.store.store_credentials(&credentials)?;

		// A pair that cannot fetch its own profile is useless; purge it
		// rather than leaving half a session behind.
		match accounts::me(&self.remote).await {
			Ok(user) => {
				self.install_user(user);

				Ok(())
			},
			Err(err) => {
				self.store.clear_credentials()?;
				self.reset();

				Err(err.into())
			},
		}
	}

	/// Registers an account. Does not sign in; callers follow up with
	/// [`Session::sign_in`] explicitly.
	pub async fn sign_up(&self, account: &NewAccount) -> ServiceResult<User> {
		Ok(accounts::register(&self.remote, account).await?)
	}

	/// Signs out locally no matter what the server says; the remote
	/// invalidation call is best effort.
	pub async fn sign_out(&self) -> ServiceResult<()> {
		if let Ok(Some(refresh)) = self.store.refresh_token()
			&& let Err(err) = accounts::logout(&self.remote, &refresh).await
		{
			tracing::warn!(
				error = %err,
				"Server-side logout failed, clearing the local session anyway."
			);
		}

		self.store.clear_credentials()?;
		self.reset();

		Ok(())
	}

	/// Applies a preference patch locally first, so dependent reads see the
	/// new values immediately, then reconciles with the server's canonical
	/// copy. On failure the previous preferences are restored.
	pub async fn update_preferences(&self, patch: PreferencePatch) -> ServiceResult<()> {
		if patch.is_empty() {
			return Ok(());
		}

		let username = self.require_username()?;
		let mut next = lock_read(&self.prefs).clone();

		patch.apply(&mut next);

		optimistic_commit(&self.prefs, next, async {
			Ok(accounts::update_preferences(&self.remote, &username, &patch).await?)
		})
		.await
	}

	pub async fn change_password(&self, current: &str, next: &str) -> ServiceResult<()> {
		let username = self.require_username()?;

		accounts::change_password(&self.remote, &username, current, next).await?;

		Ok(())
	}

	/// Deletes the account server-side, then purges the local session the
	/// same way sign-out does.
	pub async fn delete_account(&self) -> ServiceResult<()> {
		let username = self.require_username()?;

		accounts::delete_account(&self.remote, &username).await?;
		self.store.clear_credentials()?;
		self.reset();

		Ok(())
	}

	pub async fn profile(&self, username: &str) -> ServiceResult<ProfileView> {
		Ok(accounts::profile(&self.remote, username).await?)
	}

	pub fn phase(&self) -> SessionPhase {
		lock_read(&self.inner).phase
	}

	pub fn is_signed_in(&self) -> bool {
		self.phase() == SessionPhase::SignedIn
	}

	pub fn user(&self) -> Option<User> {
		lock_read(&self.inner).user.clone()
	}

	/// Last-known-good preferences; anonymous sessions read the static
	/// defaults.
	pub fn preferences(&self) -> UserPreferences {
		lock_read(&self.prefs).clone()
	}

	pub(crate) fn require_username(&self) -> ServiceResult<String> {
		let inner = lock_read(&self.inner);

		match &inner.user {
			Some(user) => Ok(user.username.clone()),
			None => Err(ServiceError::InvalidRequest {
				message: "This operation requires a signed-in session.".to_string(),
			}),
		}
	}

	fn install_user(&self, user: User) {
		let prefs = user.preferences.clone().unwrap_or_default();

		{
			let mut inner = lock_write(&self.inner);
			inner.phase = SessionPhase::SignedIn;
			inner.user = Some(user);
		}

		*lock_write(&self.prefs) = prefs;
	}

	fn reset(&self) {
		{
			let mut inner = lock_write(&self.inner);
			inner.phase = SessionPhase::SignedOut;
			inner.user = None;
		}

		*lock_write(&self.prefs) = UserPreferences::default();
	}

	fn set_phase(&self, phase: SessionPhase) {
		lock_write(&self.inner).phase = phase;
	}
}
