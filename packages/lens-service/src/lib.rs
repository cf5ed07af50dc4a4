pub mod favourites;
pub mod history;
pub mod media;
pub mod search;
pub mod session;

use std::{
	future::Future,
	mem,
	sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, atomic::AtomicU64},
};

use lens_config::Config;
use lens_remote::AuthClient;
use lens_store::ClientStore;

pub use search::SearchOutcome;
pub use session::{Session, SessionPhase};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
	InvalidCredentials { message: String },
	SessionExpired { message: String },
	InvalidRequest { message: String },
	NotFound { message: String },
	Network { message: String },
	Decode { message: String },
	Server { status: u16, message: String },
	Storage { message: String },
	StorageQuota { message: String },
}

/// Composition root: one constructed instance owns the configuration, the
/// durable store, the authenticated HTTP client and the session.
pub struct LensService {
	pub cfg: Config,
	pub store: Arc<ClientStore>,
	pub remote: Arc<AuthClient>,
	pub session: Session,
	generation: AtomicU64,
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidCredentials { message } => write!(f, "Sign-in rejected: {message}"),
			Self::SessionExpired { message } => write!(f, "Session expired: {message}"),
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::NotFound { message } => write!(f, "Not found: {message}"),
			Self::Network { message } => write!(f, "Network error: {message}"),
			Self::Decode { message } => write!(f, "Undecodable response: {message}"),
			Self::Server { status, message } => write!(f, "Server error ({status}): {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
			Self::StorageQuota { message } => write!(f, "Cache quota exceeded: {message}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<lens_remote::Error> for ServiceError {
	fn from(err: lens_remote::Error) -> Self {
		match err {
			lens_remote::Error::Reqwest(err) => Self::Network { message: err.to_string() },
			lens_remote::Error::SerdeJson(err) => Self::Decode { message: err.to_string() },
			lens_remote::Error::Store(err) => err.into(),
			lens_remote::Error::Status { status: 400, detail } =>
				Self::InvalidRequest { message: detail },
			lens_remote::Error::Status { status: 401, detail } =>
				Self::SessionExpired { message: detail },
			lens_remote::Error::Status { status: 404, detail } =>
				Self::NotFound { message: detail },
			lens_remote::Error::Status { status, detail } =>
				Self::Server { status, message: detail },
		}
	}
}

impl From<lens_store::Error> for ServiceError {
	fn from(err: lens_store::Error) -> Self {
		match &err {
			lens_store::Error::QuotaExceeded { .. } =>
				Self::StorageQuota { message: err.to_string() },
			_ => Self::Storage { message: err.to_string() },
		}
	}
}

impl LensService {
	pub fn new(cfg: Config, store: Arc<ClientStore>, remote: Arc<AuthClient>) -> Self {
		let session = Session::new(store.clone(), remote.clone());

		Self { cfg, store, remote, session, generation: AtomicU64::new(0) }
	}
}

/// Installs an optimistic value in a shared slot, runs the commit future,
/// then either installs the reconciled value the commit produced or rolls
/// the slot back to its prior snapshot. The lock is never held across the
/// await.
pub(crate) async fn optimistic_commit<T, F>(
	slot: &RwLock<T>,
	next: T,
	commit: F,
) -> ServiceResult<()>
where
	F: Future<Output = ServiceResult<T>>,
{
	let snapshot = mem::replace(&mut *lock_write(slot), next);

	match commit.await {
		Ok(reconciled) => {
			*lock_write(slot) = reconciled;

			Ok(())
		},
		Err(err) => {
			*lock_write(slot) = snapshot;

			Err(err)
		},
	}
}

// Poisoned locks keep serving the last written value; session state stays
// usable after a panicked writer.
pub(crate) fn lock_read<T>(slot: &RwLock<T>) -> RwLockReadGuard<'_, T> {
	slot.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn lock_write<T>(slot: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
	slot.write().unwrap_or_else(PoisonError::into_inner)
}
