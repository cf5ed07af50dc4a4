pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Cache quota of {quota} bytes still exceeded by a {attempted}-byte entry after one eviction.")]
	QuotaExceeded { quota: u64, attempted: u64 },
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
}

impl From<redb::DatabaseError> for Error {
	fn from(err: redb::DatabaseError) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<redb::TransactionError> for Error {
	fn from(err: redb::TransactionError) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<redb::TableError> for Error {
	fn from(err: redb::TableError) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<redb::StorageError> for Error {
	fn from(err: redb::StorageError) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<redb::CommitError> for Error {
	fn from(err: redb::CommitError) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
