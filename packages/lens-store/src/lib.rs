mod cache;
mod error;
mod store;

pub use cache::{CacheStats, CacheWrite};
pub use error::{Error, Result};
pub use store::ClientStore;
