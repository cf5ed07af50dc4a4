pub mod codec;
pub mod time_serde;

mod account;
mod media;
mod query;

pub use account::{
	HistoryEntry, HistoryPage, NewAccount, PreferencePatch, ProfileView, SessionCredentials, User,
	UserPreferences,
};
pub use media::{FilterOptions, MediaItem, SearchPage};
pub use query::{
	DEFAULT_PAGE_SIZE, FilterKey, MediaType, QueryState, SearchField, SortBy, SortDirection,
};
