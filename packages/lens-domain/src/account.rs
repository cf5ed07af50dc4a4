use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::time_serde;

/// The durable credential pair. `refresh` is optional because a refresh
/// response only carries a new refresh token when the server rotates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
	pub access: String,
	#[serde(default)]
	pub refresh: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
	#[serde(default = "default_true")]
	pub public_profile: bool,
	#[serde(default)]
	pub show_sensitive: bool,
	#[serde(default = "default_true")]
	pub blur_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub username: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
	#[serde(default)]
	pub preferences: Option<UserPreferences>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
	pub username: String,
	pub email: String,
	pub password: String,
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
}

/// A partial preference update. Unset fields are left out of the PATCH body
/// and untouched locally.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PreferencePatch {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub public_profile: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub show_sensitive: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub blur_sensitive: Option<bool>,
}

/// Another user's profile as this viewer may see it. The remote answers 403
/// for profiles their owner has made private; that is a view, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileView {
	Private,
	Public(User),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
	pub id: i64,
	pub query: String,
	#[serde(with = "time_serde")]
	pub searched_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
	#[serde(default)]
	pub results: Vec<HistoryEntry>,
	pub page: u32,
	#[serde(default)]
	pub total_pages: u32,
}

impl Default for UserPreferences {
	fn default() -> Self {
		Self { public_profile: true, show_sensitive: false, blur_sensitive: true }
	}
}

impl PreferencePatch {
	pub fn apply(&self, prefs: &mut UserPreferences) {
		if let Some(public_profile) = self.public_profile {
			prefs.public_profile = public_profile;
		}
		if let Some(show_sensitive) = self.show_sensitive {
			prefs.show_sensitive = show_sensitive;
		}
		if let Some(blur_sensitive) = self.blur_sensitive {
			prefs.blur_sensitive = blur_sensitive;
		}
	}

	pub fn is_empty(&self) -> bool {
		self.public_profile.is_none()
			&& self.show_sensitive.is_none()
			&& self.blur_sensitive.is_none()
	}
}

fn default_true() -> bool {
	true
}
