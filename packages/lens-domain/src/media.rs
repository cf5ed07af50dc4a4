use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{query::MediaType, time_serde};

/// One element of a search result page. Everything except the identifier is
/// optional or defaulted so partial payloads from older records still
/// decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
	pub id: String,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default, with = "time_serde::option")]
	pub indexed_on: Option<OffsetDateTime>,
	#[serde(default)]
	pub foreign_landing_url: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub creator: Option<String>,
	#[serde(default)]
	pub creator_url: Option<String>,
	#[serde(default)]
	pub license: Option<String>,
	#[serde(default)]
	pub license_version: Option<String>,
	#[serde(default)]
	pub license_url: Option<String>,
	#[serde(default)]
	pub attribution: Option<String>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default)]
	pub file_size: Option<i64>,
	#[serde(default)]
	pub file_type: Option<String>,
	#[serde(default)]
	pub mature: bool,
	#[serde(default)]
	pub thumbnail_url: Option<String>,
	#[serde(default)]
	pub height: Option<u32>,
	#[serde(default)]
	pub width: Option<u32>,
	#[serde(default)]
	pub duration: Option<f64>,
	#[serde(default)]
	pub media_type: MediaType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
	#[serde(default)]
	pub results: Vec<MediaItem>,
	pub page: u32,
	pub page_size: u32,
	#[serde(default)]
	pub total_count: u64,
	#[serde(default)]
	pub total_pages: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub sources: Vec<String>,
}

impl SearchPage {
	/// A full page suggests at least one further page; a short page is the
	/// final one. Heuristic only: the remote API does not report a reliable
	/// total for every search-key type.
	pub fn has_more(&self) -> bool {
		self.page_size > 0 && self.results.len() as u32 == self.page_size
	}
}
