use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 18;

/// Which field of a media record the search term applies to. Exactly one is
/// active per query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchField {
	#[default]
	Query,
	Title,
	Tag,
	Creator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
	#[default]
	Image,
	Audio,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
	#[default]
	Relevance,
	IndexedOn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
	Asc,
	#[default]
	Desc,
}

/// A multi-valued filter dimension. Ordered so that iteration over a filter
/// map is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterKey {
	Extension,
	License,
	Source,
}

/// The complete, addressable search intent. `mature: None` means "inherit
/// the signed-in viewer's stored preference"; it is resolved before the
/// state is encoded into a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
	pub search_field: SearchField,
	pub search_value: String,
	pub media_type: MediaType,
	pub page: u32,
	pub page_size: u32,
	pub mature: Option<bool>,
	pub sort_by: SortBy,
	pub sort_dir: SortDirection,
	pub filters: BTreeMap<FilterKey, BTreeSet<String>>,
}

impl SearchField {
	pub fn as_param(&self) -> &'static str {
		match self {
			Self::Query => "query",
			Self::Title => "title",
			Self::Tag => "tag",
			Self::Creator => "creator",
		}
	}

	pub fn from_param(param: &str) -> Option<Self> {
		match param {
			"query" => Some(Self::Query),
			"title" => Some(Self::Title),
			"tag" => Some(Self::Tag),
			"creator" => Some(Self::Creator),
			_ => None,
		}
	}
}

impl MediaType {
	pub fn as_param(&self) -> &'static str {
		match self {
			Self::Image => "image",
			Self::Audio => "audio",
		}
	}

	pub fn from_param(param: &str) -> Option<Self> {
		match param {
			"image" => Some(Self::Image),
			"audio" => Some(Self::Audio),
			_ => None,
		}
	}
}

impl SortBy {
	pub fn as_param(&self) -> &'static str {
		match self {
			Self::Relevance => "relevance",
			Self::IndexedOn => "indexed_on",
		}
	}

	pub fn from_param(param: &str) -> Option<Self> {
		match param {
			"relevance" => Some(Self::Relevance),
			"indexed_on" => Some(Self::IndexedOn),
			_ => None,
		}
	}
}

impl SortDirection {
	pub fn as_param(&self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}

	pub fn from_param(param: &str) -> Option<Self> {
		match param {
			"asc" => Some(Self::Asc),
			"desc" => Some(Self::Desc),
			_ => None,
		}
	}
}

impl FilterKey {
	pub fn as_param(&self) -> &'static str {
		match self {
			Self::Extension => "extension",
			Self::License => "license",
			Self::Source => "source",
		}
	}

	pub fn from_param(param: &str) -> Option<Self> {
		match param {
			"extension" => Some(Self::Extension),
			"license" => Some(Self::License),
			"source" => Some(Self::Source),
			_ => None,
		}
	}
}

impl Default for QueryState {
	fn default() -> Self {
		Self {
			search_field: SearchField::Query,
			search_value: String::new(),
			media_type: MediaType::Image,
			page: 1,
			page_size: DEFAULT_PAGE_SIZE,
			mature: None,
			sort_by: SortBy::Relevance,
			sort_dir: SortDirection::Desc,
			filters: BTreeMap::new(),
		}
	}
}

impl QueryState {
	pub fn new(field: SearchField, value: impl Into<String>) -> Self {
		Self { search_field: field, search_value: value.into(), ..Self::default() }
	}

	/// Adds the value to the dimension's set, or removes it if already
	/// selected. Any filter change returns the user to the first page.
	pub fn toggle_filter(&mut self, key: FilterKey, value: &str) {
		let values = self.filters.entry(key).or_default();

		if !values.remove(value) {
			values.insert(value.to_string());
		}
		if values.is_empty() {
			self.filters.remove(&key);
		}

		self.page = 1;
	}

	pub fn set_page(&mut self, page: u32) {
		self.page = page.max(1);
	}

	pub fn set_page_size(&mut self, page_size: u32) {
		self.page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
		self.page = 1;
	}

	pub fn set_media_type(&mut self, media_type: MediaType) {
		self.media_type = media_type;
		self.page = 1;
	}

	/// Resolves an inherited mature-content setting against the viewer's
	/// preference. Explicit values are left untouched.
	pub fn with_mature_default(mut self, visible: bool) -> Self {
		if self.mature.is_none() && visible {
			self.mature = Some(true);
		}

		self
	}

	pub fn mature_visible(&self) -> bool {
		self.mature.unwrap_or(false)
	}

	/// Folds explicit defaults back into their unset form so that equal
	/// intents compare and encode equally.
	pub fn normalize(&mut self) {
		if self.page == 0 {
			self.page = 1;
		}
		if self.page_size == 0 {
			self.page_size = DEFAULT_PAGE_SIZE;
		}
		if self.mature == Some(false) {
			self.mature = None;
		}

		for values in self.filters.values_mut() {
			values.retain(|value| !value.trim().is_empty());
		}

		self.filters.retain(|_, values| !values.is_empty());
	}

	pub fn normalized(&self) -> Self {
		let mut state = self.clone();

		state.normalize();

		state
	}
}
