//! Canonical query-string codec.
//!
//! `encode` and `decode` are mutual inverses for every normalized
//! [`QueryState`]. The canonical form omits defaults, joins each filter
//! dimension into one comma-separated value-sorted token, and emits keys in
//! alphabetical order, so the same intent always produces byte-identical
//! output. That string doubles as the result-cache key.

use std::collections::BTreeSet;

use url::form_urlencoded;

use crate::query::{
	DEFAULT_PAGE_SIZE, FilterKey, MediaType, QueryState, SearchField, SortBy, SortDirection,
};

pub fn encode(state: &QueryState) -> String {
	let state = state.normalized();
	let mut pairs: Vec<(&'static str, String)> =
		vec![(state.search_field.as_param(), state.search_value.clone())];

	for (key, values) in &state.filters {
		let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(",");

		pairs.push((key.as_param(), joined));
	}

	if state.mature == Some(true) {
		pairs.push(("mature", "true".to_string()));
	}
	if state.media_type != MediaType::Image {
		pairs.push(("media_type", state.media_type.as_param().to_string()));
	}
	if state.page > 1 {
		pairs.push(("page", state.page.to_string()));
	}
	if state.page_size != DEFAULT_PAGE_SIZE {
		pairs.push(("page_size", state.page_size.to_string()));
	}
	if state.sort_by != SortBy::Relevance {
		pairs.push(("sort_by", state.sort_by.as_param().to_string()));
	}
	if state.sort_dir != SortDirection::Desc {
		pairs.push(("sort_dir", state.sort_dir.as_param().to_string()));
	}

	pairs.sort_by(|a, b| a.0.cmp(b.0));

	let mut serializer = form_urlencoded::Serializer::new(String::new());

	for (key, value) in &pairs {
		serializer.append_pair(key, value);
	}

	serializer.finish()
}

/// Total by construction: unknown enum values fall back to their defaults,
/// unparseable numbers fall back to `page = 1` / the default page size, and
/// unrecognized keys are ignored. A malformed address therefore degrades to
/// the nearest well-formed intent instead of failing.
pub fn decode(input: &str) -> QueryState {
	let raw = input.strip_prefix('?').unwrap_or(input);
	let mut state = QueryState::default();
	let mut term: Option<(SearchField, String)> = None;

	for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
		match key.as_ref() {
			"query" | "title" | "tag" | "creator" => {
				// The first search key present claims the term; later ones
				// are ignored so a key never carries two active fields.
				if term.is_none()
					&& let Some(field) = SearchField::from_param(&key)
				{
					term = Some((field, value.into_owned()));
				}
			},
			"page" => state.page = value.parse().ok().filter(|page| *page >= 1).unwrap_or(1),
			"page_size" =>
				state.page_size =
					value.parse().ok().filter(|size| *size >= 1).unwrap_or(DEFAULT_PAGE_SIZE),
			"media_type" => state.media_type = MediaType::from_param(&value).unwrap_or_default(),
			"mature" => state.mature = (value == "true").then_some(true),
			"sort_by" => state.sort_by = SortBy::from_param(&value).unwrap_or_default(),
			"sort_dir" => state.sort_dir = SortDirection::from_param(&value).unwrap_or_default(),
			"extension" | "license" | "source" =>
				if let Some(filter) = FilterKey::from_param(&key)
					&& !state.filters.contains_key(&filter)
				{
					let values: BTreeSet<String> = value
						.split(',')
						.map(str::trim)
						.filter(|value| !value.is_empty())
						.map(str::to_string)
						.collect();

					if !values.is_empty() {
						state.filters.insert(filter, values);
					}
				},
			_ => {},
		}
	}

	if let Some((field, value)) = term {
		state.search_field = field;
		state.search_value = value;
	}

	state.normalize();

	state
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tagged(value: &str) -> QueryState {
		QueryState::new(SearchField::Tag, value)
	}

	#[test]
	fn minimal_state_encodes_term_only() {
		let state = QueryState::new(SearchField::Query, "galaxy");

		assert_eq!(encode(&state), "query=galaxy");
	}

	#[test]
	fn round_trip_preserves_every_field() {
		let mut state = tagged("nebula");

		state.media_type = MediaType::Audio;
		state.page = 3;
		state.page_size = 36;
		state.mature = Some(true);
		state.sort_by = SortBy::IndexedOn;
		state.sort_dir = SortDirection::Asc;
		state.filters.insert(
			FilterKey::License,
			BTreeSet::from(["by".to_string(), "cc0".to_string()]),
		);
		state.filters.insert(FilterKey::Extension, BTreeSet::from(["png".to_string()]));

		let decoded = decode(&encode(&state));

		assert_eq!(decoded, state.normalized());
	}

	#[test]
	fn filter_selection_order_does_not_change_the_key() {
		let mut first = tagged("nebula");
		let mut second = tagged("nebula");

		first.toggle_filter(FilterKey::License, "by-sa");
		first.toggle_filter(FilterKey::License, "by");
		second.toggle_filter(FilterKey::License, "by");
		second.toggle_filter(FilterKey::License, "by-sa");

		assert_eq!(encode(&first), encode(&second));
	}

	#[test]
	fn explicit_defaults_encode_like_omitted_defaults() {
		let mut explicit = QueryState::new(SearchField::Query, "galaxy");

		explicit.page = 1;
		explicit.page_size = DEFAULT_PAGE_SIZE;
		explicit.mature = Some(false);
		explicit.sort_by = SortBy::Relevance;
		explicit.sort_dir = SortDirection::Desc;

		let implicit = QueryState::new(SearchField::Query, "galaxy");

		assert_eq!(encode(&explicit), encode(&implicit));
	}

	#[test]
	fn only_the_active_search_field_is_emitted() {
		let state = QueryState::new(SearchField::Creator, "tycho");
		let key = encode(&state);

		assert_eq!(key, "creator=tycho");
		assert!(!key.contains("query="));
	}

	#[test]
	fn first_search_key_present_wins() {
		let state = decode("title=andromeda&query=ignored");

		assert_eq!(state.search_field, SearchField::Title);
		assert_eq!(state.search_value, "andromeda");
	}

	#[test]
	fn unknown_enum_values_fall_back_to_defaults() {
		let state = decode("query=galaxy&sort_by=banana&sort_dir=sideways&media_type=video");

		assert_eq!(state.sort_by, SortBy::Relevance);
		assert_eq!(state.sort_dir, SortDirection::Desc);
		assert_eq!(state.media_type, MediaType::Image);
	}

	#[test]
	fn invalid_numbers_fall_back_to_defaults() {
		let state = decode("query=galaxy&page=0&page_size=many");

		assert_eq!(state.page, 1);
		assert_eq!(state.page_size, DEFAULT_PAGE_SIZE);
	}

	#[test]
	fn comma_joined_filters_survive_percent_encoding() {
		let mut state = tagged("nebula");

		state.toggle_filter(FilterKey::Extension, "png");
		state.toggle_filter(FilterKey::Extension, "jpg");

		let key = encode(&state);

		assert!(key.contains("extension=jpg%2Cpng"));
		assert_eq!(decode(&key), state);
	}

	#[test]
	fn repeated_filter_keys_keep_the_first_occurrence() {
		let state = decode("query=galaxy&license=by&license=cc0");

		assert_eq!(
			state.filters[&FilterKey::License],
			BTreeSet::from(["by".to_string()])
		);
	}

	#[test]
	fn explicit_mature_false_normalizes_away() {
		let state = decode("mature=false&query=galaxy");

		assert_eq!(state.mature, None);
		assert_eq!(encode(&state), "query=galaxy");
	}

	#[test]
	fn leading_question_mark_is_tolerated() {
		let state = decode("?query=galaxy&page=2");

		assert_eq!(state.search_value, "galaxy");
		assert_eq!(state.page, 2);
	}
}
