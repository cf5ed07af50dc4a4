mod support;

use lens_service::ServiceError;
use lens_testkit::media_fixture;

use crate::support::harness;

#[tokio::test]
async fn favourite_roundtrip_is_visible_in_the_list() {
	let scene = harness().await;

	scene.api.seed_media(media_fixture("m-1", "Galaxy"));
	scene.sign_in("ada", "pw").await;

	assert!(!scene.service.is_favourite("m-1").await.expect("status"));

	scene.service.favourite("m-1").await.expect("favourite");

	assert!(scene.service.is_favourite("m-1").await.expect("status"));

	let favourites = scene.service.favourites(20).await.expect("list");

	assert_eq!(favourites.len(), 1);
	assert_eq!(favourites[0].id, "m-1");

	scene.service.unfavourite("m-1").await.expect("unfavourite");

	assert!(!scene.service.is_favourite("m-1").await.expect("status"));
	assert!(scene.service.favourites(20).await.expect("list").is_empty());
}

#[tokio::test]
async fn media_detail_returns_the_seeded_record() {
	let scene = harness().await;

	scene.api.seed_media(media_fixture("m-1", "Galaxy"));

	let item = scene.service.media_detail("m-1").await.expect("detail");

	assert_eq!(item.title.as_deref(), Some("Galaxy"));
	assert_eq!(item.source.as_deref(), Some("flickr"));
}

#[tokio::test]
async fn unknown_media_surfaces_not_found() {
	let scene = harness().await;

	let err = scene.service.media_detail("missing").await.expect_err("detail");

	assert!(matches!(err, ServiceError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn filter_catalogues_come_from_the_api() {
	let scene = harness().await;

	scene.api.seed_filters(
		vec!["nature".to_string(), "space".to_string()],
		vec!["flickr".to_string(), "met".to_string()],
	);

	let options = scene.service.filter_options().await.expect("filter options");

	assert_eq!(options.tags, ["nature", "space"]);
	assert_eq!(options.sources, ["flickr", "met"]);
}

#[tokio::test]
async fn failing_favourites_list_degrades_to_empty() {
	let scene = harness().await;

	scene.sign_in("ada", "pw").await;
	scene.api.set_always_unauthorized(true);

	assert!(scene.service.favourites(20).await.expect("list").is_empty());
}

#[tokio::test]
async fn favourites_list_requires_a_session() {
	let scene = harness().await;

	let err = scene.service.favourites(20).await.expect_err("list");

	assert!(matches!(err, ServiceError::InvalidRequest { .. }), "got {err:?}");
}
