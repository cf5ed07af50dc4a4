mod support;

use lens_domain::{NewAccount, PreferencePatch, ProfileView, UserPreferences};
use lens_service::{ServiceError, SessionPhase};

use crate::support::harness;

#[tokio::test]
async fn sign_in_makes_preferences_available_immediately() {
	let scene = harness().await;

	scene.api.add_account("ada", "correct horse");
	scene.api.set_preferences("ada", UserPreferences {
		show_sensitive: true,
		..UserPreferences::default()
	});

	scene.service.session.sign_in("ada", "correct horse").await.expect("sign-in");

	assert!(scene.service.session.is_signed_in());
	assert!(scene.service.session.preferences().show_sensitive);
	assert!(scene.service.store.access_token().expect("store read").is_some());
	assert!(scene.service.store.refresh_token().expect("store read").is_some());
}

#[tokio::test]
async fn rejected_credentials_surface_the_server_detail_and_store_nothing() {
	let scene = harness().await;

	scene.api.add_account("ada", "correct horse");

	let err = scene
		.service
		.session
		.sign_in("ada", "wrong")
		.await
		.expect_err("sign-in should be rejected");

	let ServiceError::InvalidCredentials { message } = err else {
		panic!("expected InvalidCredentials, got {err:?}");
	};

	assert!(message.contains("No active account"));
	assert!(scene.service.store.access_token().expect("store read").is_none());
	assert_eq!(scene.service.session.phase(), SessionPhase::SignedOut);
}

#[tokio::test]
async fn hydrate_without_stored_credentials_is_a_quiet_no_op() {
	let scene = harness().await;

	assert!(!scene.service.session.hydrate().await.expect("hydrate"));
	assert_eq!(scene.api.hits("me"), 0);
	assert_eq!(scene.service.session.phase(), SessionPhase::SignedOut);
}

#[tokio::test]
async fn hydrate_restores_a_session_from_stored_credentials() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;

	let restarted = scene.restarted();

	assert!(restarted.session.hydrate().await.expect("hydrate"));
	assert!(restarted.session.is_signed_in());
	assert_eq!(restarted.session.user().expect("user").username, "ada");
}

#[tokio::test]
async fn hydrate_with_dead_credentials_purges_them() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;
	scene.api.expire_access_tokens();
	scene.api.set_refuse_refresh(true);

	let restarted = scene.restarted();

	assert!(!restarted.session.hydrate().await.expect("hydrate"));
	assert_eq!(restarted.session.phase(), SessionPhase::SignedOut);
	assert!(scene.service.store.access_token().expect("store read").is_none());
	assert!(scene.service.store.refresh_token().expect("store read").is_none());
}

#[tokio::test]
async fn expired_access_token_is_refreshed_once_and_the_call_replayed() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;

	let first_refresh = scene.service.store.refresh_token().expect("store read");

	scene.api.set_rotate_refresh(true);
	scene.api.expire_access_tokens();

	scene.service.history(1).await.expect("history should succeed after refresh");

	assert_eq!(scene.api.hits("token_refresh"), 1);
	assert_eq!(scene.api.hits("history"), 2);

	let rotated_refresh = scene.service.store.refresh_token().expect("store read");

	assert!(rotated_refresh.is_some());
	assert_ne!(first_refresh, rotated_refresh);
}

#[tokio::test]
async fn refresh_exchanges_stop_at_the_bound_and_the_last_401_surfaces() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;
	scene.api.set_always_unauthorized(true);

	let err = scene.service.history(1).await.expect_err("history should give up");

	assert!(matches!(err, ServiceError::SessionExpired { .. }), "got {err:?}");
	assert_eq!(scene.api.hits("token_refresh"), 5);
	assert_eq!(scene.api.hits("history"), 6);
}

#[tokio::test]
async fn sign_out_clears_local_state_even_when_the_server_call_fails() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;
	scene.api.set_fail_logout(true);

	scene.service.session.sign_out().await.expect("sign-out");

	assert_eq!(scene.api.hits("logout"), 1);
	assert_eq!(scene.service.session.phase(), SessionPhase::SignedOut);
	assert!(scene.service.store.access_token().expect("store read").is_none());
	assert!(scene.service.store.refresh_token().expect("store read").is_none());
}

#[tokio::test]
async fn failed_preference_update_rolls_back_the_optimistic_copy() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;
	scene.api.set_fail_preferences(true);

	let patch = PreferencePatch { show_sensitive: Some(true), ..PreferencePatch::default() };
	let err = scene
		.service
		.session
		.update_preferences(patch)
		.await
		.expect_err("update should fail");

	assert!(matches!(err, ServiceError::Server { status: 500, .. }), "got {err:?}");
	assert!(!scene.service.session.preferences().show_sensitive);
}

#[tokio::test]
async fn successful_preference_update_keeps_the_reconciled_copy() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;

	let patch = PreferencePatch { show_sensitive: Some(true), ..PreferencePatch::default() };

	scene.service.session.update_preferences(patch).await.expect("update");

	assert!(scene.service.session.preferences().show_sensitive);
	assert_eq!(scene.api.hits("preferences_update"), 1);
}

#[tokio::test]
async fn empty_preference_patch_never_reaches_the_network() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;
	scene
		.service
		.session
		.update_preferences(PreferencePatch::default())
		.await
		.expect("empty patch");

	assert_eq!(scene.api.hits("preferences_update"), 0);
}

#[tokio::test]
async fn sign_up_registers_without_signing_in() {
	let scene = harness().await;
	let account = NewAccount {
		username: "newbie".to_string(),
		email: "newbie@example.org".to_string(),
		password: "fresh password".to_string(),
		first_name: None,
		last_name: None,
	};
	let user = scene.service.session.sign_up(&account).await.expect("sign-up");

	assert_eq!(user.username, "newbie");
	assert_eq!(scene.service.session.phase(), SessionPhase::SignedOut);
	assert!(scene.service.store.access_token().expect("store read").is_none());

	scene.service.session.sign_in("newbie", "fresh password").await.expect("sign-in");

	assert!(scene.service.session.is_signed_in());
}

#[tokio::test]
async fn profile_visibility_follows_the_owner_preference() {
	let scene = harness().await;

	scene.api.add_account("bob", "pw");
	scene.api.set_preferences("bob", UserPreferences {
		public_profile: false,
		..UserPreferences::default()
	});
	scene.api.add_account("carol", "pw");

	assert_eq!(
		scene.service.session.profile("bob").await.expect("profile"),
		ProfileView::Private
	);

	let ProfileView::Public(user) =
		scene.service.session.profile("carol").await.expect("profile")
	else {
		panic!("expected a public profile");
	};

	assert_eq!(user.username, "carol");
}

#[tokio::test]
async fn change_password_takes_effect_for_the_next_sign_in() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;

	let err = scene
		.service
		.session
		.change_password("not the old one", "next")
		.await
		.expect_err("wrong old password should be rejected");

	assert!(matches!(err, ServiceError::InvalidRequest { .. }), "got {err:?}");

	scene.service.session.change_password("correct horse", "battery staple").await.expect("change");
	scene.service.session.sign_out().await.expect("sign-out");
	scene.service.session.sign_in("ada", "battery staple").await.expect("sign-in");

	assert!(scene.service.session.is_signed_in());
}

#[tokio::test]
async fn delete_account_purges_the_local_session() {
	let scene = harness().await;

	scene.sign_in("ada", "correct horse").await;
	scene.service.session.delete_account().await.expect("delete");

	assert_eq!(scene.api.hits("delete_account"), 1);
	assert_eq!(scene.service.session.phase(), SessionPhase::SignedOut);
	assert!(scene.service.store.access_token().expect("store read").is_none());

	let err = scene
		.service
		.session
		.sign_in("ada", "correct horse")
		.await
		.expect_err("the account should be gone");

	assert!(matches!(err, ServiceError::InvalidCredentials { .. }), "got {err:?}");
}
