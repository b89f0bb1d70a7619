use axum::http::StatusCode;
use serde_json::json;
use std::time::Duration;

use wardscore::{user::cached::user_cache_key, CacheStore, UserRepository};

mod utils;

use utils::*;

#[tokio::test]
async fn test_repeat_lookup_is_served_from_cache() {
    let setup = TestSetupBuilder::new().build();
    let user_id = setup.create_user("Alpha").await;

    let (status, first) = setup.get(&format!("/api/v1/users/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(setup.store.get_user_calls(), 1);

    let (_, second) = setup.get(&format!("/api/v1/users/{user_id}")).await;
    assert_eq!(second, first);
    assert_eq!(setup.store.get_user_calls(), 1);
}

#[tokio::test]
async fn test_update_never_serves_stale_user() {
    let setup = TestSetupBuilder::new().build();
    let user_id = setup.create_user("Alpha").await;

    let original = setup.users.get_user(user_id).await.unwrap().unwrap();
    setup.users.get_user(user_id).await.unwrap();
    assert_eq!(setup.store.get_user_calls(), 1);

    let mut renamed = original.clone();
    renamed.game_name = "Renamed".to_string();
    setup.users.update_user(&renamed).await.unwrap();
    assert!(!setup.cache.exists(&user_cache_key(user_id)).await.unwrap());

    let fetched = setup.users.get_user(user_id).await.unwrap().unwrap();
    assert_eq!(fetched.game_name, "Renamed");
    assert_eq!(setup.store.get_user_calls(), 2);
}

#[tokio::test]
async fn test_profile_update_over_http_is_visible() {
    let setup = TestSetupBuilder::new().build();
    let user_id = setup.create_user("Alpha").await;
    setup.get(&format!("/api/v1/users/{user_id}")).await;

    let (status, updated) = setup
        .send(
            "PUT",
            &format!("/api/v1/users/{user_id}"),
            Some(json!({"game_name": "Renamed", "is_pro": true})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["riot_id"], "Renamed#BR1");

    let (_, fetched) = setup.get(&format!("/api/v1/users/{user_id}")).await;
    assert_eq!(fetched["game_name"], "Renamed");
    assert_eq!(fetched["is_pro"], true);
}

#[tokio::test]
async fn test_delete_evicts_cached_user() {
    let setup = TestSetupBuilder::new().build();
    let user_id = setup.create_user("Alpha").await;
    setup.get(&format!("/api/v1/users/{user_id}")).await;

    let (status, _) = setup
        .send("DELETE", &format!("/api/v1/users/{user_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, error) = setup.get(&format!("/api/v1/users/{user_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_expired_entries_go_back_to_store() {
    let setup = TestSetupBuilder::new()
        .with_cache_ttl(Duration::ZERO)
        .build();
    let user_id = setup.create_user("Alpha").await;

    setup.get(&format!("/api/v1/users/{user_id}")).await;
    setup.get(&format!("/api/v1/users/{user_id}")).await;

    assert_eq!(setup.store.get_user_calls(), 2);
}

#[tokio::test]
async fn test_undecodable_entry_falls_back_to_store() {
    let setup = TestSetupBuilder::new().build();
    let user_id = setup.create_user("Alpha").await;
    setup
        .cache
        .set(
            &user_cache_key(user_id),
            b"garbage".to_vec(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    let (status, user) = setup.get(&format!("/api/v1/users/{user_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["riot_id"], "Alpha#BR1");
    assert_eq!(setup.store.get_user_calls(), 1);
}
