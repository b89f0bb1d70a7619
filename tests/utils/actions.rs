use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use super::setup::TestSetup;

// ============================================================================
// HTTP Actions
// ============================================================================

impl TestSetup {
    /// Sends one request through the router and decodes the JSON body (Null when empty)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        user_id: Option<i64>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("X-User-ID", user_id.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None, None).await
    }

    /// Registers a user named `name` with tag BR1 and returns its id
    pub async fn create_user(&self, name: &str) -> i64 {
        let (status, user) = self
            .send(
                "POST",
                "/api/v1/users",
                Some(json!({
                    "game_name": name,
                    "tag_line": "BR1",
                    "email": format!("{}@example.com", name.to_lowercase()),
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {user}");
        user["id"].as_i64().unwrap()
    }

    /// Uploads replay metadata for `user_id` and returns the replay id
    pub async fn upload_replay(&self, user_id: i64, match_id: &str, duration: i32) -> i64 {
        let (status, replay) = self
            .send(
                "POST",
                "/api/v1/replays",
                Some(json!({
                    "file_name": format!("{match_id}.rofl"),
                    "match_id": match_id,
                    "duration": duration,
                    "champion": "Thresh",
                    "role": "SUPPORT",
                })),
                Some(user_id),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {replay}");
        replay["id"].as_i64().unwrap()
    }

    pub async fn process_replay(&self, replay_id: i64) -> (StatusCode, Value) {
        self.send(
            "POST",
            &format!("/api/v1/analysis/process/{replay_id}"),
            None,
            None,
        )
        .await
    }
}
