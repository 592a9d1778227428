//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use crossposter::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const API_TOKEN: &str = "test-api-token-0123456789abcdef";

/// A request the fake upstream received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub query: Vec<(String, String)>,
}

/// Fake Twitter API serving a scripted user timeline
#[derive(Clone, Default)]
pub struct FakeTwitter {
    timeline: Arc<Mutex<Value>>,
    status: Arc<Mutex<Option<StatusCode>>>,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeTwitter {
    /// Serve a timeline whose newest tweet has `id`
    pub fn with_latest(id: &str) -> Self {
        let fake = Self::default();
        fake.set_timeline(json!([{ "id": 1, "id_str": id, "text": "hello" }]));
        fake
    }

    pub fn set_timeline(&self, timeline: Value) {
        *self.timeline.lock().unwrap() = timeline;
    }

    /// Answer every request with `status` instead of the timeline
    pub fn fail_with(&self, status: StatusCode) {
        *self.status.lock().unwrap() = Some(status);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/1.1/statuses/user_timeline.json", get(user_timeline))
            .with_state(self.clone())
    }
}

async fn user_timeline(
    State(fake): State<FakeTwitter>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    fake.requests.lock().unwrap().push(RecordedRequest {
        authorization: headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .map(ToOwned::to_owned),
        query,
    });

    if let Some(status) = *fake.status.lock().unwrap() {
        return (status, Json(json!({"errors": [{"code": 89}]}))).into_response();
    }

    let timeline = fake.timeline.lock().unwrap().clone();
    Json(timeline).into_response()
}

/// Serve `router` on an ephemeral port and return its base URL
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub twitter: FakeTwitter,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with registration open
    pub async fn new() -> Self {
        Self::with_registration(true).await
    }

    pub async fn with_registration(allow_new_users: bool) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let twitter = FakeTwitter::default();
        twitter.set_timeline(json!([]));
        let twitter_base_url = spawn_upstream(twitter.router()).await;

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                allow_new_users,
                api_token: API_TOKEN.to_string(),
            },
            twitter: config::TwitterConfig {
                client_id: "test-consumer-key".to_string(),
                client_secret: "test-consumer-secret".to_string(),
                api_base_url: twitter_base_url,
            },
            http: config::HttpClientConfig {
                timeout_seconds: 5,
                user_agent: "Crossposter/test".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Build router and spawn server in background
        let app = crossposter::build_router(state.clone());
        let addr = spawn_upstream(app).await;

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr,
            state,
            twitter,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// POST a twitter callback with the API token
    pub async fn twitter_callback(
        &self,
        uid: &str,
        token: &str,
        current_user_id: Option<&str>,
    ) -> reqwest::Response {
        let mut body = json!({
            "provider": "twitter",
            "uid": uid,
            "credentials": { "token": token, "secret": format!("{token}-secret") },
        });
        if let Some(id) = current_user_id {
            body["current_user_id"] = json!(id);
        }

        self.client
            .post(self.url("/api/v1/identities/callback"))
            .bearer_auth(API_TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}
