// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use strava_sheets::config::Config;
use strava_sheets::db::SheetsDb;
use strava_sheets::models::AthleteRow;
use strava_sheets::routes::create_router;
use strava_sheets::services::{
    queue, ActivitySync, EventWorker, RetryPolicy, StravaClient, StravaService,
};
use strava_sheets::AppState;

/// Refresh token the mock Strava server rejects.
#[allow(dead_code)]
pub const REVOKED_REFRESH_TOKEN: &str = "revoked";

/// Refresh token the mock Strava server answers with 503.
#[allow(dead_code)]
pub const UNAVAILABLE_REFRESH_TOKEN: &str = "unavailable";

/// Athlete returned by the mock OAuth code exchange.
#[allow(dead_code)]
pub const OAUTH_ATHLETE_ID: u64 = 4242;

#[derive(Default)]
struct MockState {
    refresh_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    activity_calls: AtomicUsize,
    activities: Mutex<HashMap<u64, Value>>,
}

/// Local stand-in for the Strava API, bound to an ephemeral port.
#[derive(Clone)]
pub struct MockStrava {
    pub base_url: String,
    state: Arc<MockState>,
}

#[allow(dead_code)]
impl MockStrava {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/oauth/token", post(token))
            .route("/api/v3/activities/{id}", get(activity))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Strava");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_activity(&self, activity: Value) {
        let id = activity["id"].as_u64().expect("activity id");
        self.state.activities.lock().unwrap().insert(id, activity);
    }

    pub fn remove_activity(&self, id: u64) {
        self.state.activities.lock().unwrap().remove(&id);
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn exchange_calls(&self) -> usize {
        self.state.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn activity_calls(&self) -> usize {
        self.state.activity_calls.load(Ordering::SeqCst)
    }
}

async fn token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let now = chrono::Utc::now().timestamp();
    match form.get("grant_type").map(String::as_str) {
        Some("refresh_token") => {
            let n = state.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
            match form.get("refresh_token").map(String::as_str) {
                Some(REVOKED_REFRESH_TOKEN) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"message": "Bad Request", "errors": [{"field": "refresh_token", "code": "invalid"}]})),
                    );
                }
                Some(UNAVAILABLE_REFRESH_TOKEN) => {
                    return (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({"message": "Service Unavailable"})),
                    );
                }
                _ => {}
            }
            (
                StatusCode::OK,
                Json(json!({
                    "token_type": "Bearer",
                    "access_token": format!("refreshed-access-{}", n),
                    "refresh_token": format!("refreshed-refresh-{}", n),
                    "expires_at": now + 21600,
                    "expires_in": 21600
                })),
            )
        }
        Some("authorization_code") => {
            state.exchange_calls.fetch_add(1, Ordering::SeqCst);
            if form.get("code").map(String::as_str) == Some("bad-code") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"message": "Bad Request"})),
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "token_type": "Bearer",
                    "access_token": "oauth-access",
                    "refresh_token": "oauth-refresh",
                    "expires_at": now + 21600,
                    "athlete": {"id": OAUTH_ATHLETE_ID, "firstname": "Ada", "lastname": "Lovelace"}
                })),
            )
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "unsupported grant"})),
        ),
    }
}

async fn activity(
    State(state): State<Arc<MockState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.activity_calls.fetch_add(1, Ordering::SeqCst);

    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len());
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Authorization Error"})),
        );
    }

    match state.activities.lock().unwrap().get(&id) {
        Some(activity) => (StatusCode::OK, Json(activity.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Record Not Found"})),
        ),
    }
}

/// A detailed activity as Strava returns it, with two segment efforts.
#[allow(dead_code)]
pub fn activity_json(id: u64, athlete_id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "sport_type": "Run",
        "type": "Run",
        "start_date": "2024-06-16T06:10:00Z",
        "start_date_local": "2024-06-15T23:10:00Z",
        "timezone": "(GMT-08:00) America/Los_Angeles",
        "distance": 8000.0,
        "moving_time": 2400,
        "elapsed_time": 2520,
        "total_elevation_gain": 42.5,
        "average_heartrate": 151.2,
        "private": false,
        "visibility": "everyone",
        "athlete": {"id": athlete_id},
        "segment_efforts": [
            {
                "id": id * 10 + 1,
                "name": "Hill Climb",
                "elapsed_time": 300,
                "moving_time": 290,
                "distance": 1200.0,
                "segment": {"id": 501, "name": "Hill Climb", "climb_category": 1, "average_grade": 4.2}
            },
            {
                "id": id * 10 + 2,
                "name": "Flat Sprint",
                "elapsed_time": 60,
                "distance": 400.0,
                "segment": {"id": 502, "name": "Flat Sprint"}
            }
        ]
    })
}

/// Everything a test needs: the router, the worker, and the mock Strava.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db: SheetsDb,
    pub sync: ActivitySync,
    pub worker: EventWorker,
    pub strava: MockStrava,
}

/// Create a test app backed by in-memory tabs and a local mock Strava.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    let strava = MockStrava::start().await;
    let config = Config::test_default().with_strava_base(&strava.base_url);

    let db = SheetsDb::new_in_memory();
    db.ensure_schema().await.expect("ensure schema");

    let strava_service = StravaService::new(StravaClient::new(&config), db.clone());
    let sync = ActivitySync::new(strava_service.clone(), db.clone());

    let (event_queue, receiver) = queue::channel(config.queue_capacity, config.dead_letter_capacity);
    let worker = EventWorker::new(
        receiver,
        &event_queue,
        sync.clone(),
        db.clone(),
        RetryPolicy::from_config(&config),
    );

    let state = Arc::new(AppState {
        config,
        db: db.clone(),
        strava_service,
        queue: event_queue,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        sync,
        worker,
        strava,
    }
}

/// Store an athlete whose token expires `expires_in` seconds from now.
#[allow(dead_code)]
pub async fn seed_athlete(db: &SheetsDb, athlete_id: u64, refresh_token: &str, expires_in: i64) {
    let athlete = AthleteRow {
        athlete_id,
        athlete_name: "Test Athlete".to_string(),
        access_token: "stored-access".to_string(),
        refresh_token: refresh_token.to_string(),
        expires_at: chrono::Utc::now().timestamp() + expires_in,
        updated_at: "2024-06-01T00:00:00Z".to_string(),
    };
    db.upsert_athlete(&athlete).await.expect("seed athlete");
}

/// Webhook payload for an activity event.
#[allow(dead_code)]
pub fn activity_event(aspect_type: &str, activity_id: u64, owner_id: u64) -> Value {
    json!({
        "object_type": "activity",
        "object_id": activity_id,
        "aspect_type": aspect_type,
        "owner_id": owner_id,
        "subscription_id": 1,
        "event_time": 1718500000,
        "updates": {}
    })
}
