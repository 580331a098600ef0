//! In-process portal backend for integration tests.
//!
//! Speaks the same wire contract as the real backend: bearer-token session
//! probe, `{"error": ...}` failure bodies, the appointments list that
//! reports errors inside a 200, and the multipart upload form.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

use nourish_client::session::{Navigator, PortalConfig, SessionManager, TokenStore};

/// Token every successful sign-in hands out and the probe recognizes.
pub const LIVE_TOKEN: &str = "tok-live";
/// The only code the mock accepts.
pub const GOOD_OTP: &str = "123456";
/// Provider token the google-login exchange accepts.
pub const PROVIDER_TOKEN: &str = "provider-tok";

/// Scripted behavior and captured traffic.
#[derive(Default)]
pub struct PortalState {
    pub fail_logout: AtomicBool,
    pub login_delay_ms: AtomicU64,
    /// Served verbatim by `GET /api/appointments`.
    pub appointments: Mutex<Vec<Value>>,
    /// When set, the list endpoint reports this error inside a 200 body.
    pub list_error: Mutex<Option<String>>,
    pub bookings: Mutex<Vec<Value>>,
    pub cancellations: Mutex<Vec<String>>,
    pub assessments: Mutex<Vec<Value>>,
    pub uploads: Mutex<Vec<SeenUpload>>,
    pub otp_requests: Mutex<Vec<String>>,
}

/// One multipart upload as the backend saw it.
#[derive(Debug, Clone)]
pub struct SeenUpload {
    pub bucket_id: String,
    pub user_id: String,
    pub custom_path: Option<String>,
    pub is_public: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A running mock portal.
pub struct TestPortal {
    pub state: Arc<PortalState>,
    base_url: Url,
}

impl TestPortal {
    pub fn config(&self) -> PortalConfig {
        PortalConfig::new(self.base_url.clone())
    }

    pub fn manager(&self, store: Arc<dyn TokenStore>) -> SessionManager {
        SessionManager::new(self.config(), store)
    }
}

/// Bind the mock portal on an ephemeral port.
pub async fn spawn_portal() -> TestPortal {
    let state = Arc::new(PortalState::default());
    let app = router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestPortal {
        state,
        base_url: format!("http://{addr}/api/").parse().unwrap(),
    }
}

/// Navigator that records every path it is pointed at.
#[derive(Clone, Default)]
pub struct RecordingNavigator {
    visits: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_owned());
    }
}

fn router(state: Arc<PortalState>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/google-login", post(google_login))
        .route("/api/auth/session", get(session_probe))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/send-otp", post(send_otp))
        .route("/api/auth/verify-phone", post(verify_phone))
        .route("/api/appointments", get(list_appointments).post(book_appointment))
        .route("/api/appointments/{id}", put(update_appointment))
        .route("/api/health-assessment", post(submit_assessment))
        .route("/api/storage/initialize", post(initialize_storage))
        .route("/api/storage/upload", post(upload_file))
        .with_state(state)
}

fn identity(role: &str) -> Value {
    json!({
        "id": "u-1",
        "email": "asha@example.com",
        "name": "Asha Rao",
        "role": role,
        "phone": null,
        "phoneVerified": false
    })
}

fn auth_payload(role: &str) -> Value {
    json!({
        "user": identity(role),
        "session": {
            "access_token": LIVE_TOKEN,
            "refresh_token": "refresh-1",
            "expires_at": 1_893_456_000
        }
    })
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn login(State(state): State<Arc<PortalState>>, Json(body): Json<Value>) -> Response {
    let delay = state.login_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if body["password"] == "hunter2" {
        let role = if body["email"] == "sarah@portal.example" {
            "dietitian"
        } else {
            "user"
        };
        return Json(auth_payload(role)).into_response();
    }
    reject(StatusCode::UNAUTHORIZED, "Invalid login credentials")
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return reject(StatusCode::BAD_REQUEST, "User already registered");
    }
    let mut payload = auth_payload("user");
    payload["user"]["email"] = body["email"].clone();
    payload["user"]["name"] = body["name"].clone();
    Json(payload).into_response()
}

async fn google_login(Json(body): Json<Value>) -> Response {
    if body["access_token"] == PROVIDER_TOKEN {
        return Json(auth_payload("user")).into_response();
    }
    reject(StatusCode::BAD_REQUEST, "Invalid provider token")
}

async fn session_probe(headers: HeaderMap) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok());
    if bearer == Some(&format!("Bearer {LIVE_TOKEN}")) {
        // The probe reply carries a sparse session, access token only.
        return Json(json!({
            "user": identity("user"),
            "session": { "access_token": LIVE_TOKEN }
        }))
        .into_response();
    }
    Json(json!({ "user": null, "session": null })).into_response()
}

async fn logout(State(state): State<Arc<PortalState>>) -> Response {
    if state.fail_logout.load(Ordering::SeqCst) {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "sign-out backend unavailable");
    }
    Json(json!({ "success": true })).into_response()
}

async fn send_otp(State(state): State<Arc<PortalState>>, Json(body): Json<Value>) -> Response {
    let phone = body["phone"].as_str().unwrap_or_default().to_owned();
    state.otp_requests.lock().unwrap().push(phone);
    Json(json!({
        "success": true,
        "message": "OTP sent successfully",
        "otp": GOOD_OTP
    }))
    .into_response()
}

async fn verify_phone(Json(body): Json<Value>) -> Response {
    if body["otp"] != GOOD_OTP {
        return reject(StatusCode::BAD_REQUEST, "Invalid OTP");
    }
    let phone = body["phone"].clone();
    let profile = json!({
        "phone": phone,
        "phoneVerified": true,
        "name": body.get("name").cloned().unwrap_or(Value::Null)
    });
    if body.get("user_id").is_some() {
        // Established account: profile update only.
        return Json(json!({ "success": true, "profile": profile })).into_response();
    }
    // First registration by phone.
    Json(json!({
        "success": true,
        "profile": profile,
        "user": {
            "id": "u-7",
            "email": null,
            "name": body.get("name").cloned().unwrap_or(Value::Null),
            "role": "user",
            "phone": phone,
            "phoneVerified": true
        },
        "session": {
            "access_token": LIVE_TOKEN,
            "refresh_token": "refresh-7",
            "expires_at": 1_893_456_000
        }
    }))
    .into_response()
}

async fn list_appointments(
    State(state): State<Arc<PortalState>>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Response {
    if let Some(error) = state.list_error.lock().unwrap().clone() {
        return Json(json!({ "error": error, "appointments": [] })).into_response();
    }
    if !params.contains_key("user_id") {
        // The real list endpoint reports this inside a 200.
        return Json(json!({ "error": "User ID is required", "appointments": [] }))
            .into_response();
    }
    let appointments = state.appointments.lock().unwrap().clone();
    Json(json!({ "appointments": appointments })).into_response()
}

async fn book_appointment(
    State(state): State<Arc<PortalState>>,
    Json(body): Json<Value>,
) -> Response {
    for field in ["date", "time", "type", "userId"] {
        if body.get(field).is_none() {
            return reject(StatusCode::BAD_REQUEST, "Missing required fields");
        }
    }
    state.bookings.lock().unwrap().push(body.clone());

    let label = body["time"].as_str().unwrap_or_default();
    let time_24h = nourish_client::appointments::parse_clock_label(label)
        .map(|t| format!("{:02}:{:02}:00", t.hour(), t.minute()))
        .unwrap_or_else(|| "12:00:00".to_owned());

    Json(json!({
        "success": true,
        "appointment": {
            "id": "apt-9",
            "appointment_date": body["date"],
            "appointment_time": time_24h,
            "status": "requested",
            "reason": null,
            "notes": body["type"]
        }
    }))
    .into_response()
}

async fn update_appointment(
    State(state): State<Arc<PortalState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.cancellations.lock().unwrap().push(id.clone());
    Json(json!({
        "success": true,
        "appointment": { "id": id, "status": body["status"] }
    }))
    .into_response()
}

async fn submit_assessment(
    State(state): State<Arc<PortalState>>,
    Json(body): Json<Value>,
) -> Response {
    if body.get("user_id").and_then(Value::as_str).unwrap_or("").is_empty() {
        return reject(StatusCode::BAD_REQUEST, "User ID is required");
    }
    state.assessments.lock().unwrap().push(body.clone());
    Json(json!({ "success": true, "assessment": body })).into_response()
}

async fn initialize_storage() -> Response {
    Json(json!({ "success": true, "bucket": "user_uploads" })).into_response()
}

async fn upload_file(
    State(state): State<Arc<PortalState>>,
    mut multipart: Multipart,
) -> Response {
    let mut bucket_id = String::new();
    let mut user_id = String::new();
    let mut custom_path = None;
    let mut is_public = "true".to_owned();
    let mut file_name = String::new();
    let mut bytes = Vec::new();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "bucket_id" => bucket_id = field.text().await.unwrap(),
            "user_id" => user_id = field.text().await.unwrap(),
            "custom_path" => custom_path = Some(field.text().await.unwrap()),
            "is_public" => is_public = field.text().await.unwrap(),
            "file" => {
                file_name = field.file_name().unwrap_or_default().to_owned();
                bytes = field.bytes().await.unwrap().to_vec();
            }
            _ => {}
        }
    }

    if bytes.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "No file part");
    }

    let safe_name = file_name.replace(['/', ' '], "_");
    let path = custom_path
        .clone()
        .unwrap_or_else(|| format!("{user_id}/1700000000_{safe_name}"));
    let public_url = format!("https://cdn.example/{bucket_id}/{path}");

    state.uploads.lock().unwrap().push(SeenUpload {
        bucket_id,
        user_id,
        custom_path,
        is_public,
        file_name,
        bytes,
    });

    Json(json!({ "path": path, "publicUrl": public_url, "error": null })).into_response()
}
