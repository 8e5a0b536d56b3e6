use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use cadence_core::models::{
    DailyStats, Event, ExportData, Goal, Habit, Note, ShoppingItem, Subtask, Task, Transaction,
    UserSettings,
};
use cadence_core::service::CadenceService;
use cadence_core::stats::StatsDelta;

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<CadenceService>,
    api_key: Option<String>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateTaskRequest {
    text: String,
    #[serde(default = "default_priority")]
    priority: String,
}

fn default_priority() -> String {
    "medium".to_string()
}

#[derive(Deserialize)]
struct CreateSubtaskRequest {
    text: String,
}

#[derive(Deserialize)]
struct CreateItemRequest {
    name: String,
}

#[derive(Deserialize)]
struct CreateTransactionRequest {
    description: String,
    amount: f64,
    date: Option<String>,
}

#[derive(Deserialize)]
struct CreateNoteRequest {
    content: String,
}

#[derive(Deserialize)]
struct CreateHabitRequest {
    name: String,
}

#[derive(Deserialize)]
struct CreateGoalRequest {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_period")]
    period: String,
}

fn default_period() -> String {
    "monthly".to_string()
}

#[derive(Deserialize)]
struct SetProgressRequest {
    progress: i64,
}

#[derive(Deserialize)]
struct CreateEventRequest {
    title: String,
    date: String,
    time: Option<String>,
}

#[derive(Deserialize)]
struct LogWaterRequest {
    ml: i64,
    date: Option<String>,
}

#[derive(Deserialize)]
struct FocusSessionRequest {
    focus_minutes: i64,
    #[serde(default = "default_cycles")]
    cycles: i64,
    date: Option<String>,
}

fn default_cycles() -> i64 {
    1
}

#[derive(Deserialize)]
struct SetWeightRequest {
    weight_kg: f64,
}

#[derive(Deserialize)]
struct UpcomingQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    days: Option<u32>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                tracing::error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn bad_request(err: anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err}"))
}

fn parse_date_param(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{s}'. Use YYYY-MM-DD")))
}

fn date_or_today(date: Option<&str>) -> Result<NaiveDate, ApiError> {
    match date {
        Some(s) => parse_date_param(s),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Task handlers ---

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.svc.tasks()?))
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state
        .svc
        .add_task(&req.text, &req.priority)
        .map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn toggle_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .svc
        .toggle_task(id)
        .map_err(|_| ApiError::NotFound(format!("Task {id} not found")))?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc.delete_task(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Task {id} not found")))
    }
}

async fn list_subtasks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Subtask>>, ApiError> {
    Ok(Json(state.svc.subtasks(id)?))
}

async fn create_subtask(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CreateSubtaskRequest>,
) -> Result<(StatusCode, Json<Subtask>), ApiError> {
    let subtask = state
        .svc
        .add_subtask(id, &req.text)
        .map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

async fn toggle_subtask(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Subtask>, ApiError> {
    let subtask = state
        .svc
        .toggle_subtask(id)
        .map_err(|_| ApiError::NotFound(format!("Subtask {id} not found")))?;
    Ok(Json(subtask))
}

async fn delete_subtask(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc.delete_subtask(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Subtask {id} not found")))
    }
}

// --- Shopping handlers ---

async fn list_shopping(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShoppingItem>>, ApiError> {
    Ok(Json(state.svc.shopping_items()?))
}

async fn create_shopping_item(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ShoppingItem>), ApiError> {
    let item = state
        .svc
        .add_shopping_item(&req.name)
        .map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn toggle_shopping_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ShoppingItem>, ApiError> {
    let item = state
        .svc
        .toggle_shopping_item(id)
        .map_err(|_| ApiError::NotFound(format!("Shopping item {id} not found")))?;
    Ok(Json(item))
}

async fn delete_shopping_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc.delete_shopping_item(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Shopping item {id} not found")))
    }
}

async fn clear_bought(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let cleared = state.svc.clear_bought_items()?;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

// --- Finance handlers ---

async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(state.svc.transactions()?))
}

async fn create_transaction(
    State(state): State<AppState>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let date = date_or_today(req.date.as_deref())?;
    let tx = state
        .svc
        .add_transaction(&req.description, req.amount, date)
        .map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc.delete_transaction(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Transaction {id} not found")))
    }
}

async fn get_balance(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let balance = state.svc.balance()?;
    let value = serde_json::to_value(balance).context("failed to serialize balance")?;
    Ok(Json(value))
}

// --- Note handlers ---

async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.svc.notes()?))
}

async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let note = state.svc.add_note(&req.content).map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc.delete_note(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Note {id} not found")))
    }
}

// --- Habit handlers ---

async fn list_habits(State(state): State<AppState>) -> Result<Json<Vec<Habit>>, ApiError> {
    Ok(Json(state.svc.habits()?))
}

async fn create_habit(
    State(state): State<AppState>,
    Json(req): Json<CreateHabitRequest>,
) -> Result<(StatusCode, Json<Habit>), ApiError> {
    let habit = state.svc.add_habit(&req.name).map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(habit)))
}

async fn toggle_habit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Habit>, ApiError> {
    let habit = state
        .svc
        .toggle_habit_today(id)
        .map_err(|_| ApiError::NotFound(format!("Habit {id} not found")))?;
    Ok(Json(habit))
}

async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc.delete_habit(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Habit {id} not found")))
    }
}

// --- Goal handlers ---

async fn list_goals(State(state): State<AppState>) -> Result<Json<Vec<Goal>>, ApiError> {
    Ok(Json(state.svc.goals()?))
}

async fn create_goal(
    State(state): State<AppState>,
    Json(req): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    let goal = state
        .svc
        .add_goal(&req.title, &req.description, &req.period)
        .map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(goal)))
}

async fn set_goal_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SetProgressRequest>,
) -> Result<Json<Goal>, ApiError> {
    let goal = state
        .svc
        .set_goal_progress(id, req.progress)
        .map_err(|_| ApiError::NotFound(format!("Goal {id} not found")))?;
    Ok(Json(goal))
}

async fn delete_goal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc.delete_goal(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Goal {id} not found")))
    }
}

// --- Event handlers ---

async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.svc.events()?))
}

async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let date = parse_date_param(&req.date)?;
    let event = state
        .svc
        .add_event(&req.title, date, req.time.as_deref())
        .map_err(bad_request)?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn upcoming_events(
    State(state): State<AppState>,
    Query(params): Query<UpcomingQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.svc.upcoming_events(params.limit.unwrap_or(5))?))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.svc.delete_event(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Event {id} not found")))
    }
}

// --- Stats handlers ---

async fn log_water(
    State(state): State<AppState>,
    Json(req): Json<LogWaterRequest>,
) -> Result<Json<DailyStats>, ApiError> {
    let date = date_or_today(req.date.as_deref())?;
    let stats = state.svc.log_water(req.ml, date).map_err(bad_request)?;
    Ok(Json(stats))
}

async fn record_focus_session(
    State(state): State<AppState>,
    Json(req): Json<FocusSessionRequest>,
) -> Result<Json<DailyStats>, ApiError> {
    if req.focus_minutes <= 0 {
        return Err(ApiError::BadRequest(
            "focus_minutes must be greater than 0".to_string(),
        ));
    }
    if req.cycles < 0 {
        return Err(ApiError::BadRequest(
            "cycles must not be negative".to_string(),
        ));
    }
    let date = date_or_today(req.date.as_deref())?;
    let delta = StatsDelta {
        water_ml: 0,
        focus_minutes: req.focus_minutes,
        cycles: req.cycles,
    };
    let stats = state
        .svc
        .record_focus_session(delta, date)
        .map_err(bad_request)?;
    Ok(Json(stats))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyStats>, ApiError> {
    let date = parse_date_param(&date_str)?;
    let stats = state
        .svc
        .daily_stats(date)?
        .unwrap_or_else(|| DailyStats::zero(date));
    Ok(Json(stats))
}

async fn stats_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let series = state.svc.day_series(params.days.unwrap_or(7))?;
    let value = serde_json::to_value(series).context("failed to serialize series")?;
    Ok(Json(value))
}

// --- Summary / settings handlers ---

async fn get_day_summary(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let date = parse_date_param(&date_str)?;
    let summary = state.svc.day_summary(date)?;
    let value = serde_json::to_value(summary).context("failed to serialize summary")?;
    Ok(Json(value))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<UserSettings>, ApiError> {
    Ok(Json(state.svc.settings()?))
}

async fn set_weight(
    State(state): State<AppState>,
    Json(req): Json<SetWeightRequest>,
) -> Result<Json<UserSettings>, ApiError> {
    let settings = state.svc.set_weight(req.weight_kg).map_err(bad_request)?;
    Ok(Json(settings))
}

// --- Export / Import handlers ---

async fn export_data(State(state): State<AppState>) -> Result<Json<ExportData>, ApiError> {
    Ok(Json(state.svc.export_all()?))
}

async fn import_data(
    State(state): State<AppState>,
    Json(data): Json<ExportData>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = state.svc.import_all(&data).map_err(bad_request)?;
    let value = serde_json::to_value(summary).context("failed to serialize import summary")?;
    Ok(Json(value))
}

// --- Router builder ---

/// TLS configuration for the server.
pub struct TlsConfig {
    pub cert_path: std::path::PathBuf,
    pub key_path: std::path::PathBuf,
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", delete(delete_task))
        .route("/api/tasks/{id}/toggle", post(toggle_task))
        .route(
            "/api/tasks/{id}/subtasks",
            get(list_subtasks).post(create_subtask),
        )
        .route("/api/subtasks/{id}", delete(delete_subtask))
        .route("/api/subtasks/{id}/toggle", post(toggle_subtask))
        .route("/api/shopping", get(list_shopping).post(create_shopping_item))
        .route("/api/shopping/bought", delete(clear_bought))
        .route("/api/shopping/{id}", delete(delete_shopping_item))
        .route("/api/shopping/{id}/toggle", post(toggle_shopping_item))
        .route("/api/finance", get(list_transactions).post(create_transaction))
        .route("/api/finance/balance", get(get_balance))
        .route("/api/finance/{id}", delete(delete_transaction))
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/{id}", delete(delete_note))
        .route("/api/habits", get(list_habits).post(create_habit))
        .route("/api/habits/{id}", delete(delete_habit))
        .route("/api/habits/{id}/toggle", post(toggle_habit))
        .route("/api/goals", get(list_goals).post(create_goal))
        .route("/api/goals/{id}", delete(delete_goal))
        .route("/api/goals/{id}/progress", put(set_goal_progress))
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/upcoming", get(upcoming_events))
        .route("/api/events/{id}", delete(delete_event))
        .route("/api/water", post(log_water))
        .route("/api/focus/session", post(record_focus_session))
        .route("/api/stats/history", get(stats_history))
        .route("/api/stats/{date}", get(get_stats))
        .route("/api/summary/{date}", get(get_day_summary))
        .route("/api/settings", get(get_settings).put(set_weight))
        .route("/api/export", get(export_data))
        .route("/api/import", post(import_data))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    svc: CadenceService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    tls: Option<TlsConfig>,
) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info,tower_http=info".into()),
        )
        .init();

    let state = AppState {
        svc: Arc::new(svc),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        tracing::info!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
    } else {
        tracing::warn!("Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        tracing::warn!(
            "Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    if let Some(tls_config) = tls {
        let fingerprint = crate::tls::ensure_cert(&tls_config.cert_path, &tls_config.key_path)?;

        let rustls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &tls_config.cert_path,
            &tls_config.key_path,
        )
        .await
        .context("failed to load TLS certificate")?;

        let addr = format!("{bind}:{port}")
            .parse::<std::net::SocketAddr>()
            .context("invalid bind address")?;

        tracing::info!("Listening on https://{bind}:{port}");
        tracing::info!("Certificate fingerprint (SHA-256): {fingerprint}");

        axum_server::bind_rustls(addr, rustls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
        tracing::info!("Listening on http://{bind}:{port}");
        axum::serve(listener, app).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(api_key: Option<String>) -> AppState {
        AppState {
            svc: Arc::new(CadenceService::open_in_memory().unwrap()),
            api_key,
        }
    }

    fn test_app(api_key: Option<String>) -> Router {
        build_router(test_state(api_key))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/tasks")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/tasks")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_auth_mode_allows_requests() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app(None);

        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/tasks")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret path /home/user/.cadence/db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(!json["error"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn create_task_returns_201() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tasks",
                serde_json::json!({ "text": "write docs", "priority": "high" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["text"], "write docs");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["completed"], false);
    }

    #[tokio::test]
    async fn create_task_invalid_priority_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tasks",
                serde_json::json!({ "text": "x", "priority": "urgent" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_task_empty_text_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tasks",
                serde_json::json!({ "text": "   " }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn toggle_missing_task_returns_404() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tasks/99/toggle",
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn task_toggle_round_trip() {
        let state = test_state(None);
        let app = build_router(state.clone());

        let task = state.svc.add_task("flip me", "low").unwrap();

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/tasks/{}/toggle", task.id),
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["completed"], true);
        assert!(json["completed_at"].is_string());
    }

    #[tokio::test]
    async fn habit_toggle_updates_streak() {
        let state = test_state(None);
        let app = build_router(state.clone());

        let habit = state.svc.add_habit("meditate").unwrap();
        assert_eq!(habit.streak, 0);

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/habits/{}/toggle", habit.id),
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["streak"], 1);
        assert_eq!(json["completed_dates"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn water_contributions_accumulate() {
        let state = test_state(None);

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/water",
                serde_json::json!({ "ml": 250, "date": "2024-06-15" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/water",
                serde_json::json!({ "ml": 500, "date": "2024-06-15" }),
            ))
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["water_ml"], 750);
    }

    #[tokio::test]
    async fn water_out_of_range_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/water",
                serde_json::json!({ "ml": 9000 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn focus_session_contributes_stats() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/focus/session",
                serde_json::json!({ "focus_minutes": 25, "date": "2024-06-15" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["focus_minutes"], 25);
        assert_eq!(json["cycles"], 1);
    }

    #[tokio::test]
    async fn focus_session_zero_minutes_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/focus/session",
                serde_json::json!({ "focus_minutes": 0 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_missing_day_is_zero_record() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/stats/2024-06-15")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["water_ml"], 0);
        assert_eq!(json["focus_minutes"], 0);
        assert_eq!(json["cycles"], 0);
    }

    #[tokio::test]
    async fn stats_invalid_date_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/stats/not-a-date")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn summary_reflects_activity() {
        let state = test_state(None);
        let app = build_router(state.clone());

        state.svc.add_task("a", "medium").unwrap();
        state
            .svc
            .log_water(
                500,
                NaiveDate::parse_from_str("2024-06-15", "%Y-%m-%d").unwrap(),
            )
            .unwrap();

        let response = app
            .oneshot(
                axum::http::Request::get("/api/summary/2024-06-15")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["tasks_total"], 1);
        assert_eq!(json["water_ml"], 500);
    }

    #[tokio::test]
    async fn settings_weight_round_trip() {
        let state = test_state(None);

        let response = build_router(state.clone())
            .oneshot(json_request(
                "PUT",
                "/api/settings",
                serde_json::json!({ "weight_kg": 80.0 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["water_goal_ml"], 2800);

        let response = build_router(state)
            .oneshot(
                axum::http::Request::get("/api/settings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["weight_kg"], 80.0);
    }

    #[tokio::test]
    async fn settings_invalid_weight_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/settings",
                serde_json::json!({ "weight_kg": 5.0 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_import_via_api() {
        let source = test_state(None);
        source.svc.add_task("carry me over", "medium").unwrap();
        source.svc.add_habit("run").unwrap();

        let response = build_router(source)
            .oneshot(
                axum::http::Request::get("/api/export")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let export = body_json(response).await;

        let target = test_state(None);
        let response = build_router(target.clone())
            .oneshot(json_request("POST", "/api/import", export))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["tasks_imported"], 1);
        assert_eq!(json["habits_imported"], 1);
        assert_eq!(target.svc.tasks().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_bought_endpoint() {
        let state = test_state(None);
        let app = build_router(state.clone());

        let item = state.svc.add_shopping_item("milk").unwrap();
        state.svc.toggle_shopping_item(item.id).unwrap();
        state.svc.add_shopping_item("eggs").unwrap();

        let response = app
            .oneshot(
                axum::http::Request::delete("/api/shopping/bought")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["cleared"], 1);
        assert_eq!(state.svc.shopping_items().unwrap().len(), 1);
    }
}
