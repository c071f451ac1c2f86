use super::{AppResult, AppState, JsonResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use recap_core::{
    NewCalendarEvent, NewCodeIssue, NewTrackerIssue, SourceKind, SummaryRequest, TimeWindow,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .route("/health/live", get(live))
        .route("/summary/generate", post(generate_summary))
        .route("/chat/messages", get(chat_messages))
        .route("/chat/channels", get(chat_channels))
        .route("/code/repository", get(code_repository))
        .route("/code/issues", post(create_code_issue))
        .route("/code/release-notes", get(code_release_notes))
        .route("/tracker/projects", get(tracker_projects))
        .route("/tracker/issues", get(tracker_issues).post(create_tracker_issue))
        .route("/tracker/sprints", get(tracker_sprints))
        .route("/tracker/sprints/:id/issues", get(tracker_sprint_issues))
        .route("/calendar/events", get(calendar_events).post(create_calendar_event))
        .route("/calendar/calendars", get(calendar_list))
        .route("/calendar/busy-times", get(calendar_busy_times))
        .route("/bot/post-summary", post(bot_post_summary))
        .route("/bot/weekly-summary", post(bot_weekly_summary))
        .route("/bot/respond", post(bot_respond))
        .with_state(state)
}

fn default_days() -> u32 {
    7
}

#[derive(Deserialize)]
struct DaysQuery {
    #[serde(default = "default_days")]
    days: u32,
}

// ── Health ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthData {
    status: &'static str,
    version: String,
    uptime_seconds: u64,
    services: std::collections::BTreeMap<&'static str, &'static str>,
}

async fn health(State(state): State<AppState>) -> Json<JsonResponse<HealthData>> {
    Json(JsonResponse::ok(HealthData {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        services: state.services.clone(),
    }))
}

async fn ready(State(state): State<AppState>) -> Response {
    if state.missing_required.is_empty() {
        Json(JsonResponse::ok(serde_json::json!({"status": "ready"}))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(JsonResponse::<()>::err(format!(
                "not ready: {} not configured",
                state.missing_required.join(", ")
            ))),
        )
            .into_response()
    }
}

async fn live() -> Json<JsonResponse<serde_json::Value>> {
    Json(JsonResponse::ok(serde_json::json!({"status": "alive"})))
}

// ── Summary ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SummaryData {
    summary: String,
    sources_used: BTreeSet<SourceKind>,
}

async fn generate_summary(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> AppResult<Json<JsonResponse<SummaryData>>> {
    let result = state.pipeline.generate(&request).await?;
    Ok(Json(JsonResponse::ok(SummaryData {
        summary: result.text,
        sources_used: result.sources_used,
    })))
}

// ── Chat ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct MessagesQuery {
    channel_id: String,
    #[serde(default = "default_days")]
    days: u32,
}

async fn chat_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<impl IntoResponse> {
    let window = TimeWindow::new(query.days)?;
    let messages = state.chat.fetch_messages(&query.channel_id, window).await?;
    Ok(Json(JsonResponse::ok(
        serde_json::json!({"messages": messages}),
    )))
}

async fn chat_channels(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let channels = state.chat.list_channels().await?;
    Ok(Json(JsonResponse::ok(
        serde_json::json!({"channels": channels}),
    )))
}

// ── Code ─────────────────────────────────────────────────────────────────────

async fn code_repository(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> AppResult<impl IntoResponse> {
    let window = TimeWindow::new(query.days)?;
    let activity = state.code.repository_activity(window).await?;
    Ok(Json(JsonResponse::ok(activity)))
}

async fn create_code_issue(
    State(state): State<AppState>,
    Json(request): Json<NewCodeIssue>,
) -> AppResult<impl IntoResponse> {
    let issue = state.code.create_issue(request).await?;
    Ok(Json(JsonResponse::ok(issue)))
}

async fn code_release_notes(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> AppResult<impl IntoResponse> {
    let window = TimeWindow::new(query.days)?;
    let notes = state.code.release_notes(window).await?;
    Ok(Json(JsonResponse::ok(
        serde_json::json!({"release_notes": notes}),
    )))
}

// ── Tracker ──────────────────────────────────────────────────────────────────

async fn tracker_projects(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let projects = state.tracker.projects().await?;
    Ok(Json(JsonResponse::ok(
        serde_json::json!({"projects": projects}),
    )))
}

#[derive(Deserialize)]
struct TrackerIssuesQuery {
    project_key: String,
    #[serde(default = "default_days")]
    days: u32,
}

async fn tracker_issues(
    State(state): State<AppState>,
    Query(query): Query<TrackerIssuesQuery>,
) -> AppResult<impl IntoResponse> {
    let window = TimeWindow::new(query.days)?;
    let issues = state
        .tracker
        .project_issues(&query.project_key, window)
        .await?;
    Ok(Json(JsonResponse::ok(serde_json::json!({"issues": issues}))))
}

#[derive(Deserialize)]
struct SprintsQuery {
    project_key: String,
}

async fn tracker_sprints(
    State(state): State<AppState>,
    Query(query): Query<SprintsQuery>,
) -> AppResult<impl IntoResponse> {
    let sprints = state.tracker.sprints(&query.project_key).await?;
    Ok(Json(JsonResponse::ok(
        serde_json::json!({"sprints": sprints}),
    )))
}

async fn tracker_sprint_issues(
    State(state): State<AppState>,
    Path(sprint_id): Path<u64>,
) -> AppResult<impl IntoResponse> {
    let issues = state.tracker.sprint_issues(sprint_id).await?;
    Ok(Json(JsonResponse::ok(serde_json::json!({"issues": issues}))))
}

async fn create_tracker_issue(
    State(state): State<AppState>,
    Json(request): Json<NewTrackerIssue>,
) -> AppResult<impl IntoResponse> {
    let issue = state.tracker.create_issue(request).await?;
    Ok(Json(JsonResponse::ok(issue)))
}

// ── Calendar ─────────────────────────────────────────────────────────────────

fn default_calendar_id() -> String {
    "primary".to_string()
}

#[derive(Deserialize)]
struct CalendarQuery {
    #[serde(default = "default_days")]
    days: u32,
    #[serde(default = "default_calendar_id")]
    calendar_id: String,
}

async fn calendar_events(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<impl IntoResponse> {
    let window = TimeWindow::new(query.days)?;
    let events = state.calendar.events(window, &query.calendar_id).await?;
    Ok(Json(JsonResponse::ok(serde_json::json!({"events": events}))))
}

async fn calendar_list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let calendars = state.calendar.calendars().await?;
    Ok(Json(JsonResponse::ok(
        serde_json::json!({"calendars": calendars}),
    )))
}

async fn calendar_busy_times(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<impl IntoResponse> {
    let window = TimeWindow::new(query.days)?;
    let busy = state
        .calendar
        .busy_times(window, &query.calendar_id)
        .await?;
    Ok(Json(JsonResponse::ok(
        serde_json::json!({"busy_times": busy}),
    )))
}

async fn create_calendar_event(
    State(state): State<AppState>,
    Json(request): Json<NewCalendarEvent>,
) -> AppResult<impl IntoResponse> {
    let event = state.calendar.create_event(request).await?;
    Ok(Json(JsonResponse::ok(event)))
}

// ── Bot ──────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PostSummaryBody {
    channel_id: String,
    summary: String,
}

async fn bot_post_summary(
    State(state): State<AppState>,
    Json(body): Json<PostSummaryBody>,
) -> AppResult<impl IntoResponse> {
    let posted = state.bot.post_summary(&body.channel_id, &body.summary).await?;
    if !posted {
        return Err(recap_core::RecapError::unavailable(
            SourceKind::Chat,
            "message was not accepted",
        )
        .into());
    }
    Ok(Json(JsonResponse::ok(serde_json::json!({
        "message": "Summary posted successfully"
    }))))
}

#[derive(Deserialize)]
struct WeeklySummaryBody {
    channel_id: String,
    #[serde(default = "default_days")]
    days: u32,
}

async fn bot_weekly_summary(
    State(state): State<AppState>,
    Json(body): Json<WeeklySummaryBody>,
) -> AppResult<impl IntoResponse> {
    let posted = state.bot.post_weekly(&body.channel_id, body.days).await?;
    if !posted {
        return Err(recap_core::RecapError::unavailable(
            SourceKind::Chat,
            "message was not accepted",
        )
        .into());
    }
    Ok(Json(JsonResponse::ok(serde_json::json!({
        "message": "Weekly summary posted successfully"
    }))))
}

#[derive(Deserialize)]
struct BotMentionBody {
    channel_id: String,
    user_id: String,
    text: String,
}

async fn bot_respond(
    State(state): State<AppState>,
    Json(body): Json<BotMentionBody>,
) -> AppResult<impl IntoResponse> {
    let response = state
        .bot
        .respond(&body.channel_id, &body.user_id, &body.text)
        .await;
    Ok(Json(JsonResponse::ok(
        serde_json::json!({"response": response}),
    )))
}
