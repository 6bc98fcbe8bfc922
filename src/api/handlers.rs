//! HTTP request handlers

use super::types::{
    ChatPageQuery, ChatRequest, ClassifyRequest, ClassifyResponse, CreateUserRequest,
    DateRangeQuery, EmergencyContactsResponse, EmergencyListResponse, EmergencyRequest,
    ErrorResponse, LearningListResponse, LearningQuery, LimitQuery, LogMoodRequest,
    MetricListResponse, MetricRequest, MoodListResponse, NotificationListResponse,
    NotificationRequest, SuccessResponse, SurveyListResponse, SurveyQuery, SurveyRequest,
    UnreadCountResponse, UpdateProfileRequest,
};
use super::AppState;
use crate::db::{
    ChatPage, DateRange, DbError, EmergencyReport, MoodEntry, MoodStats, Notification, Profile,
    SurveyResponse, SurveyStats, WellnessMetric, DEFAULT_CHAT_PAGE_LIMIT, DEFAULT_MOOD_LIMIT,
    DEFAULT_NOTIFICATION_LIMIT, DEFAULT_RANGE_DAYS,
};
use crate::intake::{classify, classify_history, Intensity};
use crate::learning::LearningResource;
use crate::report::{build_report, UserReport};
use crate::runtime::{ChatError, TurnOutcome};
use chrono::Utc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Stateless classifier
        .route("/api/classify", post(classify_message))
        // Profiles
        .route("/api/users", post(create_user))
        .route(
            "/api/users/:id/profile",
            get(get_profile).post(update_profile),
        )
        // Chat
        .route("/api/users/:id/chat", get(get_chat).post(send_chat))
        // Moods
        .route("/api/users/:id/moods", get(list_moods).post(log_mood))
        .route("/api/users/:id/moods/stats", get(mood_stats))
        // Wellness metrics
        .route(
            "/api/users/:id/metrics",
            get(list_metrics).post(record_metric),
        )
        .route("/api/users/:id/report", get(get_report))
        // Surveys
        .route("/api/users/:id/surveys", get(list_surveys).post(submit_survey))
        .route("/api/users/:id/surveys/stats", get(survey_stats))
        // Notifications
        .route(
            "/api/users/:id/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/api/users/:id/notifications/unread", get(unread_count))
        .route("/api/notifications/:id/read", post(mark_notification_read))
        // Learning
        .route("/api/learning", get(list_learning))
        .route("/api/learning/:id", get(get_learning_resource))
        // Emergency
        .route("/api/emergency/contacts", get(emergency_contacts))
        .route(
            "/api/users/:id/emergency",
            get(list_emergency_reports).post(report_emergency),
        )
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Classifier
// ============================================================

async fn classify_message(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message must not be empty".to_string()));
    }

    let ctx = state.intake();
    let outcome = match req.onboarding_state {
        Some(onboarding_state) => classify(onboarding_state, &req.message, ctx),
        None => classify_history(&req.message, &req.history, ctx),
    };

    Ok(Json(ClassifyResponse {
        reply_text: outcome.decision.reply_text,
        action: outcome.decision.action,
        next_state: outcome.next_state,
    }))
}

// ============================================================
// Profiles
// ============================================================

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    let id = req
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let profile = state.db.create_user(
        &id,
        req.name.trim(),
        req.email.as_deref(),
        req.badge_number.as_deref(),
        req.department.as_deref(),
    )?;

    tracing::info!(user_id = %profile.id, "Created user");
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.db.get_profile(&id)?))
}

async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.db.merge_profile_fields(&id, &req.fields)?))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    let outcome = state.runtime.send_message(&id, &req.text).await?;
    Ok(Json(outcome))
}

async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChatPageQuery>,
) -> Result<Json<ChatPage>, AppError> {
    let page = state.db.list_turns_page(
        &id,
        query.limit.unwrap_or(DEFAULT_CHAT_PAGE_LIMIT),
        query.before,
    )?;
    Ok(Json(page))
}

// ============================================================
// Moods
// ============================================================

async fn log_mood(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LogMoodRequest>,
) -> Result<(StatusCode, Json<MoodEntry>), AppError> {
    let intensity = match req.intensity {
        Some(value) => Intensity::new(value).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Intensity must be between {} and {}",
                Intensity::MIN,
                Intensity::MAX
            ))
        })?,
        None => req.mood_label.default_intensity(),
    };

    let entry = state
        .db
        .log_mood(&id, req.mood_label, intensity, req.note.trim())?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_moods(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<MoodListResponse>, AppError> {
    let moods = state
        .db
        .list_moods(&id, query.limit.unwrap_or(DEFAULT_MOOD_LIMIT))?;
    Ok(Json(MoodListResponse { moods }))
}

async fn mood_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MoodStats>, AppError> {
    Ok(Json(state.db.mood_stats(&id)?))
}

// ============================================================
// Wellness metrics
// ============================================================

async fn record_metric(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MetricRequest>,
) -> Result<(StatusCode, Json<WellnessMetric>), AppError> {
    let metric = state.db.save_wellness_metric(
        &id,
        req.stress_level,
        req.mood_score,
        req.interaction_count,
        req.recorded_at.unwrap_or_else(Utc::now),
    )?;
    Ok((StatusCode::CREATED, Json(metric)))
}

async fn list_metrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<MetricListResponse>, AppError> {
    let range = date_range(&query)?;
    let metrics = state.db.list_wellness_metrics(&id, &range)?;
    Ok(Json(MetricListResponse { range, metrics }))
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<UserReport>, AppError> {
    let range = date_range(&query)?;
    let days = state.db.daily_activity(&id, &range)?;
    Ok(Json(build_report(&id, range, &days, &state.intake().catalog)))
}

/// Missing `end` means today; missing `start` covers the default window
fn date_range(query: &DateRangeQuery) -> Result<DateRange, AppError> {
    let end = query.end.unwrap_or_else(|| Utc::now().date_naive());
    match query.start {
        Some(start) => DateRange::new(start, end)
            .ok_or_else(|| AppError::BadRequest("start must not be after end".to_string())),
        None => Ok(DateRange::ending(end, DEFAULT_RANGE_DAYS)),
    }
}

// ============================================================
// Surveys
// ============================================================

async fn submit_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SurveyRequest>,
) -> Result<(StatusCode, Json<SurveyResponse>), AppError> {
    if req.category.trim().is_empty() || req.question.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Category and question are required".to_string(),
        ));
    }
    let saved = state
        .db
        .save_survey_response(&id, &req.category, &req.question, &req.answer)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn list_surveys(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SurveyQuery>,
) -> Result<Json<SurveyListResponse>, AppError> {
    let responses = state
        .db
        .list_survey_responses(&id, query.category.as_deref())?;
    Ok(Json(SurveyListResponse { responses }))
}

async fn survey_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SurveyStats>, AppError> {
    Ok(Json(state.db.survey_stats(&id)?))
}

// ============================================================
// Notifications
// ============================================================

async fn create_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let notification = state
        .db
        .create_notification(&id, &req.title, &req.message)?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn list_notifications(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let notifications = state
        .db
        .list_notifications(&id, query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT))?;
    Ok(Json(NotificationListResponse { notifications }))
}

async fn unread_count(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let unread = state.db.unread_notification_count(&id)?;
    Ok(Json(UnreadCountResponse { unread }))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.mark_notification_read(&id)?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Learning
// ============================================================

async fn list_learning(
    State(state): State<AppState>,
    Query(query): Query<LearningQuery>,
) -> Json<LearningListResponse> {
    let catalog = &state.intake().catalog;
    let category = query.category.as_deref().unwrap_or("all");

    let resources: Vec<LearningResource> = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => catalog
            .search(q)
            .into_iter()
            .filter(|r| {
                category.eq_ignore_ascii_case("all") || r.category.eq_ignore_ascii_case(category)
            })
            .cloned()
            .collect(),
        _ => catalog.by_category(category).into_iter().cloned().collect(),
    };

    Json(LearningListResponse { resources })
}

async fn get_learning_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LearningResource>, AppError> {
    state
        .intake()
        .catalog
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Learning resource not found: {id}")))
}

// ============================================================
// Emergency
// ============================================================

async fn emergency_contacts(State(state): State<AppState>) -> Json<EmergencyContactsResponse> {
    Json(EmergencyContactsResponse {
        contacts: state.emergency_contacts.as_ref().clone(),
    })
}

async fn report_emergency(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EmergencyRequest>,
) -> Result<(StatusCode, Json<EmergencyReport>), AppError> {
    let report = state.db.report_emergency(&id, req.kind, &req.details)?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn list_emergency_reports(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EmergencyListResponse>, AppError> {
    let reports = state.db.list_emergency_reports(&id)?;
    Ok(Json(EmergencyListResponse { reports }))
}

async fn get_version() -> &'static str {
    concat!("mindful ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::UserNotFound(_) | DbError::NotificationNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            DbError::UnknownProfileField(_) | DbError::InvalidMetric(_) => {
                AppError::BadRequest(e.to_string())
            }
            DbError::UserExists(_) => AppError::Conflict(e.to_string()),
            DbError::Sqlite(_) | DbError::Poisoned => {
                tracing::error!(error = %e, "Database error");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::EmptyMessage => AppError::BadRequest(e.to_string()),
            ChatError::Busy(_) => AppError::Conflict(e.to_string()),
            ChatError::Storage(_) => {
                tracing::error!(error = %e, "Chat storage error");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
