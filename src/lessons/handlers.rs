use axum::{
    extract::{Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap,
    },
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::auth::session::AuthSession;
use crate::error::ApiError;
use crate::lessons::csv;
use crate::lessons::dto::{
    parse_amount, parse_date, parse_owner_override, CreateLessonRequest, LessonDto, LessonQuery,
    LessonsResponse,
};
use crate::lessons::repo;
use crate::state::AppState;
use crate::users::dto::CreatedResponse;

pub fn lesson_routes() -> Router<AppState> {
    Router::new()
        .route("/lessons", get(list_lessons).post(create_lesson))
        .route("/lessons/export", get(export_lessons))
}

#[instrument(skip(state))]
pub async fn list_lessons(
    State(state): State<AppState>,
    Query(query): Query<LessonQuery>,
) -> Result<Json<LessonsResponse>, ApiError> {
    let rows = repo::list(&state.db, &query.into_filter()).await?;
    Ok(Json(LessonsResponse {
        ok: true,
        lessons: rows.into_iter().map(LessonDto::from).collect(),
    }))
}

#[instrument(skip(state, session, payload))]
pub async fn create_lesson(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<CreateLessonRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let date = payload.date.unwrap_or_default();
    if parse_date(&date).is_none() {
        return Err(ApiError::InvalidInput("invalid date".into()));
    }
    let customer_name = payload.customer_name.unwrap_or_default();
    if customer_name.trim().is_empty() {
        return Err(ApiError::InvalidInput("customer_name required".into()));
    }
    let amount = payload
        .amount
        .as_ref()
        .and_then(parse_amount)
        .ok_or_else(|| ApiError::InvalidInput("invalid amount".into()))?;

    // an unparseable override falls back to the caller, it is not an error
    let owner = parse_owner_override(&payload.user_id).unwrap_or(session.user.id);

    let id = repo::create(&state.db, &date, &customer_name, amount, owner).await?;

    info!(lesson_id = id, user_id = owner, "lesson created");
    Ok(Json(CreatedResponse { ok: true, id }))
}

#[instrument(skip(state, session))]
pub async fn export_lessons(
    State(state): State<AppState>,
    session: AuthSession,
    Query(query): Query<LessonQuery>,
) -> Result<(HeaderMap, String), ApiError> {
    let rows = repo::list(&state.db, &query.into_filter()).await?;
    let body = csv::render(&rows)?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, "text/csv; charset=utf-8".parse().unwrap());
    headers.insert(
        CONTENT_DISPOSITION,
        "attachment; filename=\"lessons.csv\"".parse().unwrap(),
    );

    info!(rows = rows.len(), user_id = session.user.id, "lessons exported");
    Ok((headers, body))
}
