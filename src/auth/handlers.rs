use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::auth::{
    dto::{LoginRequest, LoginResponse, Profile},
    password::verify_password,
    session,
};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::handlers::normalize_email;
use crate::users::repo::User;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), ApiError> {
    let email = normalize_email(&payload.email.unwrap_or_default());
    let password = payload.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::InvalidInput("email and password required".into()));
    }

    // one error for unknown email and wrong password alike
    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!("login with unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = session::create_session(&state.db, user.id, state.config.session_ttl_hours).await?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session::set_session_cookie(&token));

    info!(user_id = user.id, "user logged in");
    Ok((
        headers,
        Json(LoginResponse {
            ok: true,
            profile: Profile {
                id: user.id,
                username: user.username,
                email: user.email,
                name: user.name,
                is_admin: user.is_admin,
            },
        }),
    ))
}

#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    session: session::AuthSession,
) -> Result<(HeaderMap, Json<Value>), ApiError> {
    session::delete_session(&state.db, &session.token).await?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session::clear_session_cookie());

    info!(user_id = session.user.id, "user logged out");
    Ok((headers, Json(json!({ "ok": true }))))
}
