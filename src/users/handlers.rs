use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{AdminUser, AuthSession};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{
    ChangePasswordRequest, CreateUserRequest, CreatedResponse, OkResponse, UpdateUserRequest,
    UserFull, UserSimple, UsersResponse,
};
use crate::users::repo::{NewUser, User};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users_simple", get(list_users_simple))
        .route("/users/:id", put(update_user))
        .route("/users/:id/password", post(change_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Fallback username when none is supplied: the email local-part.
pub(crate) fn username_from_email(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Canonical form for stored and looked-up emails; every write and every
/// lookup must go through this or exact-match queries miss.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_admin_or_self(caller: &User, target_id: i64) -> bool {
    caller.is_admin || caller.id == target_id
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<UsersResponse<UserFull>>, ApiError> {
    let users = User::list_full(&state.db).await?;
    Ok(Json(UsersResponse {
        ok: true,
        users: users.into_iter().map(UserFull::from).collect(),
    }))
}

#[instrument(skip(state, _session))]
pub async fn list_users_simple(
    State(state): State<AppState>,
    _session: AuthSession,
) -> Result<Json<UsersResponse<UserSimple>>, ApiError> {
    let users = User::list_simple(&state.db).await?;
    Ok(Json(UsersResponse {
        ok: true,
        users: users.into_iter().map(UserSimple::from).collect(),
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let email = normalize_email(&payload.email.unwrap_or_default());
    let password = payload.password.unwrap_or_default();

    if !is_valid_email(&email) {
        return Err(ApiError::InvalidInput("invalid email".into()));
    }
    if password.is_empty() {
        return Err(ApiError::InvalidInput("password required".into()));
    }
    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!("email already registered");
        return Err(ApiError::Conflict("email already registered".into()));
    }

    // derived usernames are display-only; drop the fallback on collision
    let derived = username_from_email(&email).to_string();
    let username = if User::username_in_use(&state.db, &derived).await? {
        None
    } else {
        Some(derived)
    };

    let hash = hash_password(&password)?;
    let user = User::create(
        &state.db,
        NewUser {
            username: username.as_deref(),
            email: &email,
            password_hash: &hash,
            name: payload.name.as_deref(),
            description: payload.description.as_deref(),
            is_admin: payload.is_admin,
        },
    )
    .await?;

    info!(user_id = user.id, created_by = admin.id, "user created");
    Ok(Json(CreatedResponse { ok: true, id: user.id }))
}

#[instrument(skip(state, session, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    if !is_admin_or_self(&session.user, id) {
        return Err(ApiError::Forbidden);
    }

    let target = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    let email = match payload.email {
        Some(e) => {
            let e = normalize_email(&e);
            if !is_valid_email(&e) {
                return Err(ApiError::InvalidInput("invalid email".into()));
            }
            if User::email_in_use_by_other(&state.db, &e, id).await? {
                return Err(ApiError::Conflict("email already registered".into()));
            }
            Some(e)
        }
        None => target.email,
    };
    let name = payload.name.or(target.name);
    let description = payload.description.or(target.description);

    User::update_profile(
        &state.db,
        id,
        name.as_deref(),
        description.as_deref(),
        email.as_deref(),
    )
    .await?;

    info!(user_id = id, updated_by = session.user.id, "profile updated");
    Ok(Json(OkResponse { ok: true }))
}

#[instrument(skip(state, session, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<i64>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let new_password = payload.new_password.unwrap_or_default();
    if new_password.is_empty() {
        return Err(ApiError::InvalidInput("new_password required".into()));
    }

    // authorization before the lookup so non-admins cannot probe which ids exist
    if !is_admin_or_self(&session.user, id) {
        return Err(ApiError::Forbidden);
    }

    let target = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    if !session.user.is_admin {
        // self-service requires the current password
        let old = payload.old_password.as_deref().unwrap_or("");
        if !verify_password(old, &target.password_hash)? {
            warn!(user_id = id, "password change with wrong old password");
            return Err(ApiError::Forbidden);
        }
    }

    let hash = hash_password(&new_password)?;
    User::set_password_hash(&state.db, id, &hash).await?;

    info!(user_id = id, changed_by = session.user.id, "password changed");
    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("jan@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.nl"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaced @example.com"));
    }

    #[test]
    fn username_derives_from_local_part() {
        assert_eq!(username_from_email("jan@example.com"), "jan");
        assert_eq!(username_from_email("a.b+c@x.nl"), "a.b+c");
    }

    #[test]
    fn emails_normalize_to_trimmed_lowercase() {
        assert_eq!(normalize_email("  Admin@Example.COM "), "admin@example.com");
        assert_eq!(normalize_email("jan@example.com"), "jan@example.com");
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn admin_or_self_gates_profile_and_password_changes() {
        use time::macros::datetime;
        let user = |id: i64, is_admin: bool| User {
            id,
            username: None,
            email: Some(format!("u{id}@example.com")),
            password_hash: "$argon2id$hash".into(),
            name: None,
            description: None,
            is_admin,
            created_at: datetime!(2025-01-02 10:00 UTC),
        };
        let admin = user(1, true);
        let tutor = user(2, false);
        assert!(is_admin_or_self(&admin, 99));
        assert!(is_admin_or_self(&tutor, 2));
        // a non-admin aiming at another id is refused before any lookup
        assert!(!is_admin_or_self(&tutor, 3));
        assert!(!is_admin_or_self(&tutor, 99));
    }
}
