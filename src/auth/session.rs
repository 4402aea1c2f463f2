use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderValue},
};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::User;

pub const SESSION_COOKIE: &str = "tutorlog_session";

/// Insert a session row and return the opaque token the cookie carries.
pub async fn create_session(db: &PgPool, user_id: i64, ttl_hours: i64) -> anyhow::Result<String> {
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(ttl_hours);
    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(&token)
    .bind(user_id)
    .bind(expires_at)
    .execute(db)
    .await?;
    Ok(token)
}

pub async fn delete_session(db: &PgPool, token: &str) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(db)
        .await?;
    Ok(())
}

/// Resolve a session token to its user. Expired rows count as absent.
pub async fn find_session_user(db: &PgPool, token: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.email, u.password_hash, u.name,
               u.description, u.is_admin, u.created_at
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = $1 AND s.expires_at > now()
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get(axum::http::header::COOKIE)?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

pub fn set_session_cookie(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE, token
    ))
    .unwrap()
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "tutorlog_session=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/",
    )
}

/// Extracts the caller's session, rejecting with 401 when the cookie is
/// missing, unknown or expired.
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            parse_cookie(&parts.headers, SESSION_COOKIE).ok_or(ApiError::Unauthenticated)?;
        let user = find_session_user(&state.db, &token)
            .await?
            .ok_or(ApiError::Unauthenticated)?;
        Ok(AuthSession { user, token })
    }
}

/// Like [`AuthSession`] but additionally requires the admin flag.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        if !session.user.is_admin {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(session.user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn parse_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; tutorlog_session=abc123; lang=nl"),
        );
        assert_eq!(
            parse_cookie(&headers, SESSION_COOKIE).as_deref(),
            Some("abc123")
        );
        assert_eq!(parse_cookie(&headers, "theme").as_deref(), Some("dark"));
        assert_eq!(parse_cookie(&headers, "missing"), None);
    }

    #[test]
    fn parse_cookie_without_header_is_none() {
        let headers = HeaderMap::new();
        assert_eq!(parse_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn set_cookie_round_trips_through_parse() {
        let set = set_session_cookie("deadbeef");
        let mut headers = HeaderMap::new();
        // a browser echoes back only the name=value pair
        let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
        assert_eq!(
            parse_cookie(&headers, SESSION_COOKIE).as_deref(),
            Some("deadbeef")
        );
    }

    #[test]
    fn clear_cookie_expires_in_the_past() {
        let v = clear_session_cookie();
        let s = v.to_str().unwrap();
        assert!(s.contains("Expires=Thu, 01 Jan 1970"));
        assert!(s.starts_with("tutorlog_session="));
    }
}
