use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo::User;

/// Required fields are optional at the serde level so a missing value
/// becomes a 400 envelope instead of a serde rejection.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Patch body; absent fields leave the stored value unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: Option<String>,
    pub old_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserFull {
    pub id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct UserSimple {
    pub id: i64,
    pub username: Option<String>,
    pub name: Option<String>,
}

impl From<User> for UserFull {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            name: u.name,
            description: u.description,
            is_admin: u.is_admin,
            created_at: u.created_at,
        }
    }
}

impl From<User> for UserSimple {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            name: u.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsersResponse<T> {
    pub ok: bool,
    pub users: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub ok: bool,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
