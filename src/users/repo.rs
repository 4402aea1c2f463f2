use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::info;

use crate::auth::password::hash_password;
use crate::state::AppState;
use crate::users::handlers::normalize_email;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub username: Option<&'a str>,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub is_admin: bool,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, name, description, is_admin, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, name, description, is_admin, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, name, description, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, password_hash, name, description, is_admin, created_at
            "#,
        )
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.name)
        .bind(new.description)
        .bind(new.is_admin)
        .fetch_one(db)
        .await
    }

    /// Full listing for the admin view, newest account first.
    pub async fn list_full(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, name, description, is_admin, created_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await
    }

    /// Simplified listing for owner pickers, ordered by display name.
    pub async fn list_simple(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, name, description, is_admin, created_at
            FROM users
            ORDER BY COALESCE(name, username, email) ASC
            "#,
        )
        .fetch_all(db)
        .await
    }

    pub async fn username_in_use(db: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    pub async fn email_in_use_by_other(
        db: &PgPool,
        email: &str,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id <> $2")
                .bind(email)
                .bind(id)
                .fetch_optional(db)
                .await?;
        Ok(row.is_some())
    }

    pub async fn update_profile(
        db: &PgPool,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET name = $2, description = $3, email = $4 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(description)
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_password_hash(db: &PgPool, id: i64, hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(db)
            .await?;
        Ok(())
    }
}

/// Create the configured admin account on startup when it does not exist
/// yet. Safe to run on every boot.
pub async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (
        state.config.admin_email.as_deref(),
        state.config.admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    // store the canonical form that login looks up
    let email = normalize_email(email);

    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Ok(());
    }

    let username = if User::username_in_use(&state.db, "admin").await? {
        None
    } else {
        Some("admin")
    };

    let hash = hash_password(password)?;
    let user = User::create(
        &state.db,
        NewUser {
            username,
            email: &email,
            password_hash: &hash,
            name: None,
            description: None,
            is_admin: true,
        },
    )
    .await?;
    info!(user_id = user.id, "created bootstrap admin user");
    Ok(())
}
