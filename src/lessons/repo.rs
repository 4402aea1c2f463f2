use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// A lesson joined with its owner's display name.
#[derive(Debug, Clone, FromRow)]
pub struct LessonRow {
    pub id: i64,
    pub date: String,
    pub customer_name: String,
    pub amount: Decimal,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Already-validated filters; a `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonFilter {
    pub user_id: Option<i64>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

pub async fn create(
    db: &PgPool,
    date: &str,
    customer_name: &str,
    amount: Decimal,
    user_id: i64,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO lessons (date, customer_name, amount, user_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(date)
    .bind(customer_name)
    .bind(amount)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(id)
}

/// Filtered listing, newest first. ISO dates stored as text compare in
/// calendar order, so the range filters are plain string comparisons.
pub async fn list(db: &PgPool, filter: &LessonFilter) -> Result<Vec<LessonRow>, sqlx::Error> {
    sqlx::query_as::<_, LessonRow>(
        r#"
        SELECT l.id, l.date, l.customer_name, l.amount, l.user_id,
               COALESCE(u.name, u.username) AS user_name,
               l.created_at
        FROM lessons l
        LEFT JOIN users u ON u.id = l.user_id
        WHERE ($1::bigint IS NULL OR l.user_id = $1)
          AND ($2::text IS NULL OR l.date >= $2)
          AND ($3::text IS NULL OR l.date <= $3)
        ORDER BY l.created_at DESC
        "#,
    )
    .bind(filter.user_id)
    .bind(filter.from_date.as_deref())
    .bind(filter.to_date.as_deref())
    .fetch_all(db)
    .await
}
