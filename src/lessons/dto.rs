use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{macros::format_description, Date, OffsetDateTime};

use crate::lessons::repo::{LessonFilter, LessonRow};

/// Required fields are optional at the serde level; a missing value fails
/// validation with a 400 envelope rather than a serde rejection.
#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub date: Option<String>,
    pub customer_name: Option<String>,
    /// Clients send either `"12.50"` or `12.5`; both are accepted.
    pub amount: Option<Value>,
    pub user_id: Option<Value>,
}

/// Raw query-string filters. Values that fail to parse are dropped rather
/// than rejected, matching the lenient list behavior clients rely on.
#[derive(Debug, Default, Deserialize)]
pub struct LessonQuery {
    pub user_id: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl LessonQuery {
    pub fn into_filter(self) -> LessonFilter {
        LessonFilter {
            user_id: self.user_id.as_deref().and_then(|v| v.parse::<i64>().ok()),
            from_date: self.from_date.filter(|d| parse_date(d).is_some()),
            to_date: self.to_date.filter(|d| parse_date(d).is_some()),
        }
    }
}

/// Strict ISO calendar date, e.g. `2025-01-12`.
pub fn parse_date(s: &str) -> Option<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(s, &format).ok()
}

/// Amounts arrive as a JSON string or number; anything else is invalid.
pub fn parse_amount(v: &Value) -> Option<Decimal> {
    match v {
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        _ => None,
    }
}

/// An explicit owner override is used only when it parses as an id.
pub fn parse_owner_override(v: &Option<Value>) -> Option<i64> {
    match v {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct LessonDto {
    pub id: i64,
    pub date: String,
    pub customer_name: String,
    pub amount: String,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<LessonRow> for LessonDto {
    fn from(r: LessonRow) -> Self {
        Self {
            id: r.id,
            date: r.date,
            customer_name: r.customer_name,
            amount: r.amount.to_string(),
            user_id: r.user_id,
            user_name: r.user_name,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LessonsResponse {
    pub ok: bool,
    pub lessons: Vec<LessonDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn date_parsing_is_strict_iso() {
        assert!(parse_date("2025-01-12").is_some());
        assert!(parse_date("2025-02-29").is_none()); // not a leap year
        assert!(parse_date("12-01-2025").is_none());
        assert!(parse_date("2025-1-2").is_none());
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn amount_accepts_string_and_number() {
        assert_eq!(parse_amount(&json!("12.50")).unwrap().to_string(), "12.50");
        assert_eq!(parse_amount(&json!(12.5)).unwrap().to_string(), "12.5");
        assert_eq!(parse_amount(&json!(-3)).unwrap().to_string(), "-3");
        assert!(parse_amount(&json!("twaalf")).is_none());
        assert!(parse_amount(&json!(null)).is_none());
        assert!(parse_amount(&json!([1, 2])).is_none());
    }

    #[test]
    fn owner_override_requires_a_parseable_id() {
        assert_eq!(parse_owner_override(&Some(json!(3))), Some(3));
        assert_eq!(parse_owner_override(&Some(json!("3"))), Some(3));
        assert_eq!(parse_owner_override(&Some(json!("three"))), None);
        assert_eq!(parse_owner_override(&Some(json!(2.5))), None);
        assert_eq!(parse_owner_override(&None), None);
    }

    #[test]
    fn invalid_filters_are_dropped_not_rejected() {
        let q = LessonQuery {
            user_id: Some("abc".into()),
            from_date: Some("2025-13-01".into()),
            to_date: Some("2025-12-31".into()),
        };
        let f = q.into_filter();
        assert_eq!(f.user_id, None);
        assert_eq!(f.from_date, None);
        assert_eq!(f.to_date.as_deref(), Some("2025-12-31"));
    }

    #[test]
    fn empty_query_means_no_constraints() {
        let f = LessonQuery::default().into_filter();
        assert_eq!(f, LessonFilter::default());
    }

    #[test]
    fn lesson_dto_renders_amount_as_decimal_string() {
        use time::macros::datetime;
        let row = LessonRow {
            id: 1,
            date: "2025-01-12".into(),
            customer_name: "Jane".into(),
            amount: "12.50".parse().unwrap(),
            user_id: Some(3),
            user_name: Some("Jan".into()),
            created_at: datetime!(2025-01-12 09:30 UTC),
        };
        let json = serde_json::to_string(&LessonDto::from(row)).unwrap();
        assert!(json.contains(r#""amount":"12.50""#));
        assert!(json.contains(r#""user_id":3"#));
        assert!(json.contains("2025-01-12T09:30:00Z"));
    }
}
