use std::fmt::Write;

use time::format_description::well_known::Rfc3339;

use crate::lessons::repo::LessonRow;

pub const HEADER: &str = "user_id,user_name,date,customer_name,amount,created_at";

/// Render lessons as CSV for download. Absent owner fields become empty
/// columns; amounts keep their exact decimal form.
pub fn render(rows: &[LessonRow]) -> anyhow::Result<String> {
    let mut out = String::with_capacity(64 * (rows.len() + 1));
    out.push_str(HEADER);
    out.push('\n');
    for r in rows {
        let user_id = r.user_id.map(|id| id.to_string()).unwrap_or_default();
        writeln!(
            &mut out,
            "{},{},{},{},{},{}",
            escape(&user_id),
            escape(r.user_name.as_deref().unwrap_or("")),
            escape(&r.date),
            escape(&r.customer_name),
            escape(&r.amount.to_string()),
            escape(&r.created_at.format(&Rfc3339)?),
        )?;
    }
    Ok(out)
}

/// Quote a field when it contains a separator, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row(id: i64, customer: &str, amount: &str, user: Option<(i64, &str)>) -> LessonRow {
        LessonRow {
            id,
            date: "2025-01-12".into(),
            customer_name: customer.into(),
            amount: amount.parse().unwrap(),
            user_id: user.map(|(id, _)| id),
            user_name: user.map(|(_, n)| n.to_string()),
            created_at: datetime!(2025-01-12 09:30 UTC),
        }
    }

    #[test]
    fn header_then_one_line_per_row() {
        let rows = vec![
            row(1, "Jane", "12.50", Some((3, "Jan"))),
            row(2, "Piet", "40.00", Some((4, "Marie"))),
        ];
        let csv = render(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "3,Jan,2025-01-12,Jane,12.50,2025-01-12T09:30:00Z");
        assert_eq!(
            lines[2],
            "4,Marie,2025-01-12,Piet,40.00,2025-01-12T09:30:00Z"
        );
    }

    #[test]
    fn missing_owner_renders_empty_columns() {
        let csv = render(&[row(1, "Jane", "12.50", None)]).unwrap();
        assert_eq!(
            csv.lines().nth(1).unwrap(),
            ",,2025-01-12,Jane,12.50,2025-01-12T09:30:00Z"
        );
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        let csv = render(&[row(1, "Doe, Jane", "12.50", Some((3, "Jan")))]).unwrap();
        assert!(csv.contains(r#","Doe, Jane","#));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let csv = render(&[row(1, r#"the "best" customer"#, "1.00", None)]).unwrap();
        assert!(csv.contains(r#""the ""best"" customer""#));
    }

    #[test]
    fn empty_input_is_header_only() {
        let csv = render(&[]).unwrap();
        assert_eq!(csv, format!("{HEADER}\n"));
    }
}
