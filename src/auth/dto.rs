use serde::{Deserialize, Serialize};

/// Login body. The canonical identifier is the email; `identifier` is
/// accepted as an alias so older clients keep working. Fields are optional
/// so that missing values surface as a 400 envelope, not a serde rejection.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "identifier")]
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public part of the user returned to the client after login.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    pub profile: Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_accepts_identifier_alias() {
        let r: LoginRequest =
            serde_json::from_str(r#"{"identifier":"a@b.nl","password":"pw"}"#).unwrap();
        assert_eq!(r.email.as_deref(), Some("a@b.nl"));
        let r: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.nl","password":"pw"}"#).unwrap();
        assert_eq!(r.email.as_deref(), Some("a@b.nl"));
    }

    #[test]
    fn login_request_tolerates_missing_fields() {
        let r: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(r.email.is_none());
        assert!(r.password.is_none());
    }

    #[test]
    fn profile_never_carries_a_hash() {
        let p = Profile {
            id: 1,
            username: Some("jan".into()),
            email: Some("jan@example.com".into()),
            name: None,
            is_admin: false,
        };
        let json = serde_json::to_string(&LoginResponse { ok: true, profile: p }).unwrap();
        assert!(json.contains(r#""ok":true"#));
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }
}
