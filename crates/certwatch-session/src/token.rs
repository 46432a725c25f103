//! JWT claim decoding

use jsonwebtoken::dangerous::insecure_decode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token is empty")]
    Empty,
    #[error("Token decoding failed: {0}")]
    Malformed(String),
}

/// Payload claims issued by the backend at login.
///
/// Only `is_admin` drives the session. The other claims are informational and
/// read leniently, so an unexpected type yields `None` instead of a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "boolish")]
    pub is_admin: bool,
    #[serde(default, deserialize_with = "lenient_i64", skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Decode the payload of a token without checking its signature, algorithm or expiry.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    insecure_decode::<Claims>(token)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Malformed(e.to_string()))
}

// Accepts true/false, 0/1 and "true"/"1"/"yes"; anything else (including null) is false.
fn boolish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        _ => false,
    })
}

// Strings pass through, numbers and booleans are rendered; anything else is dropped.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// Integers, floats (truncated) and numeric strings; anything else is dropped.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn segment(value: &Value) -> String {
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(value.to_string())
    }

    pub(crate) fn token_with(payload: Value) -> String {
        encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(b"server-side-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_admin_claims() {
        let token = token_with(json!({"sub": "alice", "user_id": 7, "is_admin": true, "exp": 4102444800_i64}));
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("alice"));
        assert_eq!(claims.user_id, Some(7));
        assert!(claims.is_admin);
    }

    #[test]
    fn test_missing_or_null_admin_claim_is_false() {
        let absent = decode_claims(&token_with(json!({"sub": "bob"}))).unwrap();
        let null = decode_claims(&token_with(json!({"sub": "bob", "is_admin": null}))).unwrap();

        assert!(!absent.is_admin);
        assert!(!null.is_admin);
    }

    #[test]
    fn test_boolish_admin_claim() {
        for (value, expected) in [
            (json!(1), true),
            (json!(0), false),
            (json!("true"), true),
            (json!("False"), false),
            (json!("1"), true),
            (json!([]), false),
        ] {
            let claims = decode_claims(&token_with(json!({"is_admin": value}))).unwrap();
            assert_eq!(claims.is_admin, expected, "is_admin = {}", value);
        }
    }

    #[test]
    fn test_signature_and_expiry_are_not_checked() {
        let expired = token_with(json!({"sub": "carol", "is_admin": true, "exp": 1}));
        let foreign = encode(
            &Header::default(),
            &json!({"sub": "dave"}),
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .unwrap();

        assert!(decode_claims(&expired).unwrap().is_admin);
        assert_eq!(decode_claims(&foreign).unwrap().sub.as_deref(), Some("dave"));
    }

    #[test]
    fn test_any_header_algorithm_is_accepted() {
        let token = format!(
            "{}.{}.c2lnbmF0dXJl",
            segment(&json!({"alg": "RS256", "typ": "JWT"})),
            segment(&json!({"sub": "erin", "is_admin": true}))
        );

        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("erin"));
        assert!(claims.is_admin);
    }

    #[test]
    fn test_informational_claims_of_unexpected_type_do_not_fail() {
        let claims = decode_claims(&token_with(json!({
            "sub": 42,
            "user_id": "7",
            "exp": 1700000000.5,
            "is_admin": false
        })))
        .unwrap();

        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.user_id, Some(7));
        assert_eq!(claims.exp, Some(1700000000));
        assert!(!claims.is_admin);

        let odd = decode_claims(&token_with(json!({"sub": {"id": 1}, "user_id": "x"}))).unwrap();
        assert_eq!(odd.sub, None);
        assert_eq!(odd.user_id, None);
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        for token in ["", "   ", "not-a-jwt", "a.b.c", "eyJhbGciOiJIUzI1NiJ9.bm90LWpzb24.sig"] {
            assert!(decode_claims(token).is_err(), "token {:?} should not decode", token);
        }
    }
}
