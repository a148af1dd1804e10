//! Classification of failed responses.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::ClientError;

#[allow(clippy::unwrap_used)]
static AUTH_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(unauthori[sz]ed|401|403|credentials)\b").unwrap()
});

/// Whether an error message talks about a rejected session.
///
/// Used by the backstop for errors that bypassed the interceptor.
pub fn is_auth_failure_message(message: &str) -> bool {
    AUTH_VOCABULARY.is_match(message)
}

/// Flattens an error body into one displayable line.
///
/// Handles `{"detail": "..."}`, `{"detail": [{"loc": [...], "msg": "..."}]}`,
/// `{"message": "..."}`, `{"error": "..."}` and bare strings. Returns `None`
/// when nothing readable is found.
pub fn flatten_detail(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_item).collect();
            if parts.is_empty() { None } else { Some(parts.join("; ")) }
        }
        Value::Object(map) => ["detail", "message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(flatten_detail)),
        _ => None,
    }
}

fn flatten_item(item: &Value) -> Option<String> {
    let Value::Object(map) = item else {
        return flatten_detail(item);
    };

    let msg = map
        .get("msg")
        .or_else(|| map.get("message"))
        .and_then(Value::as_str)?
        .trim();

    let field = map
        .get("loc")
        .and_then(Value::as_array)
        .and_then(|loc| loc.iter().rev().find(|part| part.as_str() != Some("body")))
        .map(|part| match part {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

    Some(match field {
        Some(field) => format!("{field}: {msg}"),
        None => msg.to_owned(),
    })
}

/// Maps a non-success, non-auth response to an error.
pub fn classify(status: u16, body: &Value) -> ClientError {
    let detail = flatten_detail(body);
    match status {
        408 | 429 => ClientError::Transient(
            detail.unwrap_or_else(|| format!("server asked to retry later ({status})")),
        ),
        400..=499 if status != 404 => ClientError::Validation(
            detail.unwrap_or_else(|| "The request was rejected".to_owned()),
        ),
        _ => ClientError::Http {
            status,
            message: detail.unwrap_or_else(|| "Unexpected server response".to_owned()),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_auth_vocabulary() {
        assert!(is_auth_failure_message("Request failed with status code 401"));
        assert!(is_auth_failure_message("403 Forbidden"));
        assert!(is_auth_failure_message("Unauthorized"));
        assert!(is_auth_failure_message("Could not validate credentials"));
        assert!(!is_auth_failure_message("Network Error"));
        assert!(!is_auth_failure_message("order 14015 not found"));
    }

    #[test]
    fn test_flatten_string_detail() {
        let body = json!({"detail": "Email already registered"});
        assert_eq!(flatten_detail(&body).unwrap(), "Email already registered");
    }

    #[test]
    fn test_flatten_array_detail() {
        let body = json!({"detail": [
            {"loc": ["body", "email"], "msg": "field required", "type": "value_error.missing"},
            {"loc": ["body", "amount"], "msg": "must be positive"},
        ]});

        assert_eq!(
            flatten_detail(&body).unwrap(),
            "email: field required; amount: must be positive"
        );
    }

    #[test]
    fn test_flatten_item_without_loc() {
        let body = json!({"detail": [{"msg": "bad date range"}, "also this"]});
        assert_eq!(flatten_detail(&body).unwrap(), "bad date range; also this");
    }

    #[test]
    fn test_flatten_nothing_readable() {
        assert!(flatten_detail(&json!({"code": 12})).is_none());
        assert!(flatten_detail(&Value::Null).is_none());
    }

    #[test]
    fn test_classify() {
        let err = classify(422, &json!({"detail": [{"loc": ["body", "name"], "msg": "required"}]}));
        assert_eq!(err, ClientError::Validation("name: required".to_owned()));

        assert!(matches!(classify(429, &Value::Null), ClientError::Transient(_)));
        assert!(matches!(classify(404, &Value::Null), ClientError::Http { status: 404, .. }));
        assert!(matches!(classify(500, &json!("boom")), ClientError::Http { status: 500, .. }));
    }
}
