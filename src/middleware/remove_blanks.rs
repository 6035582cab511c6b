use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// Removes empty-string fields from a JSON request body before it reaches the
/// handler, e.g. `{"spot": {"name": "", "seen": true}}` becomes
/// `{"spot": {"seen": true}}`. Bodies that are not JSON objects pass through
/// untouched so the handler can report them.
pub async fn remove_blanks_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let limit = state.config.api.max_request_size_bytes;

    let bytes = to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!("Failed to buffer request body: {}", e);
        ApiError::payload_too_large(format!("Request body exceeds {} bytes", limit))
    })?;

    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) if value.is_object() => {
            remove_blank_fields(&mut value);
            parts.headers.remove(header::CONTENT_LENGTH);
            Body::from(serde_json::to_vec(&value).map_err(|e| {
                tracing::error!("Failed to re-encode sanitized body: {}", e);
                ApiError::internal_server_error("Failed to process request body")
            })?)
        }
        _ => Body::from(bytes),
    };

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Drop `""` values at the top level and one object level down
pub fn remove_blank_fields(value: &mut Value) {
    if let Value::Object(map) = value {
        map.retain(|_, v| !is_blank(v));
        for nested in map.values_mut() {
            if let Value::Object(inner) = nested {
                inner.retain(|_, v| !is_blank(v));
            }
        }
    }
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_blank_strings_inside_resource() {
        let mut body = json!({ "spot": { "name": "", "notes": "kept", "seen": false } });
        remove_blank_fields(&mut body);
        assert_eq!(body, json!({ "spot": { "notes": "kept", "seen": false } }));
    }

    #[test]
    fn keeps_non_string_and_whitespace_values() {
        let mut body = json!({ "spot": { "name": " ", "seen": null, "tags": [""] }, "extra": "" });
        remove_blank_fields(&mut body);
        assert_eq!(body, json!({ "spot": { "name": " ", "seen": null, "tags": [""] } }));
    }
}
