use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::ApiError;

/// Pull the bearer token out of the Authorization header.
pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn require_bearer_accepts_any_scheme_casing() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bEaReR tok-123"));

        assert_eq!(require_bearer(&headers).unwrap(), "tok-123");
    }

    #[test]
    fn require_bearer_rejects_absent_header() {
        let error = require_bearer(&HeaderMap::new()).unwrap_err();
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn require_bearer_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));

        let error = require_bearer(&headers).unwrap_err();
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert!(error.message.contains("scheme"));
    }

    #[test]
    fn require_bearer_rejects_scheme_without_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));

        let error = require_bearer(&headers).unwrap_err();
        assert!(error.message.contains("missing bearer token"));
    }
}
