//! Bearer shared-secret check for the scheduler endpoint.
//!
//! The cron route is meant to be called by an external scheduler carrying a
//! pre-shared token. When no secret is configured the endpoint runs
//! unauthenticated — an explicit permissive fallback for local development,
//! warned about at startup.

use axum::http::{header, HeaderMap};

/// Extract the bearer token from an Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// True if the request may run the cron endpoint.
pub fn authorize(headers: &HeaderMap, configured_secret: Option<&str>) -> bool {
    match configured_secret {
        None => true,
        Some(secret) => bearer_token(headers) == Some(secret),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_no_secret_is_permissive() {
        assert!(authorize(&HeaderMap::new(), None));
        assert!(authorize(&headers_with("Bearer anything"), None));
    }

    #[test]
    fn test_secret_must_match() {
        let secret = Some("cron-s3cret");
        assert!(authorize(&headers_with("Bearer cron-s3cret"), secret));
        assert!(!authorize(&headers_with("Bearer wrong"), secret));
        assert!(!authorize(&headers_with("cron-s3cret"), secret));
        assert!(!authorize(&HeaderMap::new(), secret));
    }
}
