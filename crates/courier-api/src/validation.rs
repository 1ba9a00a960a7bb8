//! Request validation helpers

use axum::http::HeaderMap;
use courier_core::AppError;
use subtle::ConstantTimeEq;

/// Constant-time comparison of a header value against the expected secret
pub fn header_matches_secret(headers: &HeaderMap, header: &str, expected: &str) -> bool {
    let Some(provided) = headers.get(header).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let provided = provided.trim().as_bytes();
    let expected = expected.as_bytes();
    provided.len() == expected.len() && bool::from(provided.ct_eq(expected))
}

/// Check the direct upload signature; a missing `API_SECRET` disables the API
pub fn require_api_signature(
    headers: &HeaderMap,
    header: &str,
    api_secret: Option<&str>,
) -> Result<(), AppError> {
    let Some(secret) = api_secret else {
        return Err(AppError::ServiceDisabled(
            "Direct upload API is disabled".to_string(),
        ));
    };
    if !header_matches_secret(headers, header, secret) {
        return Err(AppError::Unauthorized("Invalid signature".to_string()));
    }
    Ok(())
}
