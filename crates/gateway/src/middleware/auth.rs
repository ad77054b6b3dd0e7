//! Administrative authorization for mutating endpoints
//!
//! Accepts `Authorization: Bearer <token>` where the token is the shared
//! sync secret or an admin session JWT.

use crate::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use folio_common::auth::Principal;
use folio_common::errors::{AppError, Result};
use tracing::warn;

/// Extractor that rejects the request with 401 unless the caller is an
/// administrator. Runs before the body is read, so nothing is written on
/// rejection.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub Principal);

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match authorize_headers(state, &parts.headers) {
            Ok(principal) => Ok(AdminAuth(principal)),
            Err(e) => {
                warn!(
                    method = %parts.method,
                    path = %parts.uri.path(),
                    error = %e,
                    "Rejected unauthorized mutation"
                );
                Err(e)
            }
        }
    }
}

/// Check the `Authorization` header against the configured credentials
pub fn authorize_headers(state: &AppState, headers: &HeaderMap) -> Result<Principal> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    state.authorizer.authorize(header)
}

/// Admin principal when valid credentials were sent; anonymous otherwise
pub fn optional_admin(state: &AppState, headers: &HeaderMap) -> Option<Principal> {
    if !headers.contains_key(AUTHORIZATION) {
        return None;
    }
    authorize_headers(state, headers).ok()
}
