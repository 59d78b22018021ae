use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use stockroom_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::context::SessionContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(msg) => return json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            return json_error(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string());
        }
    };

    req.extensions_mut().insert(SessionContext::new(claims.sub));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing Authorization header")?;

    let header = header.to_str().map_err(|_| "malformed Authorization header")?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must use the Bearer scheme")?;

    let token = header.trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }

    Ok(token)
}
