use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};

use crate::app::{dto, errors, SessionIssuer};

pub async fn login(
    Extension(issuer): Extension<SessionIssuer>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    if !issuer.credentials.verify(&body.username, &body.password) {
        tracing::warn!("rejected login attempt");
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "username or password is incorrect",
        );
    }

    let (token, claims) = match issuer.jwt.issue(issuer.credentials.username(), Utc::now()) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "failed to issue session token");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "auth_error", e.to_string());
        }
    };

    tracing::info!(sub = %claims.sub, "session issued");
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "token": token,
            "token_type": "Bearer",
            "expires_at": DateTime::from_timestamp(claims.exp, 0).map(|t| t.to_rfc3339()),
        })),
    )
        .into_response()
}
