//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the injected `InventoryService`
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use stockroom_auth::{Hs256JwtValidator, StaticCredentials};

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Login-side auth state: the credential pair and the token issuer.
#[derive(Clone)]
pub struct SessionIssuer {
    pub credentials: Arc<StaticCredentials>,
    pub jwt: Arc<Hs256JwtValidator>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router_with_services(config, services))
}

/// Router over an already-built service.
pub fn router_with_services(config: &AppConfig, services: Arc<services::AppServices>) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(
        config.session_secret.as_bytes(),
        config.session_ttl,
    ));
    let issuer = SessionIssuer {
        credentials: Arc::new(StaticCredentials::new(
            config.auth_username.clone(),
            config.auth_password.clone(),
        )),
        jwt: jwt.clone(),
    };
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid session token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/login", post(routes::session::login))
        .layer(Extension(issuer))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
