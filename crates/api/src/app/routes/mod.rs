use axum::Router;

pub mod items;
pub mod session;
pub mod stocks;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/items", items::router())
        .nest("/stocks", stocks::router())
}
