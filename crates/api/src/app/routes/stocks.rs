use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::StockId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stocks).post(create_stock))
        .route("/:id", get(get_stock).patch(update_stock).delete(delete_stock))
        .route("/:id/adjust", post(adjust_quantity))
}

fn parse_id(id: &str) -> Result<StockId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("stock"))
}

pub async fn list_stocks(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_stocks().await {
        Ok(stocks) => {
            let stocks: Vec<_> = stocks.iter().map(dto::stock_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "stocks": stocks }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_stock(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };
    let new_stock = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.create_stock(new_stock).await {
        Ok(stock) => (StatusCode::CREATED, Json(dto::stock_to_json(&stock))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.get_stock(id).await {
        Ok(Some(stock)) => (StatusCode::OK, Json(dto::stock_to_json(&stock))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "stock not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };
    let patch = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.update_stock(id, patch).await {
        Ok(stock) => (StatusCode::OK, Json(dto::stock_to_json(&stock))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.delete_stock(id).await {
        Ok(removed) => {
            tracing::info!(operator = session.subject(), stock_id = %id, removed, "stock delete");
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": id.to_string(),
                    "removed": removed,
                })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn adjust_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::AdjustQuantityRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };
    let delta = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.adjust_quantity(id, delta).await {
        Ok(stock) => {
            tracing::debug!(operator = session.subject(), stock_id = %id, "quantity adjusted");
            (StatusCode::OK, Json(dto::stock_to_json(&stock))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
