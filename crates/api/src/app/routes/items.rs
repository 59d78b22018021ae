use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Extension, Path},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use stockroom_core::ItemId;
use stockroom_inventory::MAX_IMAGE_INPUT_BYTES;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", get(get_item).patch(update_item).delete(delete_item))
        .route("/:id/references", get(count_references))
        .route(
            "/:id/image",
            put(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_INPUT_BYTES)),
        )
}

fn parse_id(id: &str) -> Result<ItemId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("item"))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_items().await {
        Ok(items) => {
            let items: Vec<_> = items.iter().map(dto::item_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };
    let new_item = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.create_item(new_item).await {
        Ok(item) => (StatusCode::CREATED, Json(dto::item_to_json(&item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.get_item(id).await {
        Ok(Some(item)) => (StatusCode::OK, Json(dto::item_to_json(&item))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateItemRequest>, JsonRejection>,
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

    match services.update_item(id, patch).await {
        Ok(item) => (StatusCode::OK, Json(dto::item_to_json(&item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.delete_item(id).await {
        Ok(deletion) => {
            tracing::info!(
                operator = session.subject(),
                item_id = %id,
                removed = deletion.removed,
                "item delete"
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": id.to_string(),
                    "removed": deletion.removed,
                    "dangling_references": deletion.dangling_references,
                })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn count_references(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    match services.count_referencing_stocks(id).await {
        Ok(count) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "item_id": id.to_string(),
                "referencing_stocks": count,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Raw image bytes in the body; `Content-Type` must be `image/*`.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, axum::extract::rejection::BytesRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let body = match body {
        Ok(b) => b,
        Err(e) => {
            return errors::json_error(e.status(), "invalid_body", e.body_text());
        }
    };
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match services.set_item_image(id, &body, content_type).await {
        Ok(item) => (StatusCode::OK, Json(dto::item_to_json(&item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
