//! The item API implementation.
//!
//! Every endpoint requires a user with the `ADMIN` role.

use crate::{
    core::item::{
        item_repository::{Item, ItemRepository, ItemUpdate},
        item_service,
    },
    infra::{
        error::{ApiResult, ClientError},
        extract::Json,
        security::{Admin, User},
        state::AppState,
        validation::Valid,
    },
};
use axum::{extract::State, Router};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// The item API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .typed_get(list_items)
        .typed_post(create_item)
        .typed_get(get_item)
        .typed_put(update_item)
        .typed_delete(delete_item)
}

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/v1/items", rejection(ClientError))]
pub struct Items;

#[derive(Debug, Deserialize, TypedPath)]
#[typed_path("/v1/items/:id", rejection(ClientError))]
pub struct ItemsId(i32);

/// Confirms that an item was deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Deleted {
    /// Always true.
    pub deleted: bool,
}

/// Lists all items.
#[utoipa::path(
    get,
    path = "/api/v1/items",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Success", body = [Item]),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn list_items(
    Items: Items,
    user: User<Admin>,
    State(items): State<Arc<dyn ItemRepository>>,
) -> ApiResult<Json<Vec<Item>>> {
    let items = item_service::list_items(items.as_ref()).await?;
    Ok(Json(items))
}

/// Gets an item.
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = i32, Path, description = "The item's id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ok", body = Item),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn get_item(
    ItemsId(id): ItemsId,
    user: User<Admin>,
    State(items): State<Arc<dyn ItemRepository>>,
) -> ApiResult<Json<Item>> {
    let item = item_service::read_item(items.as_ref(), id).await?;
    Ok(Json(item))
}

/// Creates a new item.
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = Item,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Created", body = Item),
        (status = 400, description = "Item already exists", body = ErrorBody),
        (status = 422, description = "Invalid item", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn create_item(
    Items: Items,
    user: User<Admin>,
    State(items): State<Arc<dyn ItemRepository>>,
    new_item: Valid<Item>,
) -> ApiResult<Json<Item>> {
    let item = item_service::create_item(items.as_ref(), new_item).await?;
    Ok(Json(item))
}

/// Updates an item.
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = i32, Path, description = "The item's id")),
    request_body = ItemUpdate,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ok", body = Item),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Invalid update", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn update_item(
    ItemsId(id): ItemsId,
    user: User<Admin>,
    State(items): State<Arc<dyn ItemRepository>>,
    update: Valid<ItemUpdate>,
) -> ApiResult<Json<Item>> {
    let item = item_service::update_item(items.as_ref(), id, update).await?;
    Ok(Json(item))
}

/// Deletes an item.
#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = i32, Path, description = "The item's id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ok", body = Deleted),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody),
    )
)]
#[instrument(skip(items))]
pub async fn delete_item(
    ItemsId(id): ItemsId,
    user: User<Admin>,
    State(items): State<Arc<dyn ItemRepository>>,
) -> ApiResult<Json<Deleted>> {
    item_service::delete_item(items.as_ref(), id).await?;
    Ok(Json(Deleted { deleted: true }))
}
