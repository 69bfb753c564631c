//! A service for interacting with items.

use super::{
    item_repository::{DeleteItem, FetchItem, InsertItem, Item, ItemUpdate, ListItems, SaveItem},
    ItemError,
};
use crate::infra::{error::ApiResult, validation::Valid};
use tracing::instrument;

/// Lists all items.
#[instrument(skip(repository))]
pub async fn list_items<R>(repository: &R) -> ApiResult<Vec<Item>>
where
    R: ListItems + ?Sized,
{
    repository.list_items().await
}

/// Reads an item.
#[instrument(skip(repository))]
pub async fn read_item<R>(repository: &R, id: i32) -> ApiResult<Item>
where
    R: FetchItem + ?Sized,
{
    let item = repository.fetch_item(id).await?.ok_or_else(|| {
        tracing::warn!("Item not found");
        ItemError::NotFound(id)
    })?;
    Ok(item)
}

/// Creates a new item, unless one with the same id already exists.
#[instrument(skip(repository))]
pub async fn create_item<R>(repository: &R, item: Valid<Item>) -> ApiResult<Item>
where
    R: InsertItem + ?Sized,
{
    let item = repository.insert_item(item.into_inner()).await?;
    tracing::info!("Created item {}", item.id);
    Ok(item)
}

/// Updates an existing item.
#[instrument(skip(repository))]
pub async fn update_item<R>(repository: &R, id: i32, update: Valid<ItemUpdate>) -> ApiResult<Item>
where
    R: FetchItem + SaveItem + ?Sized,
{
    let mut item = read_item(repository, id).await?;
    update.into_inner().apply_to(&mut item);
    let item = repository.save_item(item).await?;
    tracing::info!("Updated item {}", item.id);
    Ok(item)
}

/// Deletes an existing item.
#[instrument(skip(repository))]
pub async fn delete_item<R>(repository: &R, id: i32) -> ApiResult<()>
where
    R: FetchItem + DeleteItem + ?Sized,
{
    read_item(repository, id).await?;
    repository.delete_item(id).await?;
    tracing::info!("Deleted item {}", id);
    Ok(())
}
