//! Types and traits for storing and loading items.

use super::ItemError;
use crate::infra::error::ApiResult;
use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use tokio::sync::RwLock;
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

/// A stored item.
///
/// The id is chosen by the client and never changes once the item is stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate, sqlx::FromRow)]
pub struct Item {
    /// The item's id.
    #[schema(example = 1)]
    pub id: i32,
    /// The item's name.
    #[schema(example = "item1")]
    #[validate(length(min = 1))]
    pub name: String,
    /// The item's type.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    #[schema(example = "type1")]
    #[validate(length(min = 1))]
    pub item_type: String,
    /// The item's price.
    #[schema(example = 1000)]
    #[validate(range(min = 0))]
    pub price: i64,
    /// How many of the item are in stock.
    #[schema(example = 1)]
    #[validate(range(min = 0))]
    pub quantity: i32,
}

/// Changes to an existing item.
/// Fields that are not set keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct ItemUpdate {
    /// The item's new name.
    #[schema(example = "UpdatedItemName")]
    #[validate(length(min = 1))]
    pub name: Option<String>,
    /// The item's new type.
    #[serde(rename = "type")]
    #[schema(example = "type1")]
    #[validate(length(min = 1))]
    pub item_type: Option<String>,
    /// The item's new price.
    #[schema(example = 1000)]
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    /// The item's new quantity.
    #[schema(example = 1)]
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
}

impl ItemUpdate {
    /// Applies the changes to an item.
    pub fn apply_to(self, item: &mut Item) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(item_type) = self.item_type {
            item.item_type = item_type;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
    }
}

/// Anything that can fetch an item.
#[async_trait::async_trait]
pub trait FetchItem {
    /// Fetches an item.
    async fn fetch_item(&self, id: i32) -> ApiResult<Option<Item>>;
}

/// Anything that can list items.
#[async_trait::async_trait]
pub trait ListItems {
    /// Lists all items, ordered by id.
    async fn list_items(&self) -> ApiResult<Vec<Item>>;
}

/// Anything that can insert a new item.
#[async_trait::async_trait]
pub trait InsertItem {
    /// Inserts the item, failing with [`ItemError::AlreadyExists`] if its id is taken.
    /// The check and the write happen atomically.
    async fn insert_item(&self, item: Item) -> ApiResult<Item>;
}

/// Anything that can save an item.
#[async_trait::async_trait]
pub trait SaveItem {
    /// Inserts the item, or replaces the one with the same id.
    async fn save_item(&self, item: Item) -> ApiResult<Item>;
}

/// Anything that can delete an item.
#[async_trait::async_trait]
pub trait DeleteItem {
    /// Deletes an item. Deleting a missing item does nothing.
    async fn delete_item(&self, id: i32) -> ApiResult<()>;
}

/// A complete item store.
pub trait ItemRepository:
    FetchItem + ListItems + InsertItem + SaveItem + DeleteItem + std::fmt::Debug + Send + Sync
{
}

impl<T> ItemRepository for T where
    T: FetchItem + ListItems + InsertItem + SaveItem + DeleteItem + std::fmt::Debug + Send + Sync
{
}

/// An item repository that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryItemRepository {
    items: RwLock<BTreeMap<i32, Item>>,
}

impl InMemoryItemRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding the given items.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let items = items.into_iter().map(|item| (item.id, item)).collect();
        Self {
            items: RwLock::new(items),
        }
    }
}

#[async_trait::async_trait]
impl FetchItem for InMemoryItemRepository {
    #[instrument(skip(self))]
    async fn fetch_item(&self, id: i32) -> ApiResult<Option<Item>> {
        let item = self.items.read().await.get(&id).cloned();
        tracing::debug!("Found item: {:?}", item);
        Ok(item)
    }
}

#[async_trait::async_trait]
impl ListItems for InMemoryItemRepository {
    #[instrument(skip(self))]
    async fn list_items(&self) -> ApiResult<Vec<Item>> {
        let items: Vec<Item> = self.items.read().await.values().cloned().collect();
        tracing::debug!("Listed {} items", items.len());
        Ok(items)
    }
}

#[async_trait::async_trait]
impl InsertItem for InMemoryItemRepository {
    #[instrument(skip(self))]
    async fn insert_item(&self, item: Item) -> ApiResult<Item> {
        match self.items.write().await.entry(item.id) {
            Entry::Occupied(_) => {
                tracing::warn!("Item already exists");
                Err(ItemError::AlreadyExists(item.id).into())
            }
            Entry::Vacant(entry) => {
                entry.insert(item.clone());
                tracing::debug!("Inserted item {}", item.id);
                Ok(item)
            }
        }
    }
}

#[async_trait::async_trait]
impl SaveItem for InMemoryItemRepository {
    #[instrument(skip(self))]
    async fn save_item(&self, item: Item) -> ApiResult<Item> {
        self.items.write().await.insert(item.id, item.clone());
        tracing::debug!("Saved item {}", item.id);
        Ok(item)
    }
}

#[async_trait::async_trait]
impl DeleteItem for InMemoryItemRepository {
    #[instrument(skip(self))]
    async fn delete_item(&self, id: i32) -> ApiResult<()> {
        let removed = self.items.write().await.remove(&id);
        tracing::debug!("Deleted item {}: {}", id, removed.is_some());
        Ok(())
    }
}
