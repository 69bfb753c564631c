//! Storing and loading items from Postgres.

use super::{
    item_repository::{DeleteItem, FetchItem, InsertItem, Item, ListItems, SaveItem},
    ItemError,
};
use crate::infra::{
    database::DbPool,
    error::{ApiError, ApiResult},
};
use tracing::{instrument, Instrument};

/// An item repository backed by the `items` table.
#[derive(Clone, Debug)]
pub struct PgItemRepository {
    db: DbPool,
}

impl PgItemRepository {
    /// Creates a new repository.
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl FetchItem for PgItemRepository {
    #[instrument(skip(self))]
    async fn fetch_item(&self, id: i32) -> ApiResult<Option<Item>> {
        tracing::info!("Reading item");
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, "type", price, quantity FROM items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .instrument(tracing::info_span!("fetch_optional"))
        .await?;
        tracing::info!("Found item: {:?}", item);
        Ok(item)
    }
}

#[async_trait::async_trait]
impl ListItems for PgItemRepository {
    #[instrument(skip(self))]
    async fn list_items(&self) -> ApiResult<Vec<Item>> {
        tracing::info!("Listing items");
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, "type", price, quantity FROM items
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .instrument(tracing::info_span!("fetch_all"))
        .await?;
        tracing::info!("Listed {} items", items.len());
        Ok(items)
    }
}

#[async_trait::async_trait]
impl InsertItem for PgItemRepository {
    #[instrument(skip(self))]
    async fn insert_item(&self, item: Item) -> ApiResult<Item> {
        tracing::info!("Inserting item");
        let id = item.id;
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (id, name, "type", price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, "type", price, quantity
            "#,
        )
        .bind(item.id)
        .bind(item.name)
        .bind(item.item_type)
        .bind(item.price)
        .bind(item.quantity)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                tracing::warn!("Item already exists");
                ApiError::from(ItemError::AlreadyExists(id))
            }
            e => ApiError::from(e),
        })?;
        tracing::info!("Inserted item {:?}", item);
        Ok(item)
    }
}

#[async_trait::async_trait]
impl SaveItem for PgItemRepository {
    #[instrument(skip(self))]
    async fn save_item(&self, item: Item) -> ApiResult<Item> {
        tracing::info!("Saving item");
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (id, name, "type", price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                "type" = EXCLUDED."type",
                price = EXCLUDED.price,
                quantity = EXCLUDED.quantity
            RETURNING id, name, "type", price, quantity
            "#,
        )
        .bind(item.id)
        .bind(item.name)
        .bind(item.item_type)
        .bind(item.price)
        .bind(item.quantity)
        .fetch_one(&self.db)
        .await?;
        tracing::info!("Saved item {:?}", item);
        Ok(item)
    }
}

#[async_trait::async_trait]
impl DeleteItem for PgItemRepository {
    #[instrument(skip(self))]
    async fn delete_item(&self, id: i32) -> ApiResult<()> {
        tracing::info!("Deleting item");
        let rows = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        tracing::info!("Deleted {} row(s)", rows.rows_affected());
        Ok(())
    }
}
