//! Items and the operations on them.

pub mod item_repository;
pub mod item_service;
pub mod pg_item_repository;

/// Domain errors from item operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    /// No item has the given id.
    #[error("ItemId {0} not found")]
    NotFound(i32),
    /// An item with the given id is already stored.
    #[error("ItemId {0} already exists")]
    AlreadyExists(i32),
}
