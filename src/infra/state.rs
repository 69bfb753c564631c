//! Global application state.
//!
//! Used for access to common resources such as the item store
//! or the keys for verifying tokens.

use super::security::{TokenKeys, UserStore};
use crate::core::item::item_repository::ItemRepository;
use axum::extract::FromRef;
use std::sync::Arc;

/// Global application state.
#[derive(Clone, Debug, FromRef)]
pub struct AppState {
    items: Arc<dyn ItemRepository>,
    keys: TokenKeys,
    users: Arc<UserStore>,
}

impl AppState {
    /// Constructs a new [`AppState`].
    pub fn new(items: Arc<dyn ItemRepository>, keys: TokenKeys, users: UserStore) -> Self {
        Self {
            items,
            keys,
            users: Arc::new(users),
        }
    }
}
