//! The features exposed through the REST API.

use crate::infra::state::AppState;
use axum::Router;

pub mod auth;
pub mod info;
pub mod item;

/// Constructs the REST API routes.
pub fn api(state: AppState) -> Router {
    Router::new()
        .merge(info::info_api::routes())
        .merge(auth::auth_api::routes())
        .merge(item::item_api::routes())
        .with_state(state)
}
