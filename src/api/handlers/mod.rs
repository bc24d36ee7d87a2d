//! REST endpoint handlers organized by resource.

pub mod cart;
pub mod product;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes, relative to the API base path.
pub fn routes() -> Router<AppState> {
    Router::new().merge(cart::routes()).merge(product::routes())
}
