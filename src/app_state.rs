//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::{CartStore, MemoryStore, ProductCatalog};
use crate::service::{CartService, ProductService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Cart lifecycle and checkout rules.
    pub cart_service: Arc<CartService>,
    /// Staff-facing catalog operations.
    pub product_service: Arc<ProductService>,
    /// Name of the active storage backend, reported by `/health`.
    pub storage_backend: &'static str,
}

impl AppState {
    /// Wires both services over the given storage handles.
    #[must_use]
    pub fn new(
        store: Arc<dyn CartStore>,
        catalog: Arc<dyn ProductCatalog>,
        cart_mutation_max_attempts: u32,
        storage_backend: &'static str,
    ) -> Self {
        Self {
            cart_service: Arc::new(CartService::new(
                store,
                Arc::clone(&catalog),
                cart_mutation_max_attempts,
            )),
            product_service: Arc::new(ProductService::new(catalog)),
            storage_backend,
        }
    }

    /// State backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory(cart_mutation_max_attempts: u32) -> Self {
        let store = MemoryStore::new();
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store),
            cart_mutation_max_attempts,
            "memory",
        )
    }
}
