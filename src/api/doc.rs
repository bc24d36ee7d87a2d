//! OpenAPI documentation configuration.
//!
//! Cart and product paths are declared relative to the API base path and
//! nested under the configured one by [`ApiDoc::with_base_path`].

use utoipa::OpenApi;

use crate::api::dto::{AddToCartRequest, RegisterProductRequest, SellProductRequest};
use crate::api::handlers::system::HealthResponse;
use crate::domain::{Cart, Category, Product, ProductInCart};
use crate::error::ErrorResponse;

/// Cart and product paths, relative to the API base path.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::cart::add_to_cart,
        crate::api::handlers::cart::get_cart,
        crate::api::handlers::cart::checkout_cart,
        crate::api::handlers::cart::get_customer_carts,
        crate::api::handlers::cart::remove_product_from_cart,
        crate::api::handlers::cart::clear_cart,
        crate::api::handlers::cart::get_all_carts,
        crate::api::handlers::cart::delete_all_carts,
        crate::api::handlers::product::register_product,
        crate::api::handlers::product::get_product,
        crate::api::handlers::product::sell_product,
    ),
    components(schemas(
        Cart,
        ProductInCart,
        Category,
        Product,
        ErrorResponse,
        AddToCartRequest,
        RegisterProductRequest,
        SellProductRequest,
    )),
    tags(
        (name = "Carts", description = "Open cart, checkout, and purchase history"),
        (name = "Products", description = "Staff-only catalog operations")
    )
)]
pub struct ResourceDoc;

/// OpenAPI document for the REST API: service info and root-level paths.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Shopfront gateway API",
        description = "Cart lifecycle and checkout. Identity is taken from the `X-Authenticated-User` and `X-Authenticated-Role` headers set by the authenticating proxy."
    ),
    paths(crate::api::handlers::system::health_handler),
    components(schemas(HealthResponse)),
    tags((name = "System", description = "Health checks"))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Builds the complete document with resource paths under `base_path`.
    ///
    /// An empty or `/` base path documents them at the root, as
    /// [`build_router`](crate::api::build_router) mounts them.
    #[must_use]
    pub fn with_base_path(base_path: &str) -> utoipa::openapi::OpenApi {
        let root = Self::openapi();
        let base = base_path.trim_end_matches('/');
        if base.is_empty() {
            root.merge_from(ResourceDoc::openapi())
        } else {
            root.nest(base, ResourceDoc::openapi())
        }
    }
}
