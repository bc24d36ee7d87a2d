//! Service layer: business logic orchestration.
//!
//! [`CartService`] enforces the cart lifecycle rules on top of the
//! persistence traits. [`ProductService`] covers the staff-facing catalog
//! routes.

pub mod cart_service;
pub mod product_service;

pub use cart_service::CartService;
pub use product_service::ProductService;
