//! # shopfront-gateway
//!
//! REST gateway for an online shop's cart lifecycle and checkout.
//!
//! Each customer owns at most one open cart. Adding a product snapshots its
//! price and category into a line item; checkout converts the open cart
//! into a paid, timestamped cart and decrements product stock in a single
//! transaction. Paid carts form the customer's purchase history.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, identity headers from the auth proxy)
//!     │
//!     ├── REST Handlers + extractors (api/)
//!     │
//!     ├── CartService, ProductService (service/)
//!     │
//!     ├── CartStore, ProductCatalog traits (persistence/)
//!     │
//!     └── PostgreSQL (sqlx) or in-memory tables
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
