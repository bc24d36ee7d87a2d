//! Domain layer: identities, catalog products, and carts.
//!
//! These are plain value types shared by the persistence backends, the
//! cart engine, and the HTTP layer. None of them perform I/O.

pub mod cart;
pub mod product;
pub mod user;

pub use cart::{Cart, PaymentMarker, ProductInCart};
pub use product::{Category, Product};
pub use user::{Role, User};
