//! Data Transfer Objects for REST request deserialization.
//!
//! Responses reuse the domain types directly; their serde attributes
//! already produce the wire shape.

pub mod cart_dto;
pub mod product_dto;

pub use cart_dto::*;
pub use product_dto::*;
