//! `oilstock-core`: shared domain building blocks.
//!
//! Pure types only: identifiers and the domain error model. Nothing here talks
//! to the network or knows about HTTP.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ProductId, UserId, WarehouseId};
