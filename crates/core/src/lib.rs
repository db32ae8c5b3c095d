//! `ordersync-core`: identity and error building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, EntityKind};
pub use error::{DomainError, DomainResult};
pub use id::{EntityId, LocalId, StoreId, StoreScope, StoreScoped};
