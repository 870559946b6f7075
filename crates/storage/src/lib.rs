//! Storage collaborators consumed by the filtering engine.
//!
//! This crate provides:
//! - A composable [`ObjectQuery`] builder with conjunctive predicates and
//!   named parameter binding
//! - The [`QueryBackend`] execution seam
//! - The [`ObserverStore`] persistence seam with refresh/commit/rollback
//!   transaction discipline
//! - An in-memory backend implementing both seams

pub mod error;
pub mod memory;
pub mod query;
pub mod store;

pub use error::StorageError;
pub use memory::MemoryBackend;
pub use query::{ObjectQuery, Predicate, QueryBackend};
pub use store::{ObserverStore, StoreTransaction};
