//! Rule-based visibility filtering for observer map views.
//!
//! This crate provides:
//! - A JSON-schema subset dialect for describing rule configuration shapes
//! - A two-pass configuration validator (structural + schema)
//! - The [`Rule`] / [`StatefulRule`] contracts and the five built-in rules
//! - A startup-time [`RuleRegistry`] indexing rules by name and priority
//! - The orchestrating [`FilterEngine`] running the hybrid query+memory
//!   filtering pipeline and persisting rule state

pub mod engine;
pub mod error;
pub mod registry;
pub mod rule;
pub mod schema;
pub mod validation;
pub mod variants;

pub use engine::FilterEngine;
pub use error::{Result, RuleError};
pub use registry::RuleRegistry;
pub use rule::{Rule, RuleApplication, StatefulRule};
pub use schema::Schema;
