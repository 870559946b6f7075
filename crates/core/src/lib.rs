//! Shared domain types for the mapwatch workspace.
//!
//! This crate provides:
//! - Geo-object records and identifier aliases
//! - Observer records with their per-observer rule configuration
//! - The rule configuration value type with its `_state` wire format
//! - Env-driven application config

pub mod config;
pub mod object;
pub mod observer;

pub use config::Config;
pub use object::*;
pub use observer::*;
