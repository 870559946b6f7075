//! Composable object query builder.
//!
//! Rules contribute conjunctive predicates to one query; the engine then
//! hands the finished query to a [`QueryBackend`] for execution. Predicates
//! are typed variants instead of SQL fragments so any backend (in-memory,
//! SQL, remote) can interpret them, with values bound through named
//! parameters exactly like a SQL builder.

use std::collections::HashMap;

use serde_json::Value;

use mapwatch_core::GeoObject;

use crate::error::{Result, StorageError};

// ── Predicates ──────────────────────────────────────────────────────

/// A single conjunctive condition on geo-objects.
///
/// Variants carrying a `param` name resolve their operand through the
/// query's bound parameters at execution time.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `map_id = :param`
    MapIs { param: String },
    /// Object is active and not past its expiry.
    Live,
    /// `id IN (:param)` — param binds to an array of object ids.
    IdIn { param: String },
    /// `side_id IN (:param)` — param binds to an array of side ids.
    SideIn { param: String },
    /// Always-false guard; the query returns nothing.
    Never,
}

// ── Query builder ───────────────────────────────────────────────────

/// A conjunctive query over geo-objects with named parameter binding.
///
/// All builder methods consume and return `self` so rule contributions
/// can be folded in as a chain.
#[derive(Debug, Clone, Default)]
pub struct ObjectQuery {
    predicates: Vec<Predicate>,
    params: HashMap<String, Value>,
}

impl ObjectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the predicate list to exactly `predicate`.
    pub fn where_clause(mut self, predicate: Predicate) -> Self {
        self.predicates.clear();
        self.predicates.push(predicate);
        self
    }

    /// Add one more conjunct.
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Bind a named parameter value.
    pub fn set_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Look up a bound parameter as an id list.
    pub fn id_list(&self, name: &str) -> Result<Vec<i64>> {
        let value = self
            .params
            .get(name)
            .ok_or_else(|| StorageError::UnboundParameter(name.to_string()))?;
        let items = value.as_array().ok_or_else(|| StorageError::BadParameter {
            name: name.to_string(),
            expected: "an array of integers",
        })?;
        items
            .iter()
            .map(|v| {
                v.as_i64().ok_or_else(|| StorageError::BadParameter {
                    name: name.to_string(),
                    expected: "an array of integers",
                })
            })
            .collect()
    }

    /// Look up a bound parameter as a single integer.
    pub fn id_value(&self, name: &str) -> Result<i64> {
        self.params
            .get(name)
            .ok_or_else(|| StorageError::UnboundParameter(name.to_string()))?
            .as_i64()
            .ok_or_else(|| StorageError::BadParameter {
                name: name.to_string(),
                expected: "an integer",
            })
    }

    /// Evaluate the full conjunction against one object.
    ///
    /// This is the reference semantics every backend must match; the
    /// in-memory backend uses it directly.
    pub fn matches(&self, object: &GeoObject, now: chrono::DateTime<chrono::Utc>) -> Result<bool> {
        for predicate in &self.predicates {
            let hit = match predicate {
                Predicate::MapIs { param } => object.map_id == self.id_value(param)?,
                Predicate::Live => object.is_live(now),
                Predicate::IdIn { param } => self.id_list(param)?.contains(&object.id),
                Predicate::SideIn { param } => match object.side_id {
                    Some(side) => self.id_list(param)?.contains(&side),
                    None => false,
                },
                Predicate::Never => false,
            };
            if !hit {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ── Execution seam ──────────────────────────────────────────────────

/// Terminal execution of a finished [`ObjectQuery`].
pub trait QueryBackend: Send + Sync {
    fn execute(&self, query: &ObjectQuery) -> Result<Vec<GeoObject>>;
}

// ── Tests ───────────────────────────────────────────────────────────
