//! Rule contracts and the per-invocation application unit.
//!
//! A rule is a named, priority-ordered unit of filtering logic constructed
//! once at startup; it owns no per-observer data. Rules contribute to both
//! phases of the pipeline: a query-level prefilter (identity by default for
//! rules that cannot express themselves there) and a pure in-memory filter
//! that is always applied. Stateful rules additionally manage an opaque
//! state value the engine persists in the observer's configuration under
//! `_state`.

use std::sync::Arc;

use serde_json::Value;

use mapwatch_core::{GeoObject, RuleEntry};
use mapwatch_storage::ObjectQuery;

use crate::error::Result;
use crate::schema::Schema;

/// Default priority for rules that don't set one. Lower = applied earlier.
pub const DEFAULT_PRIORITY: i32 = 100;

/// A single unit of filtering logic.
pub trait Rule: Send + Sync {
    /// Rule identity; must match the rule-name pattern.
    fn name(&self) -> &'static str;

    /// Evaluation order: lower priorities are applied earlier.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Schema for this rule's raw config (params plus `_state` if stateful).
    /// A pure function of the rule type.
    fn config_schema(&self) -> Schema;

    /// Contribute conjunctive predicates to the query-level prefilter.
    ///
    /// The default returns the query unchanged, for rules that cannot be
    /// expressed at the query level.
    fn apply_to_query(&self, query: ObjectQuery, entry: &RuleEntry) -> ObjectQuery {
        let _ = entry;
        query
    }

    /// In-memory refinement pass. Always invoked; must be a pure,
    /// deterministic filter of its input for a given entry.
    fn apply_to_objects(&self, objects: Vec<GeoObject>, entry: &RuleEntry) -> Vec<GeoObject>;

    /// Downcast hook for stateful rules. Stateless rules keep the default.
    fn as_stateful(&self) -> Option<&dyn StatefulRule> {
        None
    }
}

/// A rule whose behavior depends on state persisted across invocations.
pub trait StatefulRule: Rule {
    /// Build the initial state. Called exactly once, the first time an
    /// observer's config carries no `_state` for this rule.
    fn initialize_state(&self, entry: &RuleEntry) -> Result<Value>;

    /// Compute the next state to persist from the current one
    /// (`entry.state`). Called on every invocation, including the one that
    /// just initialized.
    fn update_state(&self, entry: &RuleEntry) -> Result<Value>;
}

/// Ephemeral per-invocation pairing of a rule with one observer's config
/// slice. Produced by the registry or the engine, consumed within one
/// orchestration call, never persisted.
pub struct RuleApplication {
    pub rule: Arc<dyn Rule>,
    /// The rule's config slice. For stateful rules this carries the state
    /// the current call filters on (pre-update).
    pub entry: RuleEntry,
    pub priority: i32,
}

impl std::fmt::Debug for RuleApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleApplication")
            .field("rule", &self.rule.name())
            .field("priority", &self.priority)
            .finish()
    }
}
