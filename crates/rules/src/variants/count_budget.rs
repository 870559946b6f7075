//! Request-count budget (stateful).
//!
//! Grants a fixed number of invocations. The filtering decision for the
//! current call uses the pre-decrement `remaining` value, so the call that
//! brings `remaining` to 0 still sees its objects; only the following call
//! is blocked. The engine hands this rule its pre-update state for
//! filtering and persists the decremented value.

use serde_json::{json, Value};

use mapwatch_core::{GeoObject, RuleEntry};
use mapwatch_storage::{ObjectQuery, Predicate};

use crate::error::{Result, RuleError};
use crate::rule::{Rule, StatefulRule};
use crate::schema::Schema;

use super::{int_param, now_ts};

pub struct RequestBudget;

impl RequestBudget {
    /// Pre-decrement remaining for the current call. Absent or malformed
    /// state counts as not exhausted; the engine initializes state before
    /// any filtering happens.
    fn exhausted(entry: &RuleEntry) -> bool {
        entry
            .state
            .as_ref()
            .and_then(|s| s.get("remaining"))
            .and_then(Value::as_i64)
            .map(|remaining| remaining <= 0)
            .unwrap_or(false)
    }
}

impl Rule for RequestBudget {
    fn name(&self) -> &'static str {
        "request_budget"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn config_schema(&self) -> Schema {
        Schema::object()
            .property("limit", Schema::integer().minimum(1.0))
            .property(
                "_state",
                Schema::object()
                    .property("remaining", Schema::integer().minimum(0.0))
                    .property("initialized_at", Schema::integer())
                    .property("last_used_at", Schema::integer())
                    .required_keys(&["remaining", "initialized_at", "last_used_at"])
                    .closed(),
            )
            .required_keys(&["limit"])
            .closed()
    }

    fn apply_to_query(&self, query: ObjectQuery, entry: &RuleEntry) -> ObjectQuery {
        if Self::exhausted(entry) {
            query.and_where(Predicate::Never)
        } else {
            query
        }
    }

    fn apply_to_objects(&self, objects: Vec<GeoObject>, entry: &RuleEntry) -> Vec<GeoObject> {
        if Self::exhausted(entry) {
            Vec::new()
        } else {
            objects
        }
    }

    fn as_stateful(&self) -> Option<&dyn StatefulRule> {
        Some(self)
    }
}

impl StatefulRule for RequestBudget {
    fn initialize_state(&self, entry: &RuleEntry) -> Result<Value> {
        let limit = int_param(entry, "limit").ok_or_else(|| RuleError::Processing {
            rule: self.name().to_string(),
            message: "limit missing or not an integer".to_string(),
        })?;
        let now = now_ts();
        Ok(json!({
            "remaining": limit,
            "initialized_at": now,
            "last_used_at": now,
        }))
    }

    fn update_state(&self, entry: &RuleEntry) -> Result<Value> {
        let state = entry.state.as_ref().ok_or_else(|| RuleError::Processing {
            rule: self.name().to_string(),
            message: "state missing on update".to_string(),
        })?;
        let remaining = state
            .get("remaining")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let mut next = state.clone();
        next["remaining"] = json!((remaining - 1).max(0));
        next["last_used_at"] = json!(now_ts());
        Ok(next)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
