//! Elapsed-time budget (stateful).
//!
//! Grants access for a fixed wall-clock duration starting at first use.
//! `expires_at = first_used_at + duration_seconds` is computed once at
//! initialization and never recomputed; every later call only refreshes
//! `last_used_at`. Once the deadline passes, the query phase forces an
//! always-false predicate and the memory phase returns empty, for every
//! subsequent call.

use serde_json::{json, Value};

use mapwatch_core::{GeoObject, RuleEntry};
use mapwatch_storage::{ObjectQuery, Predicate};

use crate::error::{Result, RuleError};
use crate::rule::{Rule, StatefulRule};
use crate::schema::Schema;

use super::{int_param, now_ts};

pub struct ElapsedBudget;

impl ElapsedBudget {
    /// Whether the budget has run out, judged by the state the current
    /// call carries. Absent or malformed state counts as not expired.
    fn expired(entry: &RuleEntry) -> bool {
        entry
            .state
            .as_ref()
            .and_then(|s| s.get("expires_at"))
            .and_then(Value::as_i64)
            .map(|expires_at| now_ts() > expires_at)
            .unwrap_or(false)
    }
}

impl Rule for ElapsedBudget {
    fn name(&self) -> &'static str {
        "elapsed_budget"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn config_schema(&self) -> Schema {
        Schema::object()
            .property("duration_seconds", Schema::integer().minimum(1.0))
            .property(
                "_state",
                Schema::object()
                    .property("first_used_at", Schema::integer())
                    .property("expires_at", Schema::integer())
                    .property("last_used_at", Schema::integer())
                    .required_keys(&["first_used_at", "expires_at", "last_used_at"])
                    .closed(),
            )
            .required_keys(&["duration_seconds"])
            .closed()
    }

    fn apply_to_query(&self, query: ObjectQuery, entry: &RuleEntry) -> ObjectQuery {
        if Self::expired(entry) {
            query.and_where(Predicate::Never)
        } else {
            query
        }
    }

    fn apply_to_objects(&self, objects: Vec<GeoObject>, entry: &RuleEntry) -> Vec<GeoObject> {
        if Self::expired(entry) {
            Vec::new()
        } else {
            objects
        }
    }

    fn as_stateful(&self) -> Option<&dyn StatefulRule> {
        Some(self)
    }
}

impl StatefulRule for ElapsedBudget {
    fn initialize_state(&self, entry: &RuleEntry) -> Result<Value> {
        let duration = int_param(entry, "duration_seconds").ok_or_else(|| RuleError::Processing {
            rule: self.name().to_string(),
            message: "duration_seconds missing or not an integer".to_string(),
        })?;
        let now = now_ts();
        Ok(json!({
            "first_used_at": now,
            "expires_at": now + duration,
            "last_used_at": now,
        }))
    }

    fn update_state(&self, entry: &RuleEntry) -> Result<Value> {
        let state = entry.state.as_ref().ok_or_else(|| RuleError::Processing {
            rule: self.name().to_string(),
            message: "state missing on update".to_string(),
        })?;
        let mut next = state.clone();
        // Only the usage timestamp moves; the deadline is fixed at init.
        next["last_used_at"] = json!(now_ts());
        Ok(next)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
