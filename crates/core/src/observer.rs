//! Observer records and their rule configuration.
//!
//! The wire format for a rule configuration is a JSON object mapping rule
//! names to per-rule parameter objects:
//!
//! ```json
//! {
//!   "request_budget": { "limit": 5, "_state": { "remaining": 3, ... } },
//!   "allowed_sides": { "sides": [1, 2] }
//! }
//! ```
//!
//! User-authored parameters and the engine-managed `_state` sub-object live
//! in one JSON object on the wire but are split into two fields here, so the
//! ownership boundary (users write params, the engine writes state) is a
//! type-level invariant rather than a naming convention.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::object::{MapId, ObserverId};

/// Reserved key carrying engine-managed runtime state inside a rule's config.
pub const STATE_KEY: &str = "_state";

/// A read-only external viewer, scoped to one map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub id: ObserverId,
    pub name: String,
    pub map_id: MapId,
    /// Raw rule configuration. Empty ⇒ the observer sees every live object.
    #[serde(default)]
    pub rules: RuleConfig,
}

// ── Rule configuration ──────────────────────────────────────────────

/// Per-observer mapping from rule name to that rule's raw config.
///
/// Key order is preserved so validation errors and skip logs come out in
/// the order the configuration was authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleConfig {
    entries: IndexMap<String, RuleEntry>,
}

/// One rule's raw config: user parameters plus optional engine state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// User-authored, rule-specific parameters (e.g. `limit`, `start_time`).
    #[serde(flatten)]
    pub params: Map<String, Value>,
    /// Engine-managed runtime state; shape is defined by the owning rule
    /// and opaque to everything else.
    #[serde(rename = "_state", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

impl RuleEntry {
    pub fn new(params: Map<String, Value>) -> Self {
        Self { params, state: None }
    }

    /// Rebuild the flat wire-format object (params + `_state`).
    pub fn to_value(&self) -> Value {
        let mut map = self.params.clone();
        if let Some(state) = &self.state {
            map.insert(STATE_KEY.to_string(), state.clone());
        }
        Value::Object(map)
    }
}

impl RuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, rule: &str) -> Option<&RuleEntry> {
        self.entries.get(rule)
    }

    pub fn insert(&mut self, rule: impl Into<String>, entry: RuleEntry) {
        self.entries.insert(rule.into(), entry);
    }

    /// Replace one rule's engine state, leaving its parameters untouched.
    /// No-op if the rule is not configured.
    pub fn set_state(&mut self, rule: &str, state: Value) {
        if let Some(entry) = self.entries.get_mut(rule) {
            entry.state = Some(state);
        }
    }

    /// Iterate entries in authored order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RuleEntry)> {
        self.entries.iter()
    }

    /// Rebuild the whole configuration as a wire-format JSON object.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, entry) in &self.entries {
            map.insert(name.clone(), entry.to_value());
        }
        Value::Object(map)
    }
}
