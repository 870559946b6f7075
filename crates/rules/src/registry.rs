//! Startup-time rule registry.
//!
//! Built once from the full set of rule implementations, indexed by name
//! and ordered by ascending priority, then treated as read-only
//! process-wide state. A malformed or duplicate rule name is a fatal
//! construction error; everything after startup degrades gracefully
//! instead.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use mapwatch_core::RuleConfig;

use crate::error::{Result, RuleError};
use crate::rule::{Rule, RuleApplication};
use crate::schema::Schema;
use crate::validation::{is_valid_rule_name, validate_config};
use crate::variants;

pub struct RuleRegistry {
    by_name: HashMap<String, Arc<dyn Rule>>,
    /// All rules in ascending priority order (ties keep insertion order).
    ordered: Vec<Arc<dyn Rule>>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field(
                "rules",
                &self.ordered.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RuleRegistry {
    /// Index a rule set by name and priority.
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Result<Self> {
        let mut by_name: HashMap<String, Arc<dyn Rule>> = HashMap::new();
        for rule in &rules {
            let name = rule.name().trim();
            if !is_valid_rule_name(name) {
                return Err(RuleError::InvalidRuleName(name.to_string()));
            }
            if by_name.insert(name.to_string(), rule.clone()).is_some() {
                return Err(RuleError::DuplicateRuleName(name.to_string()));
            }
        }
        let mut ordered = rules;
        ordered.sort_by_key(|r| r.priority());
        Ok(Self { by_name, ordered })
    }

    /// Registry over the built-in rule set.
    pub fn builtin() -> Result<Self> {
        Self::new(variants::builtin())
    }

    /// Exact-match lookup (after trimming). Logs a warning on a miss.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Rule>> {
        let name = name.trim();
        let rule = self.by_name.get(name).cloned();
        if rule.is_none() {
            warn!(rule = %name, "unknown rule requested");
        }
        rule
    }

    pub fn has(&self, name: &str) -> bool {
        self.by_name.contains_key(name.trim())
    }

    /// All registered rules in ascending priority order.
    pub fn all(&self) -> &[Arc<dyn Rule>] {
        &self.ordered
    }

    /// Aggregate schema for a whole configuration: one property per
    /// registered rule, no unknown properties, at least one rule.
    pub fn aggregate_schema(&self) -> Schema {
        let mut schema = Schema::object().closed().min_properties(1);
        for rule in &self.ordered {
            schema = schema.property(rule.name(), rule.config_schema());
        }
        schema
    }

    /// Aggregate schema with unknown top-level properties tolerated.
    ///
    /// The evaluation path skips unknown rule names per-rule (with a
    /// warning) rather than condemning the whole configuration, so its
    /// validation must not treat them as violations. Authoring-time
    /// validation uses the strict [`aggregate_schema`](Self::aggregate_schema).
    pub fn lenient_aggregate_schema(&self) -> Schema {
        let mut schema = self.aggregate_schema();
        schema.additional_properties = None;
        schema
    }

    /// Materialize a validated configuration into application units.
    ///
    /// Validation failures abort with the full violation list; unknown
    /// rule names are skipped (and logged by [`get`](Self::get)) without
    /// failing the rest. Units come back sorted ascending by priority.
    pub fn create_from_config(&self, config: &RuleConfig) -> Result<Vec<RuleApplication>> {
        let raw = config.to_value();
        let violations = validate_config(&raw, &self.lenient_aggregate_schema());
        if !violations.is_empty() {
            return Err(RuleError::InvalidConfiguration(violations));
        }

        let mut units: Vec<RuleApplication> = config
            .iter()
            .filter_map(|(name, entry)| {
                self.get(name).map(|rule| RuleApplication {
                    priority: rule.priority(),
                    entry: entry.clone(),
                    rule,
                })
            })
            .collect();
        units.sort_by_key(|u| u.priority);
        Ok(units)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
