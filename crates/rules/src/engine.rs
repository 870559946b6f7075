//! Orchestrating filter engine.
//!
//! One synchronous pipeline per call: validate the observer's raw
//! configuration, resolve each configured rule behind its own failure
//! boundary, run stateful rules' state lifecycle, persist state changes,
//! then fold every unit through the query phase and the memory phase in
//! ascending priority order.
//!
//! Failure policy (per error kind):
//! - invalid whole configuration → log every violation, fall back to the
//!   default "all live objects" view; a misconfigured observer must never
//!   see nothing and must never crash the caller
//! - unknown rule name → skip that rule, keep going
//! - one rule failing to initialize/update/validate → skip that rule,
//!   keep going
//! - state persistence failure → roll back and propagate; silently losing
//!   a state write would corrupt budget accounting for good

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use mapwatch_core::{GeoObject, Observer, RuleConfig};
use mapwatch_storage::{ObjectQuery, ObserverStore, Predicate, QueryBackend};

use crate::error::Result;
use crate::registry::RuleRegistry;
use crate::rule::RuleApplication;
use crate::validation::validate_config;

pub struct FilterEngine {
    registry: RuleRegistry,
    store: Arc<dyn ObserverStore>,
    backend: Arc<dyn QueryBackend>,
}

impl FilterEngine {
    pub fn new(
        registry: RuleRegistry,
        store: Arc<dyn ObserverStore>,
        backend: Arc<dyn QueryBackend>,
    ) -> Self {
        Self {
            registry,
            store,
            backend,
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Compute the observer's filtered view of its map.
    ///
    /// Concurrency: calls for different observers are independent. Two
    /// concurrent calls for the same observer race optimistically on the
    /// persisted state; a strict budget can be overrun by a small, bounded
    /// margin. Acceptable here; see the store's transaction contract.
    pub fn get_filtered_objects(&self, observer: &Observer) -> Result<Vec<GeoObject>> {
        if observer.rules.is_empty() {
            debug!(observer_id = observer.id, "no rules configured, returning default view");
            return self.default_objects(observer);
        }

        let raw = observer.rules.to_value();
        let violations = validate_config(&raw, &self.registry.lenient_aggregate_schema());
        if !violations.is_empty() {
            warn!(
                observer_id = observer.id,
                observer = %observer.name,
                violations = ?violations,
                "invalid rule configuration, falling back to default view"
            );
            return self.default_objects(observer);
        }

        let units = self.prepare_units(observer)?;

        // Query phase: fold every unit's predicate contribution into one
        // query scoped to the observer's map.
        let mut query = self.scoped_query(observer);
        for unit in &units {
            query = unit.rule.apply_to_query(query, &unit.entry);
        }
        let mut objects = self.backend.execute(&query)?;
        debug!(
            observer_id = observer.id,
            units = units.len(),
            prefiltered = objects.len(),
            "query phase complete"
        );

        // Memory phase: refine the result set in the same order.
        for unit in &units {
            objects = unit.rule.apply_to_objects(objects, &unit.entry);
        }
        debug!(observer_id = observer.id, filtered = objects.len(), "memory phase complete");

        Ok(objects)
    }

    /// Resolve each configured rule behind its own failure boundary, run
    /// the state lifecycle, persist changes, and return the units sorted
    /// ascending by priority.
    ///
    /// Unit entries carry the pre-update state: the decision for the
    /// current call belongs to the state it was admitted with, so e.g. the
    /// request budget's final call still passes while the decremented
    /// value is what gets persisted.
    fn prepare_units(&self, observer: &Observer) -> Result<Vec<RuleApplication>> {
        let mut updated = observer.rules.clone();
        let mut changed = false;
        let mut units: Vec<RuleApplication> = Vec::new();

        for (name, entry) in observer.rules.iter() {
            // (a) resolve; registry logs the warning on a miss.
            let Some(rule) = self.registry.get(name) else {
                continue;
            };
            let mut entry = entry.clone();

            // (b) state lifecycle for stateful rules. `changed` is only set
            // once a new state value actually lands in `updated`, so a rule
            // skipped mid-lifecycle never triggers a write of the stored
            // configuration back onto itself.
            if let Some(stateful) = rule.as_stateful() {
                let prior = entry.state.clone();
                if prior.is_none() {
                    match stateful.initialize_state(&entry) {
                        Ok(state) => entry.state = Some(state),
                        Err(e) => {
                            warn!(
                                observer_id = observer.id,
                                rule = %name,
                                error = %e,
                                "state initialization failed, skipping rule"
                            );
                            continue;
                        }
                    }
                }
                match stateful.update_state(&entry) {
                    Ok(next) => {
                        if prior.as_ref() != Some(&next) {
                            changed = true;
                        }
                        updated.set_state(name, next);
                    }
                    Err(e) => {
                        warn!(
                            observer_id = observer.id,
                            rule = %name,
                            error = %e,
                            "state update failed, skipping rule"
                        );
                        continue;
                    }
                }
            }

            // (c) this rule's own slice against its own schema; an invalid
            // slice disqualifies only this rule.
            let slice_errors = rule.config_schema().validate(&entry.to_value());
            if !slice_errors.is_empty() {
                warn!(
                    observer_id = observer.id,
                    rule = %name,
                    violations = ?slice_errors,
                    "rule config failed validation, skipping rule"
                );
                continue;
            }

            // (d) admit the unit.
            units.push(RuleApplication {
                priority: rule.priority(),
                entry,
                rule,
            });
        }

        units.sort_by_key(|u| u.priority);

        if changed {
            self.persist(observer, updated)?;
        }

        Ok(units)
    }

    /// Write the updated configuration back inside a refresh-then-write
    /// transaction. The one failure mode allowed to escalate.
    fn persist(&self, observer: &Observer, rules: RuleConfig) -> Result<()> {
        let mut tx = self.store.begin()?;
        let mut fresh = observer.clone();
        let staged = match tx.refresh(&mut fresh) {
            Ok(()) => tx.set_rules(fresh.id, rules),
            Err(e) => Err(e),
        };
        match staged {
            Ok(()) => {
                tx.commit().map_err(|e| {
                    warn!(observer_id = observer.id, error = %e, "state persistence failed");
                    e
                })?;
                debug!(observer_id = observer.id, "persisted rule state");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        observer_id = observer.id,
                        error = %rollback_err,
                        "rollback failed after staging error"
                    );
                }
                warn!(observer_id = observer.id, error = %e, "state persistence failed, rolled back");
                Err(e.into())
            }
        }
    }

    /// The default "all live objects on this observer's map" view.
    fn default_objects(&self, observer: &Observer) -> Result<Vec<GeoObject>> {
        let objects = self.backend.execute(&self.scoped_query(observer))?;
        Ok(objects)
    }

    fn scoped_query(&self, observer: &Observer) -> ObjectQuery {
        ObjectQuery::new()
            .where_clause(Predicate::MapIs { param: "map".to_string() })
            .and_where(Predicate::Live)
            .set_parameter("map", json!(observer.map_id))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
