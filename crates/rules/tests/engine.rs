//! Integration tests for the full filtering pipeline: default fallback,
//! fail-safe on invalid configuration, per-rule skip boundaries, budget
//! state round-trips and persistence failure handling.

use std::sync::Arc;

use serde_json::{json, Value};

use mapwatch_core::{GeoObject, Observer};
use mapwatch_rules::{FilterEngine, RuleError, RuleRegistry};
use mapwatch_storage::{MemoryBackend, ObserverStore, StorageError};

// ── Helpers ─────────────────────────────────────────────────────────

fn object(id: i64, map_id: i64, side_id: Option<i64>) -> GeoObject {
    GeoObject {
        id,
        map_id,
        side_id,
        name: format!("obj-{id}"),
        active: true,
        expires_at: None,
    }
}

fn observer(rules: Value) -> Observer {
    Observer {
        id: 1,
        name: "observer-1".to_string(),
        map_id: 1,
        rules: serde_json::from_value(rules).unwrap(),
    }
}

/// Backend with three live objects on map 1 (sides 2, 2, 3), one inactive
/// object on map 1 and one live object on map 2.
fn seeded_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_object(object(1, 1, Some(2)));
    backend.insert_object(object(2, 1, Some(2)));
    backend.insert_object(object(3, 1, Some(3)));
    let mut inactive = object(4, 1, None);
    inactive.active = false;
    backend.insert_object(inactive);
    backend.insert_object(object(5, 2, Some(2)));
    backend
}

fn engine(backend: &Arc<MemoryBackend>) -> FilterEngine {
    FilterEngine::new(
        RuleRegistry::builtin().unwrap(),
        backend.clone(),
        backend.clone(),
    )
}

fn ids(objects: &[GeoObject]) -> Vec<i64> {
    objects.iter().map(|o| o.id).collect()
}

fn setup(rules: Value) -> (Arc<MemoryBackend>, FilterEngine, Observer) {
    let backend = seeded_backend();
    let observer = observer(rules);
    backend.insert_observer(observer.clone());
    let engine = engine(&backend);
    (backend, engine, observer)
}

/// One rule's persisted `_state` as stored right now.
fn persisted_state(backend: &MemoryBackend, rule: &str) -> Value {
    backend
        .get(1)
        .unwrap()
        .rules
        .get(rule)
        .unwrap()
        .state
        .clone()
        .expect("state should be persisted")
}

// ── Default fallback ────────────────────────────────────────────────

#[test]
fn empty_config_returns_all_live_objects_on_the_map() {
    let (_, engine, observer) = setup(json!({}));
    let objects = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&objects), vec![1, 2, 3]);
}

#[test]
fn malformed_rule_name_falls_back_to_default() {
    let (backend, engine, observer) = setup(json!({ "1bad": {} }));
    let objects = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&objects), vec![1, 2, 3]);
    // Nothing was persisted on the fallback path.
    assert_eq!(backend.get(1).unwrap().rules, observer.rules);
}

#[test]
fn schema_violation_falls_back_to_default() {
    // limit 0 violates the request budget's schema at the whole-config level.
    let (backend, engine, observer) = setup(json!({ "request_budget": { "limit": 0 } }));
    let objects = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&objects), vec![1, 2, 3]);
    // In particular no budget state was initialized.
    assert!(backend.get(1).unwrap().rules.get("request_budget").unwrap().state.is_none());
}

// ── Per-rule boundaries ─────────────────────────────────────────────

#[test]
fn unknown_rule_is_skipped_and_valid_rule_still_applies() {
    let (_, engine, observer) = setup(json!({
        "mystery_rule": { "anything": 1 },
        "allowed_objects": { "ids": [2] }
    }));
    let objects = engine.get_filtered_objects(&observer).unwrap();
    // Not the default fallback: the valid rule filtered.
    assert_eq!(ids(&objects), vec![2]);
}

// ── Stateless rules ─────────────────────────────────────────────────

#[test]
fn object_allowlist_is_idempotent_across_calls() {
    let (_, engine, observer) = setup(json!({ "allowed_objects": { "ids": [1, 3] } }));
    let first = engine.get_filtered_objects(&observer).unwrap();
    let second = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&first), vec![1, 3]);
    assert_eq!(first, second);
}

#[test]
fn allowlist_cannot_reach_other_maps() {
    // Object 5 exists but lives on map 2; the map scope wins.
    let (_, engine, observer) = setup(json!({ "allowed_objects": { "ids": [1, 5] } }));
    let objects = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&objects), vec![1]);
}

#[test]
fn side_allowlist_filters_by_side() {
    let (_, engine, observer) = setup(json!({ "allowed_sides": { "sides": [3] } }));
    let objects = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&objects), vec![3]);
}

#[test]
fn side_allowlist_with_no_valid_entries_is_a_no_op() {
    let (_, engine, observer) = setup(json!({ "allowed_sides": { "sides": ["junk", -1] } }));
    let objects = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&objects), vec![1, 2, 3]);
}

// ── Request-count budget ────────────────────────────────────────────

#[test]
fn request_budget_blocks_after_the_limit_is_spent() {
    let (backend, engine, _) = setup(json!({ "request_budget": { "limit": 2 } }));

    // First call: full set, remaining 1 persisted.
    let observer = backend.get(1).unwrap();
    assert_eq!(ids(&engine.get_filtered_objects(&observer).unwrap()), vec![1, 2, 3]);
    assert_eq!(persisted_state(&backend, "request_budget")["remaining"], json!(1));

    // Second call (the one that reaches 0): still the full set.
    let observer = backend.get(1).unwrap();
    assert_eq!(ids(&engine.get_filtered_objects(&observer).unwrap()), vec![1, 2, 3]);
    assert_eq!(persisted_state(&backend, "request_budget")["remaining"], json!(0));

    // Third call: blocked, remaining stays 0.
    let observer = backend.get(1).unwrap();
    assert!(engine.get_filtered_objects(&observer).unwrap().is_empty());
    assert_eq!(persisted_state(&backend, "request_budget")["remaining"], json!(0));
}

#[test]
fn stateful_rule_is_explicitly_not_idempotent() {
    let (backend, engine, _) = setup(json!({ "request_budget": { "limit": 1 } }));

    let observer = backend.get(1).unwrap();
    let first = engine.get_filtered_objects(&observer).unwrap();
    let observer = backend.get(1).unwrap();
    let second = engine.get_filtered_objects(&observer).unwrap();

    assert_eq!(ids(&first), vec![1, 2, 3]);
    assert!(second.is_empty());
    assert_ne!(first, second);
}

// ── Elapsed-time budget ─────────────────────────────────────────────

#[test]
fn elapsed_budget_initializes_state_on_first_use() {
    let (backend, engine, observer) = setup(json!({ "elapsed_budget": { "duration_seconds": 60 } }));

    let objects = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&objects), vec![1, 2, 3]);

    let state = persisted_state(&backend, "elapsed_budget");
    let first = state["first_used_at"].as_i64().unwrap();
    assert_eq!(state["expires_at"].as_i64().unwrap(), first + 60);
}

#[test]
fn elapsed_budget_open_and_expired_windows() {
    let now = chrono::Utc::now().timestamp();

    // Deadline one second in the future: full set.
    let (backend, engine, observer) = setup(json!({ "elapsed_budget": {
        "duration_seconds": 60,
        "_state": { "first_used_at": now - 59, "expires_at": now + 1, "last_used_at": now - 59 }
    }}));
    assert_eq!(ids(&engine.get_filtered_objects(&observer).unwrap()), vec![1, 2, 3]);
    let state = persisted_state(&backend, "elapsed_budget");
    assert!(state["last_used_at"].as_i64().unwrap() >= now, "last_used_at must be touched");
    assert_eq!(state["expires_at"], json!(now + 1), "deadline is never recomputed");

    // Deadline one second in the past: empty set, last_used_at still touched.
    let (backend, engine, observer) = setup(json!({ "elapsed_budget": {
        "duration_seconds": 60,
        "_state": { "first_used_at": now - 61, "expires_at": now - 1, "last_used_at": now - 61 }
    }}));
    assert!(engine.get_filtered_objects(&observer).unwrap().is_empty());
    let state = persisted_state(&backend, "elapsed_budget");
    assert!(state["last_used_at"].as_i64().unwrap() >= now);
}

// ── Persistence failures ────────────────────────────────────────────

#[test]
fn persistence_failure_propagates_and_loses_nothing() {
    let (backend, engine, observer) = setup(json!({ "request_budget": { "limit": 2 } }));
    backend.fail_next_commit();

    let err = engine.get_filtered_objects(&observer).unwrap_err();
    assert!(matches!(err, RuleError::Storage(StorageError::Commit(_))));

    // The store still holds the pre-call configuration.
    assert!(backend.get(1).unwrap().rules.get("request_budget").unwrap().state.is_none());

    // The next call starts over cleanly.
    let observer = backend.get(1).unwrap();
    assert_eq!(ids(&engine.get_filtered_objects(&observer).unwrap()), vec![1, 2, 3]);
    assert_eq!(persisted_state(&backend, "request_budget")["remaining"], json!(1));
}

#[test]
fn staging_failure_rolls_back_and_propagates() {
    // The observer is not in the store, so persisting state fails at the
    // refresh step and the transaction is rolled back.
    let backend = seeded_backend();
    let engine = engine(&backend);
    let ghost = observer(json!({ "request_budget": { "limit": 2 } }));

    let err = engine.get_filtered_objects(&ghost).unwrap_err();
    assert!(matches!(
        err,
        RuleError::Storage(StorageError::ObserverNotFound(1))
    ));
}

// ── Combined pipeline ───────────────────────────────────────────────

#[test]
fn combined_rules_apply_in_priority_order_with_state() {
    let (backend, engine, observer) = setup(json!({
        "allowed_objects": { "ids": [1, 2] },
        "request_budget": { "limit": 5 },
        "time_window": { "start_time": "00:00", "end_time": "23:59" }
    }));

    let objects = engine.get_filtered_objects(&observer).unwrap();
    assert_eq!(ids(&objects), vec![1, 2]);
    assert_eq!(persisted_state(&backend, "request_budget")["remaining"], json!(4));
}

#[test]
fn one_invalid_slice_only_disqualifies_that_rule() {
    // The side list is structurally valid at the aggregate level only if
    // it passes the shared schema, so use a state-less failure instead:
    // an unknown rule name plus two valid rules.
    let (_, engine, observer) = setup(json!({
        "ghost_rule": {},
        "allowed_objects": { "ids": [1, 3] },
        "allowed_sides": { "sides": [2] }
    }));
    let objects = engine.get_filtered_objects(&observer).unwrap();
    // ghost skipped; ids [1,3] ∩ side 2 = object 1.
    assert_eq!(ids(&objects), vec![1]);
}
