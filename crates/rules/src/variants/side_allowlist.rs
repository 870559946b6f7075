//! Allow-list by side id.
//!
//! Restricts the view to objects owned by the configured sides. Entries
//! that are non-numeric or non-positive are silently discarded before the
//! check; if nothing valid remains the rule is a no-op in both phases. The
//! schema therefore keeps the item type lenient and only enforces
//! cardinality and uniqueness.

use serde_json::json;

use mapwatch_core::{GeoObject, RuleEntry};
use mapwatch_storage::{ObjectQuery, Predicate};

use crate::rule::Rule;
use crate::schema::Schema;

use super::int_value;

const PARAM: &str = "allowed_side_ids";

pub struct SideAllowList;

impl SideAllowList {
    /// Configured side ids with invalid entries dropped.
    fn sides(entry: &RuleEntry) -> Vec<i64> {
        entry
            .params
            .get("sides")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(int_value).filter(|id| *id > 0).collect())
            .unwrap_or_default()
    }
}

impl Rule for SideAllowList {
    fn name(&self) -> &'static str {
        "allowed_sides"
    }

    fn priority(&self) -> i32 {
        75
    }

    fn config_schema(&self) -> Schema {
        Schema::object()
            .property(
                "sides",
                Schema::array(Schema::any())
                    .min_items(1)
                    .max_items(50)
                    .unique_items(),
            )
            .required_keys(&["sides"])
            .closed()
    }

    fn apply_to_query(&self, query: ObjectQuery, entry: &RuleEntry) -> ObjectQuery {
        let sides = Self::sides(entry);
        if sides.is_empty() {
            return query;
        }
        query
            .and_where(Predicate::SideIn { param: PARAM.to_string() })
            .set_parameter(PARAM, json!(sides))
    }

    fn apply_to_objects(&self, objects: Vec<GeoObject>, entry: &RuleEntry) -> Vec<GeoObject> {
        let sides = Self::sides(entry);
        if sides.is_empty() {
            return objects;
        }
        objects
            .into_iter()
            .filter(|o| o.side_id.map(|s| sides.contains(&s)).unwrap_or(false))
            .collect()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
