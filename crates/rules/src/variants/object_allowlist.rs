//! Allow-list by object id.
//!
//! Cheap and highly selective, so it runs early (priority 50). The query
//! phase restricts to objects whose id is in the configured set; the memory
//! phase repeats the same check over the result set.

use serde_json::json;

use mapwatch_core::{GeoObject, RuleEntry};
use mapwatch_storage::{ObjectQuery, Predicate};

use crate::rule::Rule;
use crate::schema::Schema;

use super::int_value;

const PARAM: &str = "allowed_object_ids";

pub struct ObjectAllowList;

impl ObjectAllowList {
    fn ids(entry: &RuleEntry) -> Vec<i64> {
        entry
            .params
            .get("ids")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(int_value).filter(|id| *id > 0).collect())
            .unwrap_or_default()
    }
}

impl Rule for ObjectAllowList {
    fn name(&self) -> &'static str {
        "allowed_objects"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn config_schema(&self) -> Schema {
        Schema::object()
            .property(
                "ids",
                Schema::array(Schema::integer().minimum(1.0))
                    .min_items(1)
                    .max_items(100)
                    .unique_items(),
            )
            .required_keys(&["ids"])
            .closed()
    }

    fn apply_to_query(&self, query: ObjectQuery, entry: &RuleEntry) -> ObjectQuery {
        query
            .and_where(Predicate::IdIn { param: PARAM.to_string() })
            .set_parameter(PARAM, json!(Self::ids(entry)))
    }

    fn apply_to_objects(&self, objects: Vec<GeoObject>, entry: &RuleEntry) -> Vec<GeoObject> {
        let ids = Self::ids(entry);
        objects.into_iter().filter(|o| ids.contains(&o.id)).collect()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
