//! Built-in rule implementations.
//!
//! One module per rule, each co-locating its schema, filtering logic and
//! unit tests:
//! - [`ObjectAllowList`] — allow-list by object id (priority 50)
//! - [`SideAllowList`] — allow-list by side id (priority 75)
//! - [`TimeWindow`] — time-of-day visibility window (priority 10)
//! - [`ElapsedBudget`] — elapsed-time budget, stateful (priority 20)
//! - [`RequestBudget`] — request-count budget, stateful (priority 30)

mod count_budget;
mod elapsed_budget;
mod object_allowlist;
mod side_allowlist;
mod time_window;

pub use count_budget::RequestBudget;
pub use elapsed_budget::ElapsedBudget;
pub use object_allowlist::ObjectAllowList;
pub use side_allowlist::SideAllowList;
pub use time_window::TimeWindow;

use std::sync::Arc;

use serde_json::Value;

use mapwatch_core::RuleEntry;

use crate::rule::Rule;

/// The full built-in rule set, one singleton per rule.
pub fn builtin() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(TimeWindow),
        Arc::new(ElapsedBudget),
        Arc::new(RequestBudget),
        Arc::new(ObjectAllowList),
        Arc::new(SideAllowList),
    ]
}

/// Read an integer parameter, accepting numeric strings the same way the
/// schema coercion does.
pub(crate) fn int_param(entry: &RuleEntry, key: &str) -> Option<i64> {
    int_value(entry.params.get(key)?)
}

pub(crate) fn str_param<'a>(entry: &'a RuleEntry, key: &str) -> Option<&'a str> {
    entry.params.get(key)?.as_str()
}

/// Lenient integer extraction used for allow-list items.
pub(crate) fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Current wall-clock as unix seconds; state timestamps are stored this way.
pub(crate) fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
