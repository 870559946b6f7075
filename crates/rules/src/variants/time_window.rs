//! Time-of-day visibility window.
//!
//! The cheapest hard gate, so it runs first (priority 10). Out of window
//! the query phase forces an always-false predicate and the memory phase
//! returns an empty set. `end_time <= start_time` means the window spans
//! midnight. Any parse problem (malformed time, unknown timezone) fails
//! open: the window is treated as open rather than locking the observer
//! out over a config typo.

use chrono::{FixedOffset, NaiveTime, Utc};
use serde_json::json;

use mapwatch_core::{GeoObject, RuleEntry};
use mapwatch_storage::{ObjectQuery, Predicate};

use crate::rule::Rule;
use crate::schema::Schema;

use super::str_param;

const TIME_PATTERN: &str = "^([01][0-9]|2[0-3]):[0-5][0-9]$";

/// Allow-listed timezone names with their fixed UTC offsets in seconds.
const TIMEZONES: &[(&str, i32)] = &[
    ("UTC", 0),
    ("CET", 3600),
    ("EET", 7200),
    ("MSK", 10800),
    ("IST", 19800),
    ("CST", 28800),
    ("JST", 32400),
    ("AEST", 36000),
    ("EST", -18000),
    ("PST", -28800),
];

pub struct TimeWindow;

impl TimeWindow {
    /// Membership test for a window, midnight-spanning when `end <= start`.
    fn in_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
        if end <= start {
            now >= start || now <= end
        } else {
            now >= start && now <= end
        }
    }

    /// Whether the window is currently open. Parse failures fail open.
    fn is_open(entry: &RuleEntry) -> bool {
        let parsed = Self::parse(entry);
        match parsed {
            Some((start, end, offset)) => {
                let now = Utc::now().with_timezone(&offset).time();
                Self::in_window(now, start, end)
            }
            None => true,
        }
    }

    fn parse(entry: &RuleEntry) -> Option<(NaiveTime, NaiveTime, FixedOffset)> {
        let start = NaiveTime::parse_from_str(str_param(entry, "start_time")?, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(str_param(entry, "end_time")?, "%H:%M").ok()?;
        let offset = match str_param(entry, "timezone") {
            None => FixedOffset::east_opt(0)?,
            Some(name) => {
                let seconds = TIMEZONES.iter().find(|(tz, _)| *tz == name)?.1;
                FixedOffset::east_opt(seconds)?
            }
        };
        Some((start, end, offset))
    }
}

impl Rule for TimeWindow {
    fn name(&self) -> &'static str {
        "time_window"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn config_schema(&self) -> Schema {
        let zones = TIMEZONES.iter().map(|(tz, _)| json!(tz)).collect();
        Schema::object()
            .property("start_time", Schema::string().pattern(TIME_PATTERN))
            .property("end_time", Schema::string().pattern(TIME_PATTERN))
            .property("timezone", Schema::string().allowed(zones))
            .required_keys(&["start_time", "end_time"])
            .closed()
    }

    fn apply_to_query(&self, query: ObjectQuery, entry: &RuleEntry) -> ObjectQuery {
        if Self::is_open(entry) {
            query
        } else {
            query.and_where(Predicate::Never)
        }
    }

    fn apply_to_objects(&self, objects: Vec<GeoObject>, entry: &RuleEntry) -> Vec<GeoObject> {
        if Self::is_open(entry) {
            objects
        } else {
            Vec::new()
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(raw: serde_json::Value) -> RuleEntry {
        serde_json::from_value(raw).unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    #[test]
    fn same_day_window() {
        let (start, end) = (t("09:00"), t("17:00"));
        assert!(TimeWindow::in_window(t("09:00"), start, end));
        assert!(TimeWindow::in_window(t("12:30"), start, end));
        assert!(TimeWindow::in_window(t("17:00"), start, end));
        assert!(!TimeWindow::in_window(t("08:59"), start, end));
        assert!(!TimeWindow::in_window(t("17:01"), start, end));
    }

    #[test]
    fn midnight_spanning_window() {
        let (start, end) = (t("22:00"), t("06:00"));
        assert!(TimeWindow::in_window(t("23:30"), start, end));
        assert!(TimeWindow::in_window(t("02:00"), start, end));
        assert!(!TimeWindow::in_window(t("12:00"), start, end));
    }

    #[test]
    fn equal_bounds_span_the_whole_day() {
        let (start, end) = (t("08:00"), t("08:00"));
        assert!(TimeWindow::in_window(t("08:00"), start, end));
        assert!(TimeWindow::in_window(t("20:00"), start, end));
    }

    #[test]
    fn parse_failures_fail_open() {
        // Unknown timezone.
        assert!(TimeWindow::is_open(&entry(json!({
            "start_time": "00:00",
            "end_time": "00:01",
            "timezone": "Mars"
        }))));
        // Malformed time.
        assert!(TimeWindow::is_open(&entry(json!({
            "start_time": "25:99",
            "end_time": "06:00"
        }))));
        // Missing fields.
        assert!(TimeWindow::is_open(&entry(json!({}))));
    }

    #[test]
    fn closed_window_blanks_both_phases() {
        // Pick a window on the other half of the day so the test is stable
        // regardless of when it runs.
        let (start, end) = if Utc::now().time() < t("12:00") {
            ("22:00", "23:00")
        } else {
            ("02:00", "03:00")
        };
        let entry = entry(json!({ "start_time": start, "end_time": end }));

        let rule = TimeWindow;
        assert!(!TimeWindow::is_open(&entry));
        let query = rule.apply_to_query(ObjectQuery::new(), &entry);
        assert_eq!(query.predicates(), &[Predicate::Never]);
        assert!(rule
            .apply_to_objects(
                vec![GeoObject {
                    id: 1,
                    map_id: 1,
                    side_id: None,
                    name: "obj".into(),
                    active: true,
                    expires_at: None,
                }],
                &entry
            )
            .is_empty());
    }

    #[test]
    fn schema_checks_time_format_and_timezone() {
        let rule = TimeWindow;
        assert!(rule
            .config_schema()
            .validate(&json!({ "start_time": "22:00", "end_time": "06:00", "timezone": "CET" }))
            .is_empty());
        assert!(!rule
            .config_schema()
            .validate(&json!({ "start_time": "24:00", "end_time": "06:00" }))
            .is_empty());
        assert!(!rule
            .config_schema()
            .validate(&json!({ "start_time": "22:00", "end_time": "06:00", "timezone": "Mars" }))
            .is_empty());
        assert!(!rule.config_schema().validate(&json!({ "start_time": "22:00" })).is_empty());
    }
}
