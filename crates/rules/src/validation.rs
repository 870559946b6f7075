//! Two-pass validation of raw rule configurations.
//!
//! The structural pass checks the configuration is a non-empty object with
//! well-formed rule names; the schema pass checks the whole blob against
//! the registry's aggregate schema. Both passes always run and their
//! messages are reported together. This function never fails — callers
//! decide how to react to a non-empty error list.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::schema::Schema;

/// Rule identifiers start with a letter, then letters/digits/underscores.
pub const RULE_NAME_PATTERN: &str = "^[A-Za-z][A-Za-z0-9_]*$";

fn rule_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RULE_NAME_PATTERN).expect("rule name pattern is valid"))
}

/// Whether `name` is a well-formed rule identifier.
pub fn is_valid_rule_name(name: &str) -> bool {
    rule_name_regex().is_match(name)
}

/// Validate a raw configuration blob against the aggregate schema.
///
/// Returns one human-readable message per violation, in pass order:
/// structural violations first, then schema violations prefixed with the
/// offending property path.
pub fn validate_config(raw: &Value, schema: &Schema) -> Vec<String> {
    let mut errors = Vec::new();

    // Structural pass.
    match raw.as_object() {
        Some(map) if map.is_empty() => {
            errors.push("configuration must contain at least one rule".to_string());
        }
        Some(map) => {
            for key in map.keys() {
                if !is_valid_rule_name(key) {
                    errors.push(format!(
                        "'{key}' is not a valid rule name (expected {RULE_NAME_PATTERN})"
                    ));
                }
            }
        }
        None => errors.push("configuration must be a JSON object".to_string()),
    }

    // Schema pass — runs regardless of structural outcome.
    errors.extend(schema.validate(raw));

    if !errors.is_empty() {
        warn!(
            violations = errors.len(),
            config = %raw,
            "rule configuration failed validation"
        );
    }
    errors
}

// ── Tests ───────────────────────────────────────────────────────────
