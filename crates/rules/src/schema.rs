//! JSON-schema subset used to describe rule configuration shapes.
//!
//! Supported keywords: `type`, `properties`, `items`, `required`,
//! `additionalProperties`, `minItems`/`maxItems`, `uniqueItems`, `minimum`,
//! `enum`, `pattern`, `minProperties`. Validation reports every violation
//! (not just the first), one path-prefixed message per violation, and
//! coerces numeric strings to numbers before the primitive type check so
//! hand-edited configs like `"limit": "5"` still pass.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Schema value type ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaType::Object => write!(f, "object"),
            SchemaType::Array => write!(f, "array"),
            SchemaType::String => write!(f, "string"),
            SchemaType::Integer => write!(f, "integer"),
            SchemaType::Number => write!(f, "number"),
            SchemaType::Boolean => write!(f, "boolean"),
        }
    }
}

/// One schema node. Serializes to the standard JSON-schema spelling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<usize>,
}

// ── Builders ────────────────────────────────────────────────────────

impl Schema {
    fn typed(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::typed(SchemaType::Object)
    }

    pub fn array(items: Schema) -> Self {
        let mut schema = Self::typed(SchemaType::Array);
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn string() -> Self {
        Self::typed(SchemaType::String)
    }

    pub fn integer() -> Self {
        Self::typed(SchemaType::Integer)
    }

    pub fn boolean() -> Self {
        Self::typed(SchemaType::Boolean)
    }

    /// Untyped node: accepts any value (used for lenient array items).
    pub fn any() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), schema);
        self
    }

    pub fn required_keys(mut self, keys: &[&str]) -> Self {
        self.required = Some(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn closed(mut self) -> Self {
        self.additional_properties = Some(false);
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(n);
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    pub fn unique_items(mut self) -> Self {
        self.unique_items = Some(true);
        self
    }

    pub fn minimum(mut self, n: f64) -> Self {
        self.minimum = Some(n);
        self
    }

    pub fn allowed(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn min_properties(mut self, n: usize) -> Self {
        self.min_properties = Some(n);
        self
    }
}

// ── Validation ──────────────────────────────────────────────────────

impl Schema {
    /// Validate `value`, returning one message per violation.
    ///
    /// An empty vec means the value conforms.
    pub fn validate(&self, value: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        self.check(value, "", &mut errors);
        errors
    }

    fn check(&self, value: &Value, path: &str, errors: &mut Vec<String>) {
        // Numeric strings coerce to numbers before the primitive type check.
        let coerced = self.coerce(value);
        let value = coerced.as_ref().unwrap_or(value);

        if let Some(expected) = self.schema_type {
            if !type_matches(expected, value) {
                push(
                    errors,
                    path,
                    format!("expected {}, got {}", expected, type_name(value)),
                );
                // Nested checks would only produce noise on the wrong type.
                return;
            }
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                push(
                    errors,
                    path,
                    format!(
                        "value {} is not one of the allowed values",
                        compact(value)
                    ),
                );
            }
        }

        if let Some(minimum) = self.minimum {
            if let Some(n) = value.as_f64() {
                if n < minimum {
                    push(errors, path, format!("must be >= {minimum}, got {n}"));
                }
            }
        }

        if let Some(pattern) = &self.pattern {
            if let Some(s) = value.as_str() {
                match Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(s) {
                            push(errors, path, format!("'{s}' does not match pattern {pattern}"));
                        }
                    }
                    Err(_) => push(errors, path, format!("schema pattern {pattern} is invalid")),
                }
            }
        }

        if let Some(map) = value.as_object() {
            if let Some(min) = self.min_properties {
                if map.len() < min {
                    push(
                        errors,
                        path,
                        format!("must have at least {min} properties, got {}", map.len()),
                    );
                }
            }
            if let Some(required) = &self.required {
                for key in required {
                    if !map.contains_key(key) {
                        push(errors, path, format!("missing required property '{key}'"));
                    }
                }
            }
            if let Some(properties) = &self.properties {
                for (key, child) in map {
                    match properties.get(key) {
                        Some(schema) => schema.check(child, &join(path, key), errors),
                        None => {
                            if self.additional_properties == Some(false) {
                                push(errors, path, format!("unknown property '{key}'"));
                            }
                        }
                    }
                }
            } else if self.additional_properties == Some(false) && !map.is_empty() {
                for key in map.keys() {
                    push(errors, path, format!("unknown property '{key}'"));
                }
            }
        }

        if let Some(items) = value.as_array() {
            if let Some(min) = self.min_items {
                if items.len() < min {
                    push(
                        errors,
                        path,
                        format!("must have at least {min} items, got {}", items.len()),
                    );
                }
            }
            if let Some(max) = self.max_items {
                if items.len() > max {
                    push(
                        errors,
                        path,
                        format!("must have at most {max} items, got {}", items.len()),
                    );
                }
            }
            if self.unique_items == Some(true) {
                for (i, item) in items.iter().enumerate() {
                    if items[..i].contains(item) {
                        push(
                            errors,
                            &format!("{path}[{i}]"),
                            format!("duplicate item {}", compact(item)),
                        );
                    }
                }
            }
            if let Some(item_schema) = &self.items {
                for (i, item) in items.iter().enumerate() {
                    item_schema.check(item, &format!("{path}[{i}]"), errors);
                }
            }
        }
    }

    /// Coerce a numeric string to the schema's primitive number type.
    fn coerce(&self, value: &Value) -> Option<Value> {
        let s = value.as_str()?;
        match self.schema_type? {
            SchemaType::Integer => s.trim().parse::<i64>().ok().map(Value::from),
            SchemaType::Number => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            _ => None,
        }
    }
}

fn type_matches(expected: SchemaType, value: &Value) -> bool {
    match expected {
        SchemaType::Object => value.is_object(),
        SchemaType::Array => value.is_array(),
        SchemaType::String => value.is_string(),
        SchemaType::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
        SchemaType::Number => value.is_number(),
        SchemaType::Boolean => value.is_boolean(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Short single-line rendering for error messages.
fn compact(value: &Value) -> String {
    let s = value.to_string();
    if s.chars().count() > 40 {
        format!("{}...", s.chars().take(40).collect::<String>())
    } else {
        s
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn push(errors: &mut Vec<String>, path: &str, message: String) {
    if path.is_empty() {
        errors.push(message);
    } else {
        errors.push(format!("{path}: {message}"));
    }
}

// ── Tests ───────────────────────────────────────────────────────────
