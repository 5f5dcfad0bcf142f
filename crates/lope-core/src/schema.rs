//! Structural parameter schemas and the recursive argument validator.
//!
//! Tool parameter shapes are declared as a closed variant type rather than a
//! free-form `type` string, so an unrepresentable schema cannot be
//! constructed. Serialization still produces the JSON-Schema-shaped object
//! providers expect (`{"type": "object", "properties": …, "required": …}`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A structural parameter schema (discriminated by `type`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterSchema {
    /// An object with named properties.
    Object {
        /// Property schemas by name.
        properties: BTreeMap<String, ParameterSchema>,
        /// Names of required properties.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
        /// Human-readable description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A string, optionally restricted to an enumerated set.
    String {
        /// Human-readable description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Allowed values, when restricted.
        #[serde(
            rename = "enum",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        enum_values: Option<Vec<String>>,
    },
    /// Any JSON number.
    Number {
        /// Human-readable description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A whole number.
    Integer {
        /// Human-readable description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A boolean.
    Boolean {
        /// Human-readable description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// An array with a uniform item schema.
    Array {
        /// Schema every item must satisfy.
        items: Box<ParameterSchema>,
        /// Human-readable description.
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl ParameterSchema {
    /// An object schema from `(name, schema, required)` triples.
    #[must_use]
    pub fn object<I>(properties: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, ParameterSchema, bool)>,
    {
        let mut props = BTreeMap::new();
        let mut required = Vec::new();
        for (name, schema, is_required) in properties {
            let _ = props.insert(name.to_owned(), schema);
            if is_required {
                required.push(name.to_owned());
            }
        }
        Self::Object {
            properties: props,
            required,
            description: None,
        }
    }

    /// A described string schema.
    #[must_use]
    pub fn string(description: impl Into<String>) -> Self {
        Self::String {
            description: Some(description.into()),
            enum_values: None,
        }
    }

    /// A string schema restricted to an enumerated set.
    #[must_use]
    pub fn string_enum(
        description: impl Into<String>,
        values: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        Self::String {
            description: Some(description.into()),
            enum_values: Some(values.into_iter().map(str::to_owned).collect()),
        }
    }

    /// A described integer schema.
    #[must_use]
    pub fn integer(description: impl Into<String>) -> Self {
        Self::Integer {
            description: Some(description.into()),
        }
    }

    /// A described boolean schema.
    #[must_use]
    pub fn boolean(description: impl Into<String>) -> Self {
        Self::Boolean {
            description: Some(description.into()),
        }
    }

    /// A described array schema.
    #[must_use]
    pub fn array(description: impl Into<String>, items: ParameterSchema) -> Self {
        Self::Array {
            items: Box::new(items),
            description: Some(description.into()),
        }
    }

    /// Validate an argument object against this schema.
    ///
    /// Checks required properties and recursively validates each declared
    /// property's value. Properties the schema does not declare are ignored.
    /// Returns the full list of violations, each a human-readable message with
    /// a dotted path to the offending value. Empty means valid. Never panics
    /// on any input shape.
    #[must_use]
    pub fn validate(&self, args: &Map<String, Value>) -> Vec<String> {
        let mut violations = Vec::new();
        validate_value(self, &Value::Object(args.clone()), "", &mut violations);
        violations
    }
}

fn path_join(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_owned()
    } else {
        format!("{base}.{key}")
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn validate_value(schema: &ParameterSchema, value: &Value, path: &str, out: &mut Vec<String>) {
    let at = if path.is_empty() { "arguments" } else { path };
    match schema {
        ParameterSchema::Object {
            properties,
            required,
            ..
        } => {
            let Value::Object(map) = value else {
                out.push(format!("{at}: expected object, got {}", describe(value)));
                return;
            };
            for name in required {
                if !map.contains_key(name) {
                    out.push(format!(
                        "{}: required property missing",
                        path_join(path, name)
                    ));
                }
            }
            // Undeclared properties pass through: the serialized schema does
            // not forbid them, so the validator must not either.
            for (name, prop_value) in map {
                if let Some(prop_schema) = properties.get(name) {
                    validate_value(prop_schema, prop_value, &path_join(path, name), out);
                }
            }
        }
        ParameterSchema::String { enum_values, .. } => {
            let Value::String(s) = value else {
                out.push(format!("{at}: expected string, got {}", describe(value)));
                return;
            };
            if let Some(allowed) = enum_values {
                if !allowed.iter().any(|v| v == s) {
                    out.push(format!(
                        "{at}: \"{s}\" is not one of [{}]",
                        allowed.join(", ")
                    ));
                }
            }
        }
        ParameterSchema::Number { .. } => {
            if !value.is_number() {
                out.push(format!("{at}: expected number, got {}", describe(value)));
            }
        }
        ParameterSchema::Integer { .. } => {
            if !value.is_i64() && !value.is_u64() {
                out.push(format!("{at}: expected integer, got {}", describe(value)));
            }
        }
        ParameterSchema::Boolean { .. } => {
            if !value.is_boolean() {
                out.push(format!("{at}: expected boolean, got {}", describe(value)));
            }
        }
        ParameterSchema::Array { items, .. } => {
            let Value::Array(elems) = value else {
                out.push(format!("{at}: expected array, got {}", describe(value)));
                return;
            };
            for (i, elem) in elems.iter().enumerate() {
                validate_value(items, elem, &format!("{at}[{i}]"), out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn sample_schema() -> ParameterSchema {
        ParameterSchema::object([
            ("path", ParameterSchema::string("file path"), true),
            ("limit", ParameterSchema::integer("max entries"), false),
            (
                "tags",
                ParameterSchema::array("tag list", ParameterSchema::string("a tag")),
                false,
            ),
        ])
    }

    #[test]
    fn valid_arguments_produce_no_violations() {
        let schema = sample_schema();
        let violations = schema.validate(&args(json!({
            "path": "/tmp/x",
            "limit": 5,
            "tags": ["a", "b"],
        })));
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn missing_required_property() {
        let schema = sample_schema();
        let violations = schema.validate(&args(json!({"limit": 5})));
        assert_eq!(violations, vec!["path: required property missing"]);
    }

    #[test]
    fn wrong_type_reports_both_expected_and_actual() {
        let schema = sample_schema();
        let violations = schema.validate(&args(json!({"path": 42})));
        assert_eq!(violations, vec!["path: expected string, got number"]);
    }

    #[test]
    fn undeclared_property_ignored() {
        let schema = sample_schema();
        let violations = schema.validate(&args(json!({"path": "x", "bogus": true})));
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn array_items_validated_with_index_paths() {
        let schema = sample_schema();
        let violations = schema.validate(&args(json!({
            "path": "x",
            "tags": ["ok", 3, null],
        })));
        assert_eq!(
            violations,
            vec![
                "tags[1]: expected string, got number",
                "tags[2]: expected string, got null",
            ]
        );
    }

    #[test]
    fn nested_object_paths_are_dotted() {
        let schema = ParameterSchema::object([(
            "opts",
            ParameterSchema::object([("depth", ParameterSchema::integer("depth"), true)]),
            true,
        )]);
        let violations = schema.validate(&args(json!({"opts": {"depth": "deep"}})));
        assert_eq!(violations, vec!["opts.depth: expected integer, got string"]);
    }

    #[test]
    fn enum_restriction_enforced() {
        let schema = ParameterSchema::object([(
            "action",
            ParameterSchema::string_enum("what to do", ["list", "read"]),
            true,
        )]);
        assert!(schema.validate(&args(json!({"action": "list"}))).is_empty());
        let violations = schema.validate(&args(json!({"action": "delete"})));
        assert_eq!(
            violations,
            vec!["action: \"delete\" is not one of [list, read]"]
        );
    }

    #[test]
    fn multiple_violations_all_reported() {
        let schema = sample_schema();
        let violations = schema.validate(&args(json!({"limit": "many", "bogus": 1})));
        assert_eq!(
            violations,
            vec![
                "path: required property missing",
                "limit: expected integer, got string",
            ]
        );
    }

    #[test]
    fn integer_rejects_float() {
        let schema = ParameterSchema::object([(
            "n",
            ParameterSchema::integer("count"),
            true,
        )]);
        let violations = schema.validate(&args(json!({"n": 1.5})));
        assert_eq!(violations, vec!["n: expected integer, got number"]);
    }

    #[test]
    fn serializes_as_json_schema_shape() {
        let schema = sample_schema();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["path"]["type"], "string");
        assert_eq!(json["required"], json!(["path"]));
        assert_eq!(json["properties"]["tags"]["items"]["type"], "string");
    }
}
