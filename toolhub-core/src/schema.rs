//! Schema compiler for tool input
//!
//! Tool input schemas are a practical subset of JSON Schema: `object`, `array`,
//! `string` (with `enum` or `pattern`), `number`/`integer` and `boolean`. A schema
//! value is compiled once into a closed [`SchemaNode`] tree and evaluated by
//! recursive descent. Compilation is total: any node the compiler does not
//! understand becomes [`SchemaNode::Any`] instead of failing the whole schema.

use crate::tools::ValidationError;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// Compiled validator node
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// Keyed object with declared properties
    Object {
        properties: Vec<(String, SchemaNode)>,
        required: BTreeSet<String>,
        /// `additionalProperties: false`
        strict: bool,
    },
    /// Homogeneous array
    Array { items: Box<SchemaNode> },
    /// String, optionally restricted
    String(StringRule),
    /// Any JSON number
    Number,
    /// `true` or `false`
    Boolean,
    /// Accepts anything
    Any,
}

/// Restriction applied to a string node
#[derive(Debug, Clone)]
pub enum StringRule {
    Any,
    OneOf(Vec<String>),
    Matches(Regex),
}

impl SchemaNode {
    /// Compile a schema node. Never fails.
    pub fn compile(schema: &Value) -> Self {
        let Some(obj) = schema.as_object() else {
            return SchemaNode::Any;
        };

        match obj.get("type").and_then(Value::as_str) {
            Some("object") => {
                let properties = obj
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(key, value)| (key.clone(), SchemaNode::compile(value)))
                            .collect()
                    })
                    .unwrap_or_default();

                let required = obj
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|list| {
                        list.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();

                SchemaNode::Object {
                    properties,
                    required,
                    strict: obj.get("additionalProperties") == Some(&Value::Bool(false)),
                }
            }
            Some("array") => SchemaNode::Array {
                items: Box::new(obj.get("items").map(SchemaNode::compile).unwrap_or(SchemaNode::Any)),
            },
            Some("string") => SchemaNode::String(compile_string_rule(obj)),
            Some("number") | Some("integer") => SchemaNode::Number,
            Some("boolean") => SchemaNode::Boolean,
            _ => SchemaNode::Any,
        }
    }

    /// Validate `value`, returning the accepted value.
    ///
    /// Undeclared object keys are dropped from the result unless the object
    /// is strict, in which case they are rejected.
    pub fn parse(&self, value: &Value, path: &str, errors: &mut Vec<ValidationError>) -> Value {
        match self {
            SchemaNode::Any => value.clone(),
            SchemaNode::Number => {
                if !value.is_number() {
                    errors.push(type_error(path, "number", value));
                }
                value.clone()
            }
            SchemaNode::Boolean => {
                if !value.is_boolean() {
                    errors.push(type_error(path, "boolean", value));
                }
                value.clone()
            }
            SchemaNode::String(rule) => {
                match value.as_str() {
                    None => errors.push(type_error(path, "string", value)),
                    Some(s) => match rule {
                        StringRule::Any => {}
                        StringRule::OneOf(options) => {
                            if !options.iter().any(|o| o == s) {
                                errors.push(
                                    ValidationError::new(
                                        field_name(path),
                                        format!("expected one of [{}], received '{}'", options.join(", "), s),
                                    )
                                    .with_code("invalid_enum_value"),
                                );
                            }
                        }
                        StringRule::Matches(regex) => {
                            if !regex.is_match(s) {
                                errors.push(
                                    ValidationError::new(
                                        field_name(path),
                                        format!("value does not match pattern {}", regex.as_str()),
                                    )
                                    .with_code("invalid_string"),
                                );
                            }
                        }
                    },
                }
                value.clone()
            }
            SchemaNode::Array { items } => match value.as_array() {
                Some(elements) => Value::Array(
                    elements
                        .iter()
                        .enumerate()
                        .map(|(i, element)| items.parse(element, &format!("{}[{}]", path, i), errors))
                        .collect(),
                ),
                None => {
                    errors.push(type_error(path, "array", value));
                    value.clone()
                }
            },
            SchemaNode::Object {
                properties,
                required,
                strict,
            } => {
                let Some(input) = value.as_object() else {
                    errors.push(type_error(path, "object", value));
                    return value.clone();
                };

                let mut output = Map::new();
                for (key, node) in properties {
                    let child_path = join_path(path, key);
                    match input.get(key) {
                        Some(child) if !(child.is_null() && !required.contains(key)) => {
                            output.insert(key.clone(), node.parse(child, &child_path, errors));
                        }
                        Some(_) => {}
                        None if required.contains(key) => {
                            errors.push(
                                ValidationError::new(child_path, "required field is missing")
                                    .with_code("required"),
                            );
                        }
                        None => {}
                    }
                }

                if *strict {
                    for key in input.keys() {
                        if !properties.iter().any(|(declared, _)| declared == key) {
                            errors.push(
                                ValidationError::new(join_path(path, key), "unrecognized key")
                                    .with_code("unrecognized_keys"),
                            );
                        }
                    }
                }

                Value::Object(output)
            }
        }
    }
}

fn compile_string_rule(obj: &Map<String, Value>) -> StringRule {
    if let Some(options) = obj.get("enum").and_then(Value::as_array) {
        let literals: Vec<String> = options
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if !literals.is_empty() {
            return StringRule::OneOf(literals);
        }
    }

    if let Some(pattern) = obj.get("pattern").and_then(Value::as_str) {
        if let Ok(regex) = Regex::new(pattern) {
            return StringRule::Matches(regex);
        }
        tracing::debug!(pattern, "ignoring schema pattern that does not compile");
    }

    StringRule::Any
}

fn type_error(path: &str, expected: &str, received: &Value) -> ValidationError {
    let received = match received {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ValidationError::new(
        field_name(path),
        format!("expected {}, received {}", expected, received),
    )
    .with_code("invalid_type")
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn field_name(path: &str) -> String {
    if path.is_empty() {
        "input".to_string()
    } else {
        path.to_string()
    }
}

/// Error returned when a schema document cannot be compiled at all
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tool schema must be a JSON object")]
pub struct SchemaError;

/// A compiled schema paired with the document advertised to callers
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    document: Value,
    root: SchemaNode,
}

impl CompiledSchema {
    /// Compile a schema document.
    ///
    /// Only a document that is not a JSON object is rejected; problems further
    /// down the tree degrade to permissive nodes.
    pub fn compile(document: Value) -> Result<Self, SchemaError> {
        if !document.is_object() {
            return Err(SchemaError);
        }
        let root = SchemaNode::compile(&document);
        Ok(Self { document, root })
    }

    /// Compile `document`, or fall back to [`CompiledSchema::default_args`].
    pub fn compile_or_default(document: Value) -> Self {
        Self::compile(document).unwrap_or_else(|_| Self::default_args())
    }

    /// Schema accepting an optional list of positional string arguments
    pub fn default_args() -> Self {
        let document = json!({
            "type": "object",
            "properties": {
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Positional arguments forwarded to the underlying script or CLI."
                }
            }
        });
        let root = SchemaNode::compile(&document);
        Self { document, root }
    }

    /// The schema document advertised to callers
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The compiled validator
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Validate input, returning the accepted value.
    ///
    /// A missing (`null`) input is treated as an empty object.
    pub fn parse(&self, input: &Value) -> Result<Value, Vec<ValidationError>> {
        let empty = Value::Object(Map::new());
        let input = if input.is_null() { &empty } else { input };

        let mut errors = Vec::new();
        let parsed = self.root.parse(input, "", &mut errors);
        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(document: Value) -> CompiledSchema {
        CompiledSchema::compile(document).unwrap()
    }

    #[test]
    fn test_enum_field() {
        let compiled = schema(json!({
            "type": "object",
            "properties": {
                "mode": { "type": "string", "enum": ["fast", "slow"] }
            },
            "required": ["mode"]
        }));

        assert!(compiled.parse(&json!({"mode": "fast"})).is_ok());
        let errors = compiled.parse(&json!({"mode": "medium"})).unwrap_err();
        assert_eq!(errors[0].field, "mode");
        assert_eq!(errors[0].code.as_deref(), Some("invalid_enum_value"));
    }

    #[test]
    fn test_required_and_optional_properties() {
        let compiled = schema(json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "verbose": { "type": "boolean" }
            },
            "required": ["path"]
        }));

        assert!(compiled.parse(&json!({"path": "/data/a"})).is_ok());
        assert!(compiled.parse(&json!({"path": "/data/a", "verbose": null})).is_ok());
        let errors = compiled.parse(&json!({"verbose": true})).unwrap_err();
        assert_eq!(errors[0].field, "path");
        assert_eq!(errors[0].code.as_deref(), Some("required"));
    }

    #[test]
    fn test_undeclared_keys_are_stripped_unless_strict() {
        let lenient = schema(json!({
            "type": "object",
            "properties": { "a": { "type": "number" } }
        }));
        let parsed = lenient.parse(&json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(parsed, json!({"a": 1}));

        let strict = schema(json!({
            "type": "object",
            "properties": { "a": { "type": "number" } },
            "additionalProperties": false
        }));
        let errors = strict.parse(&json!({"a": 1, "b": 2})).unwrap_err();
        assert_eq!(errors[0].field, "b");
    }

    #[test]
    fn test_nested_array_paths() {
        let compiled = schema(json!({
            "type": "object",
            "properties": {
                "values": { "type": "array", "items": { "type": "number" } }
            }
        }));

        assert!(compiled.parse(&json!({"values": [1, 2.5, -3]})).is_ok());
        let errors = compiled.parse(&json!({"values": [1, "two"]})).unwrap_err();
        assert_eq!(errors[0].field, "values[1]");
    }

    #[test]
    fn test_pattern_and_bad_pattern() {
        let compiled = schema(json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "pattern": "^[a-z]+$" },
                "loose": { "type": "string", "pattern": "([unclosed" }
            }
        }));

        assert!(compiled.parse(&json!({"id": "abc", "loose": "anything"})).is_ok());
        assert!(compiled.parse(&json!({"id": "ABC"})).is_err());
    }

    #[test]
    fn test_integer_is_plain_number() {
        let compiled = schema(json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } }
        }));
        assert!(compiled.parse(&json!({"count": 1.5})).is_ok());
        assert!(compiled.parse(&json!({"count": "1"})).is_err());
    }

    #[test]
    fn test_unknown_shapes_are_permissive() {
        let node = SchemaNode::compile(&json!({"type": "tuple"}));
        assert!(matches!(node, SchemaNode::Any));

        let node = SchemaNode::compile(&json!("not a schema"));
        assert!(matches!(node, SchemaNode::Any));

        let compiled = schema(json!({
            "type": "object",
            "properties": { "blob": { "oneOf": [] }, "list": { "type": "array" } }
        }));
        assert!(compiled.parse(&json!({"blob": {"x": 1}, "list": [1, "a", null]})).is_ok());
    }

    #[test]
    fn test_non_object_document_falls_back() {
        assert_eq!(CompiledSchema::compile(json!(["array"])).unwrap_err(), SchemaError);

        let fallback = CompiledSchema::compile_or_default(json!(42));
        assert_eq!(fallback.document(), CompiledSchema::default_args().document());
        assert!(fallback.parse(&json!({"args": ["a", "b"]})).is_ok());
        assert!(fallback.parse(&json!({"args": [1]})).is_err());
    }

    #[test]
    fn test_null_input_is_empty_object() {
        let compiled = CompiledSchema::default_args();
        assert_eq!(compiled.parse(&Value::Null).unwrap(), json!({}));
    }
}
