//! JSON Schema (restricted subset) to local call-schema conversion.
//!
//! Remote tools describe their input with a JSON Schema object. This module turns
//! that into a [`FieldShape`] (one validator per property, for frameworks that
//! declare fields individually) or an [`ObjectSchema`] (one validator for the
//! whole argument object, passing unknown keys through untouched).
//!
//! Only the common primitive types are understood. Nested `object` properties are
//! treated as opaque maps; anything unrecognized accepts any value. A missing
//! schema or a top-level type other than `object` yields an empty shape.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Typed view of one restricted JSON-Schema node.
///
/// Built leniently from a `serde_json::Value`: fields with an unexpected JSON
/// type are treated as absent rather than rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaNode {
    pub kind: Option<String>,
    pub properties: BTreeMap<String, SchemaNode>,
    pub required: BTreeSet<String>,
    pub enum_values: Option<Vec<String>>,
    pub items: Option<Box<SchemaNode>>,
    pub description: Option<String>,
}

impl SchemaNode {
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let str_field = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);
        let properties = obj
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(k, v)| (k.clone(), SchemaNode::from_value(v)))
                    .collect()
            })
            .unwrap_or_default();
        let required = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let enum_values = obj.get("enum").and_then(Value::as_array).map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        });
        Self {
            kind: str_field("type"),
            properties,
            required,
            enum_values,
            items: obj
                .get("items")
                .map(|items| Box::new(SchemaNode::from_value(items))),
            description: str_field("description"),
        }
    }
}

/// Element validator for `array` properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    String,
    Number,
    Any,
}

/// Validator for one property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Closed set of string values.
    Enum(Vec<String>),
    /// `number` and `integer` alike; integers are not enforced.
    Number,
    Boolean,
    Array(ItemKind),
    /// Open key-value map; contents are not validated.
    Map,
    Any,
}

impl FieldKind {
    fn from_node(node: &SchemaNode) -> Self {
        match node.kind.as_deref() {
            Some("string") => match &node.enum_values {
                Some(values) if !values.is_empty() => FieldKind::Enum(values.clone()),
                _ => FieldKind::String,
            },
            Some("number") | Some("integer") => FieldKind::Number,
            Some("boolean") => FieldKind::Boolean,
            Some("array") => {
                let item = match node.items.as_ref().and_then(|i| i.kind.as_deref()) {
                    Some("string") => ItemKind::String,
                    Some("number") | Some("integer") => ItemKind::Number,
                    _ => ItemKind::Any,
                };
                FieldKind::Array(item)
            }
            Some("object") => FieldKind::Map,
            _ => FieldKind::Any,
        }
    }

    fn check(&self, value: &Value) -> Result<(), IssueKind> {
        let ok = match self {
            FieldKind::String => value.is_string(),
            FieldKind::Enum(allowed) => {
                return match value.as_str() {
                    Some(s) if allowed.iter().any(|a| a == s) => Ok(()),
                    _ => Err(IssueKind::NotInEnum(allowed.clone())),
                }
            }
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array(item) => {
                let Some(elements) = value.as_array() else {
                    return Err(IssueKind::Expected("array"));
                };
                let item_ok = |v: &Value| match item {
                    ItemKind::String => v.is_string(),
                    ItemKind::Number => v.is_number(),
                    ItemKind::Any => true,
                };
                if let Some(pos) = elements.iter().position(|v| !item_ok(v)) {
                    let expected = match item {
                        ItemKind::String => "string",
                        _ => "number",
                    };
                    return Err(IssueKind::BadItem {
                        index: pos,
                        expected,
                    });
                }
                true
            }
            FieldKind::Map => value.is_object(),
            FieldKind::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(IssueKind::Expected(self.type_name()))
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Enum(_) => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array(_) => "array",
            FieldKind::Map => "object",
            FieldKind::Any => "any",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldKind::String => serde_json::json!({ "type": "string" }),
            FieldKind::Enum(values) => serde_json::json!({ "type": "string", "enum": values }),
            FieldKind::Number => serde_json::json!({ "type": "number" }),
            FieldKind::Boolean => serde_json::json!({ "type": "boolean" }),
            FieldKind::Array(ItemKind::String) => {
                serde_json::json!({ "type": "array", "items": { "type": "string" } })
            }
            FieldKind::Array(ItemKind::Number) => {
                serde_json::json!({ "type": "array", "items": { "type": "number" } })
            }
            FieldKind::Array(ItemKind::Any) => serde_json::json!({ "type": "array", "items": {} }),
            FieldKind::Map => serde_json::json!({ "type": "object", "additionalProperties": {} }),
            FieldKind::Any => serde_json::json!({}),
        }
    }
}

/// One declared property: its validator, optionality and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub optional: bool,
    pub description: Option<String>,
}

impl FieldSchema {
    /// Validates a single value. `None` means the key was absent from the arguments.
    pub fn validate(&self, field: &str, value: Option<&Value>) -> Result<(), SchemaIssue> {
        match value {
            None if self.optional => Ok(()),
            None => Err(SchemaIssue {
                field: field.to_string(),
                kind: IssueKind::Missing,
            }),
            Some(v) => self.kind.check(v).map_err(|kind| SchemaIssue {
                field: field.to_string(),
                kind,
            }),
        }
    }
}

/// Per-field declarations, keyed by property name.
pub type FieldShape = BTreeMap<String, FieldSchema>;

/// Converts a tool input schema into a per-field shape.
///
/// Returns an empty shape when the schema is absent or its `type` is not `object`.
/// A property is optional unless listed in `required`; `required` entries naming
/// undeclared properties are ignored.
pub fn json_schema_to_shape(schema: Option<&Value>) -> FieldShape {
    let Some(node) = schema.map(SchemaNode::from_value) else {
        return FieldShape::new();
    };
    if node.kind.as_deref() != Some("object") {
        return FieldShape::new();
    }
    node.properties
        .iter()
        .map(|(key, prop)| {
            let field = FieldSchema {
                kind: FieldKind::from_node(prop),
                optional: !node.required.contains(key),
                description: prop.description.clone(),
            };
            (key.clone(), field)
        })
        .collect()
}

/// Converts a tool input schema into a whole-object validator that keeps unknown keys.
pub fn json_schema_to_object(schema: Option<&Value>) -> ObjectSchema {
    ObjectSchema {
        fields: json_schema_to_shape(schema),
    }
}

/// Whole-argument validator built from a [`FieldShape`].
///
/// Declared fields are type-checked; keys not declared are passed through
/// unchanged, so the remote catalog can grow without breaking callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSchema {
    fields: FieldShape,
}

impl ObjectSchema {
    pub fn new(fields: FieldShape) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &FieldShape {
        &self.fields
    }

    /// Validates `value` and returns the parsed argument object, extra keys included.
    pub fn parse(&self, value: &Value) -> Result<Map<String, Value>, SchemaError> {
        let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;
        self.parse_map(obj.clone())
    }

    /// Like [`parse`](Self::parse) for an already-decoded object.
    pub fn parse_map(&self, args: Map<String, Value>) -> Result<Map<String, Value>, SchemaError> {
        let issues: Vec<SchemaIssue> = self
            .fields
            .iter()
            .filter_map(|(key, field)| field.validate(key, args.get(key)).err())
            .collect();
        if issues.is_empty() {
            Ok(args)
        } else {
            Err(SchemaError::Invalid(issues))
        }
    }

    /// Renders the schema back to JSON Schema (for frameworks that want one).
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (key, field) in &self.fields {
            let mut prop = field.kind.to_json_schema();
            if let (Some(desc), Some(obj)) = (&field.description, prop.as_object_mut()) {
                obj.insert("description".into(), Value::String(desc.clone()));
            }
            properties.insert(key.clone(), prop);
            if !field.optional {
                required.push(Value::String(key.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": true,
        })
    }
}

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    Missing,
    Expected(&'static str),
    NotInEnum(Vec<String>),
    BadItem {
        index: usize,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub field: String,
    pub kind: IssueKind,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Missing => write!(f, "{}: required", self.field),
            IssueKind::Expected(t) => write!(f, "{}: expected {}", self.field, t),
            IssueKind::NotInEnum(allowed) => {
                write!(f, "{}: expected one of [{}]", self.field, allowed.join(", "))
            }
            IssueKind::BadItem { index, expected } => {
                write!(f, "{}[{}]: expected {}", self.field, index, expected)
            }
        }
    }
}

/// Argument validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("arguments must be a JSON object")]
    NotAnObject,
    #[error("malformed arguments: {0}")]
    Malformed(String),
    #[error("{}", join_issues(.0))]
    Invalid(Vec<SchemaIssue>),
}

impl SchemaError {
    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            SchemaError::Invalid(issues) => issues,
            _ => &[],
        }
    }
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
