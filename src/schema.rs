//! Tool input schemas and their runtime validators.
//!
//! A [`SchemaNode`] is the small JSON-schema subset tool descriptors are written
//! in: `string` (optionally an enum), `boolean`, `number`/`integer`, `object`
//! and `array`, each with an optional default. [`compile`] turns a schema into a
//! [`Validator`] which checks a JSON value and fills in defaults.
//!
//! Only object schemas are checked. Any other top-level schema compiles to a
//! validator that accepts every input unchanged. Properties not declared by an
//! object schema are passed through untouched.

use std::fmt;

use serde_json::{Map, Value, json};

/// One node of a tool input schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub default: Option<Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Any,
    String { allowed: Option<Vec<String>> },
    Boolean,
    Number { integer: bool },
    Object(ObjectSchema),
    Array { items: Option<Box<SchemaNode>> },
}

/// Properties of an object schema, in declaration order.
///
/// Requiredness is stored on each property, so the required set can only ever
/// name declared properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub schema: SchemaNode,
    pub required: bool,
}

impl ObjectSchema {
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Names of required properties, in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }
}

impl SchemaNode {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            default: None,
            description: None,
        }
    }

    pub fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String { allowed: None })
    }

    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(SchemaKind::String {
            allowed: Some(values.into_iter().map(Into::into).collect()),
        })
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number { integer: false })
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Number { integer: true })
    }

    pub fn object() -> Self {
        Self::of(SchemaKind::Object(ObjectSchema::default()))
    }

    pub fn array(items: SchemaNode) -> Self {
        Self::of(SchemaKind::Array {
            items: Some(Box::new(items)),
        })
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Add an optional property. No-op on non-object schemas.
    pub fn property(self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.push_property(name.into(), schema, false)
    }

    /// Add a required property. No-op on non-object schemas.
    pub fn required_property(self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.push_property(name.into(), schema, true)
    }

    fn push_property(mut self, name: String, schema: SchemaNode, required: bool) -> Self {
        if let SchemaKind::Object(obj) = &mut self.kind {
            obj.properties.retain(|p| p.name != name);
            obj.properties.push(Property {
                name,
                schema,
                required,
            });
        }
        self
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Build a schema from a JSON-schema literal.
    ///
    /// Unrecognized or missing `type` values become [`SchemaKind::Any`];
    /// `required` entries that name no declared property are dropped.
    pub fn from_json(value: &Value) -> Self {
        let mut node = match value.get("type").and_then(Value::as_str) {
            Some("string") => match value.get("enum").and_then(Value::as_array) {
                Some(values) => SchemaNode::string_enum(
                    values.iter().filter_map(Value::as_str).map(str::to_string),
                ),
                None => SchemaNode::string(),
            },
            Some("boolean") => SchemaNode::boolean(),
            Some("number") => SchemaNode::number(),
            Some("integer") => SchemaNode::integer(),
            Some("array") => Self::of(SchemaKind::Array {
                items: value
                    .get("items")
                    .map(|items| Box::new(SchemaNode::from_json(items))),
            }),
            Some("object") => {
                let required: Vec<&str> = value
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| names.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                let mut node = SchemaNode::object();
                if let Some(props) = value.get("properties").and_then(Value::as_object) {
                    for (name, prop) in props {
                        let schema = SchemaNode::from_json(prop);
                        node = if required.contains(&name.as_str()) {
                            node.required_property(name.clone(), schema)
                        } else {
                            node.property(name.clone(), schema)
                        };
                    }
                }
                node
            }
            _ => SchemaNode::any(),
        };
        node.default = value.get("default").cloned();
        node.description = value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        node
    }

    /// Render back to a JSON-schema object, as advertised in `tools/list`.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        match &self.kind {
            SchemaKind::Any => {}
            SchemaKind::String { allowed } => {
                out.insert("type".into(), json!("string"));
                if let Some(values) = allowed {
                    out.insert("enum".into(), json!(values));
                }
            }
            SchemaKind::Boolean => {
                out.insert("type".into(), json!("boolean"));
            }
            SchemaKind::Number { integer } => {
                let name = if *integer { "integer" } else { "number" };
                out.insert("type".into(), json!(name));
            }
            SchemaKind::Object(obj) => {
                out.insert("type".into(), json!("object"));
                let props: Map<String, Value> = obj
                    .properties
                    .iter()
                    .map(|p| (p.name.clone(), p.schema.to_json()))
                    .collect();
                out.insert("properties".into(), Value::Object(props));
                let required: Vec<&str> = obj.required().collect();
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
            }
            SchemaKind::Array { items } => {
                out.insert("type".into(), json!("array"));
                if let Some(items) = items {
                    out.insert("items".into(), items.to_json());
                }
            }
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }
        if let Some(default) = &self.default {
            out.insert("default".into(), default.clone());
        }
        Value::Object(out)
    }
}

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    /// Dotted path to the offending value, `""` for the input itself.
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Non-empty list of violations returned by a failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether any error is about `field` or something nested under it.
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|e| {
            e.path
                .strip_prefix(field)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '[']))
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// `Ok` carries the input with defaults applied.
pub type ValidationResult = Result<Value, ValidationErrors>;

/// Compiled form of a [`SchemaNode`].
#[derive(Debug, Clone)]
pub struct Validator {
    root: Check,
}

#[derive(Debug, Clone)]
enum Check {
    Any,
    String(Option<Vec<String>>),
    Boolean,
    Number,
    Object(Vec<FieldRule>),
    Array(Box<Check>),
}

#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    check: Check,
    required: bool,
    default: Option<Value>,
}

/// Compile a schema into a validator.
pub fn compile(schema: &SchemaNode) -> Validator {
    let root = match &schema.kind {
        SchemaKind::Object(obj) => compile_object(obj),
        _ => Check::Any,
    };
    Validator { root }
}

fn compile_object(obj: &ObjectSchema) -> Check {
    Check::Object(
        obj.properties
            .iter()
            .map(|p| FieldRule {
                name: p.name.clone(),
                check: compile_node(&p.schema),
                required: p.required,
                default: p.schema.default.clone(),
            })
            .collect(),
    )
}

fn compile_node(node: &SchemaNode) -> Check {
    match &node.kind {
        SchemaKind::Any => Check::Any,
        SchemaKind::String { allowed } => Check::String(allowed.clone()),
        SchemaKind::Boolean => Check::Boolean,
        SchemaKind::Number { .. } => Check::Number,
        SchemaKind::Object(obj) => compile_object(obj),
        SchemaKind::Array { items } => Check::Array(Box::new(
            items.as_deref().map(compile_node).unwrap_or(Check::Any),
        )),
    }
}

impl Validator {
    /// A validator that accepts everything.
    pub fn permissive() -> Self {
        Self { root: Check::Any }
    }

    pub fn validate(&self, input: &Value) -> ValidationResult {
        let mut errors = Vec::new();
        let value = self.root.apply(input, "", &mut errors);
        if errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
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

impl Check {
    fn apply(&self, value: &Value, path: &str, errors: &mut Vec<FieldError>) -> Value {
        let mismatch = |expected: &str, errors: &mut Vec<FieldError>| {
            errors.push(FieldError {
                path: path.to_string(),
                message: format!("expected {expected}, received {}", type_name(value)),
            });
        };

        match self {
            Check::Any => value.clone(),
            Check::String(allowed) => {
                match (value.as_str(), allowed) {
                    (None, _) => mismatch("string", errors),
                    (Some(s), Some(allowed)) if !allowed.iter().any(|a| a == s) => {
                        errors.push(FieldError {
                            path: path.to_string(),
                            message: format!(
                                "invalid value '{s}', expected one of: {}",
                                allowed.join(", ")
                            ),
                        });
                    }
                    _ => {}
                }
                value.clone()
            }
            Check::Boolean => {
                if !value.is_boolean() {
                    mismatch("boolean", errors);
                }
                value.clone()
            }
            Check::Number => {
                if !value.is_number() {
                    mismatch("number", errors);
                }
                value.clone()
            }
            Check::Array(items) => match value.as_array() {
                Some(elements) => Value::Array(
                    elements
                        .iter()
                        .enumerate()
                        .map(|(i, element)| {
                            items.apply(element, &format!("{path}[{i}]"), errors)
                        })
                        .collect(),
                ),
                None => {
                    mismatch("array", errors);
                    value.clone()
                }
            },
            Check::Object(rules) => {
                let Some(input) = value.as_object() else {
                    mismatch("object", errors);
                    return value.clone();
                };
                let mut out = input.clone();
                for rule in rules {
                    let field_path = join_path(path, &rule.name);
                    match (input.get(&rule.name), &rule.default) {
                        (Some(present), _) => {
                            let checked = rule.check.apply(present, &field_path, errors);
                            out.insert(rule.name.clone(), checked);
                        }
                        (None, Some(default)) => {
                            let checked = rule.check.apply(default, &field_path, errors);
                            out.insert(rule.name.clone(), checked);
                        }
                        (None, None) if rule.required => errors.push(FieldError {
                            path: field_path,
                            message: "required".to_string(),
                        }),
                        (None, None) => {}
                    }
                }
                Value::Object(out)
            }
        }
    }
}
