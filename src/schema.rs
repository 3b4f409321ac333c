//! JSON schema validation for artefact payloads
//!
//! Implements the subset of JSON Schema the artefact types rely on:
//! `type` (single or list), `properties`, `required`, `items`, `enum` and
//! `additionalProperties` (boolean or schema). Annotation keywords such as
//! `description` are ignored, as are keywords outside the subset.

use serde_json::{Map, Value};

use crate::{Error, Result};

/// A schema violation, located by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value (`/` for the root)
    pub path: String,
    /// What the schema expected
    pub reason: String,
}

impl SchemaViolation {
    /// Convert into the crate error for a given artefact type.
    #[must_use]
    pub fn into_error(self, type_name: &str) -> Error {
        Error::SchemaValidation {
            type_name: type_name.to_string(),
            path: self.path,
            reason: self.reason,
        }
    }
}

/// A validated JSON schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema {
    definition: Value,
}

impl JsonSchema {
    /// Wrap a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the document is not an object or a
    /// boolean, or if a `type` keyword names an unknown type.
    pub fn new(definition: Value) -> Result<Self> {
        check_definition(&definition, "")?;
        Ok(Self { definition })
    }

    /// The raw schema document.
    #[must_use]
    pub const fn definition(&self) -> &Value {
        &self.definition
    }

    /// Validate `instance`, returning the first violation found.
    ///
    /// # Errors
    ///
    /// Returns the [`SchemaViolation`] locating the offending value.
    pub fn validate(&self, instance: &Value) -> std::result::Result<(), SchemaViolation> {
        let mut path = Vec::new();
        validate_node(&self.definition, instance, &mut path)
    }
}

const KNOWN_TYPES: [&str; 7] = [
    "object", "array", "string", "number", "integer", "boolean", "null",
];

fn check_definition(definition: &Value, at: &str) -> Result<()> {
    let schema = match definition {
        Value::Bool(_) => return Ok(()),
        Value::Object(schema) => schema,
        other => {
            return Err(Error::Validation(format!(
                "schema at '{at}' must be an object or a boolean, got {other}"
            )))
        }
    };
    for type_name in declared_types(schema) {
        if !KNOWN_TYPES.contains(&type_name) {
            return Err(Error::Validation(format!(
                "schema at '{at}' declares unknown type <{type_name}>"
            )));
        }
    }
    if let Some(Value::Object(properties)) = schema.get("properties") {
        for (name, sub) in properties {
            check_definition(sub, &format!("{at}/properties/{name}"))?;
        }
    }
    if let Some(items) = schema.get("items") {
        check_definition(items, &format!("{at}/items"))?;
    }
    Ok(())
}

fn declared_types(schema: &Map<String, Value>) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(single)) => vec![single.as_str()],
        Some(Value::Array(many)) => many.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn pointer(path: &[String]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().fold(String::new(), |mut acc, segment| {
        acc.push('/');
        acc.push_str(&segment.replace('~', "~0").replace('/', "~1"));
        acc
    })
}

fn violation(path: &[String], reason: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        path: pointer(path),
        reason: reason.into(),
    }
}

fn matches_type(type_name: &str, instance: &Value) -> bool {
    match type_name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => {
            instance.is_i64()
                || instance.is_u64()
                || instance.as_f64().is_some_and(|v| v.fract() == 0.0)
        }
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        _ => false,
    }
}

fn validate_node(
    definition: &Value,
    instance: &Value,
    path: &mut Vec<String>,
) -> std::result::Result<(), SchemaViolation> {
    let schema = match definition {
        Value::Bool(true) => return Ok(()),
        Value::Bool(false) => return Err(violation(path, "no value is allowed here")),
        Value::Object(schema) => schema,
        _ => return Ok(()),
    };

    let types = declared_types(schema);
    if !types.is_empty() && !types.iter().any(|t| matches_type(t, instance)) {
        return Err(violation(
            path,
            format!("expected {}, got {instance}", types.join(" or ")),
        ));
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(instance) {
            return Err(violation(path, format!("{instance} is not one of {allowed:?}")));
        }
    }

    if let Value::Object(fields) = instance {
        if let Some(Value::Array(required)) = schema.get("required") {
            if let Some(missing) = required
                .iter()
                .filter_map(Value::as_str)
                .find(|name| !fields.contains_key(*name))
            {
                return Err(violation(path, format!("missing required property <{missing}>")));
            }
        }
        let properties = schema.get("properties").and_then(Value::as_object);
        for (name, value) in fields {
            let sub = properties
                .and_then(|props| props.get(name))
                .or_else(|| schema.get("additionalProperties"));
            if let Some(sub) = sub {
                path.push(name.clone());
                validate_node(sub, value, path)?;
                path.pop();
            }
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (instance, schema.get("items")) {
        for (idx, item) in items.iter().enumerate() {
            path.push(idx.to_string());
            validate_node(item_schema, item, path)?;
            path.pop();
        }
    }

    Ok(())
}
