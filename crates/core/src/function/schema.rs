//! Schema canonicalization.

use crate::{Error, Result};
use schemars::JsonSchema;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A function described by a Rust type.
///
/// The type's doc comment becomes the function description and field doc
/// comments become parameter descriptions. `Option` fields are optional.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSchema {
    pub name: String,
    pub schema: Value,
    description: Option<String>,
}

impl FunctionSchema {
    pub fn of<T: JsonSchema>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default(),
            description: None,
        }
    }

    /// Override the description taken from the type's doc comment.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or_else(|| self.schema.get("description").and_then(Value::as_str))
    }
}

/// Reduce a JSON schema to `{type: "object", properties, required}`.
///
/// Properties keep only `type`, `description`, `items`, `enum`, and for
/// nested objects `properties`/`required`. `$ref`s into `$defs` are
/// inlined, nullable unions collapse to their non-null member and mark the
/// property optional.
pub(crate) fn canonical(schema: &Value) -> Result<Value> {
    if !schema.is_object() {
        return Err(Error::InvalidFunction("parameters must be a JSON object".into()));
    }
    let root = schema;
    let resolved = resolve(schema, root, 0)?;
    match resolved.get("type") {
        None => {}
        Some(ty) if first_type(ty) == Some("object") => {}
        Some(other) => {
            return Err(Error::InvalidFunction(format!(
                "parameters must have type 'object', got {other}"
            )));
        }
    }
    object(resolved, root, 0)
}

const MAX_DEPTH: usize = 32;

fn object(schema: &Value, root: &Value, depth: usize) -> Result<Value> {
    let mut properties = BTreeMap::new();
    let mut nullable = BTreeSet::new();
    if let Some(props) = schema.get("properties") {
        let props = props.as_object().ok_or_else(|| {
            Error::InvalidFunction("'properties' must be a JSON object".into())
        })?;
        for (name, prop) in props {
            let (canonical, is_nullable) = property(prop, root, depth + 1)?;
            if is_nullable {
                nullable.insert(name.as_str());
            }
            properties.insert(name.as_str(), canonical);
        }
    }

    let mut required = BTreeSet::new();
    if let Some(names) = schema.get("required") {
        let names = names.as_array().ok_or_else(|| {
            Error::InvalidFunction("'required' must be an array".into())
        })?;
        for name in names {
            let name = name.as_str().ok_or_else(|| {
                Error::InvalidFunction("'required' entries must be strings".into())
            })?;
            if !properties.contains_key(name) {
                return Err(Error::InvalidFunction(format!(
                    "required parameter '{name}' is not declared"
                )));
            }
            if !nullable.contains(name) {
                required.insert(name);
            }
        }
    }

    let mut out = Map::new();
    out.insert("type".into(), "object".into());
    out.insert(
        "properties".into(),
        Value::Object(
            properties
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        ),
    );
    out.insert(
        "required".into(),
        required.into_iter().map(Value::from).collect(),
    );
    Ok(Value::Object(out))
}

/// Canonicalize one property, returning it with its nullability.
fn property(schema: &Value, root: &Value, depth: usize) -> Result<(Value, bool)> {
    if depth > MAX_DEPTH {
        return Err(Error::InvalidFunction("schema nests too deeply".into()));
    }
    let outer = schema;
    let schema = resolve(schema, root, depth)?;
    let mut nullable = false;

    // `anyOf: [X, {type: null}]`, as generated for `Option<Struct>`.
    if let Some(variants) = schema.get("anyOf").and_then(Value::as_array) {
        let mut members = variants.iter().filter(|v| !is_null(v));
        nullable = variants.iter().any(is_null);
        if let Some(member) = members.next() {
            let (mut inner, inner_nullable) = property(member, root, depth + 1)?;
            merge_description(&mut inner, schema);
            merge_description(&mut inner, outer);
            return Ok((inner, nullable || inner_nullable));
        }
    }

    let mut out = Map::new();
    let mut ty = schema.get("type").and_then(|t| {
        if let Some(types) = t.as_array() {
            nullable = types.iter().any(|t| t == "null");
        }
        first_type(t)
    });

    // Unit enums with documented variants: `oneOf: [{const: ..}, ..]`.
    let mut values = schema.get("enum").and_then(Value::as_array).cloned();
    if values.is_none()
        && let Some(variants) = schema.get("oneOf").and_then(Value::as_array)
    {
        let consts: Option<Vec<Value>> = variants
            .iter()
            .map(|v| resolve(v, root, depth).ok().and_then(|v| v.get("const").cloned()))
            .collect();
        if let Some(consts) = consts {
            ty = ty.or_else(|| variants.first().and_then(|v| v.get("type")).and_then(first_type));
            values = Some(consts);
        }
    }
    if let Some(vals) = &mut values {
        nullable |= vals.iter().any(Value::is_null);
        vals.retain(|v| !v.is_null());
        if ty.is_none() {
            ty = vals.first().map(json_type);
        }
    }

    let ty = ty.ok_or_else(|| {
        Error::InvalidFunction(format!("property without a type: {schema}"))
    })?;
    out.insert("type".into(), ty.into());
    if let Some(vals) = values {
        out.insert("enum".into(), Value::Array(vals));
    }
    match ty {
        "array" => {
            if let Some(items) = schema.get("items") {
                let (items, _) = property(items, root, depth + 1)?;
                out.insert("items".into(), items);
            }
        }
        "object" if schema.get("properties").is_some() => {
            if let Value::Object(nested) = object(schema, root, depth + 1)? {
                out.extend(nested.into_iter().filter(|(k, _)| k != "type"));
            }
        }
        _ => {}
    }
    let mut out = Value::Object(out);
    merge_description(&mut out, schema);
    merge_description(&mut out, outer);
    Ok((out, nullable))
}

fn resolve<'a>(schema: &'a Value, root: &'a Value, depth: usize) -> Result<&'a Value> {
    let mut current = schema;
    for _ in depth..MAX_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return Ok(current);
        };
        let target = reference
            .strip_prefix("#/$defs/")
            .and_then(|name| root.get("$defs")?.get(name))
            .or_else(|| {
                reference
                    .strip_prefix("#/definitions/")
                    .and_then(|name| root.get("definitions")?.get(name))
            });
        current = target.ok_or_else(|| {
            Error::InvalidFunction(format!("unresolved schema reference '{reference}'"))
        })?;
    }
    Err(Error::InvalidFunction("schema references nest too deeply".into()))
}

fn merge_description(inner: &mut Value, outer: &Value) {
    if let (Some(map), Some(desc)) = (
        inner.as_object_mut(),
        outer.get("description").and_then(Value::as_str),
    ) && !desc.trim().is_empty()
    {
        map.insert("description".into(), desc.trim().into());
    }
}

fn first_type(ty: &Value) -> Option<&str> {
    match ty {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    }
}

fn is_null(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("null")
        || schema.get("const").is_some_and(Value::is_null)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        _ => "string",
    }
}
