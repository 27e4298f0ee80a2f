//! Function descriptors.
//!
//! A function can be described three ways: a Rust type deriving
//! [`schemars::JsonSchema`] ([`FunctionSchema`]), raw wire JSON, or a
//! [`Signature`] generated by the `#[functions]` attribute. All three go
//! through [`FunctionDescriptor::normalize`], which yields the canonical
//! [`FunctionSpec`] adapters put on the wire.

use crate::{Error, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub use schema::FunctionSchema;
pub use signature::{Arg, Signature};

mod schema;
mod signature;

/// A function the model may call, in any accepted shape.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionDescriptor {
    /// Derived from a Rust type.
    Schema(FunctionSchema),
    /// Raw JSON, either `{name, description, parameters}` or the
    /// `{type: "function", function: {...}}` tool wrapper.
    Raw(Value),
    /// Introspected from a documented method.
    Signature(Signature),
}

impl FunctionDescriptor {
    /// Normalize into the canonical wire shape.
    pub fn normalize(&self) -> Result<FunctionSpec> {
        match self {
            Self::Schema(schema) => FunctionSpec::canonical(
                &schema.name,
                schema.description().unwrap_or_default(),
                &schema.schema,
            ),
            Self::Raw(value) => {
                let value = match value.get("type").and_then(Value::as_str) {
                    Some("function") => value.get("function").ok_or_else(|| {
                        Error::InvalidFunction("tool wrapper without a 'function' field".into())
                    })?,
                    _ => value,
                };
                let name = value.get("name").and_then(Value::as_str).ok_or_else(|| {
                    Error::InvalidFunction("function descriptor without a 'name'".into())
                })?;
                let description = value
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let empty = Value::Object(Map::new());
                let parameters = value.get("parameters").unwrap_or(&empty);
                FunctionSpec::canonical(name, description, parameters)
            }
            Self::Signature(signature) => FunctionSpec::canonical(
                &signature.name,
                &signature.description,
                &signature.to_schema()?,
            ),
        }
    }
}

impl From<FunctionSchema> for FunctionDescriptor {
    fn from(schema: FunctionSchema) -> Self {
        Self::Schema(schema)
    }
}

impl From<Value> for FunctionDescriptor {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

impl From<Signature> for FunctionDescriptor {
    fn from(signature: Signature) -> Self {
        Self::Signature(signature)
    }
}

/// The canonical function payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: CompactString,
    pub description: String,
    /// `{type: "object", properties, required}` with sorted keys.
    pub parameters: Value,
}

impl FunctionSpec {
    fn canonical(name: &str, description: &str, parameters: &Value) -> Result<Self> {
        let name = name.trim();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::InvalidFunction(format!(
                "invalid function name '{name}'"
            )));
        }
        Ok(Self {
            name: name.into(),
            description: description.trim().to_owned(),
            parameters: schema::canonical(parameters)?,
        })
    }

    /// The canonical wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::InvalidFunction(format!("failed to encode '{}': {e}", self.name)))
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: CompactString,
    pub arguments: Value,
}

impl FunctionCall {
    /// Build from a name and an arguments value that may be a JSON object
    /// or a JSON-encoded string, as OpenAI-style providers send it.
    pub fn parse(name: impl Into<CompactString>, arguments: &Value) -> Result<Self> {
        let arguments = match arguments {
            Value::String(raw) if raw.trim().is_empty() => Value::Object(Map::new()),
            Value::String(raw) => serde_json::from_str(raw).map_err(|e| {
                Error::InvalidFunction(format!("malformed call arguments: {e}"))
            })?,
            other => other.clone(),
        };
        Ok(Self {
            name: name.into(),
            arguments,
        })
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
