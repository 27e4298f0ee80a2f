//! Functions introspected from documented methods.

use crate::{Error, Result};
use serde_json::{Map, Value};

/// A method signature, usually generated by `#[functions]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub description: String,
    pub args: Vec<Arg>,
}

/// One argument of a [`Signature`].
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    /// The Rust type as written, e.g. `Option<String>`.
    pub ty: String,
    pub description: Option<String>,
}

impl Signature {
    /// Build from a doc comment and the argument list.
    ///
    /// The description is the first paragraph of `doc`. Argument
    /// descriptions come from an `# Arguments` section written as
    /// rustdoc conventionally does:
    ///
    /// ```text
    /// Get the current weather.
    ///
    /// # Arguments
    ///
    /// * `location` - The city name
    /// ```
    pub fn from_doc(name: &str, doc: &str, args: &[(&str, &str)]) -> Self {
        let mut summary = Vec::new();
        let mut lines = doc.lines().map(str::trim);
        for line in lines.by_ref() {
            if line.is_empty() && !summary.is_empty() {
                break;
            }
            if line.starts_with('#') {
                break;
            }
            if !line.is_empty() {
                summary.push(line);
            }
        }

        let described = arguments_section(doc);
        Self {
            name: name.to_owned(),
            description: summary.join(" "),
            args: args
                .iter()
                .map(|(arg, ty)| Arg {
                    name: (*arg).to_owned(),
                    ty: (*ty).to_owned(),
                    description: described
                        .iter()
                        .find(|(name, _)| name == arg)
                        .map(|(_, desc)| desc.clone()),
                })
                .collect(),
        }
    }

    /// The parameter schema in raw wire form.
    pub fn to_schema(&self) -> Result<Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for arg in &self.args {
            let (mut schema, optional) = rust_type(&arg.ty).ok_or_else(|| {
                Error::InvalidFunction(format!(
                    "unsupported type '{}' for argument '{}' of {}",
                    arg.ty, arg.name, self.name
                ))
            })?;
            if let Some(desc) = &arg.description
                && let Some(map) = schema.as_object_mut()
            {
                map.insert("description".into(), desc.as_str().into());
            }
            if !optional {
                required.push(Value::from(arg.name.as_str()));
            }
            properties.insert(arg.name.clone(), schema);
        }

        let mut schema = Map::new();
        schema.insert("type".into(), "object".into());
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), Value::Array(required));
        Ok(Value::Object(schema))
    }
}

/// `(name, description)` pairs from the `# Arguments` section.
fn arguments_section(doc: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let mut inside = false;
    for line in doc.lines().map(str::trim) {
        if let Some(heading) = line.strip_prefix('#') {
            inside = heading.trim_start_matches('#').trim().eq_ignore_ascii_case("arguments");
            continue;
        }
        if !inside || line.is_empty() {
            continue;
        }
        let Some(item) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) else {
            if let Some((_, desc)) = out.last_mut() {
                desc.push(' ');
                desc.push_str(line);
            }
            continue;
        };
        let item = item.trim();
        let (name, rest) = match item.strip_prefix('`') {
            Some(quoted) => quoted.split_once('`').unwrap_or((quoted, "")),
            None => item
                .split_once(|c: char| c == ':' || c.is_whitespace())
                .unwrap_or((item, "")),
        };
        let desc = rest
            .trim_start()
            .trim_start_matches(['-', ':'])
            .trim();
        out.push((name.trim().to_owned(), desc.to_owned()));
    }
    out
}

/// Map a Rust type to a JSON schema and whether it is optional.
fn rust_type(ty: &str) -> Option<(Value, bool)> {
    let ty = dereference(ty);
    if let Some(inner) = generic(ty, "Option") {
        let (schema, _) = rust_type(inner)?;
        return Some((schema, true));
    }
    let items = generic(ty, "Vec").or_else(|| ty.strip_prefix('[')?.strip_suffix(']'));
    if let Some(inner) = items {
        let (items, _) = rust_type(inner)?;
        let mut schema = Map::new();
        schema.insert("type".into(), "array".into());
        schema.insert("items".into(), items);
        return Some((Value::Object(schema), false));
    }

    let name = ty.rsplit("::").next().unwrap_or(ty).trim();
    let json = match name {
        "String" | "str" | "char" => "string",
        "bool" => "boolean",
        "f32" | "f64" => "number",
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => "integer",
        _ => return None,
    };
    let mut schema = Map::new();
    schema.insert("type".into(), json.into());
    Some((Value::Object(schema), false))
}

/// `&T` and `&mut T` are described as `T`.
fn dereference(ty: &str) -> &str {
    let ty = ty.trim();
    let Some(referent) = ty.strip_prefix('&') else {
        return ty;
    };
    let referent = referent.trim_start();
    match referent.strip_prefix("mut") {
        Some(rest) if rest.starts_with(|c: char| c.is_whitespace() || c == '[') => {
            dereference(rest)
        }
        _ => dereference(referent),
    }
}

fn generic<'a>(ty: &'a str, name: &str) -> Option<&'a str> {
    let path_end = ty.find('<')?;
    let path = &ty[..path_end];
    if path.rsplit("::").next().map(str::trim) != Some(name) {
        return None;
    }
    ty[path_end + 1..].trim_end().strip_suffix('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_types() {
        assert_eq!(rust_type("u32").map(|(v, o)| (v["type"].clone(), o)), Some(("integer".into(), false)));
        assert_eq!(rust_type("Option<&str>").map(|(_, o)| o), Some(true));
        let (array, _) = rust_type("Vec<f64>").unwrap();
        assert_eq!(array["items"]["type"], "number");
        let (slice, _) = rust_type("&[String]").unwrap();
        assert_eq!(slice["items"]["type"], "string");
        assert!(rust_type("HashMap<String,u32>").is_none());
    }

    #[test]
    fn mutable_references() {
        let (slice, _) = rust_type("&mut [u8]").unwrap();
        assert_eq!(slice["items"]["type"], "integer");
        let (list, _) = rust_type("& mut std :: vec :: Vec < String >").unwrap();
        assert_eq!(list["items"]["type"], "string");
        assert!(rust_type("mutbool").is_none());
        assert!(rust_type("&mutbool").is_none());
    }

    #[test]
    fn arguments_section_items() {
        let doc = "Summary.\n\n# Arguments\n\n* `a` - First\n  continued\n- b: Second\n\n# Returns\n\n* `x` - ignored";
        let args = arguments_section(doc);
        assert_eq!(
            args,
            vec![
                ("a".to_owned(), "First continued".to_owned()),
                ("b".to_owned(), "Second".to_owned()),
            ]
        );
    }
}
