//! Checks raw input against a type and normalizes it.
//!
//! Problems with the input itself are reported as messages in
//! [`Validated::errors`]; `Err` is reserved for metadata that cannot be
//! walked at all.

use indexmap::IndexMap;
use itertools::Itertools;
use num_traits::Signed;

use crate::abi::{TypeDef, TypeDefInfo, TypeRegistry, MAX_DEPTH};
use crate::error::FormError;
use crate::value::{parse_integer, Value};

/// Outcome of validating one input: a normalized value, or the reasons
/// there is none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Validated {
    pub value: Option<Value>,
    pub errors: Vec<String>,
}

impl Validated {
    pub fn ok(value: Value) -> Self {
        Validated {
            value: Some(value),
            errors: Vec::new(),
        }
    }

    pub fn error(message: String) -> Self {
        Validated {
            value: None,
            errors: vec![message],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn finish(value: Value, errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Validated::ok(value)
        } else {
            Validated {
                value: None,
                errors: errors.into_iter().unique().collect(),
            }
        }
    }
}

pub(crate) mod message {
    use crate::value::Value;

    pub fn required() -> String {
        "This field is required".into()
    }

    pub fn expected(input: &Value, what: &str) -> String {
        format!("\"{}\" is invalid, expected {}", input.echo(), what)
    }

    pub fn not_a_number(input: &Value) -> String {
        format!("\"{}\" is not a valid number", input.echo())
    }

    pub fn unsigned_number_ete_zero(input: &Value) -> String {
        format!("\"{}\" must be a number >= 0", input.echo())
    }

    pub fn missing_keys(keys: &[&str]) -> String {
        format!("Missing keys: {}", keys.join(", "))
    }

    pub fn length_mismatch(expected: usize, got: usize) -> String {
        format!("Expected {expected} items, got {got}")
    }

    pub fn not_an_array(input: &Value) -> String {
        format!("\"{}\" is not an array", input.echo())
    }

    pub fn invalid_enum(input: &Value) -> String {
        format!("\"{}\" is not a valid enum value", input.echo())
    }

    pub fn variant_not_found(name: &str, variants: &[&str]) -> String {
        format!(
            "Variant \"{}\" not found, expected one of: {}",
            Value::from(name).echo(),
            variants.join(", ")
        )
    }

    pub fn variant_needs_param(name: &str) -> String {
        format!("Variant \"{name}\" must have a param")
    }

    pub fn variant_takes_no_param(name: &str) -> String {
        format!("Variant \"{name}\" must not have a param")
    }
}

/// Validate `input` against `ty`.
pub fn validate(
    ty: &TypeDef,
    input: &Value,
    registry: &dyn TypeRegistry,
) -> Result<Validated, FormError> {
    validate_at(ty, input, registry, 0)
}

fn validate_at(
    ty: &TypeDef,
    input: &Value,
    registry: &dyn TypeRegistry,
    depth: usize,
) -> Result<Validated, FormError> {
    if depth > MAX_DEPTH {
        return Err(FormError::TooDeep(ty.type_name.clone()));
    }

    match ty.info {
        TypeDefInfo::Plain => Ok(validate_plain(ty, input)),
        TypeDefInfo::Struct => validate_struct(ty, input, registry, depth),
        TypeDefInfo::Tuple => validate_tuple(ty, input, registry, depth),
        TypeDefInfo::Vec | TypeDefInfo::VecFixed => validate_vec(ty, input, registry, depth),
        TypeDefInfo::Enum => validate_enum(ty, input, registry, depth),
        TypeDefInfo::Option => {
            if input.is_truthy() {
                validate_at(ty.sub_single()?, input, registry, depth + 1)
            } else {
                Ok(Validated::ok(Value::Null))
            }
        }
        TypeDefInfo::Compact => validate_at(ty.sub_single()?, input, registry, depth + 1),
        TypeDefInfo::Si => {
            let resolved = ty.resolve(registry)?;
            validate_at(&resolved, input, registry, depth + 1)
        }
    }
}

/// `Some(true)` for unsigned integer types, `Some(false)` for signed ones.
fn numeric_kind(type_name: &str) -> Option<bool> {
    match type_name {
        "Balance" | "BlockNumber" | "Timestamp" => return Some(true),
        _ => {}
    }

    let (unsigned, bits) = if let Some(bits) = type_name.strip_prefix('u') {
        (true, bits)
    } else if let Some(bits) = type_name.strip_prefix('i') {
        (false, bits)
    } else {
        return None;
    };

    if !bits.is_empty() && bits.bytes().all(|b| b.is_ascii_digit()) {
        Some(unsigned)
    } else {
        None
    }
}

fn validate_plain(ty: &TypeDef, input: &Value) -> Validated {
    if let Some(unsigned) = numeric_kind(&ty.type_name) {
        return validate_number(input, unsigned);
    }

    match ty.type_name.as_str() {
        "bool" => validate_bool(input),
        "Bytes" => validate_bytes(input),
        "Null" => Validated::ok(Value::Null),
        _ => Validated::ok(Value::Str(plain_text(input))),
    }
}

fn plain_text(input: &Value) -> String {
    match input {
        Value::Null => String::new(),
        _ => input.to_string(),
    }
}

fn validate_number(input: &Value, unsigned: bool) -> Validated {
    let n = match input {
        Value::Int(n) => n.clone(),
        Value::Null => return Validated::error(message::required()),
        Value::Str(s) if s.is_empty() => return Validated::error(message::required()),
        Value::Str(s) => match parse_integer(s) {
            Some(n) => n,
            None => return Validated::error(message::not_a_number(input)),
        },
        _ => return Validated::error(message::expected(input, "a string or number")),
    };

    if unsigned && n.is_negative() {
        Validated::error(message::unsigned_number_ete_zero(input))
    } else {
        Validated::ok(Value::Int(n))
    }
}

/// `String(input)` as Javascript would render it; `null` counts as blank.
fn js_string(input: &Value) -> String {
    match input {
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(js_string).join(","),
        Value::Object(_) => "[object Object]".into(),
        _ => input.to_string(),
    }
}

fn validate_bool(input: &Value) -> Validated {
    let text = js_string(input).to_lowercase();

    Validated::ok(Value::Bool(!matches!(text.as_str(), "" | "0" | "false")))
}

fn validate_bytes(input: &Value) -> Validated {
    match input {
        Value::Array(_) => Validated::ok(input.clone()),
        Value::Str(s) => match Value::parse_json(s) {
            Some(parsed @ Value::Array(_)) => Validated::ok(parsed),
            _ => Validated::ok(input.clone()),
        },
        _ => Validated::ok(Value::Str(plain_text(input))),
    }
}

fn validate_struct(
    ty: &TypeDef,
    input: &Value,
    registry: &dyn TypeRegistry,
    depth: usize,
) -> Result<Validated, FormError> {
    let object = match input {
        Value::Object(object) if !object.is_empty() => object.clone(),
        _ if input.is_empty() => return Ok(Validated::error(message::required())),
        Value::Str(s) => match Value::parse_json(s) {
            Some(Value::Object(object)) if !object.is_empty() => object,
            _ => {
                return Ok(Validated::error(message::expected(
                    input,
                    "an object or JSON string",
                )))
            }
        },
        _ => {
            return Ok(Validated::error(message::expected(
                input,
                "an object or JSON string",
            )))
        }
    };

    let fields: Vec<(&str, &TypeDef)> = ty
        .sub_multiple()?
        .iter()
        .filter_map(|field| field.name.as_deref().map(|name| (name, field)))
        .collect();

    let missing: Vec<&str> = fields
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !object.contains_key(*name))
        .collect();

    if !missing.is_empty() {
        return Ok(Validated::error(message::missing_keys(&missing)));
    }

    let mut errors = Vec::new();
    let mut value = IndexMap::new();

    for (name, field) in fields {
        let validated = validate_at(field, &object[name], registry, depth + 1)?;

        errors.extend(validated.errors);
        if let Some(v) = validated.value {
            value.insert(name.to_owned(), v);
        }
    }

    Ok(Validated::finish(Value::Object(value), errors))
}

fn validate_tuple(
    ty: &TypeDef,
    input: &Value,
    registry: &dyn TypeRegistry,
    depth: usize,
) -> Result<Validated, FormError> {
    let fields = ty.sub_multiple()?;

    let items = match input {
        Value::Str(s) if s.is_empty() && fields.len() == 1 => {
            if fields[0].resolve(registry)?.info == TypeDefInfo::Option {
                return Ok(Validated::ok(Value::Array(vec![Value::Null])));
            }
            vec![input.clone()]
        }
        Value::Str(s) => match Value::parse_json(s) {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![input.clone()],
        },
        Value::Int(_) => vec![input.clone()],
        Value::Array(items) => items.clone(),
        _ => {
            return Ok(Validated::error(message::expected(
                input,
                "a number, string or array",
            )))
        }
    };

    if items.len() != fields.len() {
        return Ok(Validated::error(message::length_mismatch(
            fields.len(),
            items.len(),
        )));
    }

    let mut errors = Vec::new();
    let mut value = Vec::with_capacity(items.len());

    for (field, item) in fields.iter().zip(&items) {
        let validated = validate_at(field, item, registry, depth + 1)?;

        errors.extend(validated.errors);
        value.extend(validated.value);
    }

    Ok(Validated::finish(Value::Array(value), errors))
}

fn validate_vec(
    ty: &TypeDef,
    input: &Value,
    registry: &dyn TypeRegistry,
    depth: usize,
) -> Result<Validated, FormError> {
    let elem = ty.sub_single()?;

    if input.is_empty() {
        return Ok(Validated::error(message::required()));
    }

    let items = match input {
        Value::Array(items) => items.clone(),
        Value::Str(s) => match Value::parse_json(s) {
            Some(Value::Array(items)) => items,
            _ => return Ok(Validated::error(message::not_an_array(input))),
        },
        Value::Object(_) => return Ok(Validated::error(message::not_an_array(input))),
        _ => {
            return Ok(Validated::error(message::expected(
                input,
                "an array or JSON string",
            )))
        }
    };

    if ty.info == TypeDefInfo::VecFixed {
        let length = ty
            .length
            .ok_or_else(|| FormError::MissingLength(ty.type_name.clone()))?;

        if items.len() != length {
            return Ok(Validated::error(message::length_mismatch(
                length,
                items.len(),
            )));
        }
    }

    let mut errors = Vec::new();
    let mut value = Vec::with_capacity(items.len());

    for item in &items {
        let validated = validate_at(elem, item, registry, depth + 1)?;

        errors.extend(validated.errors);
        value.extend(validated.value);
    }

    Ok(Validated::finish(Value::Array(value), errors))
}

/// Split enum input into a variant name and its payload. Accepts `"Name"`,
/// `["Name"]` and `{"Name": payload}`, as values or JSON text.
fn enum_input(input: &Value) -> Option<(String, Value)> {
    match input {
        Value::Str(s) => match Value::parse_json(s) {
            Some(parsed @ (Value::Array(_) | Value::Object(_))) => enum_input(&parsed),
            Some(Value::Str(name)) => Some((name, Value::Null)),
            _ => Some((s.trim().to_owned(), Value::Null)),
        },
        Value::Array(items) => match items.as_slice() {
            [Value::Str(name)] => Some((name.clone(), Value::Null)),
            _ => None,
        },
        Value::Object(map) if map.len() == 1 => map
            .iter()
            .next()
            .map(|(name, payload)| (name.clone(), payload.clone())),
        _ => None,
    }
}

fn validate_enum(
    ty: &TypeDef,
    input: &Value,
    registry: &dyn TypeRegistry,
    depth: usize,
) -> Result<Validated, FormError> {
    let variants = ty.sub_multiple()?;

    if input.is_empty() {
        return Ok(Validated::error(message::required()));
    }

    let (name, payload) = match enum_input(input) {
        Some(parts) => parts,
        None => return Ok(Validated::error(message::invalid_enum(input))),
    };

    let variant = match variants
        .iter()
        .find(|variant| variant.name.as_deref() == Some(name.as_str()))
    {
        Some(variant) => variant,
        None => {
            let names: Vec<&str> = variants
                .iter()
                .filter_map(|variant| variant.name.as_deref())
                .collect();
            return Ok(Validated::error(message::variant_not_found(&name, &names)));
        }
    };

    let value = if variant.is_null() {
        if payload != Value::Null {
            return Ok(Validated::error(message::variant_takes_no_param(&name)));
        }
        Value::Null
    } else {
        if payload == Value::Null {
            return Ok(Validated::error(message::variant_needs_param(&name)));
        }

        let validated = validate_at(variant, &payload, registry, depth + 1)?;
        match validated.value {
            Some(value) if validated.errors.is_empty() => value,
            _ => return Ok(validated),
        }
    };

    let mut object = IndexMap::new();
    object.insert(name, value);

    Ok(Validated::ok(Value::Object(object)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_type_names() {
        assert_eq!(numeric_kind("u8"), Some(true));
        assert_eq!(numeric_kind("u128"), Some(true));
        assert_eq!(numeric_kind("i64"), Some(false));
        assert_eq!(numeric_kind("Balance"), Some(true));
        assert_eq!(numeric_kind("bool"), None);
        assert_eq!(numeric_kind("u"), None);
        assert_eq!(numeric_kind("Text"), None);
        assert_eq!(numeric_kind(""), None);
    }
}
