use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize as _, Deserializer};
use serde_derive::{Deserialize, Serialize};

use crate::error::FormError;

pub mod substrate;

/// How many `Si` hops, or nested types, a single walk may take before the
/// metadata is considered cyclic.
pub const MAX_DEPTH: usize = 64;

/// The shape of a [`TypeDef`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDefInfo {
    Plain,
    Struct,
    Tuple,
    Vec,
    VecFixed,
    Enum,
    Option,
    Compact,
    /// Indirection through the type registry.
    Si,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypeDefSub {
    Single(Box<TypeDef>),
    Multiple(Vec<TypeDef>),
}

// Buffered untagged content loses arbitrary precision numbers, so pick the
// variant from the JSON shape instead.
impl<'de> serde::Deserialize<'de> for TypeDefSub {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;

        let sub = if json.is_array() {
            serde_json::from_value(json).map(TypeDefSub::Multiple)
        } else {
            serde_json::from_value(json).map(TypeDefSub::Single)
        };

        sub.map_err(serde::de::Error::custom)
    }
}

/// One node of an argument's type tree, as derived from contract metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    pub info: TypeDefInfo,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<TypeDefSub>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_index: Option<u32>,
}

impl TypeDef {
    fn new(info: TypeDefInfo, type_name: String, sub: Option<TypeDefSub>) -> Self {
        TypeDef {
            info,
            type_name,
            name: None,
            sub,
            length: None,
            lookup_index: None,
        }
    }

    pub fn plain(type_name: &str) -> Self {
        TypeDef::new(TypeDefInfo::Plain, type_name.to_owned(), None)
    }

    /// The payload type of a unit enum variant, or of `()`.
    pub fn null() -> Self {
        TypeDef::plain("Null")
    }

    pub fn structure(fields: Vec<(String, TypeDef)>) -> Self {
        let type_name = format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(name, ty)| format!("\"{}\":\"{}\"", name, ty.type_name))
                .collect::<Vec<_>>()
                .join(",")
        );
        let sub = fields
            .into_iter()
            .map(|(name, ty)| ty.with_name(&name))
            .collect();

        TypeDef::new(
            TypeDefInfo::Struct,
            type_name,
            Some(TypeDefSub::Multiple(sub)),
        )
    }

    pub fn tuple(fields: Vec<TypeDef>) -> Self {
        let type_name = format!(
            "({})",
            fields
                .iter()
                .map(|ty| ty.type_name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        TypeDef::new(
            TypeDefInfo::Tuple,
            type_name,
            Some(TypeDefSub::Multiple(fields)),
        )
    }

    pub fn vec(elem: TypeDef) -> Self {
        TypeDef::new(
            TypeDefInfo::Vec,
            format!("Vec<{}>", elem.type_name),
            Some(TypeDefSub::Single(Box::new(elem))),
        )
    }

    pub fn vec_fixed(elem: TypeDef, length: usize) -> Self {
        let mut ty = TypeDef::new(
            TypeDefInfo::VecFixed,
            format!("[{};{}]", elem.type_name, length),
            Some(TypeDefSub::Single(Box::new(elem))),
        );
        ty.length = Some(length);
        ty
    }

    /// An enum from `(variant, payload)` pairs; `None` marks a unit variant.
    pub fn enumeration(variants: Vec<(String, Option<TypeDef>)>) -> Self {
        let type_name = format!(
            "{{\"_enum\":[{}]}}",
            variants
                .iter()
                .map(|(name, _)| format!("\"{name}\""))
                .collect::<Vec<_>>()
                .join(",")
        );
        let sub = variants
            .into_iter()
            .map(|(name, payload)| payload.unwrap_or_else(TypeDef::null).with_name(&name))
            .collect();

        TypeDef::new(TypeDefInfo::Enum, type_name, Some(TypeDefSub::Multiple(sub)))
    }

    pub fn option(inner: TypeDef) -> Self {
        TypeDef::new(
            TypeDefInfo::Option,
            format!("Option<{}>", inner.type_name),
            Some(TypeDefSub::Single(Box::new(inner))),
        )
    }

    pub fn compact(inner: TypeDef) -> Self {
        TypeDef::new(
            TypeDefInfo::Compact,
            format!("Compact<{}>", inner.type_name),
            Some(TypeDefSub::Single(Box::new(inner))),
        )
    }

    pub fn lookup(index: u32) -> Self {
        let mut ty = TypeDef::new(TypeDefInfo::Si, format!("Lookup{index}"), None);
        ty.lookup_index = Some(index);
        ty
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// A unit enum variant payload.
    pub fn is_null(&self) -> bool {
        self.info == TypeDefInfo::Plain && self.type_name == "Null"
    }

    /// The single sub type of a Vec, VecFixed, Option or Compact.
    pub fn sub_single(&self) -> Result<&TypeDef, FormError> {
        match &self.sub {
            Some(TypeDefSub::Single(sub)) => Ok(sub),
            _ => Err(FormError::MissingSub(self.type_name.clone())),
        }
    }

    /// The sub types of a Struct, Tuple or Enum.
    pub fn sub_multiple(&self) -> Result<&[TypeDef], FormError> {
        match &self.sub {
            Some(TypeDefSub::Multiple(sub)) => Ok(sub),
            _ => Err(FormError::MissingSub(self.type_name.clone())),
        }
    }

    /// Follow `Si` indirections until a concrete type is reached. The name of
    /// the original node is kept, since struct fields and enum variants are
    /// named on the lookup node rather than on the type it points to.
    pub fn resolve<'a>(&'a self, registry: &dyn TypeRegistry) -> Result<Cow<'a, TypeDef>, FormError> {
        if self.info != TypeDefInfo::Si {
            return Ok(Cow::Borrowed(self));
        }

        let mut current = self.clone();

        for _ in 0..MAX_DEPTH {
            if current.info != TypeDefInfo::Si {
                if current.name.is_none() {
                    current.name = self.name.clone();
                }
                return Ok(Cow::Owned(current));
            }

            let index = current
                .lookup_index
                .ok_or_else(|| FormError::MissingLookupIndex(current.type_name.clone()))?;

            current = registry.lookup_type_def(index)?;
        }

        Err(FormError::TooDeep(self.type_name.clone()))
    }
}

/// Resolves `Si` lookup indices to type descriptors.
pub trait TypeRegistry {
    fn lookup_type_def(&self, index: u32) -> Result<TypeDef, FormError>;
}

/// A registry held in memory, keyed by lookup index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    types: BTreeMap<u32, TypeDef>,
}

impl TypeTable {
    pub fn new() -> Self {
        TypeTable::default()
    }

    pub fn insert(&mut self, index: u32, ty: TypeDef) -> Option<TypeDef> {
        self.types.insert(index, ty)
    }
}

impl TypeRegistry for TypeTable {
    fn lookup_type_def(&self, index: u32) -> Result<TypeDef, FormError> {
        self.types
            .get(&index)
            .cloned()
            .ok_or(FormError::UnknownLookup(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_keeps_field_name() {
        let mut table = TypeTable::new();
        table.insert(0, TypeDef::lookup(1));
        table.insert(1, TypeDef::plain("u32"));

        let field = TypeDef::lookup(0).with_name("amount");
        let resolved = field.resolve(&table).unwrap();

        assert_eq!(resolved.info, TypeDefInfo::Plain);
        assert_eq!(resolved.type_name, "u32");
        assert_eq!(resolved.name.as_deref(), Some("amount"));
    }

    #[test]
    fn cyclic_lookup() {
        let mut table = TypeTable::new();
        table.insert(0, TypeDef::lookup(0));

        assert_eq!(
            TypeDef::lookup(0).resolve(&table),
            Err(FormError::TooDeep("Lookup0".into()))
        );
    }

    #[test]
    fn missing_sub() {
        let broken = TypeDef {
            sub: None,
            ..TypeDef::vec(TypeDef::plain("u8"))
        };

        assert_eq!(
            broken.sub_single(),
            Err(FormError::MissingSub("Vec<u8>".into()))
        );
        assert!(TypeDef::tuple(vec![]).sub_multiple().unwrap().is_empty());
    }

    #[test]
    fn json_shape() {
        let ty: TypeDef = serde_json::from_str(
            r#"{"info":"VecFixed","type":"[u8;4]","sub":{"info":"Plain","type":"u8"},"length":4}"#,
        )
        .unwrap();

        assert_eq!(ty, TypeDef::vec_fixed(TypeDef::plain("u8"), 4));

        let nested = TypeDef::tuple(vec![
            TypeDef::vec(TypeDef::vec_fixed(TypeDef::plain("u8"), 2)),
            TypeDef::lookup(7),
        ]);
        let text = serde_json::to_string(&nested).unwrap();
        let parsed: TypeDef = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed, nested);
    }
}
