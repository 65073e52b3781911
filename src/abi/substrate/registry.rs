use scale_info::{
    form::PortableForm, Field, PortableRegistry, Type, TypeDef as ScaleTypeDef,
    TypeDefPrimitive, Variant,
};

use crate::abi::{TypeDef, TypeRegistry};
use crate::error::FormError;

/// Newtypes that a form shows as a single text input.
const OPAQUE_NEWTYPES: &[&str] = &["AccountId", "AccountId32", "Hash", "H160", "H256"];

impl TypeRegistry for PortableRegistry {
    fn lookup_type_def(&self, index: u32) -> Result<TypeDef, FormError> {
        let ty = self.resolve(index).ok_or(FormError::UnknownLookup(index))?;

        Ok(convert(self, ty))
    }
}

fn ident(ty: &Type<PortableForm>) -> Option<&str> {
    ty.path.segments.last().map(String::as_str)
}

/// Convert one registry entry. Children are left as `Si` lookups; the form
/// builder resolves them as it descends.
fn convert(registry: &PortableRegistry, ty: &Type<PortableForm>) -> TypeDef {
    match &ty.type_def {
        ScaleTypeDef::Composite(composite) => {
            if let Some(name) = ident(ty).filter(|name| OPAQUE_NEWTYPES.contains(name)) {
                return TypeDef::plain(name);
            }

            match composite.fields.as_slice() {
                [] => TypeDef::null(),
                [field] if field.name.is_none() => TypeDef::lookup(field.ty.id),
                fields => fields_to_type_def(fields),
            }
        }
        ScaleTypeDef::Variant(variant) => {
            let some = variant.variants.iter().find(|v| v.name == "Some");

            match (ident(ty), some) {
                (Some("Option"), Some(Variant { fields, .. })) if fields.len() == 1 => {
                    TypeDef::option(TypeDef::lookup(fields[0].ty.id))
                }
                _ => TypeDef::enumeration(
                    variant
                        .variants
                        .iter()
                        .map(|v| {
                            let payload = if v.fields.is_empty() {
                                None
                            } else {
                                Some(fields_to_type_def(&v.fields))
                            };
                            (v.name.clone(), payload)
                        })
                        .collect(),
                ),
            }
        }
        ScaleTypeDef::Sequence(seq) => {
            let is_bytes = matches!(
                registry.resolve(seq.type_param.id).map(|elem| &elem.type_def),
                Some(ScaleTypeDef::Primitive(TypeDefPrimitive::U8))
            );

            if is_bytes {
                TypeDef::plain("Bytes")
            } else {
                TypeDef::vec(TypeDef::lookup(seq.type_param.id))
            }
        }
        ScaleTypeDef::Array(array) => {
            TypeDef::vec_fixed(TypeDef::lookup(array.type_param.id), array.len as usize)
        }
        ScaleTypeDef::Tuple(tuple) => {
            if tuple.fields.is_empty() {
                TypeDef::null()
            } else {
                TypeDef::tuple(
                    tuple
                        .fields
                        .iter()
                        .map(|field| TypeDef::lookup(field.id))
                        .collect(),
                )
            }
        }
        ScaleTypeDef::Primitive(primitive) => TypeDef::plain(primitive_name(primitive)),
        ScaleTypeDef::Compact(compact) => {
            TypeDef::compact(TypeDef::lookup(compact.type_param.id))
        }
        ScaleTypeDef::BitSequence(_) => TypeDef::plain("BitVec"),
    }
}

/// Named fields become a struct, unnamed ones a tuple, and a lone unnamed
/// field stands for itself.
fn fields_to_type_def(fields: &[Field<PortableForm>]) -> TypeDef {
    if fields.iter().all(|field| field.name.is_some()) {
        TypeDef::structure(
            fields
                .iter()
                .map(|field| {
                    (
                        field.name.clone().unwrap_or_default(),
                        TypeDef::lookup(field.ty.id),
                    )
                })
                .collect(),
        )
    } else if let [field] = fields {
        TypeDef::lookup(field.ty.id)
    } else {
        TypeDef::tuple(
            fields
                .iter()
                .map(|field| TypeDef::lookup(field.ty.id))
                .collect(),
        )
    }
}

fn primitive_name(primitive: &TypeDefPrimitive) -> &'static str {
    match primitive {
        TypeDefPrimitive::Bool => "bool",
        TypeDefPrimitive::Char => "char",
        TypeDefPrimitive::Str => "Text",
        TypeDefPrimitive::U8 => "u8",
        TypeDefPrimitive::U16 => "u16",
        TypeDefPrimitive::U32 => "u32",
        TypeDefPrimitive::U64 => "u64",
        TypeDefPrimitive::U128 => "u128",
        TypeDefPrimitive::U256 => "u256",
        TypeDefPrimitive::I8 => "i8",
        TypeDefPrimitive::I16 => "i16",
        TypeDefPrimitive::I32 => "i32",
        TypeDefPrimitive::I64 => "i64",
        TypeDefPrimitive::I128 => "i128",
        TypeDefPrimitive::I256 => "i256",
    }
}
