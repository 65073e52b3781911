//! Walks a type descriptor into fresh form fields.

use indexmap::IndexMap;

use super::{FieldData, FieldDataSet, FieldValue, Uid, UidGenerator};
use crate::abi::{TypeDef, TypeDefInfo, TypeRegistry, MAX_DEPTH};
use crate::error::FormError;
use crate::value::Value;

/// The root uid of a newly built subtree, and every field in it.
#[derive(Debug, Clone)]
pub struct BuiltField {
    pub uid: Uid,
    pub field_data_set: FieldDataSet,
}

pub fn build_field(
    ty: &TypeDef,
    registry: &dyn TypeRegistry,
    uids: &mut UidGenerator,
) -> Result<BuiltField, FormError> {
    let mut field_data_set = FieldDataSet::new();
    let uid = build(ty, registry, uids, 0, &mut field_data_set)?;

    Ok(BuiltField {
        uid,
        field_data_set,
    })
}

fn build(
    ty: &TypeDef,
    registry: &dyn TypeRegistry,
    uids: &mut UidGenerator,
    depth: usize,
    out: &mut FieldDataSet,
) -> Result<Uid, FormError> {
    if depth > MAX_DEPTH {
        return Err(FormError::TooDeep(ty.type_name.clone()));
    }

    let mut enum_fields = None;
    let mut option_field = None;

    let value = match ty.info {
        TypeDefInfo::Compact => {
            return build(ty.sub_single()?, registry, uids, depth + 1, out);
        }
        TypeDefInfo::Si => {
            let resolved = ty.resolve(registry)?;
            return build(&resolved, registry, uids, depth + 1, out);
        }
        TypeDefInfo::Plain => FieldValue::Unset,
        TypeDefInfo::Struct => {
            let mut fields = IndexMap::new();

            for sub in ty.sub_multiple()? {
                if let Some(name) = &sub.name {
                    let uid = build(sub, registry, uids, depth + 1, out)?;
                    fields.insert(name.clone(), uid);
                }
            }

            FieldValue::Map(fields)
        }
        TypeDefInfo::Tuple => FieldValue::List(
            ty.sub_multiple()?
                .iter()
                .map(|sub| build(sub, registry, uids, depth + 1, out))
                .collect::<Result<_, _>>()?,
        ),
        TypeDefInfo::VecFixed => {
            let elem = ty.sub_single()?;
            let length = ty
                .length
                .ok_or_else(|| FormError::MissingLength(ty.type_name.clone()))?;

            FieldValue::List(
                (0..length)
                    .map(|_| build(elem, registry, uids, depth + 1, out))
                    .collect::<Result<_, _>>()?,
            )
        }
        TypeDefInfo::Vec => {
            let elem = ty.sub_single()?;

            FieldValue::List(vec![build(elem, registry, uids, depth + 1, out)?])
        }
        TypeDefInfo::Enum => {
            let variants = ty.sub_multiple()?;

            enum_fields = Some(
                variants
                    .iter()
                    .filter(|variant| !variant.is_null())
                    .map(|variant| build(variant, registry, uids, depth + 1, out))
                    .collect::<Result<Vec<_>, _>>()?,
            );

            match variants.first().and_then(|variant| variant.name.as_deref()) {
                Some(first) => FieldValue::Scalar(Value::from(first)),
                None => FieldValue::Unset,
            }
        }
        TypeDefInfo::Option => {
            option_field = Some(build(ty.sub_single()?, registry, uids, depth + 1, out)?);

            FieldValue::Unset
        }
    };

    let uid = uids.fresh();
    let mut field = FieldData::new(uid, ty.clone());
    field.value = value;
    field.enum_fields = enum_fields;
    field.option_field = option_field;
    out.insert(uid, field);

    Ok(uid)
}

/// Position of `name`'s payload field within an enum's `enum_fields`.
/// `Some(None)` is a unit variant, `None` an unknown name.
pub fn variant_slot(variants: &[TypeDef], name: &str) -> Option<Option<usize>> {
    let mut slot = 0;

    for variant in variants {
        let found = variant.name.as_deref() == Some(name);

        if variant.is_null() {
            if found {
                return Some(None);
            }
        } else {
            if found {
                return Some(Some(slot));
            }
            slot += 1;
        }
    }

    None
}
