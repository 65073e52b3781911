use indexmap::IndexMap;

use super::{FieldDataSet, FieldValue, FormNormalized, Uid};
use crate::abi::TypeDefInfo;
use crate::value::Value;

/// Fold the field `uid` and everything beneath it back into a nested value.
/// Missing fields come back as `null`; nothing is revalidated here.
pub fn reconstruct(set: &FieldDataSet, uid: Uid) -> Value {
    let field = match set.get(&uid) {
        Some(field) => field,
        None => return Value::Null,
    };

    match field.type_def.info {
        TypeDefInfo::Struct => match &field.value {
            FieldValue::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, uid)| (name.clone(), reconstruct(set, *uid)))
                    .collect(),
            ),
            _ => Value::Null,
        },
        TypeDefInfo::Tuple | TypeDefInfo::Vec | TypeDefInfo::VecFixed => match &field.value {
            FieldValue::List(items) => {
                Value::Array(items.iter().map(|uid| reconstruct(set, *uid)).collect())
            }
            _ => Value::Null,
        },
        TypeDefInfo::Option => match &field.value {
            FieldValue::Ref(uid) => reconstruct(set, *uid),
            _ => Value::Null,
        },
        TypeDefInfo::Enum => match field.selected_variant() {
            Some((name, payload)) => {
                let mut variant = IndexMap::new();
                variant.insert(
                    name.to_owned(),
                    payload.map_or(Value::Null, |uid| reconstruct(set, uid)),
                );
                Value::Object(variant)
            }
            None => Value::Null,
        },
        TypeDefInfo::Plain | TypeDefInfo::Compact | TypeDefInfo::Si => match &field.value {
            FieldValue::Scalar(value) => value.clone(),
            FieldValue::Ref(uid) => reconstruct(set, *uid),
            _ => Value::Null,
        },
    }
}

impl FormNormalized {
    pub fn field_value(&self, uid: Uid) -> Value {
        reconstruct(&self.field_data_set, uid)
    }

    /// Argument label to argument value, ready for the contract call.
    pub fn form_value(&self) -> IndexMap<String, Value> {
        self.form_data
            .iter()
            .map(|(label, uid)| (label.clone(), self.field_value(*uid)))
            .collect()
    }
}
