//! Whole-form validation over the fields that are currently shown.

use std::collections::{BTreeMap, BTreeSet};

use super::validator::{message, validate, Validated};
use super::{FieldData, FieldValue, FormNormalized, Uid};
use crate::abi::TypeDefInfo;
use crate::error::FormError;
use crate::value::Value;

/// Children of `field` that are shown: the selected enum variant only, and
/// an option's inner field only while it is enabled.
fn rendered_children(field: &FieldData) -> Vec<Uid> {
    match field.type_def.info {
        TypeDefInfo::Struct | TypeDefInfo::Tuple | TypeDefInfo::Vec | TypeDefInfo::VecFixed => {
            field.value.uids()
        }
        TypeDefInfo::Enum => field
            .selected_variant()
            .and_then(|(_, payload)| payload)
            .into_iter()
            .collect(),
        TypeDefInfo::Option => match field.value {
            FieldValue::Ref(uid) => vec![uid],
            _ => Vec::new(),
        },
        TypeDefInfo::Plain | TypeDefInfo::Compact | TypeDefInfo::Si => Vec::new(),
    }
}

impl FormNormalized {
    /// Every field reachable from the argument roots as the form is shown.
    pub fn rendered_uids(&self) -> BTreeSet<Uid> {
        let mut rendered = BTreeSet::new();
        let mut stack: Vec<Uid> = self.form_data.values().copied().collect();

        while let Some(uid) = stack.pop() {
            if let Some(field) = self.field(uid) {
                if rendered.insert(uid) {
                    stack.extend(rendered_children(field));
                }
            }
        }

        rendered
    }

    /// Check one field on its own. Containers never carry errors themselves;
    /// their children do.
    pub fn validate_field(&self, uid: Uid) -> Result<Validated, FormError> {
        let field = self.field_or_err(uid)?;

        match field.type_def.info {
            TypeDefInfo::Struct
            | TypeDefInfo::Tuple
            | TypeDefInfo::Vec
            | TypeDefInfo::VecFixed
            | TypeDefInfo::Option => Ok(Validated::default()),
            TypeDefInfo::Enum => {
                let selected = match &field.value {
                    FieldValue::Scalar(Value::Str(name)) if !name.is_empty() => name,
                    _ => return Ok(Validated::error(message::required())),
                };

                let names: Vec<&str> = field
                    .type_def
                    .sub_multiple()?
                    .iter()
                    .filter_map(|variant| variant.name.as_deref())
                    .collect();

                if names.contains(&selected.as_str()) {
                    Ok(Validated::ok(Value::Str(selected.clone())))
                } else {
                    Ok(Validated::error(message::variant_not_found(selected, &names)))
                }
            }
            TypeDefInfo::Plain | TypeDefInfo::Compact | TypeDefInfo::Si => {
                let raw = match &field.value {
                    FieldValue::Scalar(value) => value.clone(),
                    _ => Value::Null,
                };

                validate(&field.type_def, &raw, self.registry())
            }
        }
    }

    /// Revalidate the form. Shown fields get fresh errors and leaves that
    /// pass keep their normalized value; hidden fields lose stale errors.
    pub fn checked(&self) -> Result<FormNormalized, FormError> {
        let rendered = self.rendered_uids();
        let mut form = self.clone();

        for (uid, field) in form.field_data_set.iter_mut() {
            if !rendered.contains(uid) {
                field.errors.clear();
                continue;
            }

            let validated = self.validate_field(*uid)?;

            if field.type_def.info == TypeDefInfo::Plain {
                if let Some(value) = validated.value {
                    field.value = FieldValue::Scalar(value);
                }
            }
            field.errors = validated.errors;
        }

        tracing::debug!(
            rendered = rendered.len(),
            invalid = form.errors().len(),
            "checked argument form"
        );

        Ok(form)
    }

    /// Whether a shown field has errors; hidden fields never block.
    pub fn is_invalid(&self) -> bool {
        !self.errors().is_empty()
    }

    /// Errors of the shown fields, by uid.
    pub fn errors(&self) -> BTreeMap<Uid, Vec<String>> {
        self.rendered_uids()
            .into_iter()
            .filter_map(|uid| {
                let field = self.field(uid)?;
                if field.errors.is_empty() {
                    None
                } else {
                    Some((uid, field.errors.clone()))
                }
            })
            .collect()
    }
}
