use std::collections::BTreeSet;

use itertools::Itertools;

use super::builder::{build_field, variant_slot};
use super::{FieldData, FieldDataSet, FieldValue, FormNormalized, Uid};
use crate::abi::{TypeDef, TypeDefInfo};
use crate::error::FormError;
use crate::value::Value;

/// A state transition of a [`FormNormalized`].
#[derive(Debug, Clone)]
pub enum Action {
    SetValue { uid: Uid, value: FieldValue },
    SetErrors { uid: Uid, errors: Vec<String> },
    /// Append a freshly built `type_def` field to a vector field.
    AddSubField { uid: Uid, type_def: TypeDef },
    /// Drop `sub_uid` from a vector field, with everything beneath it.
    RemoveSubField { uid: Uid, sub_uid: Uid },
    SetForm(Box<FormNormalized>),
}

/// Apply `action` to `form`, returning the new state.
pub fn reduce(mut form: FormNormalized, action: Action) -> Result<FormNormalized, FormError> {
    form.dispatch(action)?;
    Ok(form)
}

/// `uid` and every field beneath it.
pub fn subtree_uids(set: &FieldDataSet, uid: Uid) -> BTreeSet<Uid> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![uid];

    while let Some(uid) = stack.pop() {
        if !seen.insert(uid) {
            continue;
        }

        if let Some(field) = set.get(&uid) {
            stack.extend(field.children());
        }
    }

    seen
}

impl FormNormalized {
    /// Apply one action. On error the form is left as it was.
    pub fn dispatch(&mut self, action: Action) -> Result<(), FormError> {
        match action {
            Action::SetValue { uid, value } => {
                let children = self.field_or_err(uid)?.children();
                let referenced = value.uids();

                // a value may rearrange the field's own children, never adopt others
                let stray = referenced
                    .iter()
                    .find(|sub| children.binary_search(sub).is_err())
                    .or_else(|| referenced.iter().duplicates().next());

                if let Some(sub) = stray {
                    return Err(FormError::NotASubField { parent: uid, sub: *sub });
                }

                tracing::trace!(%uid, "set value");
                self.field_mut(uid)?.value = value;
            }
            Action::SetErrors { uid, errors } => {
                tracing::trace!(%uid, errors = errors.len(), "set errors");
                self.field_mut(uid)?.errors = errors;
            }
            Action::AddSubField { uid, type_def } => {
                if !matches!(self.field_or_err(uid)?.value, FieldValue::List(_)) {
                    return Err(FormError::NotAList(uid));
                }

                let built = build_field(&type_def, self.registry.as_ref(), &mut self.uids)?;

                tracing::trace!(%uid, sub_uid = %built.uid, fields = built.field_data_set.len(), "add sub field");

                if let FieldValue::List(items) = &mut self.field_mut(uid)?.value {
                    items.push(built.uid);
                }
                self.field_data_set.extend(built.field_data_set);
            }
            Action::RemoveSubField { uid, sub_uid } => {
                let position = match &self.field_or_err(uid)?.value {
                    FieldValue::List(items) => items
                        .iter()
                        .position(|item| *item == sub_uid)
                        .ok_or(FormError::NotASubField { parent: uid, sub: sub_uid })?,
                    _ => return Err(FormError::NotAList(uid)),
                };

                let removed = subtree_uids(&self.field_data_set, sub_uid);

                tracing::trace!(%uid, %sub_uid, fields = removed.len(), "remove sub field");

                if let FieldValue::List(items) = &mut self.field_mut(uid)?.value {
                    items.remove(position);
                }
                self.field_data_set.retain(|uid, _| !removed.contains(uid));
            }
            Action::SetForm(form) => {
                tracing::debug!(fields = form.field_data_set.len(), "replace form");
                *self = *form;
            }
        }

        Ok(())
    }

    fn field_mut(&mut self, uid: Uid) -> Result<&mut FieldData, FormError> {
        self.field_data_set
            .get_mut(&uid)
            .ok_or(FormError::UnknownField(uid))
    }

    /// Add one element to the vector field `uid`, built from its own element type.
    pub fn push_item(&mut self, uid: Uid) -> Result<Uid, FormError> {
        let field = self.field_or_err(uid)?;

        if field.type_def.info != TypeDefInfo::Vec {
            return Err(FormError::NotAList(uid));
        }

        let type_def = field.type_def.sub_single()?.clone();
        self.dispatch(Action::AddSubField { uid, type_def })?;

        match &self.field_or_err(uid)?.value {
            FieldValue::List(items) => items.last().copied().ok_or(FormError::NotAList(uid)),
            _ => Err(FormError::NotAList(uid)),
        }
    }

    /// Toggle an option field; an enabled option points at its inner field.
    pub fn set_option_enabled(&mut self, uid: Uid, enabled: bool) -> Result<(), FormError> {
        let field = self.field_or_err(uid)?;

        let value = match (enabled, field.option_field) {
            (true, Some(inner)) => FieldValue::Ref(inner),
            (true, None) => return Err(FormError::MissingSub(field.type_def.type_name.clone())),
            (false, _) => FieldValue::Unset,
        };

        self.dispatch(Action::SetValue { uid, value })
    }

    /// Select a variant of an enum field by name. Returns the uid of the
    /// variant's payload field, if it has one.
    pub fn select_variant(&mut self, uid: Uid, variant: &str) -> Result<Option<Uid>, FormError> {
        let field = self.field_or_err(uid)?;
        let slot = variant_slot(field.type_def.sub_multiple()?, variant);

        let payload = match (slot, &field.enum_fields) {
            (Some(Some(slot)), Some(fields)) => fields.get(slot).copied(),
            _ => None,
        };

        self.dispatch(Action::SetValue {
            uid,
            value: FieldValue::Scalar(Value::from(variant)),
        })?;

        Ok(payload)
    }
}
