use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

use crate::abi::{TypeDef, TypeRegistry};
use crate::error::FormError;
use crate::value::Value;

pub mod builder;
pub mod checked;
pub mod reconstruct;
pub mod reducer;
pub mod validator;

pub use reducer::{reduce, Action};

/// Identifies one field within a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(u64);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field-{}", self.0)
    }
}

/// Hands out uids for one form. Ids are never reused, so a removed field's
/// uid cannot come back as a different field.
#[derive(Debug, Clone, Default)]
pub struct UidGenerator {
    next: u64,
}

impl UidGenerator {
    pub fn fresh(&mut self) -> Uid {
        let uid = Uid(self.next);
        self.next += 1;
        uid
    }
}

/// The state held by a field. Which shape is used depends on the field's
/// type: leaves hold a `Scalar`, an enabled option a `Ref` to its inner
/// field, tuples and vectors a `List`, and structs a `Map`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    #[default]
    Unset,
    Scalar(Value),
    Ref(Uid),
    List(Vec<Uid>),
    Map(IndexMap<String, Uid>),
}

impl FieldValue {
    /// Every uid this value points at, in order.
    pub fn uids(&self) -> Vec<Uid> {
        match self {
            FieldValue::Unset | FieldValue::Scalar(_) => Vec::new(),
            FieldValue::Ref(uid) => vec![*uid],
            FieldValue::List(uids) => uids.clone(),
            FieldValue::Map(map) => map.values().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldData {
    pub uid: Uid,
    pub type_def: TypeDef,
    pub value: FieldValue,
    pub errors: Vec<String>,
    /// One field per enum variant that carries a payload, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_fields: Option<Vec<Uid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_field: Option<Uid>,
}

impl FieldData {
    pub fn new(uid: Uid, type_def: TypeDef) -> Self {
        FieldData {
            uid,
            type_def,
            value: FieldValue::Unset,
            errors: Vec::new(),
            enum_fields: None,
            option_field: None,
        }
    }

    /// Uids of every field this one owns, whether or not it is shown.
    pub fn children(&self) -> Vec<Uid> {
        let mut children = self.value.uids();

        if let Some(fields) = &self.enum_fields {
            children.extend(fields.iter().copied());
        }

        if let Some(uid) = self.option_field {
            children.push(uid);
        }

        children.sort();
        children.dedup();
        children
    }

    /// The selected variant of an enum field, with its payload field if the
    /// variant has one. `None` when nothing valid is selected.
    pub fn selected_variant(&self) -> Option<(&str, Option<Uid>)> {
        let name = match &self.value {
            FieldValue::Scalar(Value::Str(name)) => name.as_str(),
            _ => return None,
        };
        let variants = self.type_def.sub_multiple().ok()?;

        match builder::variant_slot(variants, name)? {
            None => Some((name, None)),
            Some(slot) => {
                let uid = self.enum_fields.as_ref()?.get(slot).copied()?;
                Some((name, Some(uid)))
            }
        }
    }
}

pub type FieldDataSet = BTreeMap<Uid, FieldData>;

/// The whole state of one message's argument form.
#[derive(Clone)]
pub struct FormNormalized {
    /// Argument label to the uid of its root field.
    pub form_data: IndexMap<String, Uid>,
    pub field_data_set: FieldDataSet,
    registry: Arc<dyn TypeRegistry + Send + Sync>,
    uids: UidGenerator,
}

impl FormNormalized {
    /// Build a form with one root field per argument.
    pub fn new<I>(args: I, registry: Arc<dyn TypeRegistry + Send + Sync>) -> Result<Self, FormError>
    where
        I: IntoIterator<Item = (String, TypeDef)>,
    {
        let mut uids = UidGenerator::default();
        let mut form_data = IndexMap::new();
        let mut field_data_set = FieldDataSet::new();

        for (label, ty) in args {
            let built = builder::build_field(&ty, registry.as_ref(), &mut uids)?;
            field_data_set.extend(built.field_data_set);
            form_data.insert(label, built.uid);
        }

        tracing::debug!(
            args = form_data.len(),
            fields = field_data_set.len(),
            "built argument form"
        );

        Ok(FormNormalized {
            form_data,
            field_data_set,
            registry,
            uids,
        })
    }

    pub fn registry(&self) -> &dyn TypeRegistry {
        self.registry.as_ref()
    }

    pub fn field(&self, uid: Uid) -> Option<&FieldData> {
        self.field_data_set.get(&uid)
    }

    pub fn root(&self, label: &str) -> Option<Uid> {
        self.form_data.get(label).copied()
    }

    fn field_or_err(&self, uid: Uid) -> Result<&FieldData, FormError> {
        self.field(uid).ok_or(FormError::UnknownField(uid))
    }

    /// Uids referenced from the form that have no field. Always empty for a
    /// form only changed through [`Action`]s.
    pub fn dangling_uids(&self) -> Vec<Uid> {
        let mut dangling = Vec::new();
        let mut stack: Vec<Uid> = self.form_data.values().copied().collect();

        while let Some(uid) = stack.pop() {
            match self.field(uid) {
                Some(field) => stack.extend(field.children()),
                None => dangling.push(uid),
            }
        }

        dangling
    }
}

impl fmt::Debug for FormNormalized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormNormalized")
            .field("form_data", &self.form_data)
            .field("field_data_set", &self.field_data_set)
            .finish_non_exhaustive()
    }
}
