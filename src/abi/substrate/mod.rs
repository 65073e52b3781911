//! ink! contract metadata: the message specs and the type registry their
//! arguments are described in.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use contract_metadata::ContractMetadata;
use indexmap::IndexMap;
use scale_info::PortableRegistry;
use serde_derive::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::abi::TypeDef;
use crate::error::FormError;
use crate::form::validator::{validate, Validated};
use crate::form::FormNormalized;
use crate::value::Value;

pub mod registry;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArgType {
    #[serde(rename = "type")]
    pub id: u32,
    #[serde(default, rename = "displayName")]
    pub display_name: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArgSpec {
    pub label: String,
    #[serde(rename = "type")]
    pub ty: ArgType,
}

/// A constructor or message of the contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageSpec {
    pub label: String,
    pub selector: String,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    #[serde(default)]
    pub mutates: bool,
    #[serde(default)]
    pub payable: bool,
    #[serde(default)]
    pub docs: Vec<String>,
}

#[derive(Deserialize)]
struct Spec {
    #[serde(default)]
    constructors: Vec<MessageSpec>,
    #[serde(default)]
    messages: Vec<MessageSpec>,
}

pub struct ContractAbi {
    pub name: Option<String>,
    pub constructors: Vec<MessageSpec>,
    pub messages: Vec<MessageSpec>,
    pub registry: Arc<PortableRegistry>,
}

fn metadata_error(e: impl ToString) -> FormError {
    FormError::Metadata(e.to_string())
}

impl ContractAbi {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FormError> {
        let text = fs::read_to_string(&path).map_err(|e| {
            FormError::Metadata(format!("{}: {}", path.as_ref().display(), e))
        })?;

        ContractAbi::from_json(&text)
    }

    /// Parse a `.contract` bundle, a `metadata.json`, or a bare ABI object.
    pub fn from_json(text: &str) -> Result<Self, FormError> {
        let json: JsonValue = serde_json::from_str(text).map_err(metadata_error)?;

        let (name, mut abi) = if json.get("source").is_some() {
            let metadata: ContractMetadata =
                serde_json::from_value(json).map_err(metadata_error)?;
            (Some(metadata.contract.name), metadata.abi)
        } else {
            match json {
                JsonValue::Object(abi) => (None, abi),
                _ => return Err(FormError::Metadata("expected a JSON object".into())),
            }
        };

        // metadata from before the ink! 4 release is wrapped in a version key
        if let Some(JsonValue::Object(inner)) = abi.remove("V3") {
            abi = inner;
        }

        ContractAbi::from_abi(name, abi)
    }

    fn from_abi(name: Option<String>, mut abi: Map<String, JsonValue>) -> Result<Self, FormError> {
        let spec = abi
            .remove("spec")
            .ok_or_else(|| FormError::Metadata("missing `spec` section".into()))?;
        let spec: Spec = serde_json::from_value(spec).map_err(metadata_error)?;

        let types = abi
            .remove("types")
            .ok_or_else(|| FormError::Metadata("missing `types` section".into()))?;
        let registry: PortableRegistry =
            serde_json::from_value(serde_json::json!({ "types": types })).map_err(metadata_error)?;

        tracing::info!(
            contract = name.as_deref().unwrap_or("<unnamed>"),
            constructors = spec.constructors.len(),
            messages = spec.messages.len(),
            "loaded contract metadata"
        );

        Ok(ContractAbi {
            name,
            constructors: spec.constructors,
            messages: spec.messages,
            registry: Arc::new(registry),
        })
    }

    /// Look up a message by label, then a constructor.
    pub fn find(&self, label: &str) -> Result<&MessageSpec, FormError> {
        self.messages
            .iter()
            .chain(self.constructors.iter())
            .find(|message| message.label == label)
            .ok_or_else(|| FormError::UnknownMessage(label.to_owned()))
    }

    pub fn arg_types(&self, message: &MessageSpec) -> Vec<(String, TypeDef)> {
        message
            .args
            .iter()
            .map(|arg| {
                (
                    arg.label.clone(),
                    TypeDef::lookup(arg.ty.id).with_name(&arg.label),
                )
            })
            .collect()
    }

    /// A fresh argument form for `message`.
    pub fn form(&self, message: &MessageSpec) -> Result<FormNormalized, FormError> {
        FormNormalized::new(self.arg_types(message), self.registry.clone())
    }

    /// Validate whole argument values at once, without building a form.
    /// Arguments missing from `input` are validated as `null`.
    pub fn validate_args(
        &self,
        message: &MessageSpec,
        input: &IndexMap<String, Value>,
    ) -> Result<IndexMap<String, Validated>, FormError> {
        self.arg_types(message)
            .into_iter()
            .map(|(label, ty)| {
                let value = input.get(&label).cloned().unwrap_or_default();
                let validated = validate(&ty, &value, self.registry.as_ref())?;
                Ok((label, validated))
            })
            .collect()
    }

    /// Human readable argument type, as the metadata names it.
    pub fn display_type(&self, arg: &ArgSpec) -> String {
        if arg.ty.display_name.is_empty() {
            format!("Lookup{}", arg.ty.id)
        } else {
            arg.ty.display_name.join("::")
        }
    }
}
