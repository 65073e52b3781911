use thiserror::Error;

use crate::form::Uid;

/// Failures that are not about user input: malformed metadata, or a form
/// action that does not fit the current field store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("type `{0}` is missing its sub type")]
    MissingSub(String),

    #[error("fixed vector `{0}` is missing its length")]
    MissingLength(String),

    #[error("lookup type `{0}` has no lookup index")]
    MissingLookupIndex(String),

    #[error("type lookup {0} not found in registry")]
    UnknownLookup(u32),

    #[error("type `{0}` is nested too deeply")]
    TooDeep(String),

    #[error("field {0} not found in form")]
    UnknownField(Uid),

    #[error("field {0} does not hold a list of sub fields")]
    NotAList(Uid),

    #[error("field {sub} is not a sub field of {parent}")]
    NotASubField { parent: Uid, sub: Uid },

    #[error("no message or constructor named `{0}`")]
    UnknownMessage(String),

    #[error("invalid contract metadata: {0}")]
    Metadata(String),
}
