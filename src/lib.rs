//! Argument forms for ink! contract messages.
//!
//! A contract message's parameter list is walked into a flat, uid-keyed
//! store of [`form::FieldData`] records. The store is edited through
//! [`form::Action`]s, validated per field, and finally folded back into the
//! nested [`value::Value`] a contract call expects.

pub mod abi;
pub mod error;
pub mod form;
pub mod value;

pub use abi::{TypeDef, TypeDefInfo, TypeRegistry, TypeTable};
pub use error::FormError;
pub use form::{Action, FieldData, FieldDataSet, FieldValue, FormNormalized, Uid};
pub use value::Value;
