//! Shared value types, identifiers, and error taxonomy for moor-core.
//!
//! This crate has no knowledge of storage, scripting, or dispatch — it only
//! defines the vocabulary every other crate in the workspace shares.

pub mod error;
pub mod ids;
pub mod util;
pub mod value;

pub use error::{
    DispatchError, ObjectGraphError, PermissionError, ResolverError, ScriptError, ScriptErrorKind,
    ScriptFrame, StoreError,
};
pub use ids::{ClassId, Dbref, ObjectId};
pub use value::{PropertyAccess, Value};
