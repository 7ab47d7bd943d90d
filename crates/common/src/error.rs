//! The error taxonomy from spec.md §7, split by the component that raises
//! each kind. Each typed error is a `thiserror` enum in the teacher's style:
//! short `#[error(...)]` messages, `#[source]` chains where one wraps
//! another.

use crate::ids::ObjectId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    #[error("document not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectGraphError {
    #[error("a class named {0:?} already exists")]
    DuplicateName(String),
    #[error("a verb named {0:?} already exists with a different owner")]
    DuplicateVerb(String),
    #[error("parent class {0} does not exist")]
    MissingParent(ObjectId),
    #[error("class inheritance would be cyclic")]
    CyclicInheritance,
    #[error("class {0} is abstract and cannot be instantiated")]
    AbstractClass(ObjectId),
    #[error("object {0} not found")]
    NotFound(ObjectId),
    #[error("class {0} still has living instances")]
    HasLivingInstances(ObjectId),
    #[error("object {0} still has contents")]
    HasContents(ObjectId),
    #[error("move would create a containment cycle")]
    CyclicMove,
    #[error("permission denied: {0}")]
    PermissionDenied(#[from] PermissionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("{actor} may not {action} on {target}")]
    Denied {
        actor: ObjectId,
        action: String,
        target: ObjectId,
    },
    #[error("property {0:?} is read-only")]
    ReadOnlyProperty(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("nothing matches {0:?} here")]
    NotFound(String),
    #[error("{query:?} is ambiguous among {count} candidates")]
    Ambiguous { query: String, count: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("I don't understand that.")]
    VerbNotFound,
    #[error("which one did you mean?")]
    AmbiguousTarget(Vec<ObjectId>),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Permission(#[from] PermissionError),
}

/// §4.6's error kinds. Kept as a single flat enum with a `kind` discriminant
/// (rather than one variant per kind wrapping heterogeneous payloads)
/// because §4.6 specifies `ScriptError` as one struct shape, not a sum type.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ScriptErrorKind {
    Compile,
    Runtime,
    Permission,
    PropertyAccess,
    FunctionNotFound,
    ContextMissing,
    Timeout,
    CallDepthExceeded,
}

impl ScriptErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            ScriptErrorKind::Compile => "That verb doesn't compile.",
            ScriptErrorKind::Runtime => "Something went wrong running that.",
            ScriptErrorKind::Permission => "You can't do that.",
            ScriptErrorKind::PropertyAccess => "You can't access that property.",
            ScriptErrorKind::FunctionNotFound => "No such function.",
            ScriptErrorKind::ContextMissing => "There's no active context for that.",
            ScriptErrorKind::Timeout => "That took too long.",
            ScriptErrorKind::CallDepthExceeded => "Too much recursion.",
        }
    }
}

/// One stack frame, identifying the verb/function and the offending line
/// within its source (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFrame {
    pub verb_or_function: String,
    pub object_id: ObjectId,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub message: String,
    pub frames: Vec<ScriptFrame>,
    pub source_snippet: Option<String>,
}

impl ScriptError {
    pub fn new(kind: ScriptErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            frames: Vec::new(),
            source_snippet: None,
        }
    }

    pub fn with_frame(mut self, frame: ScriptFrame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Formats the way the Dispatcher surfaces an uncaught error to a user
    /// (§7's "Surface" column).
    pub fn user_facing(&self) -> String {
        self.kind.user_message().to_string()
    }
}

impl From<PermissionError> for ScriptError {
    fn from(e: PermissionError) -> Self {
        ScriptError::new(ScriptErrorKind::Permission, e.to_string())
    }
}
