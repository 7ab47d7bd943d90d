//! Compilation cache, invocation scaffolding, the embedded verb/function
//! scripting language, the curated builtin surface, and the delay queue
//! (spec.md §4.6, §4.7, §4.9). `builtins` and `runtime` live alongside the
//! interpreter rather than in a separate crate because `BuiltinApi` must
//! call back into `ScriptRuntime` for nested verb/function invocation —
//! splitting them would make the two crates depend on each other.

pub mod ast;
pub mod builtins;
pub mod delay_queue;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod runtime;
pub mod vm;

pub use builtins::{BuiltinApi, Notification};
pub use delay_queue::{DelayQueue, DelayedTask};
pub use runtime::{Invocation, RuntimeConfig, ScriptRuntime, TaskContext, VerbReturn};
pub use vm::{Host, RtValue};
