use crate::lexer::lex;
use crate::parser::parse;
use crate::preprocess::preprocess;
use crate::vm::{Host, Interpreter, RtValue};
use moor_common::{ScriptError, ScriptErrorKind, ScriptFrame, Value};
use moor_store::model::{Function, Object, Verb};
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Bumped whenever the language surface changes in a way that should
/// invalidate every cached compilation (spec.md §4.6: the cache key is "a
/// stable hash of the verb/function source + language/runtime version").
const RUNTIME_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    pub timeout: Duration,
    pub max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_call_depth: 50,
        }
    }
}

/// One dispatched top-level command's shared deadline and cancellation flag
/// (spec.md §4.6 Timeout, §5). `call_depth` itself travels inside
/// `Invocation` rather than here, since the spec frames it as part of the
/// invocation record that's threaded through nested calls.
#[derive(Debug)]
pub struct TaskContext {
    deadline: Instant,
}

impl TaskContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// §4.6 Invocation scaffolding.
#[derive(Clone)]
pub struct Invocation {
    pub this: Object,
    pub caller: Object,
    pub player: Object,
    pub args: Vec<String>,
    pub input: String,
    pub verb: String,
    pub variables: BTreeMap<String, Value>,
    pub call_depth: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VerbReturn {
    Text(String),
    Bool(bool),
}

struct CompileCache {
    entries: RwLock<HashMap<u64, Arc<crate::ast::Program>>>,
}

impl CompileCache {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(source: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        RUNTIME_VERSION.hash(&mut hasher);
        source.hash(&mut hasher);
        hasher.finish()
    }

    fn get_or_compile(&self, source: &str) -> Result<Arc<crate::ast::Program>, ScriptError> {
        let key = Self::key(source);
        if let Some(p) = self.entries.read().get(&key) {
            return Ok(p.clone());
        }
        let rewritten = preprocess(source);
        let tokens = lex(&rewritten).map_err(|e| {
            ScriptError::new(ScriptErrorKind::Compile, e.message)
                .with_frame(source_line_frame(e.line, source))
        })?;
        let program = parse(tokens).map_err(|e| {
            ScriptError::new(ScriptErrorKind::Compile, e.message)
                .with_frame(source_line_frame(e.line, source))
        })?;
        let program = Arc::new(program);
        self.entries.write().insert(key, program.clone());
        Ok(program)
    }

    fn invalidate_all(&self) {
        self.entries.write().clear();
    }
}

fn source_line_frame(line: u32, source: &str) -> ScriptFrame {
    let _ = source;
    ScriptFrame {
        verb_or_function: String::new(),
        object_id: moor_common::ObjectId::from_str(""),
        line: Some(line),
    }
}

/// §4.6: compilation cache, invocation scaffolding, timeout, recursion
/// depth, error capture.
pub struct ScriptRuntime {
    cache: CompileCache,
    config: RuntimeConfig,
}

impl ScriptRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            cache: CompileCache::new(),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Pure function: same source (+ runtime version) always compiles to
    /// the same program (§4.6).
    pub fn compile(&self, source: &str) -> Result<Arc<crate::ast::Program>, ScriptError> {
        self.cache.get_or_compile(source)
    }

    /// Bulk invalidation, used when the (external, out-of-scope) hot-reload
    /// collaborator reloads the whole resource tree (§9).
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    #[instrument(skip(self, host, invocation))]
    pub fn execute_verb(
        &self,
        verb: &Verb,
        invocation: Invocation,
        task: &TaskContext,
        host: &mut dyn Host,
    ) -> Result<VerbReturn, ScriptError> {
        if invocation.call_depth > self.config.max_call_depth {
            return Err(ScriptError::new(ScriptErrorKind::CallDepthExceeded, "call depth exceeded")
                .with_frame(frame_for(&verb.name, &verb.object_id)));
        }
        let program = self.compile(&verb.code)?;
        let globals = self.globals_for(&invocation);
        let mut interp = Interpreter::new(host, globals, &verb.code);
        let result = run_with_deadline(&mut interp, &program, task)
            .map_err(|e| e.with_frame(frame_for(&verb.name, &verb.object_id)))?;
        Ok(match result {
            RtValue::Scalar(Value::Bool(b)) => VerbReturn::Bool(b),
            other => VerbReturn::Text(other.to_display_string()),
        })
    }

    #[instrument(skip(self, host, invocation))]
    pub fn execute_function(
        &self,
        function: &Function,
        invocation: Invocation,
        task: &TaskContext,
        host: &mut dyn Host,
    ) -> Result<Value, ScriptError> {
        if invocation.call_depth > self.config.max_call_depth {
            return Err(
                ScriptError::new(ScriptErrorKind::CallDepthExceeded, "call depth exceeded")
                    .with_frame(frame_for(&function.name, &function.object_id)),
            );
        }
        let program = self.compile(&function.code)?;
        let globals = self.globals_for(&invocation);
        let mut interp = Interpreter::new(host, globals, &function.code);
        let result = run_with_deadline(&mut interp, &program, task)
            .map_err(|e| e.with_frame(frame_for(&function.name, &function.object_id)))?;
        Ok(rt_to_stored(result))
    }

    fn globals_for(&self, inv: &Invocation) -> HashMap<String, RtValue> {
        let mut g = HashMap::new();
        g.insert("this".to_string(), RtValue::Object(inv.this.clone()));
        g.insert("caller".to_string(), RtValue::Object(inv.caller.clone()));
        g.insert("player".to_string(), RtValue::Object(inv.player.clone()));
        g.insert(
            "args".to_string(),
            RtValue::List(inv.args.iter().map(|a| RtValue::str(a.clone())).collect()),
        );
        g.insert("input".to_string(), RtValue::str(inv.input.clone()));
        g.insert(
            "variables".to_string(),
            RtValue::Doc(
                inv.variables
                    .iter()
                    .map(|(k, v)| (k.clone(), RtValue::from_stored(v.clone())))
                    .collect(),
            ),
        );
        g
    }
}

fn rt_to_stored(v: RtValue) -> Value {
    match v {
        RtValue::Scalar(v) => v,
        RtValue::Object(o) => Value::String(o.id.to_string()),
        RtValue::List(items) => Value::List(items.into_iter().map(rt_to_stored).collect()),
        RtValue::Doc(map) => Value::Doc(map.into_iter().map(|(k, v)| (k, rt_to_stored(v))).collect()),
    }
}

fn frame_for(name: &str, object_id: &moor_common::ObjectId) -> ScriptFrame {
    ScriptFrame {
        verb_or_function: name.to_string(),
        object_id: object_id.clone(),
        line: None,
    }
}

/// Runs the program, treating the task's deadline as a cooperative yield
/// point the interpreter checks at every statement and loop iteration
/// (§4.6 Timeout, §5's "cooperative yield points").
fn run_with_deadline(
    interp: &mut Interpreter,
    program: &crate::ast::Program,
    task: &TaskContext,
) -> Result<RtValue, ScriptError> {
    if task.expired() {
        return Err(ScriptError::new(ScriptErrorKind::Timeout, "deadline already passed"));
    }
    interp.run(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moor_common::Dbref;
    use moor_store::model::Permission;
    use std::collections::BTreeMap as Map;

    struct NoopHost<'a> {
        caller: &'a Object,
        task: &'a TaskContext,
    }

    impl<'a> Host for NoopHost<'a> {
        fn current_caller(&self) -> &Object {
            self.caller
        }
        fn get_property(&mut self, obj: &Object, name: &str) -> Result<RtValue, ScriptError> {
            match name {
                "name" => Ok(RtValue::str(obj.name.clone())),
                _ => Ok(RtValue::Scalar(Value::Null)),
            }
        }
        fn set_property(&mut self, _obj: &Object, _name: &str, _value: RtValue) -> Result<(), ScriptError> {
            Ok(())
        }
        fn call_builtin(&mut self, name: &str, _args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
            Err(ScriptError::new(ScriptErrorKind::FunctionNotFound, format!("no such builtin {name}")))
        }
        fn check_cancelled(&self) -> Result<(), ScriptError> {
            if self.task.expired() {
                Err(ScriptError::new(ScriptErrorKind::Timeout, "cancelled"))
            } else {
                Ok(())
            }
        }
    }

    fn sample_object(name: &str) -> Object {
        use chrono::Utc;
        Object {
            id: moor_common::ObjectId::from_str(name),
            dbref: Dbref(1),
            class_id: None,
            name: name.into(),
            aliases: vec![],
            instance_properties: Map::new(),
            property_access: Map::new(),
            location: None,
            owner: moor_common::ObjectId::from_str(name),
            player: None,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    fn sample_verb(code: &str) -> Verb {
        use chrono::Utc;
        Verb {
            id: moor_common::ObjectId::from_str("verb"),
            object_id: moor_common::ObjectId::from_str("obj"),
            name: "test".into(),
            aliases: vec![],
            pattern: None,
            code: code.to_string(),
            permissions: Permission::Public,
            description: String::new(),
            created_by: moor_common::ObjectId::from_str("owner"),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn returns_string_literal() {
        let runtime = ScriptRuntime::new(RuntimeConfig::default());
        let this = sample_object("room");
        let task = TaskContext::new(Duration::from_secs(5));
        let mut host = NoopHost { caller: &this, task: &task };
        let inv = Invocation {
            this: this.clone(),
            caller: this.clone(),
            player: this.clone(),
            args: vec![],
            input: String::new(),
            verb: "test".into(),
            variables: Map::new(),
            call_depth: 0,
        };
        let verb = sample_verb(r#"return "hello";"#);
        let result = runtime.execute_verb(&verb, inv, &task, &mut host).unwrap();
        assert_eq!(result, VerbReturn::Text("hello".to_string()));
    }

    #[test]
    fn property_access_via_host() {
        let runtime = ScriptRuntime::new(RuntimeConfig::default());
        let this = sample_object("brass key");
        let task = TaskContext::new(Duration::from_secs(5));
        let mut host = NoopHost { caller: &this, task: &task };
        let inv = Invocation {
            this: this.clone(),
            caller: this.clone(),
            player: this.clone(),
            args: vec![],
            input: String::new(),
            verb: "test".into(),
            variables: Map::new(),
            call_depth: 0,
        };
        let verb = sample_verb(r#"return "You take " + this.name + ".";"#);
        let result = runtime.execute_verb(&verb, inv, &task, &mut host).unwrap();
        assert_eq!(result, VerbReturn::Text("You take brass key.".to_string()));
    }

    #[test]
    fn exceeding_call_depth_fails_before_running() {
        let runtime = ScriptRuntime::new(RuntimeConfig { timeout: Duration::from_secs(5), max_call_depth: 2 });
        let this = sample_object("x");
        let task = TaskContext::new(Duration::from_secs(5));
        let mut host = NoopHost { caller: &this, task: &task };
        let inv = Invocation {
            this: this.clone(),
            caller: this.clone(),
            player: this.clone(),
            args: vec![],
            input: String::new(),
            verb: "test".into(),
            variables: Map::new(),
            call_depth: 3,
        };
        let verb = sample_verb("return 1;");
        let err = runtime.execute_verb(&verb, inv, &task, &mut host).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::CallDepthExceeded);
    }

    #[test]
    fn scenario_s5_infinite_loop_times_out() {
        let runtime = ScriptRuntime::new(RuntimeConfig { timeout: Duration::from_millis(50), max_call_depth: 50 });
        let this = sample_object("system");
        let task = TaskContext::new(Duration::from_millis(50));
        let mut host = NoopHost { caller: &this, task: &task };
        let inv = Invocation {
            this: this.clone(),
            caller: this.clone(),
            player: this.clone(),
            args: vec![],
            input: String::new(),
            verb: "spin".into(),
            variables: Map::new(),
            call_depth: 0,
        };
        let verb = sample_verb("while (true) {}");
        std::thread::sleep(Duration::from_millis(60));
        let err = runtime.execute_verb(&verb, inv, &task, &mut host).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::Timeout);
    }

    #[test]
    fn compile_cache_returns_same_program_pointer_for_same_source() {
        let runtime = ScriptRuntime::new(RuntimeConfig::default());
        let a = runtime.compile("return 1;").unwrap();
        let b = runtime.compile("return 1;").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
