use crate::delay_queue::DelayQueue;
use crate::runtime::{Invocation, ScriptRuntime, TaskContext, VerbReturn};
use crate::vm::{Host, Interpreter, RtValue};
use moor_common::{Dbref, ObjectGraphError, ScriptError, ScriptErrorKind, Value};
use moor_objgraph::{ObjectGraph, PermissionModel, VerbTable};
use moor_resolver::{ResolveResult, Resolver};
use moor_store::model::Object;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// A message queued for delivery to a player, produced by the `notify`
/// builtin. The dispatcher drains these after a command finishes and hands
/// them to whatever transport owns that player's session.
#[derive(Clone, Debug)]
pub struct Notification {
    pub recipient: Object,
    pub message: String,
}

fn graph_err(e: ObjectGraphError) -> ScriptError {
    match e {
        ObjectGraphError::PermissionDenied(p) => p.into(),
        other => ScriptError::new(ScriptErrorKind::Runtime, other.to_string()),
    }
}

fn missing_arg(builtin: &str, index: usize) -> ScriptError {
    ScriptError::new(
        ScriptErrorKind::Runtime,
        format!("{builtin}: missing argument {index}"),
    )
}

fn wrong_type(builtin: &str, index: usize) -> ScriptError {
    ScriptError::new(
        ScriptErrorKind::Runtime,
        format!("{builtin}: argument {index} has the wrong type"),
    )
}

/// Implements `Host` on behalf of a single verb/function invocation, and is
/// the curated surface (spec.md §4.7) scripts reach through `call_builtin`:
/// object graph mutation, player messaging, the resolver, movement, and
/// nested verb/function invocation. Everything not exposed here (direct
/// store access, raw collection scans) is deliberately unreachable from
/// script code.
pub struct BuiltinApi<'a> {
    graph: &'a ObjectGraph,
    runtime: &'a ScriptRuntime,
    task: &'a TaskContext,
    caller: Object,
    player: Object,
    call_depth: usize,
    outbox: RefCell<Vec<Notification>>,
    delay_queue: &'a DelayQueue,
}

impl<'a> BuiltinApi<'a> {
    pub fn new(
        graph: &'a ObjectGraph,
        runtime: &'a ScriptRuntime,
        task: &'a TaskContext,
        caller: Object,
        player: Object,
        call_depth: usize,
        delay_queue: &'a DelayQueue,
    ) -> Self {
        Self {
            graph,
            runtime,
            task,
            caller,
            player,
            call_depth,
            outbox: RefCell::new(Vec::new()),
            delay_queue,
        }
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        self.outbox.borrow_mut().drain(..).collect()
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.graph)
    }

    fn obj_arg(&self, builtin: &str, args: &[RtValue], index: usize) -> Result<Object, ScriptError> {
        args.get(index)
            .and_then(RtValue::as_object)
            .cloned()
            .ok_or_else(|| wrong_type(builtin, index))
    }

    fn str_arg(&self, builtin: &str, args: &[RtValue], index: usize) -> Result<String, ScriptError> {
        args.get(index)
            .and_then(RtValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing_arg(builtin, index))
    }

    fn notify(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let recipient = self.obj_arg("notify", &args, 0)?;
        let message = self.str_arg("notify", &args, 1)?;
        self.outbox.borrow_mut().push(Notification { recipient, message });
        Ok(RtValue::Scalar(Value::Null))
    }

    fn find_object_by_dbref(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let n = match args.first() {
            Some(RtValue::Scalar(Value::Int(n))) => *n,
            _ => return Err(wrong_type("find_object_by_dbref", 0)),
        };
        if n < 0 {
            return Err(ScriptError::new(ScriptErrorKind::Runtime, "negative dbref"));
        }
        self.graph
            .get_object_by_dbref(Dbref(n as u64))
            .map(RtValue::Object)
            .ok_or_else(|| ScriptError::new(ScriptErrorKind::Runtime, format!("no object at #{n}")))
    }

    fn get_class(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let name = self.str_arg("get_class", &args, 0)?;
        self.resolver()
            .resolve_class(&name)
            .map(RtValue::Object)
            .ok_or_else(|| ScriptError::new(ScriptErrorKind::Runtime, format!("no such class {name:?}")))
    }

    fn find_object(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let id = self.str_arg("find_object", &args, 0)?;
        self.graph
            .get_object(&id)
            .map(RtValue::Object)
            .map_err(graph_err)
    }

    fn get_inheritance_chain(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let class_name = self.str_arg("get_inheritance_chain", &args, 0)?;
        let class = self
            .graph
            .get_class_by_name(&class_name)
            .ok_or_else(|| ScriptError::new(ScriptErrorKind::Runtime, format!("no such class {class_name:?}")))?;
        let chain = self.graph.inheritance_chain(class.id.as_str());
        Ok(RtValue::List(chain.into_iter().map(|c| RtValue::str(c.name)).collect()))
    }

    fn get_all_objects(&self) -> Result<RtValue, ScriptError> {
        let all = self.graph.store().objects.find_all();
        Ok(RtValue::List(all.into_iter().map(RtValue::Object).collect()))
    }

    fn get_objects_in_location(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let location = self.obj_arg("get_objects_in_location", &args, 0)?;
        let contents = self.graph.list_in_location(location.id.as_str());
        Ok(RtValue::List(contents.into_iter().map(RtValue::Object).collect()))
    }

    fn get_objects_by_class(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let class_name = self.str_arg("get_objects_by_class", &args, 0)?;
        let class = self
            .graph
            .get_class_by_name(&class_name)
            .ok_or_else(|| ScriptError::new(ScriptErrorKind::Runtime, format!("no such class {class_name:?}")))?;
        let objs = self.graph.find_objects_by_class(class.id.as_str(), true);
        Ok(RtValue::List(objs.into_iter().map(RtValue::Object).collect()))
    }

    fn find_player(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let name = self.str_arg("find_player", &args, 0)?;
        self.graph
            .store()
            .player_by_name(&name)
            .map(RtValue::Object)
            .ok_or_else(|| ScriptError::new(ScriptErrorKind::Runtime, format!("no such player {name:?}")))
    }

    fn find_player_by_id(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let id = self.str_arg("find_player_by_id", &args, 0)?;
        let obj = self.graph.get_object(&id).map_err(graph_err)?;
        if !obj.is_player() {
            return Err(ScriptError::new(ScriptErrorKind::Runtime, format!("{id} is not a player")));
        }
        Ok(RtValue::Object(obj))
    }

    fn get_online_players(&self) -> Result<RtValue, ScriptError> {
        let players = self.graph.store().online_players();
        Ok(RtValue::List(players.into_iter().map(RtValue::Object).collect()))
    }

    fn get_all_players(&self) -> Result<RtValue, ScriptError> {
        let players = self.graph.store().all_players();
        Ok(RtValue::List(players.into_iter().map(RtValue::Object).collect()))
    }

    fn current_player(&self) -> Result<RtValue, ScriptError> {
        Ok(RtValue::Object(self.player.clone()))
    }

    fn has_flag(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let player = self.obj_arg("has_flag", &args, 0)?;
        let flag_name = self.str_arg("has_flag", &args, 1)?;
        let flag = match flag_name.to_lowercase().as_str() {
            "admin" => moor_store::model::PlayerFlag::Admin,
            "moderator" => moor_store::model::PlayerFlag::Moderator,
            "programmer" => moor_store::model::PlayerFlag::Programmer,
            other => return Err(ScriptError::new(ScriptErrorKind::Runtime, format!("no such flag {other:?}"))),
        };
        Ok(RtValue::Scalar(Value::Bool(player.has_flag(flag))))
    }

    fn is_admin(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let player = self.obj_arg("is_admin", &args, 0)?;
        Ok(RtValue::Scalar(Value::Bool(PermissionModel::is_admin(&player))))
    }

    fn is_moderator(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let player = self.obj_arg("is_moderator", &args, 0)?;
        Ok(RtValue::Scalar(Value::Bool(PermissionModel::is_moderator(&player))))
    }

    fn is_programmer(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let player = self.obj_arg("is_programmer", &args, 0)?;
        Ok(RtValue::Scalar(Value::Bool(PermissionModel::is_programmer(&player))))
    }

    fn find_object_in_room(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let name = self.str_arg("find_object_in_room", &args, 0)?;
        match self.resolver().resolve(&name, &self.player, None, None) {
            ResolveResult::Unique(o) => Ok(RtValue::Object(o)),
            ResolveResult::Ambiguous(_) => Err(ScriptError::new(ScriptErrorKind::Runtime, format!("{name:?} is ambiguous"))),
            ResolveResult::None => Err(ScriptError::new(ScriptErrorKind::Runtime, format!("nothing matches {name:?} here"))),
        }
    }

    fn notify_room(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let location = self.obj_arg("notify_room", &args, 0)?;
        let message = self.str_arg("notify_room", &args, 1)?;
        let exclude = args.get(2).and_then(RtValue::as_object).map(|o| o.id.clone());
        for occupant in self.graph.list_in_location(location.id.as_str()) {
            if Some(&occupant.id) == exclude.as_ref() {
                continue;
            }
            self.outbox.borrow_mut().push(Notification {
                recipient: occupant,
                message: message.clone(),
            });
        }
        Ok(RtValue::Scalar(Value::Null))
    }

    fn say_to_room(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let message = self.str_arg("say_to_room", &args, 0)?;
        let exclude_self = args.get(1).map(RtValue::truthy).unwrap_or(false);
        let Some(location) = self.player.location.clone() else {
            return Ok(RtValue::Scalar(Value::Null));
        };
        for occupant in self.graph.list_in_location(location.as_str()) {
            if exclude_self && occupant.id == self.player.id {
                continue;
            }
            self.outbox.borrow_mut().push(Notification {
                recipient: occupant,
                message: message.clone(),
            });
        }
        Ok(RtValue::Scalar(Value::Null))
    }

    fn log(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let text = self.str_arg("log", &args, 0)?;
        tracing::info!(target: "moor_script::log", "{text}");
        Ok(RtValue::Scalar(Value::Null))
    }

    fn join_args(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let items = match args.first() {
            Some(RtValue::List(items)) => items.clone(),
            _ => return Err(wrong_type("join_args", 0)),
        };
        let start = args.get(1).and_then(RtValue::as_object).is_none();
        let start_idx = if start {
            match args.get(1) {
                Some(RtValue::Scalar(Value::Int(n))) => (*n).max(0) as usize,
                _ => 0,
            }
        } else {
            0
        };
        let joined = items
            .iter()
            .skip(start_idx)
            .map(RtValue::to_display_string)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(RtValue::str(joined))
    }

    /// Dynamic-name property access, for scripts that hold the property name
    /// in a variable rather than writing it as a literal `obj.name`. The
    /// `obj.name` member-access syntax (`vm::member_get`) is the common case
    /// and goes through `Host::get_property` directly; this builtin exists
    /// for the remaining case a static identifier can't cover.
    fn get_property(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("get_property", &args, 0)?;
        let name = self.str_arg("get_property", &args, 1)?;
        match self.graph.get_property(target.id.as_str(), &name, &self.caller) {
            Ok(Some(v)) => Ok(RtValue::from_stored(v)),
            Ok(None) => Ok(args.get(2).cloned().unwrap_or(RtValue::Scalar(Value::Null))),
            Err(e) => Err(graph_err(e)),
        }
    }

    fn set_property(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("set_property", &args, 0)?;
        let name = self.str_arg("set_property", &args, 1)?;
        let value = match args.get(2) {
            Some(RtValue::Scalar(v)) => v.clone(),
            Some(other) => Value::String(other.to_display_string()),
            None => return Err(missing_arg("set_property", 2)),
        };
        self.graph
            .set_property(target.id.as_str(), &name, value, &self.caller)
            .map_err(graph_err)?;
        Ok(RtValue::Scalar(Value::Null))
    }

    /// Schedules `verb` on `target` to run after `delay_seconds`, detached
    /// from the current task (spec.md §4.9). Returns the task id so the
    /// caller can `cancel_fork` it later.
    fn fork(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("fork", &args, 0)?;
        let verb_name = self.str_arg("fork", &args, 1)?;
        let delay_seconds = match args.get(2) {
            Some(RtValue::Scalar(Value::Int(n))) => (*n).max(0) as u64,
            Some(RtValue::Scalar(Value::Float(f))) => f.max(0.0) as u64,
            _ => 0,
        };
        let call_args = match args.get(3) {
            Some(RtValue::List(items)) => items.iter().map(RtValue::to_display_string).collect(),
            _ => Vec::new(),
        };
        let id = self.delay_queue.schedule(
            target.id,
            verb_name,
            call_args,
            std::time::Duration::from_secs(delay_seconds),
        );
        Ok(RtValue::Scalar(Value::Int(id as i64)))
    }

    fn cancel_fork(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let id = match args.first() {
            Some(RtValue::Scalar(Value::Int(n))) => *n as u64,
            _ => return Err(wrong_type("cancel_fork", 0)),
        };
        Ok(RtValue::Scalar(Value::Bool(self.delay_queue.cancel(id))))
    }

    fn resolve(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let query = self.str_arg("resolve", &args, 0)?;
        let object_type = args.get(1).and_then(RtValue::as_str);
        match self.resolver().resolve(&query, &self.player, None, object_type) {
            ResolveResult::Unique(o) => Ok(RtValue::Object(o)),
            ResolveResult::Ambiguous(candidates) => Err(ScriptError::new(
                ScriptErrorKind::Runtime,
                format!("{query:?} is ambiguous among {} candidates", candidates.len()),
            )),
            ResolveResult::None => Err(ScriptError::new(
                ScriptErrorKind::Runtime,
                format!("nothing matches {query:?} here"),
            )),
        }
    }

    fn move_object(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("move_object", &args, 0)?;
        let destination = args.get(1).and_then(RtValue::as_object).cloned();
        self.graph
            .move_object(target.id.as_str(), destination.map(|d| d.id))
            .map_err(graph_err)?;
        Ok(RtValue::Scalar(Value::Null))
    }

    fn create_object(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let class_name = self.str_arg("create_object", &args, 0)?;
        let location = args.get(1).and_then(RtValue::as_object).map(|o| o.id.clone());
        let class = self
            .resolver()
            .resolve_class(&class_name)
            .ok_or_else(|| ScriptError::new(ScriptErrorKind::Runtime, format!("no such class {class_name:?}")))?;
        let obj = self
            .graph
            .create_instance(class.id.as_str(), location, self.caller.id.clone())
            .map_err(graph_err)?;
        Ok(RtValue::Object(obj))
    }

    fn destroy_object(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("destroy_object", &args, 0)?;
        let cascade = args.get(1).map(RtValue::truthy).unwrap_or(false);
        PermissionModel::check_verb_mutation(&self.caller, &target).map_err(ScriptError::from)?;
        self.graph.destroy(target.id.as_str(), cascade).map_err(graph_err)?;
        Ok(RtValue::Scalar(Value::Null))
    }

    fn list_contents(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("list_contents", &args, 0)?;
        let contents = self.graph.list_in_location(target.id.as_str());
        Ok(RtValue::List(contents.into_iter().map(RtValue::Object).collect()))
    }

    /// Renders a room the way the `look` verb in the starter world is meant
    /// to: name, description, then a line per occupant/exit/item so verb
    /// authors don't each re-implement the same listing.
    fn describe_room(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let room = self.obj_arg("describe_room", &args, 0)?;
        let description = match self.graph.get_property(room.id.as_str(), "description", &self.caller) {
            Ok(Some(Value::String(s))) => s,
            _ => String::new(),
        };
        let mut lines = vec![format!("=== {} ===", room.name)];
        if !description.is_empty() {
            lines.push(description);
        }
        for occupant in self.graph.list_in_location(room.id.as_str()) {
            if occupant.id == self.player.id {
                continue;
            }
            lines.push(format!("You see {} here.", occupant.name));
        }
        Ok(RtValue::str(lines.join("\n")))
    }

    /// Looks up a verb without invoking it, for scripts that want to check
    /// whether one exists (or inspect its metadata) before calling it with
    /// `call_verb`. Returns `null` when no verb by that name is visible
    /// through the inheritance walk.
    fn find_verb(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("find_verb", &args, 0)?;
        let name = self.str_arg("find_verb", &args, 1)?;
        match VerbTable::new(self.graph).find_verb(target.id.as_str(), &name) {
            Some(v) => Ok(RtValue::Doc(BTreeMap::from([
                ("name".to_string(), RtValue::str(v.name)),
                ("objectId".to_string(), RtValue::str(v.object_id.to_string())),
                ("description".to_string(), RtValue::str(v.description)),
                ("permissions".to_string(), RtValue::str(format!("{:?}", v.permissions))),
            ]))),
            None => Ok(RtValue::Scalar(Value::Null)),
        }
    }

    fn find_function(&self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("find_function", &args, 0)?;
        let name = self.str_arg("find_function", &args, 1)?;
        let system_id = self.graph.store().objects.find_one(|o| o.is_system_object()).map(|o| o.id);
        match VerbTable::new(self.graph).find_function(target.id.as_str(), &name, true, system_id.as_deref_str()) {
            Some(f) => Ok(RtValue::Doc(BTreeMap::from([
                ("name".to_string(), RtValue::str(f.name)),
                ("objectId".to_string(), RtValue::str(f.object_id.to_string())),
                ("description".to_string(), RtValue::str(f.description)),
                ("permissions".to_string(), RtValue::str(format!("{:?}", f.permissions))),
            ]))),
            None => Ok(RtValue::Scalar(Value::Null)),
        }
    }

    fn call_verb(&mut self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("call_verb", &args, 0)?;
        let verb_name = self.str_arg("call_verb", &args, 1)?;
        let call_args = match args.get(2) {
            Some(RtValue::List(items)) => items.iter().map(RtValue::to_display_string).collect(),
            _ => Vec::new(),
        };
        let verb = VerbTable::new(self.graph)
            .find_verb(target.id.as_str(), &verb_name)
            .ok_or_else(|| {
                ScriptError::new(
                    ScriptErrorKind::FunctionNotFound,
                    format!("no such verb {verb_name:?} on {}", target.name),
                )
            })?;
        let next_depth = self.call_depth + 1;
        let invocation = Invocation {
            this: target.clone(),
            caller: self.caller.clone(),
            player: self.player.clone(),
            args: call_args,
            input: String::new(),
            verb: verb_name,
            variables: Default::default(),
            call_depth: next_depth,
        };
        let saved_caller = std::mem::replace(&mut self.caller, target);
        let saved_depth = std::mem::replace(&mut self.call_depth, next_depth);
        let result = self.runtime.execute_verb(&verb, invocation, self.task, self);
        self.caller = saved_caller;
        self.call_depth = saved_depth;
        Ok(match result? {
            VerbReturn::Text(s) => RtValue::str(s),
            VerbReturn::Bool(b) => RtValue::Scalar(Value::Bool(b)),
        })
    }

    fn call_function(&mut self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        let target = self.obj_arg("call_function", &args, 0)?;
        let function_name = self.str_arg("call_function", &args, 1)?;
        let call_args = match args.get(2) {
            Some(RtValue::List(items)) => items.iter().map(RtValue::to_display_string).collect(),
            _ => Vec::new(),
        };
        let system_id = self
            .graph
            .store()
            .objects
            .find_one(|o| o.is_system_object())
            .map(|o| o.id);
        let function = VerbTable::new(self.graph)
            .find_function(target.id.as_str(), &function_name, true, system_id.as_deref_str())
            .ok_or_else(|| {
                ScriptError::new(
                    ScriptErrorKind::FunctionNotFound,
                    format!("no such function {function_name:?} on {}", target.name),
                )
            })?;
        let next_depth = self.call_depth + 1;
        let invocation = Invocation {
            this: target.clone(),
            caller: self.caller.clone(),
            player: self.player.clone(),
            args: call_args,
            input: String::new(),
            verb: function_name,
            variables: Default::default(),
            call_depth: next_depth,
        };
        let saved_caller = std::mem::replace(&mut self.caller, target);
        let saved_depth = std::mem::replace(&mut self.call_depth, next_depth);
        let result = self.runtime.execute_function(&function, invocation, self.task, self);
        self.caller = saved_caller;
        self.call_depth = saved_depth;
        Ok(RtValue::from_stored(result?))
    }

    /// Admin-only raw script evaluation (spec.md §4.8: store/interpreter
    /// bypass operations are Admin-gated). Runs in the same host so nested
    /// property access and builtins see the calling verb's permissions.
    fn execute_script(&mut self, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        PermissionModel::require_admin(&self.caller).map_err(ScriptError::from)?;
        let source = self.str_arg("execute_script", &args, 0)?;
        if self.call_depth + 1 > self.runtime.config().max_call_depth {
            return Err(ScriptError::new(ScriptErrorKind::CallDepthExceeded, "call depth exceeded"));
        }
        let program = self.runtime.compile(&source)?;
        self.call_depth += 1;
        let mut interp = Interpreter::new(self, HashMap::new(), &source);
        let result = interp.run(&program);
        self.call_depth -= 1;
        result
    }
}

trait SystemIdExt {
    fn as_deref_str(&self) -> Option<&str>;
}

impl SystemIdExt for Option<moor_common::ObjectId> {
    fn as_deref_str(&self) -> Option<&str> {
        self.as_ref().map(|id| id.as_str())
    }
}

impl<'a> Host for BuiltinApi<'a> {
    fn current_caller(&self) -> &Object {
        &self.caller
    }

    fn get_property(&mut self, obj: &Object, name: &str) -> Result<RtValue, ScriptError> {
        match self.graph.get_property(obj.id.as_str(), name, &self.caller) {
            Ok(Some(v)) => Ok(RtValue::from_stored(v)),
            Ok(None) => Ok(RtValue::Scalar(Value::Null)),
            Err(e) => Err(graph_err(e)),
        }
    }

    fn set_property(&mut self, obj: &Object, name: &str, value: RtValue) -> Result<(), ScriptError> {
        let stored = match value {
            RtValue::Scalar(v) => v,
            other => Value::String(other.to_display_string()),
        };
        self.graph
            .set_property(obj.id.as_str(), name, stored, &self.caller)
            .map_err(graph_err)
    }

    fn call_builtin(&mut self, name: &str, args: Vec<RtValue>) -> Result<RtValue, ScriptError> {
        match name {
            "notify" => self.notify(args),
            "find_object_by_dbref" => self.find_object_by_dbref(args),
            "find_object" => self.find_object(args),
            "get_class" => self.get_class(args),
            "get_property" => BuiltinApi::get_property(self, args),
            "set_property" => BuiltinApi::set_property(self, args),
            "get_inheritance_chain" => self.get_inheritance_chain(args),
            "get_all_objects" => self.get_all_objects(),
            "get_objects_in_location" => self.get_objects_in_location(args),
            "get_objects_by_class" => self.get_objects_by_class(args),
            "find_player" => self.find_player(args),
            "find_player_by_id" => self.find_player_by_id(args),
            "get_online_players" => self.get_online_players(),
            "get_all_players" => self.get_all_players(),
            "current_player" => self.current_player(),
            "has_flag" => self.has_flag(args),
            "is_admin" => self.is_admin(args),
            "is_moderator" => self.is_moderator(args),
            "is_programmer" => self.is_programmer(args),
            "find_object_in_room" => self.find_object_in_room(args),
            "find_object_in_inventory" => self.find_object_in_room(args),
            "notify_room" => self.notify_room(args),
            "say_to_room" => self.say_to_room(args),
            "log" => self.log(args),
            "join_args" => self.join_args(args),
            "resolve" => self.resolve(args),
            "move_object" => self.move_object(args),
            "create_object" => self.create_object(args),
            "destroy_object" => self.destroy_object(args),
            "list_contents" => self.list_contents(args),
            "describe_room" => self.describe_room(args),
            "fork" => self.fork(args),
            "cancel_fork" => self.cancel_fork(args),
            "find_verb" => self.find_verb(args),
            "find_function" => self.find_function(args),
            "call_verb" => self.call_verb(args),
            "call_function" => self.call_function(args),
            "execute_script" => self.execute_script(args),
            other => Err(ScriptError::new(
                ScriptErrorKind::FunctionNotFound,
                format!("no such builtin {other:?}"),
            )),
        }
    }

    fn check_cancelled(&self) -> Result<(), ScriptError> {
        if self.task.expired() {
            Err(ScriptError::new(ScriptErrorKind::Timeout, "execution deadline exceeded"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeConfig;
    use chrono::Utc;
    use moor_common::ObjectId;
    use moor_store::WorldStore;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn blank_object(graph: &ObjectGraph, name: &str) -> Object {
        graph
            .create_plain_object(Object {
                id: ObjectId::new(),
                dbref: graph.next_dbref(),
                class_id: None,
                name: name.into(),
                aliases: vec![],
                instance_properties: BTreeMap::new(),
                property_access: BTreeMap::new(),
                location: None,
                owner: ObjectId::from_str("owner"),
                player: None,
                created_at: Utc::now(),
                modified_at: Utc::now(),
            })
            .unwrap()
    }

    #[test]
    fn notify_queues_a_message_for_later_delivery() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let runtime = ScriptRuntime::new(RuntimeConfig::default());
        let task = TaskContext::new(Duration::from_secs(5));
        let player = blank_object(&graph, "Alice");
        let delay_queue = DelayQueue::new();
        let mut api = BuiltinApi::new(&graph, &runtime, &task, player.clone(), player.clone(), 0, &delay_queue);
        api.call_builtin("notify", vec![RtValue::Object(player.clone()), RtValue::str("hi")])
            .unwrap();
        let notes = api.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "hi");
    }

    #[test]
    fn list_contents_reflects_location() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let runtime = ScriptRuntime::new(RuntimeConfig::default());
        let task = TaskContext::new(Duration::from_secs(5));
        let room = blank_object(&graph, "Lobby");
        let item = blank_object(&graph, "key");
        graph.move_object(item.id.as_str(), Some(room.id.clone())).unwrap();
        let delay_queue = DelayQueue::new();
        let mut api = BuiltinApi::new(&graph, &runtime, &task, room.clone(), room.clone(), 0, &delay_queue);
        let result = api.call_builtin("list_contents", vec![RtValue::Object(room)]).unwrap();
        match result {
            RtValue::List(items) => assert_eq!(items.len(), 1),
            other => panic!("expected list, got {other:?}"),
        }
    }
}
