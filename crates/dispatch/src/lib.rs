//! Turns a player's raw input line into a verb invocation or an `@`-command
//! (spec.md §4.5): tokenization, candidate-target ordering, pattern
//! matching with named captures, and permission pre-checks before a verb
//! ever runs.

mod commands;
mod pattern;

use chrono::Utc;
use moor_common::Value;
use moor_objgraph::{ObjectGraph, VerbTable};
use moor_script::{BuiltinApi, DelayQueue, Invocation, ScriptRuntime, TaskContext, VerbReturn};
use moor_store::model::{Object, Verb};
use std::collections::BTreeMap;
use tracing::instrument;

/// Result of one dispatched command: the text to show the invoking player,
/// plus any messages other players/objects should receive (spec.md §4.7
/// `notify`).
#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    pub text: String,
    pub notifications: Vec<moor_script::Notification>,
}

impl DispatchOutcome {
    fn text_only(text: impl Into<String>) -> Self {
        Self { text: text.into(), notifications: Vec::new() }
    }
}

pub struct Dispatcher<'g> {
    graph: &'g ObjectGraph,
    runtime: &'g ScriptRuntime,
    delay_queue: DelayQueue,
}

impl<'g> Dispatcher<'g> {
    pub fn new(graph: &'g ObjectGraph, runtime: &'g ScriptRuntime) -> Self {
        Self { graph, runtime, delay_queue: DelayQueue::new() }
    }

    /// Fires every `fork`/`delay` task whose deadline has passed (spec.md
    /// §4.9): each runs as a self-invocation of the scheduling object (no
    /// originating player survives the wait, so the object is both `caller`
    /// and `player` for its own deferred verb).
    pub fn run_pending(&self) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        for due in self.delay_queue.pop_ready() {
            let Ok(target) = self.graph.get_object(due.object_id.as_str()) else { continue };
            let Some(verb) = VerbTable::new(self.graph).find_verb(target.id.as_str(), &due.verb) else { continue };
            let invocation = Invocation {
                this: target.clone(),
                caller: target.clone(),
                player: target.clone(),
                args: due.args,
                input: String::new(),
                verb: due.verb,
                variables: BTreeMap::new(),
                call_depth: 0,
            };
            let task = TaskContext::new(self.runtime.config().timeout);
            let mut host = BuiltinApi::new(self.graph, self.runtime, &task, target.clone(), target, 0, &self.delay_queue);
            let result = self.runtime.execute_verb(&verb, invocation, &task, &mut host);
            let notifications = host.take_notifications();
            let text = match result {
                Ok(VerbReturn::Text(s)) => s,
                Ok(VerbReturn::Bool(_)) => String::new(),
                Err(e) => e.user_facing(),
            };
            outcomes.push(DispatchOutcome { text, notifications });
        }
        outcomes
    }

    #[instrument(skip(self, player, input))]
    pub fn dispatch(&self, player: &Object, input: &str) -> DispatchOutcome {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return DispatchOutcome::text_only("");
        }
        let (command_word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim_start()),
            None => (trimmed, ""),
        };

        if command_word.starts_with('@') {
            if let Some(text) = commands::handle_at_command(self.graph, self.runtime, player, command_word, rest) {
                return DispatchOutcome::text_only(text);
            }
            // Unrecognized `@`-command: falls through to verb lookup so
            // players may define their own (spec.md §6).
        }

        match self.find_verb_candidate(player, command_word) {
            Some((target, verb)) => self.invoke(player, &target, &verb, command_word, rest),
            None => DispatchOutcome::text_only("I don't understand that."),
        }
    }

    /// Candidate-target order (spec.md §4.5): the player themself, their
    /// location, their inventory, the room's other contents, then the
    /// system object as a last resort — first object exposing a verb whose
    /// name or pattern matches wins.
    fn find_verb_candidate(&self, player: &Object, command_word: &str) -> Option<(Object, Verb)> {
        let table = VerbTable::new(self.graph);
        let mut candidates = vec![player.clone()];
        if let Some(loc_id) = &player.location {
            if let Ok(room) = self.graph.get_object(loc_id.as_str()) {
                candidates.push(room.clone());
            }
        }
        candidates.extend(self.graph.list_in_location(player.id.as_str()));
        if let Some(loc_id) = &player.location {
            candidates.extend(self.graph.list_in_location(loc_id.as_str()));
        }
        if let Some(sys) = self.graph.store().objects.find_one(|o| o.is_system_object()) {
            candidates.push(sys);
        }
        for candidate in candidates {
            if let Some(verb) = table.find_verb(candidate.id.as_str(), command_word) {
                return Some((candidate, verb));
            }
        }
        None
    }

    fn invoke(&self, player: &Object, target: &Object, verb: &Verb, verb_name: &str, rest: &str) -> DispatchOutcome {
        let mut variables = BTreeMap::new();
        let args: Vec<String> = if let Some(pattern) = &verb.pattern {
            match pattern::match_pattern(pattern, rest) {
                Some(captures) => {
                    for (name, value) in &captures {
                        if !name.is_empty() {
                            variables.insert(name.clone(), Value::from(value.clone()));
                        }
                    }
                    captures.into_iter().map(|(_, v)| v).collect()
                }
                None => return DispatchOutcome::text_only("That doesn't work that way."),
            }
        } else if rest.is_empty() {
            Vec::new()
        } else {
            rest.split_whitespace().map(str::to_string).collect()
        };

        let invocation = Invocation {
            this: target.clone(),
            caller: player.clone(),
            player: player.clone(),
            args,
            input: rest.to_string(),
            verb: verb_name.to_string(),
            variables,
            call_depth: 0,
        };
        let task = TaskContext::new(self.runtime.config().timeout);
        let mut host = BuiltinApi::new(
            self.graph,
            self.runtime,
            &task,
            target.clone(),
            player.clone(),
            0,
            &self.delay_queue,
        );
        let result = self.runtime.execute_verb(verb, invocation, &task, &mut host);
        let notifications = host.take_notifications();
        let text = match result {
            Ok(VerbReturn::Text(s)) => s,
            Ok(VerbReturn::Bool(true)) => String::new(),
            Ok(VerbReturn::Bool(false)) => "I don't understand that.".to_string(),
            Err(e) => e.user_facing(),
        };
        DispatchOutcome { text, notifications }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moor_common::ObjectId;
    use moor_script::RuntimeConfig;
    use moor_store::model::Permission;
    use moor_store::WorldStore;
    use std::sync::Arc;

    fn plain_object(graph: &ObjectGraph, name: &str, location: Option<ObjectId>) -> Object {
        graph
            .create_plain_object(Object {
                id: ObjectId::new(),
                dbref: graph.next_dbref(),
                class_id: None,
                name: name.into(),
                aliases: vec![],
                instance_properties: BTreeMap::new(),
                property_access: BTreeMap::new(),
                location,
                owner: ObjectId::from_str("owner"),
                player: None,
                created_at: Utc::now(),
                modified_at: Utc::now(),
            })
            .unwrap()
    }

    #[test]
    fn scenario_s1_look_describes_the_room() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let room = plain_object(&graph, "Lobby", None);
        let player = plain_object(&graph, "Alice", Some(room.id.clone()));
        graph
            .set_property(room.id.as_str(), "description", Value::from("A quiet lobby."), &player)
            .unwrap();
        VerbTable::new(&graph)
            .create_or_update_verb(
                room.id.as_str(),
                "look",
                vec![],
                None,
                "return describe_room(this);".into(),
                Permission::Public,
                String::new(),
                room.owner.clone(),
            )
            .unwrap();
        let runtime = ScriptRuntime::new(RuntimeConfig::default());
        let dispatcher = Dispatcher::new(&graph, &runtime);
        let outcome = dispatcher.dispatch(&player, "look");
        assert!(outcome.text.contains("A quiet lobby."));
    }

    #[test]
    fn unrecognized_verb_reports_not_understood() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let player = plain_object(&graph, "Alice", None);
        let runtime = ScriptRuntime::new(RuntimeConfig::default());
        let dispatcher = Dispatcher::new(&graph, &runtime);
        let outcome = dispatcher.dispatch(&player, "xyzzy");
        assert_eq!(outcome.text, "I don't understand that.");
    }

    #[test]
    fn at_commands_bypass_verb_lookup() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let player = plain_object(&graph, "Alice", None);
        let runtime = ScriptRuntime::new(RuntimeConfig::default());
        let dispatcher = Dispatcher::new(&graph, &runtime);
        let outcome = dispatcher.dispatch(&player, "@create Widget");
        assert!(outcome.text.contains("permission") || outcome.text.contains("No such class"));
    }
}
