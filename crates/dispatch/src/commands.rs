use moor_common::Value;
use moor_objgraph::{ObjectGraph, PermissionModel, VerbTable};
use moor_resolver::Resolver;
use moor_script::ScriptRuntime;
use moor_store::model::{Object, Permission};
use std::collections::BTreeMap;

/// Handles the fixed `@`-prefixed administrative surface (spec.md §4.5,
/// §4.8): world editing operations that bypass the scripting language
/// entirely rather than being verbs a player could shadow or delete.
/// Returns `None` for any `@`-word outside this fixed set so the dispatcher
/// can fall through to ordinary verb lookup (spec.md §6: "unprivileged
/// `@`-commands fall through to verb lookup so that users may define their
/// own").
pub fn handle_at_command(
    graph: &ObjectGraph,
    runtime: &ScriptRuntime,
    player: &Object,
    command: &str,
    rest: &str,
) -> Option<String> {
    Some(match command.to_lowercase().as_str() {
        "@create" => at_create(graph, player, rest),
        "@destroy" => at_destroy(graph, player, rest),
        "@describe" => at_describe(graph, player, rest),
        "@setverb" => at_setverb(graph, player, rest),
        "@dig" => at_dig(graph, player, rest),
        "@dump" => at_dump(graph, player, rest),
        "@reload" => at_reload(runtime, player),
        _ => return None,
    })
}

fn at_create(graph: &ObjectGraph, player: &Object, rest: &str) -> String {
    if !PermissionModel::is_programmer(player) && !PermissionModel::is_admin(player) {
        return "You don't have permission to create objects.".to_string();
    }
    let class_name = rest.trim();
    if class_name.is_empty() {
        return "Usage: @create <ClassName>".to_string();
    }
    let resolver = Resolver::new(graph);
    let Some(class) = resolver.resolve_class(class_name) else {
        return format!("No such class {class_name:?}.");
    };
    match graph.create_instance(class.id.as_str(), player.location.clone(), player.id.clone()) {
        Ok(obj) => format!("Created {} ({}).", obj.name, obj.dbref),
        Err(e) => format!("Could not create that: {e}"),
    }
}

fn at_destroy(graph: &ObjectGraph, player: &Object, rest: &str) -> String {
    let query = rest.trim();
    if query.is_empty() {
        return "Usage: @destroy <object>".to_string();
    }
    let resolver = Resolver::new(graph);
    let target = match resolver.resolve(query, player, None, None) {
        moor_resolver::ResolveResult::Unique(o) => o,
        moor_resolver::ResolveResult::Ambiguous(_) => return format!("Which {query:?} did you mean?"),
        moor_resolver::ResolveResult::None => return format!("You don't see {query:?} here."),
    };
    if PermissionModel::check_verb_mutation(player, &target).is_err() {
        return "You don't have permission to destroy that.".to_string();
    }
    match graph.destroy(target.id.as_str(), true) {
        Ok(()) => format!("Destroyed {}.", target.name),
        Err(e) => format!("Could not destroy that: {e}"),
    }
}

fn at_describe(graph: &ObjectGraph, player: &Object, rest: &str) -> String {
    let Some((query, description)) = rest.split_once('=') else {
        return "Usage: @describe <object> = <text>".to_string();
    };
    let query = query.trim();
    let description = description.trim();
    let resolver = Resolver::new(graph);
    let target = match resolver.resolve(query, player, None, None) {
        moor_resolver::ResolveResult::Unique(o) => o,
        moor_resolver::ResolveResult::Ambiguous(_) => return format!("Which {query:?} did you mean?"),
        moor_resolver::ResolveResult::None => return format!("You don't see {query:?} here."),
    };
    match graph.set_property(target.id.as_str(), "description", Value::String(description.to_string()), player) {
        Ok(()) => format!("{} described.", target.name),
        Err(e) => format!("Could not set that description: {e}"),
    }
}

/// `@setverb <object>:<verb> <code...>` — a minimal single-statement verb
/// editor. A real client would open `code` in a multi-line buffer; this
/// command exists so the command surface is reachable end-to-end without one.
fn at_setverb(graph: &ObjectGraph, player: &Object, rest: &str) -> String {
    if !PermissionModel::is_programmer(player) && !PermissionModel::is_admin(player) {
        return "You don't have permission to program verbs.".to_string();
    }
    let Some((target_part, code)) = rest.split_once(' ') else {
        return "Usage: @setverb <object>:<verb> <code>".to_string();
    };
    let Some((query, verb_name)) = target_part.split_once(':') else {
        return "Usage: @setverb <object>:<verb> <code>".to_string();
    };
    let resolver = Resolver::new(graph);
    let target = match resolver.resolve(query, player, None, None) {
        moor_resolver::ResolveResult::Unique(o) => o,
        moor_resolver::ResolveResult::Ambiguous(_) => return format!("Which {query:?} did you mean?"),
        moor_resolver::ResolveResult::None => return format!("You don't see {query:?} here."),
    };
    let table = VerbTable::new(graph);
    match table.create_or_update_verb(
        target.id.as_str(),
        verb_name,
        Vec::new(),
        None,
        code.to_string(),
        Permission::Public,
        String::new(),
        player.id.clone(),
    ) {
        Ok(_) => format!("{verb_name} set on {}.", target.name),
        Err(e) => format!("Could not set that verb: {e}"),
    }
}

/// `@dig <direction> to <RoomName>` — creates a new Room and an Exit from
/// the player's current location in `direction`.
fn at_dig(graph: &ObjectGraph, player: &Object, rest: &str) -> String {
    if !PermissionModel::is_programmer(player) && !PermissionModel::is_admin(player) {
        return "You don't have permission to dig rooms.".to_string();
    }
    let Some(current_location) = player.location.clone() else {
        return "You have nowhere to dig from.".to_string();
    };
    let Some((direction, room_name)) = rest.split_once(" to ") else {
        return "Usage: @dig <direction> to <RoomName>".to_string();
    };
    let direction = direction.trim();
    let room_name = room_name.trim();
    if direction.is_empty() || room_name.is_empty() {
        return "Usage: @dig <direction> to <RoomName>".to_string();
    }
    let resolver = Resolver::new(graph);
    let Some(room_class) = resolver.resolve_class("Room") else {
        return "The starter world has no Room class.".to_string();
    };
    let Some(exit_class) = resolver.resolve_class("Exit") else {
        return "The starter world has no Exit class.".to_string();
    };
    let new_room = match graph.create_instance(room_class.id.as_str(), None, player.id.clone()) {
        Ok(o) => o,
        Err(e) => return format!("Could not create the room: {e}"),
    };
    if let Err(e) = graph.set_property(new_room.id.as_str(), "description", Value::from(""), player) {
        return format!("Room created but could not describe it: {e}");
    }
    let new_room = match graph.rename(new_room.id.as_str(), room_name) {
        Ok(o) => o,
        Err(e) => return format!("Room created but could not name it: {e}"),
    };
    let exit = match graph.create_instance(exit_class.id.as_str(), Some(current_location), player.id.clone()) {
        Ok(o) => o,
        Err(e) => return format!("Room created but could not dig the exit: {e}"),
    };
    let mut props = BTreeMap::new();
    props.insert("direction".to_string(), Value::from(direction));
    props.insert("destinationId".to_string(), Value::from(new_room.id.to_string()));
    for (k, v) in props {
        if let Err(e) = graph.set_property(exit.id.as_str(), &k, v, player) {
            return format!("Exit created but could not set {k}: {e}");
        }
    }
    format!("Dug {direction} to a new room, {room_name} ({}).", new_room.dbref)
}

fn at_dump(graph: &ObjectGraph, player: &Object, rest: &str) -> String {
    if PermissionModel::require_admin(player).is_err() {
        return "You don't have permission to dump the world.".to_string();
    }
    let path = if rest.trim().is_empty() { "world.jsonl" } else { rest.trim() };
    match moor_store::snapshot::dump(graph.store(), path) {
        Ok(()) => format!("World dumped to {path}."),
        Err(e) => format!("Dump failed: {e}"),
    }
}

fn at_reload(runtime: &ScriptRuntime, player: &Object) -> String {
    if PermissionModel::require_admin(player).is_err() {
        return "You don't have permission to reload the world.".to_string();
    }
    runtime.invalidate_all();
    "Compiled verb/function cache invalidated.".to_string()
}
