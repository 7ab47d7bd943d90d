use chrono::Utc;
use moor_common::{Dbref, ObjectId, Value};
use moor_objgraph::{ObjectGraph, VerbTable};
use moor_store::model::{Object, Permission, PlayerData, PlayerFlag};
use moor_store::WorldStore;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

/// The starter world: a system object, the four well-known classes, one
/// seeded admin player, and a single room with an item — enough to run the
/// literal end-to-end scenarios (spec.md §8 S1/S2: look, take an item).
pub struct SeededWorld {
    pub graph: ObjectGraph,
    pub admin: Object,
    pub lobby: Object,
}

fn blank(id: ObjectId, dbref: Dbref, name: &str, owner: ObjectId) -> Object {
    let now = Utc::now();
    Object {
        id,
        dbref,
        class_id: None,
        name: name.to_string(),
        aliases: Vec::new(),
        instance_properties: BTreeMap::new(),
        property_access: BTreeMap::new(),
        location: None,
        owner,
        player: None,
        created_at: now,
        modified_at: now,
    }
}

pub fn seed() -> SeededWorld {
    let graph = ObjectGraph::new(Arc::new(WorldStore::new()));

    let system_id = ObjectId::new();
    let mut system = blank(system_id.clone(), Dbref(0), "System", system_id.clone());
    system.instance_properties.insert("isSystemObject".to_string(), Value::Bool(true));
    let system = graph.create_plain_object(system).expect("seed: system object");

    let room_class = graph
        .create_class("Room", None, "A location objects and players can be in.", false)
        .expect("seed: Room class");
    let item_class = graph
        .create_class("Item", None, "A portable object.", false)
        .expect("seed: Item class");
    graph
        .create_class("Exit", None, "A one-way passage between rooms.", false)
        .expect("seed: Exit class");
    let player_class = graph
        .create_class("Player", None, "A player character.", false)
        .expect("seed: Player class");

    let lobby_id = ObjectId::new();
    let mut lobby = blank(lobby_id.clone(), graph.next_dbref(), "Lobby", system.id.clone());
    lobby.class_id = Some(room_class.id.clone());
    lobby.instance_properties.insert(
        "description".to_string(),
        Value::from("A quiet stone lobby. Dust motes drift through a shaft of light."),
    );
    let lobby = graph.create_plain_object(lobby).expect("seed: Lobby room");

    let admin_id = ObjectId::new();
    let mut admin = blank(admin_id.clone(), graph.next_dbref(), "Wizard", admin_id.clone());
    admin.class_id = Some(player_class.id.clone());
    admin.location = Some(lobby.id.clone());
    admin.player = Some(PlayerData {
        password_hash: String::new(),
        session_id: None,
        last_login: None,
        flags: [PlayerFlag::Admin, PlayerFlag::Moderator, PlayerFlag::Programmer]
            .into_iter()
            .collect::<BTreeSet<_>>(),
    });
    let admin = graph.create_plain_object(admin).expect("seed: admin player");

    let lantern_id = ObjectId::new();
    let mut lantern = blank(lantern_id, graph.next_dbref(), "brass lantern", admin.id.clone());
    lantern.class_id = Some(item_class.id.clone());
    lantern.location = Some(lobby.id.clone());
    lantern
        .instance_properties
        .insert("description".to_string(), Value::from("A dull brass lantern, unlit."));
    graph.create_plain_object(lantern).expect("seed: brass lantern");

    let verbs = VerbTable::new(&graph);
    verbs
        .create_or_update_verb(
            room_class.id.as_str(),
            "look",
            vec!["l".to_string()],
            None,
            "return describe_room(this);".to_string(),
            Permission::Public,
            "Describes the room the player is standing in.".to_string(),
            system.id.clone(),
        )
        .expect("seed: look verb");
    verbs
        .create_or_update_verb(
            item_class.id.as_str(),
            "get",
            vec!["take".to_string()],
            None,
            r#"move_object(this, caller); notify(player, "You take " + this.name + "."); return true;"#.to_string(),
            Permission::Public,
            "Picks an item up into the caller's inventory.".to_string(),
            system.id.clone(),
        )
        .expect("seed: get verb");

    info!(admin = %admin.dbref, lobby = %lobby.dbref, "seeded starter world");
    SeededWorld { graph, admin, lobby }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moor_resolver::Resolver;

    #[test]
    fn seeds_admin_at_dbref_one_in_the_lobby() {
        let world = seed();
        assert_eq!(world.admin.dbref, Dbref(1));
        assert_eq!(world.admin.location, Some(world.lobby.id.clone()));
        assert!(world.admin.has_flag(PlayerFlag::Admin));
    }

    #[test]
    fn system_object_is_recognizable_and_at_dbref_zero() {
        let world = seed();
        let system = world
            .graph
            .store()
            .objects
            .find_one(|o| o.is_system_object())
            .expect("system object exists");
        assert_eq!(system.dbref, Dbref(0));
    }

    #[test]
    fn resolver_finds_the_brass_lantern_by_prefix() {
        let world = seed();
        let resolver = Resolver::new(&world.graph);
        match resolver.resolve("brass", &world.admin, None, None) {
            moor_resolver::ResolveResult::Unique(o) => assert_eq!(o.name, "brass lantern"),
            other => panic!("expected unique match, got {other:?}"),
        }
    }
}
