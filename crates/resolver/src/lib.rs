//! Text-to-object resolution (spec.md §4.3): keywords, class references,
//! DBREF, raw ids, and tiered exact/prefix name matching over local
//! candidates.

pub mod directions;

use chrono::Utc;
use directions::direction_match_keys;
use moor_common::{Dbref, ObjectId, Value};
use moor_objgraph::ObjectGraph;
use moor_store::model::Object;
use std::collections::BTreeMap;

/// Class names addressable by bare name in stage 2 of resolution (spec.md
/// §4.3). The starter world (`server`) seeds exactly these.
pub const WELL_KNOWN_CLASSES: &[&str] = &["Room", "Item", "Exit", "Player"];

#[derive(Clone, Debug)]
pub enum ResolveResult {
    Unique(Object),
    Ambiguous(Vec<Object>),
    None,
}

pub struct Resolver<'g> {
    graph: &'g ObjectGraph,
}

impl<'g> Resolver<'g> {
    pub fn new(graph: &'g ObjectGraph) -> Self {
        Self { graph }
    }

    fn effective_location(&self, looker: &Object, location_override: Option<&Object>) -> Option<ObjectId> {
        if let Some(o) = location_override {
            return Some(o.id.clone());
        }
        looker.location.clone()
    }

    fn system_object(&self) -> Option<Object> {
        self.graph.store().objects.find_one(|o| o.is_system_object())
    }

    /// Synthesizes a placeholder object for a class reference (§4.3 stage
    /// 2), so verbs/functions can be attached to classes through the same
    /// addressing scheme as instances.
    /// Public entry point for builtins' `get_class` (spec.md §4.6
    /// preprocessing rewrites `class:Name` into a call to this).
    pub fn resolve_class(&self, class_name: &str) -> Option<Object> {
        self.class_placeholder(class_name)
    }

    fn class_placeholder(&self, class_name: &str) -> Option<Object> {
        let class = self.graph.get_class_by_name(class_name)?;
        let mut props = BTreeMap::new();
        props.insert("className".to_string(), Value::from(class.name.clone()));
        props.insert("description".to_string(), Value::from(class.description.clone()));
        Some(Object {
            id: class.id.clone(),
            dbref: Dbref(0),
            class_id: None,
            name: class.name,
            aliases: Vec::new(),
            instance_properties: props,
            property_access: BTreeMap::new(),
            location: None,
            owner: class.id,
            player: None,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        })
    }

    fn parse_class_reference<'a>(&self, query: &'a str) -> Option<&'a str> {
        if let Some(name) = query.strip_prefix("class:") {
            return Some(name);
        }
        if let Some(name) = query.strip_suffix(".class") {
            return Some(name);
        }
        if WELL_KNOWN_CLASSES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(query))
        {
            return Some(query);
        }
        None
    }

    /// The full strict-order resolution algorithm (spec.md §4.3).
    pub fn resolve(
        &self,
        query: &str,
        looker: &Object,
        location_override: Option<&Object>,
        object_type: Option<&str>,
    ) -> ResolveResult {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return ResolveResult::None;
        }

        // Stage 1: keywords.
        match trimmed.to_lowercase().as_str() {
            "me" | "player" => return ResolveResult::Unique(looker.clone()),
            "here" | "room" => {
                if let Some(loc_id) = self.effective_location(looker, location_override) {
                    if let Ok(obj) = self.graph.get_object(loc_id.as_str()) {
                        return ResolveResult::Unique(obj);
                    }
                }
                return ResolveResult::None;
            }
            "system" => {
                return match self.system_object() {
                    Some(obj) => ResolveResult::Unique(obj),
                    None => ResolveResult::None,
                };
            }
            _ => {}
        }

        // Stage 2: class reference.
        if let Some(class_name) = self.parse_class_reference(trimmed) {
            return match self.class_placeholder(class_name) {
                Some(obj) => ResolveResult::Unique(obj),
                None => ResolveResult::None,
            };
        }

        // Stage 3: DBREF.
        if let Some(dbref) = Dbref::parse(trimmed) {
            return match self.graph.get_object_by_dbref(dbref) {
                Some(obj) => ResolveResult::Unique(obj),
                None => ResolveResult::None,
            };
        }

        // Stage 4: raw object id.
        if let Ok(obj) = self.graph.get_object(trimmed) {
            return ResolveResult::Unique(obj);
        }

        // Stage 5: name/alias/prefix match over local candidates.
        self.match_local(trimmed, looker, location_override, object_type)
    }

    fn candidates(&self, looker: &Object, location_override: Option<&Object>) -> Vec<Object> {
        let mut out = self.graph.list_in_location(looker.id.as_str());
        if let Some(loc_id) = self.effective_location(looker, location_override) {
            for o in self.graph.list_in_location(loc_id.as_str()) {
                if !out.iter().any(|e| e.id == o.id) {
                    out.push(o);
                }
            }
        }
        out
    }

    fn match_keys(&self, obj: &Object) -> Vec<String> {
        let mut keys = vec![obj.name.to_lowercase()];
        keys.extend(obj.aliases.iter().map(|a| a.to_lowercase()));
        if let Some(Value::String(dir)) = obj.instance_properties.get("direction") {
            keys.extend(direction_match_keys(dir));
        }
        let initialism = moor_common::util::initialism(&obj.name);
        if initialism.len() > 1 {
            keys.push(initialism.to_lowercase());
        }
        keys
    }

    fn match_local(
        &self,
        query: &str,
        looker: &Object,
        location_override: Option<&Object>,
        object_type: Option<&str>,
    ) -> ResolveResult {
        let mut candidates = self.candidates(looker, location_override);
        if let Some(type_name) = object_type {
            candidates.retain(|o| {
                o.class_id
                    .as_ref()
                    .and_then(|cid| self.graph.get_class(cid.as_str()))
                    .is_some_and(|c| c.name.eq_ignore_ascii_case(type_name))
            });
        }

        let query_lower = query.to_lowercase();
        let mut exact: Vec<Object> = Vec::new();
        for c in &candidates {
            if self.match_keys(c).iter().any(|k| k == &query_lower) {
                exact.push(c.clone());
            }
        }
        if !exact.is_empty() {
            return dedup_result(exact);
        }

        let query_tokens = moor_common::util::tokenize(query);
        let mut prefix: Vec<Object> = Vec::new();
        for c in &candidates {
            let matches = self.match_keys(c).iter().any(|k| {
                let candidate_tokens = moor_common::util::tokenize(k);
                moor_common::util::tokens_prefix_match(&query_tokens, &candidate_tokens)
            });
            if matches {
                prefix.push(c.clone());
            }
        }
        dedup_result(prefix)
    }
}

fn dedup_result(mut objs: Vec<Object>) -> ResolveResult {
    objs.dedup_by(|a, b| a.id == b.id);
    match objs.len() {
        0 => ResolveResult::None,
        1 => ResolveResult::Unique(objs.remove(0)),
        _ => ResolveResult::Ambiguous(objs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moor_store::WorldStore;
    use std::sync::Arc;

    fn mk_room(graph: &ObjectGraph) -> Object {
        graph
            .create_plain_object(Object {
                id: ObjectId::new(),
                dbref: graph.next_dbref(),
                class_id: None,
                name: "Lobby".into(),
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

    fn mk_item(graph: &ObjectGraph, name: &str, location: &ObjectId) -> Object {
        graph
            .create_plain_object(Object {
                id: ObjectId::new(),
                dbref: graph.next_dbref(),
                class_id: None,
                name: name.into(),
                aliases: vec![],
                instance_properties: BTreeMap::new(),
                property_access: BTreeMap::new(),
                location: Some(location.clone()),
                owner: ObjectId::from_str("owner"),
                player: None,
                created_at: Utc::now(),
                modified_at: Utc::now(),
            })
            .unwrap()
    }

    fn mk_player(graph: &ObjectGraph, location: &ObjectId) -> Object {
        graph
            .create_plain_object(Object {
                id: ObjectId::new(),
                dbref: graph.next_dbref(),
                class_id: None,
                name: "Alice".into(),
                aliases: vec![],
                instance_properties: BTreeMap::new(),
                property_access: BTreeMap::new(),
                location: Some(location.clone()),
                owner: ObjectId::from_str("alice"),
                player: None,
                created_at: Utc::now(),
                modified_at: Utc::now(),
            })
            .unwrap()
    }

    #[test]
    fn keyword_me_resolves_to_looker() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let room = mk_room(&graph);
        let player = mk_player(&graph, &room.id);
        let resolver = Resolver::new(&graph);
        match resolver.resolve("me", &player, None, None) {
            ResolveResult::Unique(o) => assert_eq!(o.id, player.id),
            other => panic!("expected unique, got {other:?}"),
        }
    }

    #[test]
    fn scenario_s3_ambiguous_red_items() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let room = mk_room(&graph);
        let player = mk_player(&graph, &room.id);
        mk_item(&graph, "red gem", &room.id);
        mk_item(&graph, "red gemstone", &room.id);
        let resolver = Resolver::new(&graph);
        match resolver.resolve("red", &player, None, None) {
            ResolveResult::Ambiguous(v) => assert_eq!(v.len(), 2),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn exact_match_wins_over_prefix_match_of_another_candidate() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let room = mk_room(&graph);
        let player = mk_player(&graph, &room.id);
        let gem = mk_item(&graph, "gem", &room.id);
        mk_item(&graph, "gemstone", &room.id);
        let resolver = Resolver::new(&graph);
        match resolver.resolve("gem", &player, None, None) {
            ResolveResult::Unique(o) => assert_eq!(o.id, gem.id),
            other => panic!("expected unique exact match, got {other:?}"),
        }
    }

    #[test]
    fn dbref_resolves_directly() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let room = mk_room(&graph);
        let resolver = Resolver::new(&graph);
        let query = room.dbref.to_string();
        match resolver.resolve(&query, &room, None, None) {
            ResolveResult::Unique(o) => assert_eq!(o.id, room.id),
            other => panic!("expected unique, got {other:?}"),
        }
    }
}
