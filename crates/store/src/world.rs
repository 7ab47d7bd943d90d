use crate::collection::Collection;
use crate::model::{Class, Function, Object, Verb};
use moor_common::Dbref;

/// The five logical collections from spec.md §4.1, plus the query surface
/// the secondary indexes promise. The in-memory `Collection` stores rows in
/// a `BTreeMap`; query methods here express the *index contracts* (objects
/// by dbref, by class, by location; verbs/functions by owning object and by
/// name) as scans over that map. For the data sizes a single-process world
/// holds this is indistinguishable in behavior from a dedicated index, and
/// keeps every index trivially consistent with the primary store — the
/// property the spec actually requires (§4.1: "the store is authoritative
/// for writes").
#[derive(Default)]
pub struct WorldStore {
    pub classes: Collection<Class>,
    pub objects: Collection<Object>,
    pub verbs: Collection<Verb>,
    pub functions: Collection<Function>,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- objects --------------------------------------------------------

    pub fn object_by_dbref(&self, dbref: Dbref) -> Option<Object> {
        self.objects.find_one(|o| o.dbref == dbref)
    }

    pub fn objects_by_class(&self, class_id: &str) -> Vec<Object> {
        self.objects
            .find_many(|o| o.class_id.as_ref().map(|id| id.as_str()) == Some(class_id))
    }

    pub fn objects_by_location(&self, location_id: &str) -> Vec<Object> {
        self.objects
            .find_many(|o| o.location.as_ref().map(|id| id.as_str()) == Some(location_id))
    }

    pub fn player_by_name(&self, name: &str) -> Option<Object> {
        self.objects
            .find_one(|o| o.is_player() && o.name.eq_ignore_ascii_case(name))
    }

    pub fn player_by_session(&self, session_id: &str) -> Option<Object> {
        self.objects.find_one(|o| {
            o.player
                .as_ref()
                .and_then(|p| p.session_id.as_deref())
                .is_some_and(|s| s == session_id)
        })
    }

    pub fn all_players(&self) -> Vec<Object> {
        self.objects.find_many(|o| o.is_player())
    }

    pub fn online_players(&self) -> Vec<Object> {
        self.objects
            .find_many(|o| o.player.as_ref().is_some_and(|p| p.session_id.is_some()))
    }

    pub fn max_dbref(&self) -> u64 {
        self.objects.find_all().iter().map(|o| o.dbref.0).max().unwrap_or(0)
    }

    // -- verbs ------------------------------------------------------------

    pub fn verbs_on(&self, object_id: &str) -> Vec<Verb> {
        self.verbs.find_many(|v| v.object_id.as_str() == object_id)
    }

    pub fn verb_by_name(&self, object_id: &str, name: &str) -> Option<Verb> {
        self.verbs
            .find_one(|v| v.object_id.as_str() == object_id && v.matches_name(name))
    }

    // -- functions ----------------------------------------------------------

    pub fn functions_on(&self, object_id: &str) -> Vec<Function> {
        self.functions.find_many(|f| f.object_id.as_str() == object_id)
    }

    pub fn function_by_name(&self, object_id: &str, name: &str) -> Option<Function> {
        self.functions
            .find_one(|f| f.object_id.as_str() == object_id && f.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Permission, Verb};
    use chrono::Utc;
    use moor_common::ObjectId;

    fn verb(object_id: &str, name: &str) -> Verb {
        Verb {
            id: ObjectId::new(),
            object_id: ObjectId::from_str(object_id),
            name: name.into(),
            aliases: vec![],
            pattern: None,
            code: String::new(),
            permissions: Permission::Public,
            description: String::new(),
            created_by: ObjectId::from_str("owner"),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn verb_lookup_is_scoped_to_object_and_case_insensitive() {
        let store = WorldStore::new();
        let v = verb("room1", "Look");
        store.verbs.insert(v.id.clone().as_str(), v).unwrap();
        assert!(store.verb_by_name("room1", "look").is_some());
        assert!(store.verb_by_name("room2", "look").is_none());
    }
}
