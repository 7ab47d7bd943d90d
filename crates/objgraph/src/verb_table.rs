use crate::object_graph::ObjectGraph;
use chrono::Utc;
use moor_common::{ObjectGraphError, ObjectId};
use moor_store::model::{Function, Permission, Verb};

type Result<T> = std::result::Result<T, ObjectGraphError>;

/// Provenance of a verb/function returned by `list_verbs_on`/`list_functions_on`
/// (§4.4), for editor UIs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Provenance {
    Instance,
    Class(String),
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Instance => write!(f, "instance"),
            Provenance::Class(name) => write!(f, "class {name}"),
        }
    }
}

/// Storage and inheritance-aware lookup of verbs and functions by owning
/// object (spec.md §4.4). Holds a reference to `ObjectGraph` because the
/// inheritance walk needs `inheritance_chain` and class lookups.
pub struct VerbTable<'g> {
    graph: &'g ObjectGraph,
}

impl<'g> VerbTable<'g> {
    pub fn new(graph: &'g ObjectGraph) -> Self {
        Self { graph }
    }

    /// §3.2(8) walk: verbs on the object itself first, then up the
    /// inheritance chain most-derived to root.
    pub fn find_verb(&self, object_id: &str, name: &str) -> Option<Verb> {
        if let Some(v) = self.graph.store().verb_by_name(object_id, name) {
            return Some(v);
        }
        let obj = self.graph.get_object(object_id).ok()?;
        let class_id = obj.class_id.as_ref()?;
        for class in self.graph.inheritance_chain(class_id.as_str()).into_iter().rev() {
            if let Some(v) = self.graph.store().verb_by_name(class.id.as_str(), name) {
                return Some(v);
            }
        }
        None
    }

    /// Deduplicated on verb name, most-specific winning, annotated with
    /// provenance for editor UIs (§4.4).
    pub fn list_verbs_on(&self, object_id: &str) -> Vec<(Verb, Provenance)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for v in self.graph.store().verbs_on(object_id) {
            seen.insert(v.name.to_lowercase());
            out.push((v, Provenance::Instance));
        }
        if let Ok(obj) = self.graph.get_object(object_id) {
            if let Some(class_id) = &obj.class_id {
                for class in self.graph.inheritance_chain(class_id.as_str()).into_iter().rev() {
                    for v in self.graph.store().verbs_on(class.id.as_str()) {
                        let key = v.name.to_lowercase();
                        if seen.insert(key) {
                            out.push((v, Provenance::Class(class.name.clone())));
                        }
                    }
                }
            }
        }
        out
    }

    /// Creates or, for the same author, overwrites a verb on `object_id`
    /// (§4.4 uniqueness rule).
    pub fn create_or_update_verb(
        &self,
        object_id: &str,
        name: &str,
        aliases: Vec<String>,
        pattern: Option<String>,
        code: String,
        permissions: Permission,
        description: String,
        created_by: ObjectId,
    ) -> Result<Verb> {
        if let Some(existing) = self.graph.store().verb_by_name(object_id, name) {
            if existing.created_by != created_by {
                return Err(ObjectGraphError::DuplicateVerb(name.to_string()));
            }
            let mut updated = existing;
            updated.aliases = aliases;
            updated.pattern = pattern;
            updated.code = code;
            updated.permissions = permissions;
            updated.description = description;
            updated.modified_at = Utc::now();
            self.graph.store().verbs.update(updated.id.as_str(), updated.clone())?;
            return Ok(updated);
        }
        let now = Utc::now();
        let verb = Verb {
            id: ObjectId::new(),
            object_id: ObjectId::from_str(object_id),
            name: name.to_string(),
            aliases,
            pattern,
            code,
            permissions,
            description,
            created_by,
            created_at: now,
            modified_at: now,
        };
        self.graph.store().verbs.insert(verb.id.as_str(), verb.clone())?;
        Ok(verb)
    }

    pub fn destroy_verb(&self, verb_id: &str) -> bool {
        self.graph.store().verbs.delete(verb_id)
    }

    // -- functions ------------------------------------------------------

    /// Mirrors `find_verb`'s walk, plus a final fallback to the system
    /// object's functions when `include_system` is set (§4.4).
    pub fn find_function(
        &self,
        object_id: &str,
        name: &str,
        include_system: bool,
        system_object_id: Option<&str>,
    ) -> Option<Function> {
        if let Some(f) = self.graph.store().function_by_name(object_id, name) {
            return Some(f);
        }
        if let Ok(obj) = self.graph.get_object(object_id) {
            if let Some(class_id) = &obj.class_id {
                for class in self.graph.inheritance_chain(class_id.as_str()).into_iter().rev() {
                    if let Some(f) = self.graph.store().function_by_name(class.id.as_str(), name) {
                        return Some(f);
                    }
                }
            }
        }
        if include_system {
            if let Some(sys_id) = system_object_id {
                if sys_id != object_id {
                    return self.graph.store().function_by_name(sys_id, name);
                }
            }
        }
        None
    }

    pub fn list_functions_on(&self, object_id: &str) -> Vec<Function> {
        self.graph.store().functions_on(object_id)
    }

    pub fn create_or_update_function(&self, function: Function) -> Result<Function> {
        if let Some(existing) = self
            .graph
            .store()
            .function_by_name(function.object_id.as_str(), &function.name)
        {
            if existing.created_by != function.created_by {
                return Err(ObjectGraphError::DuplicateName(function.name.clone()));
            }
            let mut updated = function;
            updated.id = existing.id;
            updated.modified_at = Utc::now();
            self.graph.store().functions.update(updated.id.as_str(), updated.clone())?;
            return Ok(updated);
        }
        self.graph.store().functions.insert(function.id.as_str(), function.clone())?;
        Ok(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_graph::ObjectGraph;
    use moor_store::WorldStore;
    use std::sync::Arc;

    #[test]
    fn verb_lookup_walks_up_inheritance_chain() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let animal = graph.create_class("Animal", None, "", false).unwrap();
        let dog = graph
            .create_class("Dog", Some(animal.id.clone()), "", false)
            .unwrap();
        let instance = graph
            .create_instance(dog.id.as_str(), None, ObjectId::from_str("owner"))
            .unwrap();

        let table = VerbTable::new(&graph);
        table
            .create_or_update_verb(
                animal.id.as_str(),
                "speak",
                vec![],
                None,
                "return \"...\";".into(),
                Permission::Public,
                String::new(),
                ObjectId::from_str("owner"),
            )
            .unwrap();

        let found = table.find_verb(instance.id.as_str(), "speak");
        assert!(found.is_some());
    }

    #[test]
    fn instance_verb_shadows_class_verb() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let c = graph.create_class("Item", None, "", false).unwrap();
        let instance = graph
            .create_instance(c.id.as_str(), None, ObjectId::from_str("owner"))
            .unwrap();
        let table = VerbTable::new(&graph);
        table
            .create_or_update_verb(
                c.id.as_str(),
                "look",
                vec![],
                None,
                "return \"class\";".into(),
                Permission::Public,
                String::new(),
                ObjectId::from_str("owner"),
            )
            .unwrap();
        table
            .create_or_update_verb(
                instance.id.as_str(),
                "look",
                vec![],
                None,
                "return \"instance\";".into(),
                Permission::Public,
                String::new(),
                ObjectId::from_str("owner"),
            )
            .unwrap();
        let found = table.find_verb(instance.id.as_str(), "look").unwrap();
        assert_eq!(found.code, "return \"instance\";");
    }

    #[test]
    fn same_author_overwrite_does_not_duplicate() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let owner = ObjectId::from_str("owner");
        let obj = graph.create_plain_object(moor_store::model::Object {
            id: ObjectId::new(),
            dbref: moor_common::Dbref(1),
            class_id: None,
            name: "thing".into(),
            aliases: vec![],
            instance_properties: Default::default(),
            property_access: Default::default(),
            location: None,
            owner: owner.clone(),
            player: None,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }).unwrap();
        let table = VerbTable::new(&graph);
        table
            .create_or_update_verb(obj.id.as_str(), "go", vec![], None, "1".into(), Permission::Public, "".into(), owner.clone())
            .unwrap();
        table
            .create_or_update_verb(obj.id.as_str(), "go", vec![], None, "2".into(), Permission::Public, "".into(), owner)
            .unwrap();
        assert_eq!(table.list_verbs_on(obj.id.as_str()).len(), 1);
    }
}
