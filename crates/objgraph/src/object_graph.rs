use crate::cache::ObjectCache;
use crate::permission::PermissionModel;
use chrono::Utc;
use moor_common::{ClassId, Dbref, ObjectGraphError, ObjectId, PropertyAccess, Value};
use moor_store::model::{Class, Object};
use moor_store::WorldStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

type Result<T> = std::result::Result<T, ObjectGraphError>;

/// Classes, instances, inheritance, property resolution, containment, and
/// DBREF allocation (spec.md §4.2).
pub struct ObjectGraph {
    store: Arc<WorldStore>,
    cache: ObjectCache,
    /// DBREF allocation is serialized (§4.2, §5) through this counter. The
    /// spec frames it as "a property of the system object"; we keep the
    /// authoritative value here and mirror it onto the system object's
    /// `dbrefCounter` property for introspection, which gets us the
    /// serialization guarantee without a chicken-and-egg dependency on the
    /// system object existing before the first `create_instance` call.
    dbref_counter: Mutex<u64>,
}

impl ObjectGraph {
    pub fn new(store: Arc<WorldStore>) -> Self {
        let next = store.max_dbref() + 1;
        Self {
            store,
            cache: ObjectCache::new(),
            dbref_counter: Mutex::new(next),
        }
    }

    fn alloc_dbref(&self) -> Dbref {
        let mut counter = self.dbref_counter.lock();
        let n = *counter;
        *counter += 1;
        Dbref(n)
    }

    // -- classes ----------------------------------------------------------

    #[instrument(skip(self))]
    pub fn create_class(
        &self,
        name: &str,
        parent_id: Option<ClassId>,
        description: &str,
        is_abstract: bool,
    ) -> Result<Class> {
        if self
            .store
            .classes
            .find_one(|c| c.name.eq_ignore_ascii_case(name))
            .is_some()
        {
            return Err(ObjectGraphError::DuplicateName(name.to_string()));
        }
        if let Some(parent) = &parent_id {
            let parent_class = self
                .store
                .classes
                .find_by_id(parent.as_str())
                .ok_or_else(|| ObjectGraphError::MissingParent(parent.clone()))?;
            // Defence-in-depth cycle guard (§4.2): walk the would-be parent
            // chain and make sure it terminates within the total class
            // count.
            let total = self.store.classes.len() + 1;
            let mut steps = 0usize;
            let mut cursor = Some(parent_class);
            while let Some(c) = cursor {
                steps += 1;
                if steps > total {
                    return Err(ObjectGraphError::CyclicInheritance);
                }
                cursor = c
                    .parent_id
                    .as_ref()
                    .and_then(|p| self.store.classes.find_by_id(p.as_str()));
            }
        }
        let now = Utc::now();
        let class = Class {
            id: ClassId::new(),
            name: name.to_string(),
            parent_id,
            default_properties: BTreeMap::new(),
            description: description.to_string(),
            is_abstract,
            created_at: now,
            modified_at: now,
        };
        self.store.classes.insert(class.id.as_str(), class.clone())?;
        Ok(class)
    }

    pub fn get_class(&self, id: &str) -> Option<Class> {
        self.store.classes.find_by_id(id)
    }

    pub fn get_class_by_name(&self, name: &str) -> Option<Class> {
        self.store
            .classes
            .find_one(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Root-first, ending with the class itself (§4.2). Undefined ids yield
    /// the empty list. Guards against cycles defensively even though
    /// `create_class` is supposed to prevent them.
    pub fn inheritance_chain(&self, class_id: &str) -> Vec<Class> {
        let Some(start) = self.store.classes.find_by_id(class_id) else {
            return Vec::new();
        };
        let mut chain = vec![start.clone()];
        let mut cursor = start.parent_id.clone();
        let limit = self.store.classes.len() + 1;
        while let Some(pid) = cursor {
            if chain.len() > limit {
                break;
            }
            let Some(parent) = self.store.classes.find_by_id(pid.as_str()) else {
                break;
            };
            cursor = parent.parent_id.clone();
            chain.push(parent);
        }
        chain.reverse();
        chain
    }

    fn class_lineage_ids(&self, class_id: &str) -> Vec<ClassId> {
        self.inheritance_chain(class_id)
            .into_iter()
            .map(|c| c.id)
            .collect()
    }

    // -- instances ----------------------------------------------------------

    #[instrument(skip(self))]
    pub fn create_instance(
        &self,
        class_id: &str,
        location: Option<ObjectId>,
        owner: ObjectId,
    ) -> Result<Object> {
        let class = self
            .store
            .classes
            .find_by_id(class_id)
            .ok_or_else(|| ObjectGraphError::MissingParent(ClassId::from_str(class_id)))?;
        if class.is_abstract {
            return Err(ObjectGraphError::AbstractClass(class.id));
        }
        let now = Utc::now();
        let obj = Object {
            id: ObjectId::new(),
            dbref: self.alloc_dbref(),
            class_id: Some(class.id.clone()),
            name: class.name.clone(),
            aliases: Vec::new(),
            instance_properties: BTreeMap::new(),
            property_access: BTreeMap::new(),
            location: location.clone(),
            owner,
            player: None,
            created_at: now,
            modified_at: now,
        };
        self.store.objects.insert(obj.id.as_str(), obj.clone())?;
        self.cache.put(obj.clone());
        Ok(obj)
    }

    /// Allocates the next DBREF without otherwise creating anything. World
    /// seeding (`server`) uses this to assign stable `#0`/`#1`-style
    /// addresses before calling `create_plain_object`.
    pub fn next_dbref(&self) -> Dbref {
        self.alloc_dbref()
    }

    /// Plain, non-instantiated objects (exits, rooms authored directly
    /// rather than through a class) and seeded players go through here. The
    /// caller supplies the DBREF (via `next_dbref` or a fixed seed value).
    pub fn create_plain_object(&self, mut obj: Object) -> Result<Object> {
        obj.created_at = Utc::now();
        obj.modified_at = obj.created_at;
        self.store.objects.insert(obj.id.as_str(), obj.clone())?;
        self.cache.put(obj.clone());
        Ok(obj)
    }

    /// `cascade = true` destroys contents recursively; `cascade = false`
    /// orphans them by clearing their `location` (§4.2: "Cascades to
    /// contents — their location becomes null, or they are destroyed by
    /// caller choice").
    #[instrument(skip(self))]
    pub fn destroy(&self, object_id: &str, cascade: bool) -> Result<()> {
        let _obj = self.get_object(object_id)?;
        let contents = self.store.objects_by_location(object_id);
        for child in contents {
            if cascade {
                self.destroy(child.id.as_str(), true)?;
            } else {
                let mut child = child;
                child.location = None;
                child.modified_at = Utc::now();
                self.store.objects.update(child.id.as_str(), child.clone())?;
                self.cache.put(child);
            }
        }
        for verb in self.store.verbs_on(object_id) {
            self.store.verbs.delete(verb.id.as_str());
        }
        for func in self.store.functions_on(object_id) {
            self.store.functions.delete(func.id.as_str());
        }
        self.store.objects.delete(object_id);
        self.cache.invalidate(object_id);
        Ok(())
    }

    pub fn destroy_class(&self, class_id: &str, cascade: bool) -> Result<()> {
        let class = self
            .store
            .classes
            .find_by_id(class_id)
            .ok_or_else(|| ObjectGraphError::NotFound(ClassId::from_str(class_id)))?;
        let instances = self.store.objects_by_class(class_id);
        if !instances.is_empty() {
            if !cascade {
                return Err(ObjectGraphError::HasLivingInstances(class.id));
            }
            for inst in instances {
                self.destroy(inst.id.as_str(), true)?;
            }
        }
        self.store.classes.delete(class_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn move_object(&self, object_id: &str, new_location: Option<ObjectId>) -> Result<()> {
        let mut obj = self.get_object(object_id)?;
        if let Some(dest) = &new_location {
            if self.is_descendant(dest.as_str(), object_id) {
                return Err(ObjectGraphError::CyclicMove);
            }
        }
        obj.location = new_location;
        obj.modified_at = Utc::now();
        self.store.objects.update(object_id, obj.clone())?;
        self.cache.put(obj);
        Ok(())
    }

    /// Is `candidate` reachable by following `location` from `ancestor`?
    /// Used to forbid a move that would create a containment cycle
    /// (§3.2 invariant 3, §4.2 `move`).
    fn is_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        if candidate == ancestor {
            return true;
        }
        let mut cursor = self.get_object(candidate).ok().and_then(|o| o.location);
        let mut steps = 0usize;
        let limit = self.store.objects.len() + 1;
        while let Some(loc) = cursor {
            if loc.as_str() == ancestor {
                return true;
            }
            steps += 1;
            if steps > limit {
                return false;
            }
            cursor = self.get_object(loc.as_str()).ok().and_then(|o| o.location);
        }
        false
    }

    /// Renames an object in place (used by `@dig` to give a freshly
    /// instantiated Room its player-chosen name instead of the class
    /// default).
    pub fn rename(&self, object_id: &str, name: &str) -> Result<Object> {
        let mut obj = self.get_object(object_id)?;
        obj.name = name.to_string();
        obj.modified_at = Utc::now();
        self.store.objects.update(object_id, obj.clone())?;
        self.cache.put(obj.clone());
        Ok(obj)
    }

    pub fn get_object(&self, id: &str) -> Result<Object> {
        if let Some(cached) = self.cache.get(id) {
            return Ok(cached);
        }
        let obj = self
            .store
            .objects
            .find_by_id(id)
            .ok_or_else(|| ObjectGraphError::NotFound(ObjectId::from_str(id)))?;
        self.cache.put(obj.clone());
        Ok(obj)
    }

    pub fn get_object_by_dbref(&self, dbref: Dbref) -> Option<Object> {
        self.store.object_by_dbref(dbref)
    }

    pub fn list_in_location(&self, location_id: &str) -> Vec<Object> {
        self.store.objects_by_location(location_id)
    }

    pub fn find_objects_by_class(&self, class_id: &str, include_subclasses: bool) -> Vec<Object> {
        if !include_subclasses {
            return self.store.objects_by_class(class_id);
        }
        let subclass_ids: Vec<ClassId> = self
            .store
            .classes
            .find_all()
            .into_iter()
            .filter(|c| self.class_lineage_ids(c.id.as_str()).iter().any(|id| id.as_str() == class_id))
            .map(|c| c.id)
            .collect();
        self.store
            .objects
            .find_many(|o| matches!(&o.class_id, Some(cid) if subclass_ids.contains(cid)))
    }

    // -- properties ---------------------------------------------------------

    /// §3.2 invariant 7 lookup order.
    pub fn get_property(&self, object_id: &str, name: &str, caller: &Object) -> Result<Option<Value>> {
        let obj = self.get_object(object_id)?;
        if let Some(v) = obj.instance_properties.get(name) {
            let access = obj.property_access.get(name).copied();
            let lineage = self.same_lineage(caller, &obj);
            PermissionModel::check_property_read(caller, &obj, access, lineage)?;
            return Ok(Some(v.clone()));
        }
        if let Some(class_id) = &obj.class_id {
            for class in self.inheritance_chain(class_id.as_str()).into_iter().rev() {
                if let Some(v) = class.default_properties.get(name) {
                    return Ok(Some(v.clone()));
                }
            }
        }
        Ok(None)
    }

    pub fn set_property(&self, object_id: &str, name: &str, value: Value, caller: &Object) -> Result<()> {
        let mut obj = self.get_object(object_id)?;
        let access = obj.property_access.get(name).copied();
        PermissionModel::check_property_write(caller, &obj, access, name)?;
        obj.instance_properties.insert(name.to_string(), value);
        obj.modified_at = Utc::now();
        self.store.objects.update(object_id, obj.clone())?;
        self.cache.put(obj);
        Ok(())
    }

    pub fn clear_property(&self, object_id: &str, name: &str, caller: &Object) -> Result<()> {
        let mut obj = self.get_object(object_id)?;
        let access = obj.property_access.get(name).copied();
        PermissionModel::check_property_write(caller, &obj, access, name)?;
        obj.instance_properties.remove(name);
        obj.modified_at = Utc::now();
        self.store.objects.update(object_id, obj.clone())?;
        self.cache.put(obj);
        Ok(())
    }

    /// Whether `caller`'s class descends from the class that declares the
    /// property on `owner` — used by the Protected access check (§4.2).
    /// Since property declarations are not separately tracked per class, we
    /// approximate "same lineage" as: caller is of the same class as owner,
    /// or caller's class appears in owner's inheritance chain (or vice
    /// versa).
    fn same_lineage(&self, caller: &Object, owner: &Object) -> bool {
        let (Some(caller_class), Some(owner_class)) = (&caller.class_id, &owner.class_id) else {
            return false;
        };
        let caller_chain = self.class_lineage_ids(caller_class.as_str());
        let owner_chain = self.class_lineage_ids(owner_class.as_str());
        caller_chain.iter().any(|c| owner_chain.contains(c))
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moor_common::Value;

    fn admin() -> Object {
        use moor_store::model::PlayerData;
        use std::collections::BTreeSet;
        Object {
            id: ObjectId::from_str("admin"),
            dbref: Dbref(1),
            class_id: None,
            name: "Admin".into(),
            aliases: vec![],
            instance_properties: BTreeMap::new(),
            property_access: BTreeMap::new(),
            location: None,
            owner: ObjectId::from_str("admin"),
            player: Some(PlayerData {
                password_hash: String::new(),
                session_id: None,
                last_login: None,
                flags: [moor_store::model::PlayerFlag::Admin].into_iter().collect::<BTreeSet<_>>(),
            }),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn class_create_rejects_duplicate_name_case_insensitively() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        graph.create_class("Animal", None, "", false).unwrap();
        let err = graph.create_class("animal", None, "", false).unwrap_err();
        assert!(matches!(err, ObjectGraphError::DuplicateName(_)));
    }

    #[test]
    fn inheritance_chain_is_root_first_and_includes_self() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let animal = graph.create_class("Animal", None, "", false).unwrap();
        let dog = graph
            .create_class("Dog", Some(animal.id.clone()), "", false)
            .unwrap();
        let chain = graph.inheritance_chain(dog.id.as_str());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].id, animal.id);
        assert_eq!(chain[1].id, dog.id);
    }

    #[test]
    fn abstract_classes_cannot_be_instantiated() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let c = graph.create_class("Shape", None, "", true).unwrap();
        let err = graph
            .create_instance(c.id.as_str(), None, ObjectId::from_str("owner"))
            .unwrap_err();
        assert!(matches!(err, ObjectGraphError::AbstractClass(_)));
    }

    #[test]
    fn scenario_s4_inheritance_override_and_clear() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let mut animal = graph.create_class("Animal", None, "", false).unwrap();
        animal
            .default_properties
            .insert("sound".into(), Value::from("generic"));
        graph.store.classes.update(animal.id.as_str(), animal.clone()).unwrap();

        let dog = graph
            .create_class("Dog", Some(animal.id.clone()), "", false)
            .unwrap();
        let mut dog = dog;
        dog.default_properties.insert("sound".into(), Value::from("bark"));
        graph.store.classes.update(dog.id.as_str(), dog.clone()).unwrap();

        let owner = admin();
        let instance = graph
            .create_instance(dog.id.as_str(), None, owner.id.clone())
            .unwrap();
        graph.store.objects.update(instance.id.as_str(), {
            let mut o = instance.clone();
            o.owner = owner.id.clone();
            o
        }).unwrap();

        assert_eq!(
            graph.get_property(instance.id.as_str(), "sound", &owner).unwrap(),
            Some(Value::from("bark"))
        );
        graph
            .set_property(instance.id.as_str(), "sound", Value::from("woof"), &owner)
            .unwrap();
        assert_eq!(
            graph.get_property(instance.id.as_str(), "sound", &owner).unwrap(),
            Some(Value::from("woof"))
        );
        graph.clear_property(instance.id.as_str(), "sound", &owner).unwrap();
        assert_eq!(
            graph.get_property(instance.id.as_str(), "sound", &owner).unwrap(),
            Some(Value::from("bark"))
        );
    }

    #[test]
    fn move_rejects_cycles() {
        let graph = ObjectGraph::new(Arc::new(WorldStore::new()));
        let room = graph.create_plain_object(blank_object("room")).unwrap();
        let bag = graph.create_plain_object(blank_object("bag")).unwrap();
        graph.move_object(bag.id.as_str(), Some(room.id.clone())).unwrap();
        let err = graph
            .move_object(room.id.as_str(), Some(bag.id.clone()))
            .unwrap_err();
        assert!(matches!(err, ObjectGraphError::CyclicMove));
    }

    fn blank_object(name: &str) -> Object {
        Object {
            id: ObjectId::new(),
            dbref: Dbref(0),
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
        }
    }
}
