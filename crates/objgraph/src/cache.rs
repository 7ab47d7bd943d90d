use moor_store::model::Object;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-wide in-memory cache of live `Object` values, keyed by id
/// (spec.md §4.2). Every successful write to the `objects` collection must
/// flow through `put`/`invalidate` so that readers never see a torn view of
/// a single object (§4.2 "Cache coherence").
///
/// The underlying `Store` is itself in-memory (crate `moor-store`), so this
/// cache is not buying query latency the way it would in front of a real
/// database — it exists to give `ObjectGraph` a single choke point for
/// "the cache is authoritative for reads; the store is authoritative for
/// writes" (§4.1), the way the teacher layers `sysobj_cache`/`prop_cache`
/// read caches in front of its persistent `WorldState` transactions.
#[derive(Default)]
pub struct ObjectCache {
    entries: RwLock<HashMap<String, Object>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Object> {
        self.entries.read().get(id).cloned()
    }

    pub fn put(&self, obj: Object) {
        self.entries.write().insert(obj.id.as_str().to_string(), obj);
    }

    pub fn invalidate(&self, id: &str) {
        self.entries.write().remove(id);
    }
}
