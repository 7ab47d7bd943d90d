use moor_common::StoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A typed document collection addressable by primary key (spec.md §4.1).
/// Generic over any `Clone` document type; secondary indexes are layered on
/// top by the collections in `world.rs` that need them, rather than baked
/// in here, since each collection's index shape differs.
pub struct Collection<T: Clone> {
    rows: RwLock<BTreeMap<String, T>>,
}

impl<T: Clone> Default for Collection<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T: Clone> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: &str, doc: T) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        if rows.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        rows.insert(id.to_string(), doc);
        Ok(())
    }

    pub fn update(&self, id: &str, doc: T) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        if !rows.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        rows.insert(id.to_string(), doc);
        Ok(())
    }

    pub fn delete(&self, id: &str) -> bool {
        self.rows.write().remove(id).is_some()
    }

    pub fn find_by_id(&self, id: &str) -> Option<T> {
        self.rows.read().get(id).cloned()
    }

    pub fn find_one<F: Fn(&T) -> bool>(&self, pred: F) -> Option<T> {
        self.rows.read().values().find(|v| pred(v)).cloned()
    }

    pub fn find_many<F: Fn(&T) -> bool>(&self, pred: F) -> Vec<T> {
        self.rows.read().values().filter(|v| pred(v)).cloned().collect()
    }

    pub fn find_all(&self) -> Vec<T> {
        self.rows.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_duplicate_fails() {
        let c: Collection<i32> = Collection::new();
        c.insert("a", 1).unwrap();
        assert!(matches!(c.insert("a", 2), Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn update_missing_fails() {
        let c: Collection<i32> = Collection::new();
        assert!(matches!(c.update("a", 1), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_reports_whether_a_row_was_removed() {
        let c: Collection<i32> = Collection::new();
        c.insert("a", 1).unwrap();
        assert!(c.delete("a"));
        assert!(!c.delete("a"));
    }
}
