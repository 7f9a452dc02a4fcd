use crate::engine::ContractEngine;
use dashmap::{DashMap, Entry};
use std::fmt::{Display, Formatter};
use std::hash::Hash;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheError {
    EngineNotFound,
    EngineAlreadyExists,
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::EngineNotFound => write!(f, "Engine not found in collection"),
            CacheError::EngineAlreadyExists => write!(f, "Engine already exists in collection"),
        }
    }
}

impl std::error::Error for CacheError {}

/// Named engines, each published as a whole.
///
/// A reload builds a new [`ContractEngine`] off to the side and swaps it in
/// with [`replace`](Self::replace). Requests holding the previous `Arc` finish
/// against the snapshot they started with.
pub struct ContractCollection<K> {
    engines: DashMap<K, Arc<ContractEngine>>,
}

impl<K> Default for ContractCollection<K>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ContractCollection<K>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        ContractCollection {
            engines: DashMap::new(),
        }
    }

    pub fn insert(&self, id: K, engine: ContractEngine) -> Result<Arc<ContractEngine>, CacheError> {
        match self.engines.entry(id) {
            Entry::Occupied(_) => Err(CacheError::EngineAlreadyExists),
            Entry::Vacant(entry) => {
                let engine = Arc::new(engine);
                entry.insert(Arc::clone(&engine));
                Ok(engine)
            }
        }
    }

    /// Publishes `engine` under `id`, returning the snapshot it replaced.
    pub fn replace(&self, id: K, engine: ContractEngine) -> Option<Arc<ContractEngine>> {
        let previous = self.engines.insert(id, Arc::new(engine));
        log::debug!(
            "Published engine snapshot ({})",
            if previous.is_some() { "replaced" } else { "new" }
        );
        previous
    }

    pub fn get(&self, id: &K) -> Result<Arc<ContractEngine>, CacheError> {
        match self.engines.get(id) {
            Some(engine) => Ok(Arc::clone(engine.value())),
            None => Err(CacheError::EngineNotFound),
        }
    }

    pub fn remove(&self, id: &K) -> Result<Arc<ContractEngine>, CacheError> {
        match self.engines.remove(id) {
            Some((_, engine)) => Ok(engine),
            None => Err(CacheError::EngineNotFound),
        }
    }

    pub fn contains(&self, id: &K) -> bool {
        self.engines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn clear(&self) {
        self.engines.clear();
        log::debug!("Cleared engine collection");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::Operation;
    use serde_json::json;

    fn engine(id: &str) -> ContractEngine {
        let operation: Operation = serde_json::from_value(json!({
            "id": id,
            "method": "get",
            "path": "/pets",
            "responses": [{"code": "204"}]
        }))
        .unwrap();
        ContractEngine::builder().operation(operation).build().unwrap()
    }

    #[test]
    fn test_insert_get_remove() {
        let collection = ContractCollection::new();
        assert_eq!(collection.get(&"pets").err(), Some(CacheError::EngineNotFound));

        let inserted = collection.insert("pets", engine("v1")).unwrap();
        assert!(collection.contains(&"pets"));
        assert!(Arc::ptr_eq(&inserted, &collection.get(&"pets").unwrap()));
        assert_eq!(
            collection.insert("pets", engine("v2")).err(),
            Some(CacheError::EngineAlreadyExists)
        );

        assert!(collection.remove(&"pets").is_ok());
        assert!(collection.is_empty());
        assert!(collection.remove(&"pets").is_err());
    }

    #[test]
    fn test_replace_keeps_old_snapshot_alive() {
        let collection = ContractCollection::new();
        assert!(collection.replace("pets", engine("v1")).is_none());
        let held = collection.get(&"pets").unwrap();

        let previous = collection.replace("pets", engine("v2")).unwrap();
        assert!(Arc::ptr_eq(&held, &previous));
        assert!(held.find_operation("v1").is_some());
        assert!(collection.get(&"pets").unwrap().find_operation("v2").is_some());
        assert_eq!(collection.len(), 1);

        collection.clear();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_independent_collections() {
        let first = ContractCollection::new();
        let second = ContractCollection::new();
        first.insert(1, engine("a")).unwrap();
        assert!(!second.contains(&1));
    }
}
