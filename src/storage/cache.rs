use crate::core::{Entity, Guid, Result, SphynxError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Guid -> entity map shared by every request.
///
/// A single exclusive lock guards the map. It is held only for the map
/// access itself, never while an operation computes the value being stored.
pub struct EntityCache {
    entities: Mutex<HashMap<Guid, Arc<Entity>>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self {
            entities: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, guid: &Guid) -> Result<Option<Arc<Entity>>> {
        let entities = self.entities.lock()?;
        Ok(entities.get(guid).cloned())
    }

    pub fn contains(&self, guid: &Guid) -> Result<bool> {
        let entities = self.entities.lock()?;
        Ok(entities.contains_key(guid))
    }

    /// Insert or replace. Replacing is only legal with content equal to the
    /// guid's existing value.
    pub fn put(&self, guid: Guid, entity: Arc<Entity>) -> Result<()> {
        let mut entities = self.entities.lock()?;
        entities.insert(guid, entity);
        Ok(())
    }

    /// Commits a whole batch under one lock acquisition, so readers see
    /// either none or all of it.
    pub fn put_all<I>(&self, batch: I) -> Result<()>
    where
        I: IntoIterator<Item = (Guid, Arc<Entity>)>,
    {
        let mut entities = self.entities.lock()?;
        entities.extend(batch);
        Ok(())
    }

    /// Looks up every named input. The first missing guid aborts the lookup.
    pub fn resolve(&self, inputs: &BTreeMap<String, Guid>) -> Result<HashMap<String, Arc<Entity>>> {
        let entities = self.entities.lock()?;
        let mut resolved = HashMap::with_capacity(inputs.len());
        for (name, guid) in inputs {
            let entity = entities
                .get(guid)
                .cloned()
                .ok_or_else(|| SphynxError::InputNotFound {
                    name: name.clone(),
                    guid: guid.clone(),
                })?;
            resolved.insert(name.clone(), entity);
        }
        Ok(resolved)
    }

    pub fn len(&self) -> Result<usize> {
        let entities = self.entities.lock()?;
        Ok(entities.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VertexSet;
    use std::thread;

    fn vertices(mapping: Vec<i64>) -> Arc<Entity> {
        Arc::new(Entity::VertexSet(VertexSet::new(mapping)))
    }

    #[test]
    fn test_missing_guid_reports_absent() {
        let cache = EntityCache::new();
        let guid = Guid::from("never-committed");
        assert!(cache.get(&guid).unwrap().is_none());
        assert!(!cache.contains(&guid).unwrap());
    }

    #[test]
    fn test_put_is_visible_from_other_threads() {
        let cache = Arc::new(EntityCache::new());
        let writer = Arc::clone(&cache);
        thread::spawn(move || {
            writer.put(Guid::from("v"), vertices(vec![1, 2])).unwrap();
        })
        .join()
        .unwrap();

        assert!(cache.contains(&Guid::from("v")).unwrap());
        assert_eq!(*cache.get(&Guid::from("v")).unwrap().unwrap(), *vertices(vec![1, 2]));
    }

    #[test]
    fn test_put_all_commits_batch() {
        let cache = EntityCache::new();
        cache
            .put_all(vec![
                (Guid::from("a"), vertices(vec![1])),
                (Guid::from("b"), vertices(vec![2])),
            ])
            .unwrap();
        assert_eq!(cache.len().unwrap(), 2);
    }

    #[test]
    fn test_resolve_reports_first_missing_input() {
        let cache = EntityCache::new();
        cache.put(Guid::from("present"), vertices(vec![])).unwrap();

        let mut inputs = BTreeMap::new();
        inputs.insert("a".to_string(), Guid::from("present"));
        inputs.insert("b".to_string(), Guid::from("absent"));

        match cache.resolve(&inputs) {
            Err(SphynxError::InputNotFound { name, guid }) => {
                assert_eq!(name, "b");
                assert_eq!(guid, Guid::from("absent"));
            }
            other => panic!("expected InputNotFound, got {other:?}"),
        }
    }
}
