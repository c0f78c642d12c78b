use super::{ConfigStore, StoreError, split_hive};
use crate::tree::{KeySection, RegTree, RegValue, ValueEntry};
use std::collections::BTreeMap;

/// In-memory configuration store
///
/// Key and value names compare case-insensitively, and keys keep the casing they
/// were first created with. Subtree snapshots come back in case-insensitive
/// path order, which puts every parent before its children.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    keys: BTreeMap<String, MemoryKey>,
}

#[derive(Debug, Clone)]
struct MemoryKey {
    path: String,
    values: Vec<(String, RegValue)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper: create a key and set a value on it
    pub fn with_value(mut self, path: &str, name: &str, value: RegValue) -> Result<Self, StoreError> {
        self.create_key(path)?;
        self.set_value(path, name, &value)?;
        Ok(self)
    }

    /// Number of keys held, hives included
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    fn normalize(path: &str) -> Result<String, StoreError> {
        let (hive, rest) = split_hive(path)?;
        Ok(if rest.is_empty() {
            hive.to_string()
        } else {
            format!("{}\\{}", hive, rest)
        })
    }

    fn lookup(&self, path: &str) -> Result<Option<&MemoryKey>, StoreError> {
        let normalized = Self::normalize(path)?;
        Ok(self.keys.get(&normalized.to_lowercase()))
    }

    fn lookup_mut(&mut self, path: &str) -> Result<&mut MemoryKey, StoreError> {
        let normalized = Self::normalize(path)?;
        self.keys
            .get_mut(&normalized.to_lowercase())
            .ok_or(StoreError::KeyNotFound(normalized))
    }

    /// Lowercased keys of `path` and everything below it
    fn subtree_keys(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let root = Self::normalize(path)?.to_lowercase();
        let prefix = format!("{}\\", root);
        Ok(self
            .keys
            .keys()
            .filter(|k| **k == root || k.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

impl ConfigStore for MemoryStore {
    fn key_exists(&self, path: &str) -> bool {
        matches!(self.lookup(path), Ok(Some(_)))
    }

    fn read_value(&self, path: &str, name: &str) -> Result<Option<RegValue>, StoreError> {
        Ok(self.lookup(path)?.and_then(|key| {
            key.values
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        }))
    }

    fn set_value(&mut self, path: &str, name: &str, value: &RegValue) -> Result<(), StoreError> {
        let key = self.lookup_mut(path)?;
        match key.values.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = value.clone(),
            None => key.values.push((name.to_string(), value.clone())),
        }
        Ok(())
    }

    fn delete_value(&mut self, path: &str, name: &str) -> Result<(), StoreError> {
        if let Ok(key) = self.lookup_mut(path) {
            key.values.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        }
        Ok(())
    }

    fn create_key(&mut self, path: &str) -> Result<(), StoreError> {
        let normalized = Self::normalize(path)?;
        let mut current = String::new();
        for segment in normalized.split('\\').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(segment);
            self.keys
                .entry(current.to_lowercase())
                .or_insert_with(|| MemoryKey {
                    path: current.clone(),
                    values: Vec::new(),
                });
        }
        Ok(())
    }

    fn delete_key(&mut self, path: &str) -> Result<(), StoreError> {
        for key in self.subtree_keys(path)? {
            self.keys.remove(&key);
        }
        Ok(())
    }

    fn import_tree(&self, path: &str) -> Result<RegTree, StoreError> {
        let keys = self.subtree_keys(path)?;
        if keys.is_empty() {
            return Err(StoreError::KeyNotFound(Self::normalize(path)?));
        }

        let mut tree = RegTree::new();
        for key in keys {
            let stored = &self.keys[&key];
            let mut section = KeySection::new(stored.path.clone());
            section.values = stored
                .values
                .iter()
                .map(|(name, value)| ValueEntry::set(name.clone(), value.clone()))
                .collect();
            tree.push(section);
        }
        Ok(tree)
    }
}
