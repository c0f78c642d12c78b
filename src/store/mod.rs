//! Configuration store access
//!
//! The [`ConfigStore`] trait is the seam between the profile logic and the Windows
//! Registry. Paths are always full paths including the hive
//! (`HKEY_CURRENT_USER\Software\...`); short hive aliases such as `HKCU` are
//! accepted wherever a path is.
//!
//! - `memory`: case-insensitive in-memory store
//! - `windows`: the live registry (Windows only)

mod memory;
#[cfg(windows)]
mod windows;

pub use memory::MemoryStore;
#[cfg(windows)]
pub use windows::WindowsRegistry;

use crate::tree::{RegTree, RegValue};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by configuration stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown registry hive in '{0}'")]
    UnknownHive(String),

    #[error("registry key '{0}' does not exist")]
    KeyNotFound(String),

    #[error("value '{name}' under '{path}' cannot be stored: {reason}")]
    UnsupportedValue {
        path: String,
        name: String,
        reason: String,
    },

    #[error("registry access failed for '{path}': {message}")]
    Access { path: String, message: String },
}

/// How a tree is written back into a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Write every key of the tree, not just the first
    pub recursive: bool,
    /// Replace `$$NAME$$` tokens in string values with environment variables
    pub substitute_env: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            substitute_env: true,
        }
    }
}

/// Hierarchical key/value configuration store
pub trait ConfigStore {
    /// Whether a key exists
    fn key_exists(&self, path: &str) -> bool;

    /// Read a value; `Ok(None)` when the key or value is missing
    fn read_value(&self, path: &str, name: &str) -> Result<Option<RegValue>, StoreError>;

    /// Set a value on an existing key
    fn set_value(&mut self, path: &str, name: &str, value: &RegValue) -> Result<(), StoreError>;

    /// Remove a value; missing values are not an error
    fn delete_value(&mut self, path: &str, name: &str) -> Result<(), StoreError>;

    /// Create a key and any missing parents
    fn create_key(&mut self, path: &str) -> Result<(), StoreError>;

    /// Remove a key and its subtree; missing keys are not an error
    fn delete_key(&mut self, path: &str) -> Result<(), StoreError>;

    /// Snapshot a key and its whole subtree, parents before children
    fn import_tree(&self, path: &str) -> Result<RegTree, StoreError>;

    /// Read a string value, treating an empty string as absent
    fn read_string(&self, path: &str, name: &str) -> Result<Option<String>, StoreError> {
        let value = self.read_value(path, name)?;
        Ok(value
            .as_ref()
            .and_then(RegValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }

    /// Whether the store can hold `value`; `write_tree` skips values it cannot
    fn supports(&self, _value: &RegValue) -> bool {
        true
    }

    fn set_string(&mut self, path: &str, name: &str, value: &str) -> Result<(), StoreError> {
        self.set_value(path, name, &RegValue::String(value.to_string()))
    }

    /// Apply a tree: delete, create and set values section by section
    fn write_tree(&mut self, tree: &RegTree, options: WriteOptions) -> Result<(), StoreError> {
        let lookup = |name: &str| std::env::var(name).ok();
        let sections = if options.recursive {
            &tree.keys[..]
        } else {
            &tree.keys[..tree.keys.len().min(1)]
        };

        for section in sections {
            if section.delete {
                debug!(path = %section.path, "deleting key");
                self.delete_key(&section.path)?;
                continue;
            }

            self.create_key(&section.path)?;
            for entry in &section.values {
                let Some(value) = &entry.value else {
                    self.delete_value(&section.path, &entry.name)?;
                    continue;
                };
                let value = if options.substitute_env {
                    value.substitute_env(&lookup)
                } else {
                    value.clone()
                };
                if !self.supports(&value) {
                    warn!(
                        path = %section.path,
                        value = %entry.name,
                        kind = value.kind(),
                        "skipping value the store cannot hold"
                    );
                    continue;
                }
                self.set_value(&section.path, &entry.name, &value)?;
            }
        }

        debug!(keys = sections.len(), "tree written");
        Ok(())
    }
}

/// Canonical name of a hive given its full name or short alias
pub fn canonical_hive(name: &str) -> Option<&'static str> {
    const HIVES: &[(&str, &str)] = &[
        ("HKEY_CURRENT_USER", "HKCU"),
        ("HKEY_LOCAL_MACHINE", "HKLM"),
        ("HKEY_CLASSES_ROOT", "HKCR"),
        ("HKEY_USERS", "HKU"),
        ("HKEY_CURRENT_CONFIG", "HKCC"),
    ];

    HIVES
        .iter()
        .find(|(full, short)| name.eq_ignore_ascii_case(full) || name.eq_ignore_ascii_case(short))
        .map(|(full, _)| *full)
}

/// Split a full path into its canonical hive and the remaining subkey path
pub fn split_hive(path: &str) -> Result<(&'static str, &str), StoreError> {
    let path = path.trim_matches('\\');
    let (hive, rest) = path.split_once('\\').unwrap_or((path, ""));
    let hive = canonical_hive(hive).ok_or_else(|| StoreError::UnknownHive(path.to_string()))?;
    Ok((hive, rest.trim_matches('\\')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::KeySection;

    #[test]
    fn test_split_hive() {
        assert_eq!(
            split_hive(r"HKCU\Software\Test").unwrap(),
            ("HKEY_CURRENT_USER", r"Software\Test")
        );
        assert_eq!(
            split_hive(r"hkey_local_machine\").unwrap(),
            ("HKEY_LOCAL_MACHINE", "")
        );
        assert!(matches!(
            split_hive(r"HKEY_NOWHERE\x"),
            Err(StoreError::UnknownHive(_))
        ));
    }

    /// Memory store that, like the Windows backend, cannot hold raw value types
    struct NoRawStore(MemoryStore);

    impl ConfigStore for NoRawStore {
        fn key_exists(&self, path: &str) -> bool {
            self.0.key_exists(path)
        }

        fn read_value(&self, path: &str, name: &str) -> Result<Option<RegValue>, StoreError> {
            self.0.read_value(path, name)
        }

        fn set_value(&mut self, path: &str, name: &str, value: &RegValue) -> Result<(), StoreError> {
            self.0.set_value(path, name, value)
        }

        fn delete_value(&mut self, path: &str, name: &str) -> Result<(), StoreError> {
            self.0.delete_value(path, name)
        }

        fn create_key(&mut self, path: &str) -> Result<(), StoreError> {
            self.0.create_key(path)
        }

        fn delete_key(&mut self, path: &str) -> Result<(), StoreError> {
            self.0.delete_key(path)
        }

        fn import_tree(&self, path: &str) -> Result<RegTree, StoreError> {
            self.0.import_tree(path)
        }

        fn supports(&self, value: &RegValue) -> bool {
            !matches!(value, RegValue::Raw { .. })
        }
    }

    #[test]
    fn test_write_tree_skips_unsupported_values() {
        let key = r"HKEY_CURRENT_USER\Software\Test";
        let mut tree = RegTree::new();
        tree.push(
            KeySection::new(key)
                .with_value("Link", RegValue::Raw { kind: 6, bytes: vec![1, 2] })
                .with_value("Name", RegValue::String("kept".to_string())),
        );

        let mut store = NoRawStore(MemoryStore::new());
        store.write_tree(&tree, WriteOptions::default()).unwrap();

        assert_eq!(store.read_value(key, "Link").unwrap(), None);
        assert_eq!(
            store.read_value(key, "Name").unwrap(),
            Some(RegValue::String("kept".to_string()))
        );
    }
}
