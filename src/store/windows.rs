use super::{ConfigStore, StoreError, split_hive};
use crate::tree::{KeySection, RegTree, RegValue, ValueEntry};
use registry::{Data, Hive, RegKey, Security};
use std::convert::TryInto;
use tracing::{debug, warn};
use utfx::U16CString;

/// The live Windows Registry
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }

    fn hive(path: &str) -> Result<(Hive, &str), StoreError> {
        let (name, rest) = split_hive(path)?;
        let hive = match name {
            "HKEY_CURRENT_USER" => Hive::CurrentUser,
            "HKEY_LOCAL_MACHINE" => Hive::LocalMachine,
            "HKEY_CLASSES_ROOT" => Hive::ClassesRoot,
            "HKEY_USERS" => Hive::Users,
            "HKEY_CURRENT_CONFIG" => Hive::CurrentConfig,
            _ => return Err(StoreError::UnknownHive(path.to_string())),
        };
        Ok((hive, rest))
    }

    fn open(path: &str, sec: Security) -> Result<RegKey, StoreError> {
        let (hive, rest) = Self::hive(path)?;
        hive.open(rest, sec).map_err(|e| access(path, e))
    }

    fn collect(key: &RegKey, path: &str, tree: &mut RegTree) -> Result<(), StoreError> {
        let mut section = KeySection::new(path);
        for value in key.values() {
            let value = value.map_err(|e| access(path, e))?;
            let name = value.name().to_string_lossy();
            match from_data(value.data()) {
                Some(data) => section.values.push(ValueEntry::set(name, data)),
                None => warn!(path, value = %name, "skipping value of unsupported type"),
            }
        }
        tree.push(section);

        let mut children = Vec::new();
        for child in key.keys() {
            let child = child.map_err(|e| access(path, e))?;
            children.push(child.to_string());
        }
        children.sort_by_key(|name| name.to_lowercase());

        for name in children {
            let child_path = format!("{}\\{}", path, name);
            let child = key
                .open(name.as_str(), Security::Read)
                .map_err(|e| access(&child_path, e))?;
            Self::collect(&child, &child_path, tree)?;
        }
        Ok(())
    }
}

impl ConfigStore for WindowsRegistry {
    fn key_exists(&self, path: &str) -> bool {
        Self::open(path, Security::Read).is_ok()
    }

    fn read_value(&self, path: &str, name: &str) -> Result<Option<RegValue>, StoreError> {
        let Ok(key) = Self::open(path, Security::Read) else {
            return Ok(None);
        };
        match key.value(name) {
            Ok(data) => Ok(from_data(&data)),
            Err(registry::value::Error::NotFound(..)) => Ok(None),
            Err(e) => Err(access(path, e)),
        }
    }

    fn supports(&self, value: &RegValue) -> bool {
        writable(value)
    }

    fn set_value(&mut self, path: &str, name: &str, value: &RegValue) -> Result<(), StoreError> {
        let key = Self::open(path, Security::Write)?;
        let data = to_data(path, name, value)?;
        key.set_value(name, &data).map_err(|e| access(path, e))
    }

    fn delete_value(&mut self, path: &str, name: &str) -> Result<(), StoreError> {
        let Ok(key) = Self::open(path, Security::Write) else {
            return Ok(());
        };
        match key.delete_value(name) {
            Ok(()) | Err(registry::value::Error::NotFound(..)) => Ok(()),
            Err(e) => Err(access(path, e)),
        }
    }

    fn create_key(&mut self, path: &str) -> Result<(), StoreError> {
        let (hive, rest) = Self::hive(path)?;
        debug!(path, "creating key");
        hive.create(rest, Security::AllAccess)
            .map(|_| ())
            .map_err(|e| access(path, e))
    }

    fn delete_key(&mut self, path: &str) -> Result<(), StoreError> {
        if !self.key_exists(path) {
            return Ok(());
        }
        let (hive, rest) = Self::hive(path)?;
        hive.delete(rest, true).map_err(|e| access(path, e))
    }

    fn import_tree(&self, path: &str) -> Result<RegTree, StoreError> {
        let key = Self::open(path, Security::Read)
            .map_err(|_| StoreError::KeyNotFound(path.to_string()))?;
        let mut tree = RegTree::new();
        Self::collect(&key, path, &mut tree)?;
        debug!(path, keys = tree.len(), "imported registry subtree");
        Ok(tree)
    }
}

fn access(path: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Access {
        path: path.to_string(),
        message: err.to_string(),
    }
}

fn from_data(data: &Data) -> Option<RegValue> {
    let value = match data {
        Data::None => RegValue::None,
        Data::String(s) => RegValue::String(s.to_string_lossy()),
        Data::ExpandString(s) => RegValue::ExpandString(s.to_string_lossy()),
        Data::MultiString(list) => {
            RegValue::MultiString(list.iter().map(|s| s.to_string_lossy()).collect())
        }
        Data::Binary(bytes) => RegValue::Binary(bytes.clone()),
        Data::U32(v) => RegValue::Dword(*v),
        Data::U32BE(v) => RegValue::Raw {
            kind: 5,
            bytes: v.to_be_bytes().to_vec(),
        },
        Data::U64(v) => RegValue::Qword(*v),
        _ => return None,
    };
    Some(value)
}

fn to_data(path: &str, name: &str, value: &RegValue) -> Result<Data, StoreError> {
    let wide = |s: &str| -> Result<U16CString, StoreError> {
        s.try_into().map_err(|_| unsupported(path, name, "string contains a NUL character"))
    };

    Ok(match value {
        RegValue::None => Data::None,
        RegValue::String(s) => Data::String(wide(s)?),
        RegValue::ExpandString(s) => Data::ExpandString(wide(s)?),
        RegValue::MultiString(list) => Data::MultiString(
            list.iter()
                .map(|s| wide(s))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        RegValue::Binary(bytes) => Data::Binary(bytes.clone()),
        RegValue::Dword(v) => Data::U32(*v),
        RegValue::Qword(v) => Data::U64(*v),
        RegValue::Raw { kind: 5, bytes } if bytes.len() == 4 => {
            Data::U32BE(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        RegValue::Raw { kind, .. } => {
            return Err(unsupported(path, name, &format!("registry type {} is not writable", kind)));
        }
    })
}

/// Whether `to_data` can express a value
fn writable(value: &RegValue) -> bool {
    let has_nul = |s: &String| s.contains('\0');
    match value {
        RegValue::String(s) | RegValue::ExpandString(s) => !has_nul(s),
        RegValue::MultiString(list) => !list.iter().any(has_nul),
        RegValue::Raw { kind: 5, bytes } => bytes.len() == 4,
        RegValue::Raw { .. } => false,
        _ => true,
    }
}

fn unsupported(path: &str, name: &str, reason: &str) -> StoreError {
    StoreError::UnsupportedValue {
        path: path.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
