//! In-memory snapshot of a registry subtree
//!
//! A [`RegTree`] is the flat, ordered list of key sections a `.reg` file contains:
//! each section carries a full key path (hive included) and its values, parents
//! before children. The configuration store produces and consumes the same shape.

/// Registry value type number for `REG_NONE`
pub const REG_NONE: u32 = 0;
/// Registry value type number for `REG_SZ`
pub const REG_SZ: u32 = 1;
/// Registry value type number for `REG_EXPAND_SZ`
pub const REG_EXPAND_SZ: u32 = 2;
/// Registry value type number for `REG_BINARY`
pub const REG_BINARY: u32 = 3;
/// Registry value type number for `REG_DWORD`
pub const REG_DWORD: u32 = 4;
/// Registry value type number for `REG_MULTI_SZ`
pub const REG_MULTI_SZ: u32 = 7;
/// Registry value type number for `REG_QWORD`
pub const REG_QWORD: u32 = 11;

/// Typed registry value data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegValue {
    None,
    String(String),
    ExpandString(String),
    MultiString(Vec<String>),
    Binary(Vec<u8>),
    Dword(u32),
    Qword(u64),
    /// Any other registry type, kept as raw bytes
    Raw { kind: u32, bytes: Vec<u8> },
}

impl RegValue {
    /// Registry type number of this value
    pub fn kind(&self) -> u32 {
        match self {
            RegValue::None => REG_NONE,
            RegValue::String(_) => REG_SZ,
            RegValue::ExpandString(_) => REG_EXPAND_SZ,
            RegValue::MultiString(_) => REG_MULTI_SZ,
            RegValue::Binary(_) => REG_BINARY,
            RegValue::Dword(_) => REG_DWORD,
            RegValue::Qword(_) => REG_QWORD,
            RegValue::Raw { kind, .. } => *kind,
        }
    }

    /// The value as text, for string-typed values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RegValue::String(s) | RegValue::ExpandString(s) => Some(s),
            _ => None,
        }
    }

    /// Copy of the value with `$$NAME$$` tokens substituted in all string data
    pub fn substitute_env<F>(&self, lookup: &F) -> RegValue
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            RegValue::String(s) => RegValue::String(substitute_env_tokens(s, lookup)),
            RegValue::ExpandString(s) => RegValue::ExpandString(substitute_env_tokens(s, lookup)),
            RegValue::MultiString(list) => RegValue::MultiString(
                list.iter()
                    .map(|s| substitute_env_tokens(s, lookup))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// A named value inside a key section
///
/// An empty name is the key's default value (`@` in `.reg` files). A `None` value
/// marks the value for deletion (`"name"=-`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEntry {
    pub name: String,
    pub value: Option<RegValue>,
}

impl ValueEntry {
    pub fn set(name: impl Into<String>, value: RegValue) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// One key and its values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySection {
    /// Full path including the hive, e.g. `HKEY_CURRENT_USER\Software\...`
    pub path: String,
    /// Remove the key and its subtree instead of writing it (`[-path]`)
    pub delete: bool,
    pub values: Vec<ValueEntry>,
}

impl KeySection {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            delete: false,
            values: Vec::new(),
        }
    }

    pub fn deletion(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            delete: true,
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: RegValue) -> Self {
        self.values.push(ValueEntry::set(name, value));
        self
    }

    /// Look up a value by name, ignoring case like the registry does
    pub fn value(&self, name: &str) -> Option<&RegValue> {
        self.values
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .and_then(|entry| entry.value.as_ref())
    }
}

/// Ordered list of key sections making up a registry subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegTree {
    pub keys: Vec<KeySection>,
}

impl RegTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, section: KeySection) {
        self.keys.push(section);
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Find a key section by path, ignoring case
    pub fn key(&self, path: &str) -> Option<&KeySection> {
        self.keys
            .iter()
            .find(|section| section.path.eq_ignore_ascii_case(path))
    }
}

/// Replace `$$NAME$$` tokens using `lookup`; tokens it cannot resolve stay verbatim
pub fn substitute_env_tokens<F>(text: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("$$") {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        let Some(close) = after_open.find("$$") else {
            result.push_str(&rest[open..]);
            return result;
        };

        let name = &after_open[..close];
        let resolved = is_env_name(name).then(|| lookup(name)).flatten();
        match resolved {
            Some(value) => {
                result.push_str(&value);
                rest = &after_open[close + 2..];
            }
            None => {
                result.push_str("$$");
                rest = after_open;
            }
        }
    }

    result.push_str(rest);
    result
}

fn is_env_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '(' || c == ')')
}
