//! Office versions and the registry locations of their Outlook profiles
//!
//! All paths here are relative to `HKEY_CURRENT_USER`; use [`current_user`] to turn
//! them into the full paths the configuration store and `.reg` files use.

use std::fmt;

/// Hive that holds every Outlook profile
pub const CURRENT_USER: &str = "HKEY_CURRENT_USER";

/// Registry value naming the profile Outlook opens automatically
pub const DEFAULT_PROFILE_VALUE: &str = "DefaultProfile";

/// Registry value pointing Outlook at a PRF file on first run
pub const IMPORT_PRF_VALUE: &str = "ImportPrf";

/// Exchange client options carried alongside a profile
pub const CLIENT_OPTIONS_KEY: &str = r"Software\Microsoft\Exchange\Client\Options";

/// Where Office installs the custom PRF files Outlook setup looks for
pub const OFFICE_INSTALL_DIR: &str = r"C:\Program Files (x86)\Microsoft Office";

const OUTLOOK_2010_PROFILES: &str =
    r"Software\Microsoft\Windows NT\CurrentVersion\Windows Messaging Subsystem\Profiles";
const OUTLOOK_2013_KEY: &str = r"Software\Microsoft\Office\15.0\Outlook";
const OUTLOOK_2013_PROFILES: &str = r"Software\Microsoft\Office\15.0\Outlook\Profiles";
const OUTLOOK_2016_KEY: &str = r"Software\Microsoft\Office\16.0\Outlook";
const OUTLOOK_2016_PROFILES: &str = r"Software\Microsoft\Office\16.0\Outlook\Profiles";

/// Prefix a `HKEY_CURRENT_USER`-relative path with the hive name
pub fn current_user(path: &str) -> String {
    format!("{}\\{}", CURRENT_USER, path)
}

/// Outlook versions whose profiles can be exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfficeVersion {
    Office2010,
    Office2013,
    Office2016,
}

impl OfficeVersion {
    /// Key whose subkeys are the individual profiles
    pub fn profiles_root(self) -> &'static str {
        match self {
            OfficeVersion::Office2010 => OUTLOOK_2010_PROFILES,
            OfficeVersion::Office2013 => OUTLOOK_2013_PROFILES,
            OfficeVersion::Office2016 => OUTLOOK_2016_PROFILES,
        }
    }

    /// Key holding the `DefaultProfile` value
    ///
    /// Outlook 2010 keeps it on the profile root itself; later versions keep it on
    /// the version's Outlook key.
    pub fn default_profile_key(self) -> &'static str {
        match self {
            OfficeVersion::Office2010 => OUTLOOK_2010_PROFILES,
            OfficeVersion::Office2013 => OUTLOOK_2013_KEY,
            OfficeVersion::Office2016 => OUTLOOK_2016_KEY,
        }
    }

    /// Custom PRF file names to try for `Setup\ImportPrf`, in preference order
    pub fn custom_prf_candidates(self) -> &'static [&'static str] {
        match self {
            OfficeVersion::Office2016 => &["Custom16.prf", "Custom15.prf"],
            _ => &["Custom15.prf"],
        }
    }
}

impl fmt::Display for OfficeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfficeVersion::Office2010 => write!(f, "Office2010"),
            OfficeVersion::Office2013 => write!(f, "Office2013"),
            OfficeVersion::Office2016 => write!(f, "Office2016"),
        }
    }
}

/// Office versions a profile can be converted to or imported into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetVersion {
    #[default]
    Office2013,
    Office2016,
}

impl TargetVersion {
    /// Interpret a `TargetVersion=` value; anything unrecognized means 2013
    pub fn from_arg(value: &str) -> Self {
        if value.eq_ignore_ascii_case("2016") || value.eq_ignore_ascii_case("Office2016") {
            TargetVersion::Office2016
        } else {
            TargetVersion::Office2013
        }
    }

    pub fn office(self) -> OfficeVersion {
        match self {
            TargetVersion::Office2013 => OfficeVersion::Office2013,
            TargetVersion::Office2016 => OfficeVersion::Office2016,
        }
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.office().fmt(f)
    }
}

/// Where a named profile lives for a given Office version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLocation {
    root: &'static str,
    name: String,
}

impl ProfileLocation {
    pub fn new(version: OfficeVersion, name: impl Into<String>) -> Self {
        Self {
            root: version.profiles_root(),
            name: name.into(),
        }
    }

    /// The profile root (`...\Profiles`) this location sits under
    pub fn root(&self) -> &'static str {
        self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<root>\<name>`, relative to `HKEY_CURRENT_USER`
    pub fn path(&self) -> String {
        format!("{}\\{}", self.root, self.name)
    }

    /// Full store path including the hive
    pub fn full_path(&self) -> String {
        current_user(&self.path())
    }
}
