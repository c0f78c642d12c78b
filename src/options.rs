//! Interpretation of `NAME=VALUE` command line settings
//!
//! Setting names match by case-insensitive prefix and the value is everything after
//! the first `=`. Settings with a missing or unusable value are ignored, as if they
//! had not been given.

use crate::office::{OfficeVersion, TargetVersion};
use std::fmt;
use std::path::{Path, PathBuf};

/// Profile exported when the store has no usable default
pub const DEFAULT_SOURCE_PROFILE: &str = "Outlook";

/// Profile name written on conversion or import
pub const DEFAULT_TARGET_PROFILE: &str = "Email";

/// Usage text printed when no operation was requested
pub const USAGE: &str = "\
USAGE: outlook-profiler Export2010={FilePath} [Options={OptionsFilePath}] [TargetProfile={ProfileName}] [SourceProfile={ProfileName}] [TargetVersion=2013|2016] [Log={LogPath}] [IgnoreDefault]
       outlook-profiler Export2013={FilePath} [Options={OptionsFilePath}] [TargetProfile={ProfileName}] [SourceProfile={ProfileName}] [TargetVersion=2013|2016] [Log={LogPath}] [IgnoreDefault]
       outlook-profiler Export2016={FilePath} [Options={OptionsFilePath}] [TargetProfile={ProfileName}] [SourceProfile={ProfileName}] [TargetVersion=2013|2016] [Log={LogPath}] [IgnoreDefault]
       outlook-profiler Import={FilePath} [Options={OptionsFilePath}] [TargetProfile={ProfileName}] [TargetVersion=2013|2016] [Log={LogPath}]

NOTE: For export operations, you can use IgnoreDefault as an optional parameter to force the SourceProfile to be used instead of the Default Profile.";

/// The operation selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationKind {
    Export2010,
    Export2013,
    Export2016,
    Import,
    #[default]
    None,
}

impl OperationKind {
    /// Office version to export from, for export operations
    pub fn export_version(self) -> Option<OfficeVersion> {
        match self {
            OperationKind::Export2010 => Some(OfficeVersion::Office2010),
            OperationKind::Export2013 => Some(OfficeVersion::Office2013),
            OperationKind::Export2016 => Some(OfficeVersion::Office2016),
            OperationKind::Import | OperationKind::None => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Export2010 => "Export2010",
            OperationKind::Export2013 => "Export2013",
            OperationKind::Export2016 => "Export2016",
            OperationKind::Import => "Import",
            OperationKind::None => "None",
        };
        f.write_str(name)
    }
}

/// Everything a run needs to know, fixed once parsing is done
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub operation: OperationKind,
    /// Export destination or import source
    pub path: Option<PathBuf>,
    /// Client options file, exported or imported alongside the profile
    pub options_path: Option<PathBuf>,
    pub source_profile: String,
    pub target_profile: String,
    pub target_version: TargetVersion,
    pub log_path: Option<PathBuf>,
    /// Export `source_profile` even when the store names a different default
    pub ignore_default: bool,
}

impl Default for OperationRequest {
    fn default() -> Self {
        Self {
            operation: OperationKind::None,
            path: None,
            options_path: None,
            source_profile: DEFAULT_SOURCE_PROFILE.to_string(),
            target_profile: DEFAULT_TARGET_PROFILE.to_string(),
            target_version: TargetVersion::default(),
            log_path: None,
            ignore_default: false,
        }
    }
}

impl OperationRequest {
    /// Build a request from raw command line settings
    ///
    /// Every setting is checked against every name, and later settings override
    /// earlier ones.
    ///
    /// # Arguments
    /// * `args` - Settings such as `Export2013=C:\out.reg` or `IgnoreDefault`
    ///
    /// # Returns
    /// The resolved request; invalid settings leave the defaults in place
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = Self::default();

        for arg in args {
            let arg = arg.as_ref();
            let value = arg.split_once('=').map(|(_, value)| value);

            if has_prefix(arg, "export") || has_prefix(arg, "import") {
                if let Some(path) = value.and_then(usable_file_path) {
                    request.operation = if has_prefix(arg, "export2013") {
                        OperationKind::Export2013
                    } else if has_prefix(arg, "export2016") {
                        OperationKind::Export2016
                    } else if has_prefix(arg, "export2010") {
                        OperationKind::Export2010
                    } else {
                        OperationKind::Import
                    };
                    request.path = Some(path);
                }
            }

            if has_prefix(arg, "options") {
                if let Some(path) = value.and_then(usable_file_path) {
                    request.options_path = Some(path);
                }
            }

            if has_prefix(arg, "targetProfile") {
                if let Some(name) = value.filter(|v| !v.is_empty()) {
                    request.target_profile = name.to_string();
                }
            }

            if has_prefix(arg, "sourceProfile") {
                if let Some(name) = value.filter(|v| !v.is_empty()) {
                    request.source_profile = name.to_string();
                }
            }

            if has_prefix(arg, "targetVersion") {
                if let Some(version) = value.filter(|v| !v.is_empty()) {
                    request.target_version = TargetVersion::from_arg(version);
                }
            }

            if has_prefix(arg, "log") {
                if let Some(path) = value.and_then(usable_file_path) {
                    request.log_path = Some(path);
                }
            }

            if has_prefix(arg, "IgnoreDefault") {
                request.ignore_default = true;
            }
        }

        request
    }
}

/// Case-insensitive ASCII prefix test
fn has_prefix(arg: &str, prefix: &str) -> bool {
    arg.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Accept a file path whose name is non-empty and whose directory already exists
///
/// A bare file name refers to the current directory.
fn usable_file_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        return None;
    }

    let path = Path::new(value);
    path.file_name().filter(|name| !name.is_empty())?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    parent.is_dir().then(|| path.to_path_buf())
}
