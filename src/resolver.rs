//! Profile and version resolution
//!
//! Decides which profile an export actually reads (the store's configured default
//! can override the requested one) and where a converted or imported profile goes.

use crate::office::{OfficeVersion, ProfileLocation, TargetVersion, current_user};
use crate::rewrite::{ProfileConversion, RewriteError};
use crate::store::ConfigStore;
use tracing::debug;

/// Outcome of resolving the source profile of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Profile the export reads
    pub location: ProfileLocation,
    /// Default profile configured for the version, if any
    pub configured_default: Option<String>,
    /// The configured default replaced the requested profile
    pub uses_default: bool,
    /// The effective profile exists in the store
    pub exists: bool,
}

/// Source and destination of an export with conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub source: ResolvedSource,
    pub destination: ProfileLocation,
}

impl ResolvedProfile {
    /// Conversion is skipped when the profile keeps its name
    pub fn needs_conversion(&self) -> bool {
        needs_conversion(self.source.location.name(), self.destination.name())
    }

    /// Rules that retarget the exported text from source to destination
    pub fn conversion(&self) -> Result<ProfileConversion, RewriteError> {
        ProfileConversion::new(&self.source.location, &self.destination)
    }
}

/// Resolve the profile an export should read
///
/// # Arguments
/// * `version` - Office version being exported
/// * `requested` - Profile named on the command line (or the built-in default)
/// * `ignore_default` - Never let the configured default override `requested`
/// * `default_lookup` - Returns the configured default profile name for a version
/// * `profile_exists` - Tests a `HKEY_CURRENT_USER`-relative profile path
///
/// # Returns
/// The effective profile and whether it exists; a missing profile is reported by
/// the caller rather than treated as an error
pub fn resolve_source<D, E>(
    version: OfficeVersion,
    requested: &str,
    ignore_default: bool,
    default_lookup: D,
    profile_exists: E,
) -> ResolvedSource
where
    D: FnOnce(OfficeVersion) -> Option<String>,
    E: Fn(&str) -> bool,
{
    let configured_default = default_lookup(version).filter(|name| !name.is_empty());

    let usable_default = configured_default.as_deref().filter(|name| {
        !ignore_default && profile_exists(&ProfileLocation::new(version, *name).path())
    });

    let (location, uses_default) = match usable_default {
        Some(name) => (ProfileLocation::new(version, name), true),
        None => (ProfileLocation::new(version, requested), false),
    };

    let exists = uses_default || profile_exists(&location.path());
    debug!(
        version = %version,
        profile = location.name(),
        uses_default,
        exists,
        "resolved source profile"
    );

    ResolvedSource {
        location,
        configured_default,
        uses_default,
        exists,
    }
}

/// Destination of a conversion or import; no existence check is made
pub fn resolve_destination(target: TargetVersion, profile: &str) -> ProfileLocation {
    ProfileLocation::new(target.office(), profile)
}

/// Whether text must be rewritten to move `source` to `target`
pub fn needs_conversion(source: &str, target: &str) -> bool {
    source != target
}

/// Resolve source and destination of an export against a configuration store
pub fn resolve<S: ConfigStore + ?Sized>(
    store: &S,
    version: OfficeVersion,
    requested: &str,
    ignore_default: bool,
    target: TargetVersion,
    target_profile: &str,
) -> ResolvedProfile {
    let source = resolve_source(
        version,
        requested,
        ignore_default,
        |v| default_profile(store, v),
        |path| store.key_exists(&current_user(path)),
    );

    ResolvedProfile {
        source,
        destination: resolve_destination(target, target_profile),
    }
}

/// Configured default profile of a version; unreadable values count as absent
pub fn default_profile<S: ConfigStore + ?Sized>(store: &S, version: OfficeVersion) -> Option<String> {
    let key = current_user(version.default_profile_key());
    match store.read_string(&key, crate::office::DEFAULT_PROFILE_VALUE) {
        Ok(name) => name,
        Err(e) => {
            debug!(key = %key, error = %e, "default profile not readable");
            None
        }
    }
}
