//! Export and import runs
//!
//! [`Profiler`] carries out one [`OperationRequest`] against a configuration store.
//! Each operation step returns a `Result`; the run loop reports failures and always
//! finishes normally. Registry writes that happened before a failure are not rolled
//! back.

use crate::office::{
    CLIENT_OPTIONS_KEY, DEFAULT_PROFILE_VALUE, IMPORT_PRF_VALUE, OFFICE_INSTALL_DIR,
    OfficeVersion, TargetVersion, current_user,
};
use crate::options::{OperationKind, OperationRequest, USAGE};
use crate::output::RunLog;
use crate::regfile::{self, ExportOptions};
use crate::resolver::{self, ResolvedProfile, resolve_destination};
use crate::store::{ConfigStore, StoreError, WriteOptions};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// How an operation step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// Nothing to do, or a precondition was not met; already reported
    Skipped,
}

/// Final state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No operation was requested; usage was printed
    Usage,
    Completed,
    Skipped,
    Failed,
}

impl From<StepOutcome> for RunStatus {
    fn from(outcome: StepOutcome) -> Self {
        match outcome {
            StepOutcome::Completed => RunStatus::Completed,
            StepOutcome::Skipped => RunStatus::Skipped,
        }
    }
}

/// Why an imported profile could not be made the default
#[derive(Debug, Error)]
pub enum DefaultProfileError {
    #[error("Registry key {0} does not exist")]
    MissingKey(String),

    #[error("Failed to set default profile: {0}")]
    SetDefault(#[source] StoreError),

    #[error("Failed to set first run values:{0}")]
    FirstRun(#[source] StoreError),
}

/// Runs export and import operations against a configuration store
pub struct Profiler<'a, S: ConfigStore> {
    store: S,
    log: &'a RunLog,
    office_dir: PathBuf,
}

impl<'a, S: ConfigStore> Profiler<'a, S> {
    pub fn new(store: S, log: &'a RunLog) -> Self {
        Self {
            store,
            log,
            office_dir: PathBuf::from(OFFICE_INSTALL_DIR),
        }
    }

    /// Directory searched for the custom PRF files used on first run
    pub fn with_office_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.office_dir = dir.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Carry out a request: print the banner, run the operation, report any failure
    pub fn run(&mut self, request: &OperationRequest) -> RunStatus {
        self.log.line(format!(
            "*** Outlook Profiler v{} ***",
            env!("CARGO_PKG_VERSION")
        ));
        self.log.blank();
        self.log.line(format!("Operation Type: {}", request.operation));
        if let Some(path) = self.log.log_path() {
            self.log.line(format!("Log File:{}", path.display()));
        }

        let (result, failure) = match (request.operation, request.path.as_deref()) {
            (OperationKind::Import, Some(path)) => {
                (self.import(path, request), "Error importing Outlook profile")
            }
            (kind, Some(path)) => match kind.export_version() {
                Some(version) => (
                    self.export(version, path, request),
                    "Error exporting Outlook profile",
                ),
                None => return self.usage(),
            },
            (_, None) => return self.usage(),
        };

        match result {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                self.log.line(format!("{}: {}", failure, e));
                self.log.line(format!("Exception details:{:?}", e));
                RunStatus::Failed
            }
        }
    }

    fn usage(&self) -> RunStatus {
        self.log.console_line("");
        self.log.console_line(USAGE);
        RunStatus::Usage
    }

    /// Export a profile root to `path`, then retarget it to the requested profile
    ///
    /// # Arguments
    /// * `version` - Office version to export from
    /// * `path` - Destination `.reg` file
    /// * `request` - Source/target profile names, target version and options path
    ///
    /// # Returns
    /// `Skipped` when the source profile does not exist
    pub fn export(
        &mut self,
        version: OfficeVersion,
        path: &Path,
        request: &OperationRequest,
    ) -> Result<StepOutcome> {
        let resolved = resolver::resolve(
            &self.store,
            version,
            &request.source_profile,
            request.ignore_default,
            request.target_version,
            &request.target_profile,
        );
        let source = &resolved.source;
        let source_name = source.location.name();

        match (&source.configured_default, source.uses_default) {
            (Some(default), true) => self.log.line(format!(
                "Default Outlook profile is '{}' and will be used.",
                default
            )),
            (Some(default), false) => self.log.line(format!(
                "Default Outlook profile is '{}', source profile override: '{}'",
                default, source_name
            )),
            (None, _) => self.log.line("No default Outlook profile exists"),
        }

        if !source.exists {
            self.log.line(format!(
                "Outlook profile '{}' does not exist, no Outlook profile export will be performed.",
                source_name
            ));
            return Ok(StepOutcome::Skipped);
        }

        self.log.line(format!(
            "Exporting Outlook profile '{}' to {}",
            source_name,
            path.display()
        ));
        let profiles_key = current_user(version.profiles_root());
        let tree = self
            .store
            .import_tree(&profiles_key)
            .with_context(|| format!("Failed to read {}", profiles_key))?;
        regfile::export(&tree, path, ExportOptions::default())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.log.line(format!(
            "Exported Outlook profile '{}' to {}",
            source_name,
            path.display()
        ));

        if let Some(options_path) = &request.options_path {
            self.export_client_options(options_path)?;
        }

        self.convert(&resolved, request.target_version, path)?;
        Ok(StepOutcome::Completed)
    }

    fn export_client_options(&mut self, path: &Path) -> Result<()> {
        let options_key = current_user(CLIENT_OPTIONS_KEY);
        if !self.store.key_exists(&options_key) {
            self.log.line("No client options exist");
            return Ok(());
        }

        self.log
            .line(format!("Exporting Client options to {}", path.display()));
        let tree = self
            .store
            .import_tree(&options_key)
            .with_context(|| format!("Failed to read {}", options_key))?;
        regfile::export(&tree, path, ExportOptions::default())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.log
            .line(format!("Exported Client options to {}", path.display()));
        Ok(())
    }

    /// Rewrite the exported file so the profile lands at its destination
    fn convert(&self, resolved: &ResolvedProfile, target: TargetVersion, path: &Path) -> Result<()> {
        let source_name = resolved.source.location.name();
        let target_name = resolved.destination.name();

        if !resolved.needs_conversion() {
            self.log.line(format!(
                "Outlook profile conversion not required for '{}' - source and target profiles are the same.",
                target_name
            ));
            return Ok(());
        }

        self.log.line(format!(
            "Converting Outlook profile '{}' to {} with target profile name '{}' in {}",
            source_name,
            target,
            target_name,
            path.display()
        ));

        let conversion = resolved.conversion()?;
        let mut text = regfile::read_text(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for rule in conversion.rules() {
            debug!(
                search = rule.search(),
                replacement = rule.replacement(),
                matches = rule.count_matches(&text.text),
                "applying rewrite rule"
            );
            text.text = rule.apply(&text.text);
        }
        regfile::write_text(path, &text)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        self.log.line(format!(
            "Updated Outlook profile '{}' to {} with target profile name '{}' in {}",
            source_name,
            target,
            target_name,
            path.display()
        ));
        Ok(())
    }

    /// Import a profile from `path` unless the target profile already exists
    ///
    /// The imported profile becomes the default profile of the target version. The
    /// client options file, when given, is written after the profile.
    pub fn import(&mut self, path: &Path, request: &OperationRequest) -> Result<StepOutcome> {
        let target = request.target_version;
        let target_name = request.target_profile.as_str();
        let destination = resolve_destination(target, target_name);

        if !path.is_file() {
            self.log.line(
                "Import file does not exist, no Outlook profile import will be performed.",
            );
            return Ok(StepOutcome::Skipped);
        }

        self.log.line("Checking for existing Outlook profile ...");
        if self.store.key_exists(&destination.full_path()) {
            self.log.line(format!(
                "Outlook profile '{}' already exists - will not be overwritten.",
                target_name
            ));
            return Ok(StepOutcome::Skipped);
        }
        self.log.line(format!(
            "Outlook profile '{}' does not exist, Outlook profile will be imported.",
            target_name
        ));

        self.log.line(format!(
            "Importing Outlook profile '{}' from {}",
            target_name,
            path.display()
        ));
        self.write_file(path)?;
        self.log.line(format!(
            "Imported Outlook profile '{}' from {}",
            target_name,
            path.display()
        ));

        match self.set_default(target.office(), target_name) {
            Ok(()) => self.log.line(format!(
                "Set Outlook profile '{}' as the default profile.",
                target_name
            )),
            Err(e) => {
                match &e {
                    DefaultProfileError::MissingKey(key) => {
                        debug!(key = %key, "default profile key missing")
                    }
                    DefaultProfileError::SetDefault(_) | DefaultProfileError::FirstRun(_) => {
                        self.log.line(e.to_string());
                        self.log.line(format!("Exception details: {:?}", e));
                    }
                }
                self.log.line(format!(
                    "Failed to set Outlook profile '{}' as the default profile.",
                    target_name
                ));
            }
        }

        if let Some(options_path) = &request.options_path {
            self.log.line(format!(
                "Importing Client options from {}",
                options_path.display()
            ));
            self.write_file(options_path)?;
            self.log.line(format!(
                "Imported Client options from {}",
                options_path.display()
            ));
        }

        Ok(StepOutcome::Completed)
    }

    fn write_file(&mut self, path: &Path) -> Result<()> {
        let tree = regfile::import_file(path)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if tree.is_empty() {
            warn!(path = %path.display(), "registry file contains no keys");
        }
        self.store
            .write_tree(&tree, WriteOptions::default())
            .with_context(|| format!("Failed to write {} to the registry", path.display()))?;
        Ok(())
    }

    /// Make `profile` the default and point first-run setup at a custom PRF file
    ///
    /// The version's Outlook key must already exist; the `Setup` subkey is created
    /// when missing.
    pub fn set_default(
        &mut self,
        version: OfficeVersion,
        profile: &str,
    ) -> Result<(), DefaultProfileError> {
        let key = current_user(version.default_profile_key());
        if !self.store.key_exists(&key) {
            return Err(DefaultProfileError::MissingKey(key));
        }

        self.store
            .set_string(&key, DEFAULT_PROFILE_VALUE, profile)
            .map_err(DefaultProfileError::SetDefault)?;

        let setup_key = format!("{}\\Setup", key);
        self.store
            .create_key(&setup_key)
            .map_err(DefaultProfileError::FirstRun)?;

        let prf = version
            .custom_prf_candidates()
            .iter()
            .map(|name| self.office_dir.join(name))
            .find(|candidate| candidate.is_file());

        if let Some(prf) = prf {
            debug!(prf = %prf.display(), "setting first-run PRF");
            self.store
                .set_string(&setup_key, IMPORT_PRF_VALUE, &prf.to_string_lossy())
                .map_err(DefaultProfileError::FirstRun)?;
        }

        Ok(())
    }
}
