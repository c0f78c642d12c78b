//! Common test utilities for integration tests
#![allow(dead_code)]

use outlook_profiler::office::current_user;
use outlook_profiler::regfile;
use outlook_profiler::{ConfigStore, MemoryStore, OfficeVersion, RegValue, RunLog};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Exchange service subkey every Outlook profile carries
pub const SERVICE_KEY: &str = "9375CFF0413111d3B88A00104B2A6676";

/// Create a store holding the given profiles of one Office version
pub fn store_with_profiles(version: OfficeVersion, profiles: &[&str]) -> MemoryStore {
    let mut store = MemoryStore::new();
    add_profiles(&mut store, version, profiles);
    store
}

/// Add profiles with a service subkey and a few typed values
pub fn add_profiles(store: &mut MemoryStore, version: OfficeVersion, profiles: &[&str]) {
    let root = current_user(version.profiles_root());
    store.create_key(&root).unwrap();
    for profile in profiles {
        let service = format!("{}\\{}\\{}", root, profile, SERVICE_KEY);
        store.create_key(&service).unwrap();
        store
            .set_value(&service, "Account Name", &RegValue::String(format!("{}@example.com", profile)))
            .unwrap();
        store
            .set_value(&service, "Flags", &RegValue::Dword(0x0000_0012))
            .unwrap();
        store
            .set_value(&service, "Service UID", &RegValue::Binary(vec![0x9d, 0x3f, 0x00, 0x42, 0xff]))
            .unwrap();
    }
}

/// Record `profile` as the configured default for `version`
pub fn set_configured_default(store: &mut MemoryStore, version: OfficeVersion, profile: &str) {
    let key = current_user(version.default_profile_key());
    store.create_key(&key).unwrap();
    store.set_string(&key, "DefaultProfile", profile).unwrap();
}

/// Temporary directory with a log file wired into a RunLog
pub fn test_log() -> (TempDir, RunLog) {
    let dir = TempDir::new().unwrap();
    let log = RunLog::create(&dir.path().join("run.log")).unwrap();
    (dir, log)
}

/// Everything written to the log so far
pub fn log_text(log: &RunLog) -> String {
    fs::read_to_string(log.log_path().unwrap()).unwrap()
}

/// Decoded text of a `.reg` file
pub fn reg_text(path: &Path) -> String {
    regfile::read_text(path).unwrap().text
}

pub fn file_in(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

/// Build settings with a path argument, as the command line would pass them
pub fn path_arg(name: &str, path: &Path) -> String {
    format!("{}={}", name, path.display())
}
