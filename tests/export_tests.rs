//! Export run tests against an in-memory registry
mod common;

use common::*;
use outlook_profiler::office::{CLIENT_OPTIONS_KEY, current_user};
use outlook_profiler::regfile::{self, ExportOptions};
use outlook_profiler::{
    ConfigStore, OfficeVersion, OperationRequest, Profiler, RegValue, RunStatus,
};
use std::fs;
use tempfile::TempDir;

const ROOT_2013: &str = r"Software\Microsoft\Office\15.0\Outlook\Profiles";
const ROOT_2016: &str = r"Software\Microsoft\Office\16.0\Outlook\Profiles";

#[test]
fn test_export_renames_profile() {
    let dir = TempDir::new().unwrap();
    let out = file_in(&dir, "out.reg");
    let (_log_dir, log) = test_log();

    let store = store_with_profiles(OfficeVersion::Office2013, &["Outlook"]);
    let request = OperationRequest::from_args([path_arg("Export2013", &out), "TargetProfile=Work".to_string()]);
    let status = Profiler::new(store, &log).run(&request);
    assert_eq!(status, RunStatus::Completed);

    let text = reg_text(&out);
    assert!(text.starts_with("Windows Registry Editor Version 5.00"));
    assert!(text.contains(&format!("[HKEY_CURRENT_USER\\{}\\Work]", ROOT_2013)));
    assert!(text.contains(&format!("[HKEY_CURRENT_USER\\{}\\Work\\{}]", ROOT_2013, SERVICE_KEY)));
    assert!(!text.contains("Profiles\\Outlook"));
    assert!(text.contains("\"Account Name\"=\"Outlook@example.com\""));

    let messages = log_text(&log);
    assert!(messages.contains("Operation Type: Export2013"));
    assert!(messages.contains("No default Outlook profile exists"));
    assert!(messages.contains(&format!("Exported Outlook profile 'Outlook' to {}", out.display())));
    assert!(messages.contains("with target profile name 'Work'"));
}

#[test]
fn test_export_uses_configured_default() {
    let dir = TempDir::new().unwrap();
    let out = file_in(&dir, "out.reg");
    let (_log_dir, log) = test_log();

    let mut store = store_with_profiles(OfficeVersion::Office2013, &["Outlook", "Work"]);
    set_configured_default(&mut store, OfficeVersion::Office2013, "Work");

    let request = OperationRequest::from_args([
        path_arg("Export2013", &out),
        "SourceProfile=Outlook".to_string(),
        "TargetProfile=Email".to_string(),
    ]);
    assert_eq!(Profiler::new(store, &log).run(&request), RunStatus::Completed);

    let text = reg_text(&out);
    assert!(text.contains("\"Account Name\"=\"Work@example.com\""));
    assert!(text.contains(&format!("\\{}\\Email\\{}]", ROOT_2013, SERVICE_KEY)));
    // the overridden profile is exported under its own name
    assert!(text.contains(&format!("\\{}\\Outlook\\{}]", ROOT_2013, SERVICE_KEY)));
    assert!(log_text(&log).contains("Default Outlook profile is 'Work' and will be used."));
}

#[test]
fn test_export_ignore_default() {
    let dir = TempDir::new().unwrap();
    let out = file_in(&dir, "out.reg");
    let (_log_dir, log) = test_log();

    let mut store = store_with_profiles(OfficeVersion::Office2013, &["Outlook", "Work"]);
    set_configured_default(&mut store, OfficeVersion::Office2013, "Work");

    let request = OperationRequest::from_args([
        path_arg("Export2013", &out),
        "IgnoreDefault".to_string(),
    ]);
    assert_eq!(Profiler::new(store, &log).run(&request), RunStatus::Completed);

    let text = reg_text(&out);
    assert!(text.contains(&format!("\\{}\\Email\\{}]", ROOT_2013, SERVICE_KEY)));
    assert!(text.contains(&format!("\\{}\\Work\\{}]", ROOT_2013, SERVICE_KEY)));
    assert!(log_text(&log).contains("Default Outlook profile is 'Work', source profile override: 'Outlook'"));
}

#[test]
fn test_export_missing_profile_is_skipped() {
    let dir = TempDir::new().unwrap();
    let out = file_in(&dir, "out.reg");
    let (_log_dir, log) = test_log();

    let store = store_with_profiles(OfficeVersion::Office2016, &["Other"]);
    let request = OperationRequest::from_args([path_arg("Export2016", &out)]);
    assert_eq!(Profiler::new(store, &log).run(&request), RunStatus::Skipped);

    assert!(!out.exists());
    assert!(log_text(&log).contains(
        "Outlook profile 'Outlook' does not exist, no Outlook profile export will be performed."
    ));
}

#[test]
fn test_same_profile_name_leaves_export_untouched() {
    let dir = TempDir::new().unwrap();
    let out = file_in(&dir, "out.reg");
    let expected = file_in(&dir, "expected.reg");
    let (_log_dir, log) = test_log();

    let store = store_with_profiles(OfficeVersion::Office2013, &["Outlook"]);
    let tree = store
        .import_tree(&current_user(ROOT_2013))
        .unwrap();
    regfile::export(&tree, &expected, ExportOptions::default()).unwrap();

    let request = OperationRequest::from_args([
        path_arg("Export2013", &out),
        "TargetProfile=Outlook".to_string(),
    ]);
    assert_eq!(Profiler::new(store, &log).run(&request), RunStatus::Completed);

    assert_eq!(fs::read(&out).unwrap(), fs::read(&expected).unwrap());
    assert!(log_text(&log).contains(
        "Outlook profile conversion not required for 'Outlook' - source and target profiles are the same."
    ));
}

#[test]
fn test_export_2010_converts_to_2016() {
    let dir = TempDir::new().unwrap();
    let out = file_in(&dir, "out.reg");
    let (_log_dir, log) = test_log();

    let store = store_with_profiles(OfficeVersion::Office2010, &["Outlook"]);
    let request = OperationRequest::from_args([
        path_arg("Export2010", &out),
        "TargetVersion=2016".to_string(),
    ]);
    assert_eq!(Profiler::new(store, &log).run(&request), RunStatus::Completed);

    let text = reg_text(&out);
    assert!(text.contains(&format!("[HKEY_CURRENT_USER\\{}]", ROOT_2016)));
    assert!(text.contains(&format!("[HKEY_CURRENT_USER\\{}\\Email\\{}]", ROOT_2016, SERVICE_KEY)));
    assert!(!text.contains("Windows Messaging Subsystem"));
    assert!(log_text(&log).contains("Converting Outlook profile 'Outlook' to Office2016"));
}

#[test]
fn test_export_client_options() {
    let dir = TempDir::new().unwrap();
    let out = file_in(&dir, "out.reg");
    let options = file_in(&dir, "options.reg");
    let (_log_dir, log) = test_log();

    let mut store = store_with_profiles(OfficeVersion::Office2013, &["Outlook"]);
    let options_key = current_user(CLIENT_OPTIONS_KEY);
    store.create_key(&options_key).unwrap();
    store
        .set_value(&options_key, "PickLogonProfile", &RegValue::String("0".to_string()))
        .unwrap();

    let request = OperationRequest::from_args([
        path_arg("Export2013", &out),
        path_arg("Options", &options),
    ]);
    assert_eq!(Profiler::new(store, &log).run(&request), RunStatus::Completed);

    let text = reg_text(&options);
    assert!(text.contains(&format!("[{}]", options_key)));
    assert!(text.contains("\"PickLogonProfile\"=\"0\""));
    assert!(log_text(&log).contains("Exported Client options to"));
}

#[test]
fn test_export_without_client_options() {
    let dir = TempDir::new().unwrap();
    let out = file_in(&dir, "out.reg");
    let options = file_in(&dir, "options.reg");
    let (_log_dir, log) = test_log();

    let store = store_with_profiles(OfficeVersion::Office2013, &["Outlook"]);
    let request = OperationRequest::from_args([
        path_arg("Export2013", &out),
        path_arg("Options", &options),
    ]);
    assert_eq!(Profiler::new(store, &log).run(&request), RunStatus::Completed);

    assert!(!options.exists());
    assert!(log_text(&log).contains("No client options exist"));
}

#[test]
fn test_export_write_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let (_log_dir, log) = test_log();

    let store = store_with_profiles(OfficeVersion::Office2013, &["Outlook"]);
    let mut request = OperationRequest::from_args([path_arg("Export2013", &file_in(&dir, "out.reg"))]);
    request.path = Some(dir.path().join("removed").join("out.reg"));

    assert_eq!(Profiler::new(store, &log).run(&request), RunStatus::Failed);
    let messages = log_text(&log);
    assert!(messages.contains("Error exporting Outlook profile: Failed to write"));
    assert!(messages.contains("Exception details:"));
}

#[test]
fn test_no_operation_prints_usage() {
    let (_log_dir, log) = test_log();
    let request = OperationRequest::from_args(["TargetProfile=Work"]);
    let status = Profiler::new(store_with_profiles(OfficeVersion::Office2013, &[]), &log).run(&request);

    assert_eq!(status, RunStatus::Usage);
    let messages = log_text(&log);
    assert!(messages.contains("Operation Type: None"));
    // usage goes to the console only
    assert!(!messages.contains("USAGE"));
}
