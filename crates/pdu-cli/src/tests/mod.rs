//! Runner tests with an in-memory configuration loader.

use std::ffi::OsString;
use std::fs;

use camino::Utf8PathBuf;
use pdu_config::{Config, MARKER_FILE_NAME, SERVICE_DIR_NAME, SUPERVISOR_PROGRAM_NAME};
use pdu_types::ErrorCode;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::config::ConfigLoader;
use crate::errors::AppError;
use crate::execute;

struct StaticLoader {
    config: Config,
}

impl ConfigLoader for StaticLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

struct Workspace {
    dir: TempDir,
    loader: StaticLoader,
}

impl Workspace {
    fn run(&self, args: &[&str]) -> (Result<(), AppError>, String) {
        let mut stdout = Vec::new();
        let argv = std::iter::once("pdu-library")
            .chain(args.iter().copied())
            .map(OsString::from);
        let outcome = execute(argv, &mut stdout, &self.loader);
        (outcome, String::from_utf8(stdout).expect("utf-8 output"))
    }

    fn code(&self, args: &[&str]) -> ErrorCode {
        self.run(args).0.expect_err("command should fail").code()
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = tempfile::tempdir().expect("temp dir");
    let working_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
    let config = Config {
        working_dir,
        shutdown_timeout_secs: 1,
        ..Config::default()
    };
    Workspace {
        dir,
        loader: StaticLoader { config },
    }
}

#[rstest]
fn version_reports_library_name(workspace: Workspace) {
    let (outcome, stdout) = workspace.run(&["version"]);
    assert!(outcome.is_ok());
    assert!(stdout.starts_with("PduLibrary:"), "got {stdout}");
}

#[rstest]
fn network_configuration_round_trips(workspace: Workspace) {
    let (saved, echo) = workspace.run(&["setnwcfg", "--host", "10.20.0.4", "--port", "9100"]);
    assert!(saved.is_ok(), "{saved:?}");
    assert!(echo.contains("10.20.0.4:9100"));

    let (loaded, stdout) = workspace.run(&["getnwcfg"]);
    assert!(loaded.is_ok());
    assert_eq!(stdout, "host: 10.20.0.4\nport: 9100\n");
}

#[rstest]
fn short_flags_are_accepted(workspace: Workspace) {
    let (saved, _) = workspace.run(&["setnwcfg", "-u", "10.20.0.5", "-p", "9200"]);
    assert!(saved.is_ok(), "{saved:?}");
    let (_, settings) = workspace.run(&["getnwcfg"]);
    assert_eq!(settings, "host: 10.20.0.5\nport: 9200\n");

    let (prefixed, _) = workspace.run(&["seturlprefix", "-p", "/racks"]);
    assert!(prefixed.is_ok(), "{prefixed:?}");
    let (_, prefix) = workspace.run(&["geturlprefix"]);
    assert_eq!(prefix, "/racks\n");

    let conf = workspace
        .dir
        .path()
        .join(SERVICE_DIR_NAME)
        .join(format!("{SUPERVISOR_PROGRAM_NAME}.conf"));
    let (registered, _) = workspace.run(&["service", "-r"]);
    assert!(registered.is_ok(), "{registered:?}");
    assert!(conf.exists());
    let (deregistered, _) = workspace.run(&["service", "-d"]);
    assert!(deregistered.is_ok(), "{deregistered:?}");
    assert!(!conf.exists());
}

#[rstest]
#[case::port_not_numeric(&["setnwcfg", "--host", "10.0.0.1", "--port", "http"])]
#[case::port_zero(&["setnwcfg", "--host", "10.0.0.1", "--port", "0"])]
#[case::prefix_without_slash(&["seturlprefix", "--urlprefix", "pdu"])]
fn invalid_settings_are_configuration_errors(workspace: Workspace, #[case] args: &[&str]) {
    assert_eq!(workspace.code(args), ErrorCode::Configuration);
}

#[rstest]
fn url_prefix_is_normalised(workspace: Workspace) {
    let (saved, _) = workspace.run(&["seturlprefix", "--urlprefix", "/pdu/"]);
    assert!(saved.is_ok());
    let (_, stdout) = workspace.run(&["geturlprefix"]);
    assert_eq!(stdout, "/pdu\n");

    let (cleared, _) = workspace.run(&["seturlprefix", "--urlprefix", "/"]);
    assert!(cleared.is_ok());
    let (_, after) = workspace.run(&["geturlprefix"]);
    assert_eq!(after, "/\n");
}

#[rstest]
#[case::stop(&["stop"])]
#[case::show_api_spec(&["showapispec"])]
fn commands_needing_a_server_report_not_running(workspace: Workspace, #[case] args: &[&str]) {
    assert_eq!(workspace.code(args), ErrorCode::NotRunning);
}

#[rstest]
fn show_api_spec_builds_url_from_settings(workspace: Workspace) {
    let (saved, _) = workspace.run(&["setnwcfg", "--host", "127.0.0.1", "--port", "8765"]);
    assert!(saved.is_ok());
    let service_dir = workspace.dir.path().join(SERVICE_DIR_NAME);
    fs::write(service_dir.join(MARKER_FILE_NAME), b"").expect("write marker");

    let (outcome, stdout) = workspace.run(&["showapispec"]);
    assert!(outcome.is_ok());
    assert_eq!(stdout, "http://127.0.0.1:8765/v1/spec\n");
}

#[rstest]
fn start_over_existing_marker_keeps_the_marker(workspace: Workspace) {
    let service_dir = workspace.dir.path().join(SERVICE_DIR_NAME);
    fs::create_dir_all(&service_dir).expect("service dir");
    let marker = service_dir.join(MARKER_FILE_NAME);
    fs::write(&marker, b"").expect("write marker");

    assert_eq!(workspace.code(&["start"]), ErrorCode::AlreadyRunning);
    assert!(marker.exists());
}

#[rstest]
#[case::no_command(&[])]
#[case::unknown_command(&["launch"])]
#[case::service_without_action(&["service"])]
#[case::service_with_both_actions(&["service", "--register", "--deregister"])]
fn usage_errors_map_to_generic_code(workspace: Workspace, #[case] args: &[&str]) {
    let (outcome, _) = workspace.run(args);
    let error = outcome.expect_err("usage error");
    assert!(matches!(error, AppError::CliUsage(_)));
    assert_eq!(error.code().exit_status(), 1);
}
