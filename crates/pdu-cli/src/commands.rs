//! Executes a parsed command against the service crate.

use std::io::Write;
use std::sync::Arc;

use pdu_config::{Config, UrlPrefix, WorkingPaths};
use pdu_service::{
    LifecycleCoordinator, LifecycleError, SupervisorService, SystemShutdownSignal, library_version,
};
use tracing::warn;

use crate::cli::{CliCommand, ServiceArgs};
use crate::errors::AppError;

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::commands");

pub(crate) fn execute<W: Write>(
    command: &CliCommand,
    config: &Config,
    stdout: &mut W,
) -> Result<(), AppError> {
    match command {
        CliCommand::Version => emit(stdout, &library_version()),
        CliCommand::Service(args) => manage_service(*args, config, stdout),
        CliCommand::Start => start(&coordinator(config)?),
        CliCommand::Stop => {
            coordinator(config)?.stop(false)?;
            emit(stdout, "rest server stopped")
        }
        CliCommand::Restart => Ok(coordinator(config)?.restart()?),
        CliCommand::ShowApiSpec => emit(stdout, coordinator(config)?.show_api_spec()?.as_str()),
        CliCommand::GetNetworkConfig => {
            let settings = coordinator(config)?.network_config()?;
            emit(stdout, &format!("host: {}\nport: {}", settings.host, settings.port))
        }
        CliCommand::SetNetworkConfig { host, port } => {
            let settings = coordinator(config)?.set_network_config(host, port)?;
            emit(
                stdout,
                &format!("network configuration saved: {}:{}", settings.host, settings.port),
            )
        }
        CliCommand::SetUrlPrefix { url_prefix } => {
            let stored = coordinator(config)?.set_url_prefix(url_prefix)?;
            emit(stdout, &format!("url prefix saved: {}", display_prefix(stored.as_ref())))
        }
        CliCommand::GetUrlPrefix => {
            let stored = coordinator(config)?.url_prefix()?;
            emit(stdout, display_prefix(stored.as_ref()))
        }
    }
}

fn coordinator(config: &Config) -> Result<LifecycleCoordinator, AppError> {
    Ok(LifecycleCoordinator::from_config(config)?
        .with_shutdown_signal(Arc::new(SystemShutdownSignal::new())))
}

/// Runs the server; after a failure, clears whatever marker the attempt left.
///
/// A refused start leaves the running server's marker alone.
fn start(coordinator: &LifecycleCoordinator) -> Result<(), AppError> {
    let Err(error) = coordinator.start(false) else {
        return Ok(());
    };
    if !matches!(error, LifecycleError::AlreadyRunning { .. }) {
        if let Err(cleanup) = coordinator.stop(true) {
            warn!(target: CLI_TARGET, error = %cleanup, "cleanup after failed start also failed");
        }
    }
    Err(error.into())
}

fn manage_service<W: Write>(
    args: ServiceArgs,
    config: &Config,
    stdout: &mut W,
) -> Result<(), AppError> {
    let paths = WorkingPaths::from_config(config)?;
    let service = SupervisorService::for_current_exe(&paths)?;
    if args.register {
        service.register()?;
        emit(
            stdout,
            &format!("registered supervisor program at {}", service.conf_path().display()),
        )
    } else {
        service.deregister()?;
        emit(stdout, "deregistered supervisor program")
    }
}

fn display_prefix(prefix: Option<&UrlPrefix>) -> &str {
    prefix.map_or("/", UrlPrefix::as_str)
}

fn emit<W: Write>(stdout: &mut W, line: &str) -> Result<(), AppError> {
    writeln!(stdout, "{line}").map_err(AppError::Output)
}
