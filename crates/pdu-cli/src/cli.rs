//! Command-line surface of `pdu-library`.

use clap::{Args, Parser, Subcommand};

/// Manages the PDU library REST server.
#[derive(Parser, Debug)]
#[command(name = "pdu-library", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The operation to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations accepted by `pdu-library`.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Starts the REST server and serves until it is stopped.
    Start,
    /// Stops the running REST server.
    Stop,
    /// Stops any running server, then starts a new one.
    Restart,
    /// Prints the URL of the API description.
    #[command(name = "showapispec")]
    ShowApiSpec,
    /// Prints the persisted host and port.
    #[command(name = "getnwcfg")]
    GetNetworkConfig,
    /// Persists a new host and port for the next start.
    #[command(name = "setnwcfg")]
    SetNetworkConfig {
        /// Address to bind.
        #[arg(short = 'u', long)]
        host: String,
        /// Port to bind.
        #[arg(short = 'p', long)]
        port: String,
    },
    /// Persists the route prefix; an empty value or `/` removes it.
    #[command(name = "seturlprefix")]
    SetUrlPrefix {
        /// Prefix such as `/pdu`.
        #[arg(short = 'p', long = "urlprefix", allow_hyphen_values = true)]
        url_prefix: String,
    },
    /// Prints the persisted route prefix.
    #[command(name = "geturlprefix")]
    GetUrlPrefix,
    /// Registers or removes the supervisor program.
    Service(ServiceArgs),
    /// Prints the library version.
    Version,
}

/// Exactly one of `--register` or `--deregister`.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub(crate) struct ServiceArgs {
    /// Writes the supervisor program definition.
    #[arg(short = 'r', long)]
    pub(crate) register: bool,
    /// Removes the supervisor program definition.
    #[arg(short = 'd', long)]
    pub(crate) deregister: bool,
}
