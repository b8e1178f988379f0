mod cmd;
mod exit;
mod logging;
mod output;

use clap::{ArgAction, Parser};
use ovey_ocp::LinkConfig;

use crate::cmd::Command;
use crate::exit::CliResult;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ovey", version, about = "Manage Ovey virtual RDMA devices")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Minimum log level (stderr). Overrides -v.
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<LogLevel>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Time to wait for each kernel reply (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION", default_value = "5s", global = true)]
    timeout: String,

    /// Generic netlink family of the kernel module.
    #[arg(
        long,
        value_name = "NAME",
        default_value = ovey_ocp::FAMILY_NAME,
        global = true,
        hide = true
    )]
    family: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn link_config(&self) -> CliResult<LinkConfig> {
        Ok(LinkConfig {
            family_name: self.family.clone(),
            recv_timeout: Some(cmd::parse_duration(&self.timeout)?),
        })
    }
}

fn main() {
    let cli = Cli::parse();
    let level = cli
        .log_level
        .unwrap_or_else(|| LogLevel::from_verbosity(cli.verbose));
    init_logging(cli.log_format, level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cli
        .link_config()
        .and_then(|config| dispatch(cli.command, format, config));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(target_os = "linux")]
fn dispatch(command: Command, format: OutputFormat, config: LinkConfig) -> CliResult<i32> {
    cmd::run(command, format, &ovey_ocp::Client::system(config))
}

#[cfg(not(target_os = "linux"))]
fn dispatch(command: Command, _format: OutputFormat, _config: LinkConfig) -> CliResult<i32> {
    match command {
        Command::Version(args) => cmd::version::run(args),
        _ => Err(exit::CliError::new(
            exit::TRANSPORT_ERROR,
            "generic netlink is only available on Linux",
        )),
    }
}
