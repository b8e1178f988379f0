use std::time::Duration;

use clap::{Args, Subcommand};
use ovey_ocp::{Client, Dialer};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod delete;
pub mod echo;
pub mod families;
pub mod info;
pub mod new;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a virtual device on top of a physical RDMA device.
    New(NewArgs),
    /// Delete a virtual device.
    Delete(DeleteArgs),
    /// Show what the kernel reports about a virtual device.
    Info(InfoArgs),
    /// List families and round-trip a message through the kernel module.
    Echo(EchoArgs),
    /// List generic netlink families registered with the kernel.
    Families(FamiliesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run<D: Dialer>(
    command: Command,
    format: OutputFormat,
    client: &Client<D>,
) -> CliResult<i32> {
    match command {
        Command::New(args) => new::run(args, format, client),
        Command::Delete(args) => delete::run(args, format, client),
        Command::Info(args) => info::run(args, format, client),
        Command::Echo(args) => echo::run(args, format, client),
        Command::Families(args) => families::run(args, format, client),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Name of the virtual device.
    #[arg(long, short = 'n')]
    pub name: String,
    /// Name of the physical parent device (e.g. mlx5_0).
    #[arg(long, short = 'p')]
    pub parent: String,
    /// Node GUID for the virtual device, as printed by ibv_devinfo.
    #[arg(long, value_name = "GUID")]
    pub guid: Option<String>,
    /// UUID of the virtual network the device joins.
    #[arg(long, value_name = "UUID")]
    pub virt_net: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Name of the virtual device.
    #[arg(long, short = 'n')]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Name of the virtual device.
    #[arg(long, short = 'n')]
    pub name: String,
}

#[derive(Args, Debug, Default)]
pub struct EchoArgs {
    /// Text for the kernel module to echo back.
    #[arg(long, short = 'm')]
    pub message: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct FamiliesArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0s").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("bad").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }
}
