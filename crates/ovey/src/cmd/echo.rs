use ovey_ocp::{Client, Dialer, EchoConfig};
use tracing::warn;

use crate::cmd::EchoArgs;
use crate::exit::{ocp_error, CliResult, SUCCESS};
use crate::output::{print_echo, OutputFormat};

pub fn run<D: Dialer>(args: EchoArgs, format: OutputFormat, client: &Client<D>) -> CliResult<i32> {
    let report = client
        .echo(EchoConfig {
            message: args.message,
        })
        .map_err(|err| ocp_error("echo failed", err))?;

    if !report.module_loaded() {
        warn!(
            family = %client.config().family_name,
            "family not registered; is the ovey kernel module loaded?"
        );
    }
    print_echo(&report, format)?;
    Ok(SUCCESS)
}
