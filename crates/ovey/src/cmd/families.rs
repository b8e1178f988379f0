use ovey_ocp::{Client, Dialer};

use crate::cmd::FamiliesArgs;
use crate::exit::{ocp_error, CliResult, SUCCESS};
use crate::output::{print_families, OutputFormat};

pub fn run<D: Dialer>(
    _args: FamiliesArgs,
    format: OutputFormat,
    client: &Client<D>,
) -> CliResult<i32> {
    let families = client
        .list_families()
        .map_err(|err| ocp_error("listing families failed", err))?;
    print_families(&families, format)?;
    Ok(SUCCESS)
}
