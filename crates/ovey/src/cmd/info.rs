use ovey_ocp::{Client, DeviceInfo, DeviceInfoConfig, Dialer};

use crate::cmd::InfoArgs;
use crate::exit::{ocp_error, CliResult, SUCCESS};
use crate::output::{print_device_info, OutputFormat};

pub fn run<D: Dialer>(args: InfoArgs, format: OutputFormat, client: &Client<D>) -> CliResult<i32> {
    let info = query(args, client)?;
    print_device_info(&info, format)?;
    Ok(SUCCESS)
}

fn query<D: Dialer>(args: InfoArgs, client: &Client<D>) -> CliResult<DeviceInfo> {
    client
        .device_info(DeviceInfoConfig { name: args.name })
        .map_err(|err| ocp_error("device info failed", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::{client, ovey_kernel};

    #[test]
    fn query_known_device() {
        let kernel = ovey_kernel();
        let info = query(
            InfoArgs {
                name: "childA".into(),
            },
            &client(&kernel),
        )
        .unwrap();
        assert_eq!(info.parent_device_name.as_deref(), Some("parent0"));
    }
}
