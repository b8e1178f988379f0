use ovey_ocp::{parse_guid, Client, Dialer, NewDeviceConfig};
use tracing::info;

use crate::cmd::NewArgs;
use crate::exit::{ocp_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_messages, DeviceMessages, OutputFormat};

pub fn run<D: Dialer>(args: NewArgs, format: OutputFormat, client: &Client<D>) -> CliResult<i32> {
    let out = create(args, client)?;
    print_messages(&out, format)?;
    Ok(SUCCESS)
}

fn create<D: Dialer>(args: NewArgs, client: &Client<D>) -> CliResult<DeviceMessages> {
    let config = device_config(args)?;
    let name = config.name.clone();

    let messages = client
        .new_device(config)
        .map_err(|err| ocp_error("create device failed", err))?;
    info!(device = %name, messages = messages.len(), "virtual device created");

    Ok(DeviceMessages::new("new", name, messages))
}

fn device_config(args: NewArgs) -> CliResult<NewDeviceConfig> {
    let node_guid = match args.guid.as_deref() {
        Some(text) => Some(parse_guid(text).ok_or_else(|| {
            CliError::new(
                USAGE,
                format!(
                    "invalid GUID {text:?}: expected four groups of hex digits \
                     like 0002:c903:0010:0001"
                ),
            )
        })?),
        None => None,
    };

    Ok(NewDeviceConfig {
        node_guid,
        virt_net_uuid: args.virt_net,
        ..NewDeviceConfig::new(args.name, args.parent)
    })
}
