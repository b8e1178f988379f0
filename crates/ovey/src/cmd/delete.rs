use ovey_ocp::{Client, DeleteDeviceConfig, Dialer};
use tracing::info;

use crate::cmd::DeleteArgs;
use crate::exit::{ocp_error, CliResult, SUCCESS};
use crate::output::{print_messages, DeviceMessages, OutputFormat};

pub fn run<D: Dialer>(
    args: DeleteArgs,
    format: OutputFormat,
    client: &Client<D>,
) -> CliResult<i32> {
    let out = delete(args, client)?;
    print_messages(&out, format)?;
    Ok(SUCCESS)
}

fn delete<D: Dialer>(args: DeleteArgs, client: &Client<D>) -> CliResult<DeviceMessages> {
    client
        .delete_device(DeleteDeviceConfig {
            name: args.name.clone(),
        })
        .map_err(|err| ocp_error("delete device failed", err))?;
    info!(device = %args.name, "virtual device deleted");

    Ok(DeviceMessages::new("delete", args.name, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::{client, ovey_kernel};
    use crate::exit::FAILURE;

    #[test]
    fn delete_known_device() {
        let kernel = ovey_kernel();
        let out = delete(
            DeleteArgs {
                name: "childA".into(),
            },
            &client(&kernel),
        )
        .unwrap();
        assert_eq!(out.operation, "delete");
        assert!(out.messages.is_empty());
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn delete_missing_device() {
        let kernel = ovey_kernel();
        let err = delete(
            DeleteArgs {
                name: "missing".into(),
            },
            &client(&kernel),
        )
        .unwrap_err();
        assert_eq!(err.code, FAILURE);
        assert!(err.message.starts_with("delete device failed: "));
    }
}
