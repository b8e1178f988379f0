use std::time::Duration;

use crate::properties::FAMILY_NAME;

/// Default time to wait for the kernel's reply to one request.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for dialing a [`Link`](crate::Link).
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Family to resolve. Default: `rdma-ovey`.
    pub family_name: String,
    /// Receive timeout applied to the channel. `None` blocks indefinitely.
    pub recv_timeout: Option<Duration>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            family_name: FAMILY_NAME.to_string(),
            recv_timeout: Some(DEFAULT_RECV_TIMEOUT),
        }
    }
}

/// Arguments of the create-device command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeviceConfig {
    /// Name of the virtual device to create.
    pub name: String,
    /// Name of the physical RDMA device it is layered on.
    pub parent: String,
    /// Node GUID to assign, in host byte order.
    pub node_guid: Option<u64>,
    /// Virtual network the device joins.
    pub virt_net_uuid: Option<String>,
}

impl NewDeviceConfig {
    pub fn new(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            node_guid: None,
            virt_net_uuid: None,
        }
    }
}

/// Arguments of the delete-device command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDeviceConfig {
    pub name: String,
}

/// Arguments of the device-info command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfoConfig {
    pub name: String,
}

/// Arguments of the echo diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoConfig {
    /// Text for the kernel to echo back.
    pub message: Option<String>,
}
