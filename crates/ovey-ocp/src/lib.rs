//! Ovey Control Protocol (OCP).
//!
//! OCP is the generic netlink family through which user space asks the Ovey
//! kernel module to create, inspect and delete virtual RDMA devices.
//!
//! - [`Link`] is one session: an open channel bound to the resolved family.
//! - [`Request`] is one command exchanged over a link.
//! - [`Client`] runs the device operations, each over a fresh link.
//!
//! Operations return data (kernel messages, device descriptions, typed
//! errors); presenting it is left to the caller.

pub mod client;
pub mod config;
pub mod device;
pub mod echo;
pub mod error;
pub mod link;
pub mod properties;
pub mod request;

pub use client::Client;
pub use config::{DeleteDeviceConfig, DeviceInfoConfig, EchoConfig, LinkConfig, NewDeviceConfig};
pub use device::{format_guid, parse_guid, DeviceInfo};
pub use echo::EchoReport;
pub use error::{DialError, ErrorKind, OcpError, Phase, Result};
pub use link::{Dialer, Link};
pub use ovey_genl::Family;
pub use properties::{OveyAttribute, OveyOperation, FAMILY_NAME};
pub use request::Request;

#[cfg(target_os = "linux")]
pub use link::SystemDialer;

/// Create a virtual device on the real kernel. See [`Client::new_device`].
#[cfg(target_os = "linux")]
pub fn new_device(config: NewDeviceConfig) -> Result<Vec<String>> {
    Client::system(LinkConfig::default()).new_device(config)
}

/// Delete a virtual device on the real kernel. See [`Client::delete_device`].
#[cfg(target_os = "linux")]
pub fn delete_device(config: DeleteDeviceConfig) -> Result<()> {
    Client::system(LinkConfig::default()).delete_device(config)
}
