//! Wire constants shared with the kernel module.
//!
//! The numeric values mirror `enum OveyOperation` and `enum OveyAttribute`
//! in the module's protocol header and must not be renumbered.

use std::fmt;

/// Name the kernel module registers its generic netlink family under.
pub const FAMILY_NAME: &str = "rdma-ovey";

/// Command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OveyOperation {
    Unspec = 0,
    Echo = 1,
    CreateDevice = 2,
    DeleteDevice = 3,
    DebugRespondError = 4,
    DeviceInfo = 5,
}

impl OveyOperation {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OveyOperation {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        Ok(match code {
            0 => Self::Unspec,
            1 => Self::Echo,
            2 => Self::CreateDevice,
            3 => Self::DeleteDevice,
            4 => Self::DebugRespondError,
            5 => Self::DeviceInfo,
            other => return Err(other),
        })
    }
}

impl fmt::Display for OveyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OveyOperation::{:?}({})", self, self.code())
    }
}

/// Attribute type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OveyAttribute {
    Unspec = 0,
    /// Informational text from the kernel (string).
    Msg = 1,
    /// Name of the virtual device being created, deleted or queried (string).
    DeviceName = 2,
    /// Name of the physical parent device (string).
    ParentDeviceName = 3,
    /// Node GUID (u64, big-endian).
    NodeGuid = 4,
    /// Virtual network UUID (string).
    VirtNetUuidStr = 5,
}

impl OveyAttribute {
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for OveyAttribute {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, u16> {
        Ok(match code {
            0 => Self::Unspec,
            1 => Self::Msg,
            2 => Self::DeviceName,
            3 => Self::ParentDeviceName,
            4 => Self::NodeGuid,
            5 => Self::VirtNetUuidStr,
            other => return Err(other),
        })
    }
}

impl fmt::Display for OveyAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OveyAttribute::{:?}({})", self, self.code())
    }
}
