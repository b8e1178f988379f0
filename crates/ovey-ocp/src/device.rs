//! Device descriptions decoded from kernel replies.

use ovey_netlink::{DecodeError, GenlPayload};
use serde::{Serialize, Serializer};

use crate::properties::OveyAttribute;

/// What the kernel reports about one virtual device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device_name: String,
    pub parent_device_name: Option<String>,
    /// Node GUID in host byte order. Serialized as GUID text.
    #[serde(serialize_with = "serialize_guid")]
    pub node_guid: Option<u64>,
    pub virt_net_uuid: Option<String>,
    pub messages: Vec<String>,
}

impl DeviceInfo {
    /// Decode the reply set of a device-info request.
    ///
    /// Later values overwrite earlier ones; unknown attributes are skipped.
    /// `requested` fills in the name if the kernel does not echo it.
    pub fn from_replies(requested: &str, replies: &[GenlPayload]) -> Result<Self, DecodeError> {
        let mut info = DeviceInfo {
            device_name: requested.to_string(),
            ..DeviceInfo::default()
        };

        for reply in replies {
            for attr in reply.attributes() {
                let attr = attr?;
                match OveyAttribute::try_from(attr.kind()) {
                    Ok(OveyAttribute::Msg) => info.messages.push(attr.string()?.to_string()),
                    Ok(OveyAttribute::DeviceName) => info.device_name = attr.string()?.to_string(),
                    Ok(OveyAttribute::ParentDeviceName) => {
                        info.parent_device_name = Some(attr.string()?.to_string())
                    }
                    Ok(OveyAttribute::NodeGuid) => info.node_guid = Some(attr.u64_be()?),
                    Ok(OveyAttribute::VirtNetUuidStr) => {
                        info.virt_net_uuid = Some(attr.string()?.to_string())
                    }
                    Ok(OveyAttribute::Unspec) | Err(_) => {}
                }
            }
        }
        Ok(info)
    }

    /// The node GUID as `xxxx:xxxx:xxxx:xxxx`.
    pub fn guid(&self) -> Option<String> {
        self.node_guid.map(format_guid)
    }
}

/// Render a GUID the way `ibv_devinfo` does: four groups of four hex digits,
/// most significant first.
pub fn format_guid(guid: u64) -> String {
    format!(
        "{:04x}:{:04x}:{:04x}:{:04x}",
        (guid >> 48) & 0xffff,
        (guid >> 32) & 0xffff,
        (guid >> 16) & 0xffff,
        guid & 0xffff
    )
}

/// Parse GUID text produced by [`format_guid`].
///
/// Exactly four colon-separated groups of one to four hex digits are accepted.
pub fn parse_guid(text: &str) -> Option<u64> {
    let mut guid = 0u64;
    let mut groups = 0;
    for group in text.split(':') {
        if group.is_empty() || group.len() > 4 {
            return None;
        }
        let value = u16::from_str_radix(group, 16).ok()?;
        guid = (guid << 16) | u64::from(value);
        groups += 1;
    }
    (groups == 4).then_some(guid)
}

fn serialize_guid<S: Serializer>(guid: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match guid {
        Some(guid) => serializer.serialize_some(&format_guid(*guid)),
        None => serializer.serialize_none(),
    }
}
