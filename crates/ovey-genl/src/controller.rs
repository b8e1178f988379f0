//! Family discovery through the generic netlink controller (`nlctrl`).

use netlink_packet_generic::ctrl::nlas::{GenlCtrlAttrs, McastGrpAttrs, OpAttrs};
use netlink_packet_generic::ctrl::{GenlCtrl, GenlCtrlCmd};
use ovey_netlink::HeaderFlags;
use ovey_transport::NetlinkTransport;
use serde::Serialize;
use tracing::debug;

use crate::conn::Conn;
use crate::error::{GenlError, Result};

/// Fixed family id of the controller.
pub const GENL_ID_CTRL: u16 = 0x10;
/// Name of the controller family.
pub const CTRL_NAME: &str = "nlctrl";

/// A resolved generic netlink family.
///
/// The id is assigned by the kernel when the family registers and is only
/// meaningful while the owning module stays loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Family {
    pub id: u16,
    pub name: String,
    pub version: u8,
    pub header_size: u32,
    pub max_attr: u32,
    pub operations: Vec<Operation>,
    pub groups: Vec<MulticastGroup>,
}

/// A command the family accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub id: u32,
    pub flags: u32,
}

/// A multicast group registered by the family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MulticastGroup {
    pub id: u32,
    pub name: String,
}

impl<T: NetlinkTransport> Conn<T> {
    /// Resolve a family by name.
    ///
    /// Returns [`GenlError::FamilyNotFound`] when no such family is registered.
    pub fn get_family(&mut self, name: &str) -> Result<Family> {
        let request = GenlCtrl {
            cmd: GenlCtrlCmd::GetFamily,
            nlas: vec![GenlCtrlAttrs::FamilyName(name.to_string())],
        };

        let replies = match self.execute(GENL_ID_CTRL, request, HeaderFlags::REQUEST) {
            Ok(replies) => replies,
            Err(GenlError::Kernel { errno }) if errno == libc::ENOENT => {
                return Err(GenlError::FamilyNotFound(name.to_string()));
            }
            Err(err) => return Err(err),
        };

        let reply = replies
            .first()
            .ok_or_else(|| GenlError::FamilyNotFound(name.to_string()))?;
        let family = parse_family(reply)?;
        debug!(
            name = %family.name,
            id = family.id,
            version = family.version,
            "resolved generic netlink family"
        );
        Ok(family)
    }

    /// List every family registered with the controller.
    pub fn list_families(&mut self) -> Result<Vec<Family>> {
        let request = GenlCtrl {
            cmd: GenlCtrlCmd::GetFamily,
            nlas: Vec::new(),
        };
        let replies = self.execute(
            GENL_ID_CTRL,
            request,
            HeaderFlags::REQUEST | HeaderFlags::DUMP,
        )?;
        replies.iter().map(parse_family).collect()
    }
}

/// Build a [`Family`] from a controller `NEWFAMILY` message.
pub fn parse_family(message: &GenlCtrl) -> Result<Family> {
    let mut id = None;
    let mut name = None;
    let mut version = 0u8;
    let mut header_size = 0;
    let mut max_attr = 0;
    let mut operations = Vec::new();
    let mut groups = Vec::new();

    for nla in &message.nlas {
        match nla {
            GenlCtrlAttrs::FamilyId(value) => id = Some(*value),
            GenlCtrlAttrs::FamilyName(value) => name = Some(value.clone()),
            // The controller sends a u32; generic netlink headers carry a u8.
            GenlCtrlAttrs::Version(value) => version = u8::try_from(*value).unwrap_or(u8::MAX),
            GenlCtrlAttrs::HdrSize(value) => header_size = *value,
            GenlCtrlAttrs::MaxAttr(value) => max_attr = *value,
            GenlCtrlAttrs::Ops(ops) => operations = ops.iter().map(|op| operation(op)).collect(),
            GenlCtrlAttrs::McastGroups(entries) => {
                groups = entries.iter().map(|entry| group(entry)).collect()
            }
            _ => {}
        }
    }

    Ok(Family {
        id: id.ok_or(GenlError::MissingAttribute("CTRL_ATTR_FAMILY_ID"))?,
        name: name.ok_or(GenlError::MissingAttribute("CTRL_ATTR_FAMILY_NAME"))?,
        version,
        header_size,
        max_attr,
        operations,
        groups,
    })
}

fn operation(attrs: &[OpAttrs]) -> Operation {
    let mut op = Operation { id: 0, flags: 0 };
    for attr in attrs {
        match attr {
            OpAttrs::Id(id) => op.id = *id,
            OpAttrs::Flags(flags) => op.flags = *flags,
        }
    }
    op
}

fn group(attrs: &[McastGrpAttrs]) -> MulticastGroup {
    let mut group = MulticastGroup {
        id: 0,
        name: String::new(),
    };
    for attr in attrs {
        match attr {
            McastGrpAttrs::Id(id) => group.id = *id,
            McastGrpAttrs::Name(name) => group.name = name.clone(),
        }
    }
    group
}

#[cfg(test)]
mod tests {
    use ovey_genl_mock::{CommandReply, MockFamily, MockKernel};

    use super::*;

    fn kernel() -> MockKernel {
        MockKernel::new()
            .with_family(MockFamily::new(0x1a, "rdma-ovey", 1, |_| {
                CommandReply::Messages(Vec::new())
            }))
            .with_family(MockFamily::new(0x1b, "devlink", 1, |_| {
                CommandReply::Messages(Vec::new())
            }))
    }

    #[test]
    fn get_family_resolves_id_and_version() {
        let kernel = kernel();
        let mut conn = Conn::new(kernel.connect().unwrap());

        let family = conn.get_family("rdma-ovey").unwrap();
        assert_eq!(family.id, 0x1a);
        assert_eq!(family.name, "rdma-ovey");
        assert_eq!(family.version, 1);

        let sent = kernel.requests_for(GENL_ID_CTRL);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command, 3);
    }

    #[test]
    fn get_family_reports_not_found() {
        let kernel = kernel();
        let mut conn = Conn::new(kernel.connect().unwrap());

        let err = conn.get_family("missing").unwrap_err();
        assert!(matches!(err, GenlError::FamilyNotFound(ref name) if name == "missing"));
    }

    #[test]
    fn get_family_other_errors_pass_through() {
        let kernel = kernel().with_controller_error(libc::EPERM);
        let mut conn = Conn::new(kernel.connect().unwrap());

        let err = conn.get_family("rdma-ovey").unwrap_err();
        assert_eq!(err.errno(), Some(libc::EPERM));
    }

    #[test]
    fn list_families_includes_controller() {
        let kernel = kernel();
        let mut conn = Conn::new(kernel.connect().unwrap());

        let families = conn.list_families().unwrap();
        let names: Vec<&str> = families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![CTRL_NAME, "rdma-ovey", "devlink"]);
        assert_eq!(families[0].id, GENL_ID_CTRL);
    }

    #[test]
    fn dump_ends_at_done_even_when_ack_is_requested() {
        let kernel = kernel();
        let mut conn = Conn::new(kernel.connect().unwrap());

        let request = GenlCtrl {
            cmd: GenlCtrlCmd::GetFamily,
            nlas: Vec::new(),
        };
        let flags = HeaderFlags::REQUEST | HeaderFlags::DUMP | HeaderFlags::ACK;
        let replies = conn.execute(GENL_ID_CTRL, request, flags).unwrap();
        assert_eq!(replies.len(), 3);
        assert_eq!(conn.get_ref().pending_datagrams(), 0);

        // The link is still usable afterwards.
        assert_eq!(conn.get_family("devlink").unwrap().id, 0x1b);
    }

    #[test]
    fn parse_family_reads_nested_sets() {
        let message = GenlCtrl {
            cmd: GenlCtrlCmd::NewFamily,
            nlas: vec![
                GenlCtrlAttrs::FamilyId(0x22),
                GenlCtrlAttrs::FamilyName("thermal".to_string()),
                GenlCtrlAttrs::Version(1),
                GenlCtrlAttrs::HdrSize(0),
                GenlCtrlAttrs::MaxAttr(9),
                GenlCtrlAttrs::Ops(vec![vec![OpAttrs::Id(3), OpAttrs::Flags(0x0e)]]),
                GenlCtrlAttrs::McastGroups(vec![vec![
                    McastGrpAttrs::Name("events".to_string()),
                    McastGrpAttrs::Id(5),
                ]]),
            ],
        };

        let family = parse_family(&message).unwrap();
        assert_eq!(family.id, 0x22);
        assert_eq!(family.max_attr, 9);
        assert_eq!(family.operations, vec![Operation { id: 3, flags: 0x0e }]);
        assert_eq!(
            family.groups,
            vec![MulticastGroup {
                id: 5,
                name: "events".to_string()
            }]
        );

        let json = serde_json::to_value(&family).unwrap();
        assert_eq!(json["name"], "thermal");
    }

    #[test]
    fn parse_family_clamps_oversized_version() {
        let message = GenlCtrl {
            cmd: GenlCtrlCmd::NewFamily,
            nlas: vec![
                GenlCtrlAttrs::FamilyId(0x22),
                GenlCtrlAttrs::FamilyName("wide".to_string()),
                GenlCtrlAttrs::Version(300),
            ],
        };
        assert_eq!(parse_family(&message).unwrap().version, u8::MAX);
    }

    #[test]
    fn parse_family_requires_id() {
        let message = GenlCtrl {
            cmd: GenlCtrlCmd::NewFamily,
            nlas: vec![GenlCtrlAttrs::FamilyName("nameless".to_string())],
        };

        assert!(matches!(
            parse_family(&message),
            Err(GenlError::MissingAttribute("CTRL_ATTR_FAMILY_ID"))
        ));
    }
}
