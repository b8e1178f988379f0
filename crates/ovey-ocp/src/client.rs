use ovey_genl::Family;
use ovey_netlink::{AttributeEncoder, DecodeError, GenlPayload};
use tracing::debug;

use crate::config::{DeleteDeviceConfig, DeviceInfoConfig, EchoConfig, LinkConfig, NewDeviceConfig};
use crate::device::DeviceInfo;
use crate::echo::EchoReport;
use crate::error::{DialError, OcpError, Result};
use crate::link::{enumerate, open_conn, resolve, Dialer, Link};
use crate::properties::{OveyAttribute, OveyOperation};

/// Runs OCP operations.
///
/// Every operation dials its own [`Link`], executes exactly one request and
/// releases the link before returning, on success and on every failure path.
#[derive(Debug, Clone)]
pub struct Client<D> {
    dialer: D,
    config: LinkConfig,
}

#[cfg(target_os = "linux")]
impl Client<crate::link::SystemDialer> {
    /// A client for the running kernel.
    pub fn system(config: LinkConfig) -> Self {
        Self::new(crate::link::SystemDialer, config)
    }
}

impl<D: Dialer> Client<D> {
    pub fn new(dialer: D, config: LinkConfig) -> Self {
        Self { dialer, config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Open a link with this client's configuration.
    pub fn dial(&self) -> std::result::Result<Link<D::Transport>, DialError> {
        Link::dial_with(&self.dialer, &self.config)
    }

    /// Create a virtual device layered on a physical parent.
    ///
    /// Returns the kernel's informational messages in the order received.
    pub fn new_device(&self, config: NewDeviceConfig) -> Result<Vec<String>> {
        let mut link = self.dial()?;

        let mut attrs = AttributeEncoder::new();
        attrs
            .string(OveyAttribute::DeviceName.code(), config.name)
            .string(OveyAttribute::ParentDeviceName.code(), config.parent);
        if let Some(guid) = config.node_guid {
            attrs.u64_be(OveyAttribute::NodeGuid.code(), guid);
        }
        if let Some(uuid) = config.virt_net_uuid {
            attrs.string(OveyAttribute::VirtNetUuidStr.code(), uuid);
        }
        let payload = attrs.encode()?;

        let replies = link
            .new_request(OveyOperation::CreateDevice, payload)
            .execute()?;
        link.close();

        let messages = collect_messages(&replies)?;
        debug!(messages = messages.len(), "device created");
        Ok(messages)
    }

    /// Delete a virtual device. The reply body is not interpreted.
    pub fn delete_device(&self, config: DeleteDeviceConfig) -> Result<()> {
        let mut link = self.dial()?;

        let mut attrs = AttributeEncoder::new();
        attrs.string(OveyAttribute::DeviceName.code(), config.name);
        let payload = attrs.encode()?;

        let replies = link
            .new_request(OveyOperation::DeleteDevice, payload)
            .execute()?;
        link.close();

        debug!(replies = replies.len(), "device deleted");
        Ok(())
    }

    /// Query the kernel's view of a virtual device.
    pub fn device_info(&self, config: DeviceInfoConfig) -> Result<DeviceInfo> {
        let mut link = self.dial()?;

        let mut attrs = AttributeEncoder::new();
        attrs.string(OveyAttribute::DeviceName.code(), config.name.as_str());
        let payload = attrs.encode()?;

        let replies = link
            .new_request(OveyOperation::DeviceInfo, payload)
            .execute()?;
        link.close();

        Ok(DeviceInfo::from_replies(&config.name, &replies)?)
    }

    /// List every family registered with the controller.
    ///
    /// Does not require the Ovey family to be registered.
    pub fn list_families(&self) -> Result<Vec<Family>> {
        let mut conn = open_conn(&self.dialer, &self.config)?;
        Ok(enumerate(&mut conn)?)
    }

    /// Diagnostic round trip.
    ///
    /// Lists every registered family, then resolves the Ovey family. If it is
    /// registered, sends an echo command (carrying `config.message` when
    /// given) and collects the messages of the reply. A missing family is
    /// reported in the result, not as an error.
    pub fn echo(&self, config: EchoConfig) -> Result<EchoReport> {
        let mut conn = open_conn(&self.dialer, &self.config)?;
        let families = enumerate(&mut conn)?;

        let family = match resolve(&mut conn, &self.config.family_name) {
            Ok(family) => family,
            Err(DialError::FamilyNotFound(name)) => {
                debug!(family = %name, "family not registered, skipping echo");
                return Ok(EchoReport {
                    families,
                    ovey_family: None,
                    messages: Vec::new(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let mut attrs = AttributeEncoder::new();
        if let Some(message) = config.message {
            attrs.string(OveyAttribute::Msg.code(), message);
        }
        let payload = attrs.encode()?;

        let mut link = Link::from_parts(conn, family.clone());
        let replies = link.new_request(OveyOperation::Echo, payload).execute()?;
        link.close();

        Ok(EchoReport {
            families,
            ovey_family: Some(family),
            messages: collect_messages(&replies)?,
        })
    }

    /// Ask the kernel to answer with an error.
    ///
    /// Exercises the error path of the module. A successful exchange returns
    /// the reply messages; the expected kernel error comes back as a
    /// send-phase [`OcpError`].
    pub fn debug_respond_error(&self) -> Result<Vec<String>> {
        let mut link = self.dial()?;
        let payload = AttributeEncoder::new().encode()?;

        let replies = link
            .new_request(OveyOperation::DebugRespondError, payload)
            .execute()?;
        link.close();

        Ok(collect_messages(&replies)?)
    }
}

/// Every `Msg` attribute across the reply set, in order. Other attributes are
/// skipped.
pub(crate) fn collect_messages(
    replies: &[GenlPayload],
) -> std::result::Result<Vec<String>, DecodeError> {
    let mut messages = Vec::new();
    for reply in replies {
        for attr in reply.attributes() {
            let attr = attr?;
            if attr.kind() == OveyAttribute::Msg.code() {
                messages.push(attr.string()?.to_string());
            }
        }
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use ovey_genl::GenlError;
    use ovey_genl_mock::{CommandReply, CommandRequest, MockFamily, MockKernel};
    use ovey_netlink::HeaderFlags;
    use ovey_transport::TransportError;

    use super::*;
    use crate::error::{ErrorKind, Phase};
    use crate::properties::FAMILY_NAME;

    const ID: u16 = 0x1d;

    fn msg(text: &str) -> AttributeEncoder {
        let mut attrs = AttributeEncoder::new();
        attrs.string(OveyAttribute::Msg.code(), text);
        attrs
    }

    /// Simulated Ovey module. `childA` is the only device it knows.
    fn ovey_kernel() -> MockKernel {
        MockKernel::new().with_family(MockFamily::new(ID, FAMILY_NAME, 1, handle))
    }

    fn handle(req: &CommandRequest) -> CommandReply {
        let name = req.string(OveyAttribute::DeviceName.code());
        match OveyOperation::try_from(req.command) {
            Ok(OveyOperation::CreateDevice) => {
                let name = name.unwrap_or_default();
                let parent = req
                    .string(OveyAttribute::ParentDeviceName.code())
                    .unwrap_or_default();
                CommandReply::Messages(vec![
                    msg(&format!("created {name}")),
                    msg(&format!("linked to {parent}")),
                ])
            }
            Ok(OveyOperation::DeleteDevice) | Ok(OveyOperation::DeviceInfo)
                if name.as_deref() != Some("childA") =>
            {
                CommandReply::Error(libc::ENODEV)
            }
            Ok(OveyOperation::DeleteDevice) => CommandReply::Messages(Vec::new()),
            Ok(OveyOperation::DeviceInfo) => {
                let mut attrs = AttributeEncoder::new();
                attrs
                    .string(OveyAttribute::DeviceName.code(), "childA")
                    .string(OveyAttribute::ParentDeviceName.code(), "parent0")
                    .u64_be(OveyAttribute::NodeGuid.code(), 0xdead_beef_0000_0001);
                CommandReply::Messages(vec![attrs])
            }
            Ok(OveyOperation::Echo) => {
                let text = req
                    .string(OveyAttribute::Msg.code())
                    .unwrap_or_else(|| "hello from kernel".to_string());
                CommandReply::Messages(vec![msg(&text)])
            }
            Ok(OveyOperation::DebugRespondError) => CommandReply::Error(libc::EINVAL),
            _ => CommandReply::Error(libc::EOPNOTSUPP),
        }
    }

    fn client(kernel: &MockKernel) -> Client<impl Dialer + '_> {
        Client::new(move || kernel.connect(), LinkConfig::default())
    }

    #[test]
    fn new_device_returns_messages_in_order() {
        let kernel = ovey_kernel();
        let messages = client(&kernel)
            .new_device(NewDeviceConfig::new("childA", "parent0"))
            .unwrap();

        assert_eq!(messages, vec!["created childA", "linked to parent0"]);
        assert_eq!(kernel.open_channels(), 0);

        let sent = kernel.requests_for(ID);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command, OveyOperation::CreateDevice.code());
        let kinds: Vec<u16> = sent[0].attributes.iter().map(|attr| attr.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                OveyAttribute::DeviceName.code(),
                OveyAttribute::ParentDeviceName.code()
            ]
        );
    }

    #[test]
    fn new_device_sends_optional_guid_big_endian() {
        let kernel = ovey_kernel();
        let config = NewDeviceConfig {
            node_guid: Some(0x0102_0304_0506_0708),
            virt_net_uuid: Some("net-1".into()),
            ..NewDeviceConfig::new("childA", "parent0")
        };
        client(&kernel).new_device(config).unwrap();

        let sent = kernel.requests_for(ID);
        let guid = sent[0]
            .attributes
            .iter()
            .find(|attr| attr.kind() == OveyAttribute::NodeGuid.code())
            .unwrap();
        assert_eq!(&guid.value()[..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(sent[0]
            .attributes
            .iter()
            .any(|attr| attr.kind() == OveyAttribute::VirtNetUuidStr.code()
                && attr.string().unwrap() == "net-1"));
    }

    #[test]
    fn delete_device_accepts_bare_ack() {
        let kernel = ovey_kernel();
        client(&kernel)
            .delete_device(DeleteDeviceConfig {
                name: "childA".into(),
            })
            .unwrap();
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn delete_missing_device_fails_in_send_phase() {
        let kernel = ovey_kernel();
        let err = client(&kernel)
            .delete_device(DeleteDeviceConfig {
                name: "missing".into(),
            })
            .unwrap_err();

        assert_eq!(err.phase(), Phase::Send);
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert_eq!(err.errno(), Some(libc::ENODEV));
        assert!(err.is_no_such_device());
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn operations_fail_to_dial_without_module() {
        let kernel = MockKernel::new();
        let err = client(&kernel)
            .new_device(NewDeviceConfig::new("childA", "parent0"))
            .unwrap_err();

        assert_eq!(err.phase(), Phase::Dial);
        assert_eq!(err.kind(), ErrorKind::FamilyNotFound);
        assert!(kernel.requests_for(ID).is_empty());
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn embedded_nul_fails_in_encode_phase() {
        let kernel = ovey_kernel();
        let err = client(&kernel)
            .new_device(NewDeviceConfig::new("bad\0name", "parent0"))
            .unwrap_err();

        assert_eq!(err.phase(), Phase::Encode);
        assert_eq!(err.kind(), ErrorKind::EncodingError);
        assert!(kernel.requests_for(ID).is_empty());
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn device_info_decodes_reply() {
        let kernel = ovey_kernel();
        let info = client(&kernel)
            .device_info(DeviceInfoConfig {
                name: "childA".into(),
            })
            .unwrap();

        assert_eq!(info.device_name, "childA");
        assert_eq!(info.parent_device_name.as_deref(), Some("parent0"));
        assert_eq!(info.guid().as_deref(), Some("dead:beef:0000:0001"));
    }

    #[test]
    fn echo_reports_families_and_messages() {
        let kernel = ovey_kernel();
        let report = client(&kernel)
            .echo(EchoConfig {
                message: Some("ping".into()),
            })
            .unwrap();

        let names: Vec<&str> = report.families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["nlctrl", FAMILY_NAME]);
        assert!(report.module_loaded());
        assert_eq!(report.messages, vec!["ping"]);
        assert_eq!(kernel.opened_channels(), 1);
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn echo_tolerates_missing_family() {
        let kernel = MockKernel::new();
        let report = client(&kernel).echo(EchoConfig::default()).unwrap();

        assert!(!report.module_loaded());
        assert_eq!(report.families.len(), 1);
        assert!(report.messages.is_empty());
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn list_families_without_module() {
        let kernel = MockKernel::new();
        let families = client(&kernel).list_families().unwrap();

        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "nlctrl");
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn echo_distinguishes_query_failure() {
        let kernel = ovey_kernel().with_controller_error(libc::EPERM);
        let err = client(&kernel).echo(EchoConfig::default()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FamilyQueryFailed);
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn debug_respond_error_surfaces_kernel_error() {
        let kernel = ovey_kernel();
        let err = client(&kernel).debug_respond_error().unwrap_err();

        assert!(matches!(
            err,
            OcpError::Send(GenlError::Kernel { errno }) if errno == libc::EINVAL
        ));
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn send_failure_is_reported_in_send_phase() {
        let kernel = MockKernel::new().with_family(
            MockFamily::new(ID, FAMILY_NAME, 1, handle).with_send_error(libc::ENOBUFS),
        );
        let err = client(&kernel)
            .delete_device(DeleteDeviceConfig {
                name: "childA".into(),
            })
            .unwrap_err();

        assert_eq!(err.phase(), Phase::Send);
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert!(matches!(
            err,
            OcpError::Send(GenlError::Transport(TransportError::Send(_)))
        ));
        assert!(kernel.requests_for(ID).is_empty());
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn silent_kernel_times_out() {
        let kernel = MockKernel::new().with_family(MockFamily::new(ID, FAMILY_NAME, 1, |_| {
            CommandReply::Messages(Vec::new())
        }));
        let mut link = client(&kernel).dial().unwrap();

        // No ACK requested and no reply sent: nothing ever arrives.
        let err = link
            .new_request(OveyOperation::Echo, bytes::Bytes::new())
            .with_flags(HeaderFlags::empty())
            .execute()
            .map_err(OcpError::from)
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            OcpError::Send(GenlError::Transport(TransportError::Timeout(_)))
        ));
    }
}
