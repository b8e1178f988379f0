//! Simulated kernel side of generic netlink for tests.
//!
//! [`MockKernel`] answers controller queries for the families registered
//! with it and hands family commands to a per-family handler. Channels opened
//! with [`MockKernel::connect`] implement [`NetlinkTransport`], so the real
//! connection code runs unchanged against it. The kernel also counts open
//! channels, which lets tests assert that every path releases its channel.

use std::collections::VecDeque;
use std::io;
use std::num::NonZeroI32;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use netlink_packet_core::NetlinkSerializable;
use netlink_packet_generic::ctrl::nlas::GenlCtrlAttrs;
use netlink_packet_generic::ctrl::{GenlCtrl, GenlCtrlCmd};
use netlink_packet_utils::Emitable;
use ovey_netlink::{
    align, decode_datagram, encode_message, Attribute, AttributeEncoder, DoneMessage,
    ErrorMessage, GenlMessage, GenlPayload, HeaderFlags, NetlinkHeader, NetlinkMessage,
    NetlinkPayload, Payload,
};
use ovey_transport::{NetlinkTransport, Result, TransportError};
use tracing::trace;

const GENL_ID_CTRL: u16 = 0x10;
const CTRL_NAME: &str = "nlctrl";
const CTRL_CMD_GETFAMILY: u8 = 3;
const CTRL_ATTR_FAMILY_NAME: u16 = 2;

const FIRST_PORT: u32 = 4000;

type Request = NetlinkMessage<GenlMessage<GenlPayload>>;

/// A family command as the handler sees it.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub command: u8,
    pub version: u8,
    pub flags: HeaderFlags,
    pub attributes: Vec<Attribute>,
}

impl CommandRequest {
    /// First string attribute of the given type.
    pub fn string(&self, kind: u16) -> Option<String> {
        self.attributes
            .iter()
            .find(|attr| attr.kind() == kind)
            .and_then(|attr| attr.string().ok())
            .map(str::to_string)
    }
}

/// How the simulated kernel answers a family command.
#[derive(Debug, Clone)]
pub enum CommandReply {
    /// Zero or more reply messages. More than one is sent as a multi-part
    /// reply terminated by `NLMSG_DONE`. An acknowledgement follows when
    /// the request asked for one.
    Messages(Vec<AttributeEncoder>),
    /// A netlink error with this (positive) errno.
    Error(i32),
    /// A multi-part reply terminated by `NLMSG_DONE`, followed by a netlink
    /// error instead of the acknowledgement.
    MessagesThenError {
        messages: Vec<AttributeEncoder>,
        errno: i32,
    },
}

type Handler = Arc<dyn Fn(&CommandRequest) -> CommandReply + Send + Sync>;

/// A family registered with the mock controller.
#[derive(Clone)]
pub struct MockFamily {
    id: u16,
    name: String,
    version: u8,
    max_attr: u32,
    send_error: Option<i32>,
    handler: Handler,
}

impl MockFamily {
    pub fn new(
        id: u16,
        name: impl Into<String>,
        version: u8,
        handler: impl Fn(&CommandRequest) -> CommandReply + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            version,
            max_attr: 0,
            send_error: None,
            handler: Arc::new(handler),
        }
    }

    /// Set the advertised highest attribute type.
    pub fn with_max_attr(mut self, max_attr: u32) -> Self {
        self.max_attr = max_attr;
        self
    }

    /// Make every send addressed to this family fail with `errno`, as if
    /// the channel refused the datagram. Controller queries are unaffected.
    pub fn with_send_error(mut self, errno: i32) -> Self {
        self.send_error = Some(errno);
        self
    }
}

impl std::fmt::Debug for MockFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFamily")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

/// A request observed by the mock kernel.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub family: u16,
    pub flags: HeaderFlags,
    pub sequence: u32,
    pub port: u32,
    pub command: u8,
    pub version: u8,
    pub attributes: Vec<Attribute>,
}

#[derive(Default)]
struct State {
    families: Vec<MockFamily>,
    controller_error: Option<i32>,
    unavailable: bool,
    next_port: u32,
    open: usize,
    opened: usize,
    closed: usize,
    requests: Vec<RecordedRequest>,
}

/// Shared simulated kernel. Clones observe the same state.
#[derive(Clone, Default)]
pub struct MockKernel {
    state: Arc<Mutex<State>>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family.
    pub fn with_family(self, family: MockFamily) -> Self {
        self.lock().families.push(family);
        self
    }

    /// Make every controller query fail with `errno`.
    pub fn with_controller_error(self, errno: i32) -> Self {
        self.lock().controller_error = Some(errno);
        self
    }

    /// Make [`connect`](Self::connect) fail as if generic netlink were missing.
    pub fn unavailable(self) -> Self {
        self.lock().unavailable = true;
        self
    }

    /// Open a channel to the simulated kernel.
    pub fn connect(&self) -> Result<MockChannel> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(TransportError::Unavailable(io::Error::from_raw_os_error(
                libc::EPROTONOSUPPORT,
            )));
        }
        let port = FIRST_PORT + state.next_port;
        state.next_port += 1;
        state.open += 1;
        state.opened += 1;
        trace!(port, "mock channel opened");

        Ok(MockChannel {
            state: Arc::clone(&self.state),
            port,
            queue: VecDeque::new(),
            recv_timeout: None,
        })
    }

    /// Channels currently open.
    pub fn open_channels(&self) -> usize {
        self.lock().open
    }

    /// Channels opened since creation.
    pub fn opened_channels(&self) -> usize {
        self.lock().opened
    }

    /// Channels released since creation.
    pub fn closed_channels(&self) -> usize {
        self.lock().closed
    }

    /// Every request received so far, controller queries included.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests addressed to `family`.
    pub fn requests_for(&self, family: u16) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|req| req.family == family)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Addressing of a received request, kept to build its replies.
struct Incoming {
    family: u16,
    flags: HeaderFlags,
    sequence: u32,
    port: u32,
    /// The request header as it arrived, echoed back in error messages.
    raw_header: Vec<u8>,
}

impl Incoming {
    fn new(header: &NetlinkHeader) -> Self {
        let mut raw_header = vec![0u8; header.buffer_len()];
        header.emit(&mut raw_header);
        Self {
            family: header.message_type,
            flags: HeaderFlags::from_bits_retain(header.flags),
            sequence: header.sequence_number,
            port: header.port_number,
            raw_header,
        }
    }

    fn reply_header(&self, flags: HeaderFlags) -> NetlinkHeader {
        let mut header = NetlinkHeader::default();
        header.flags = flags.bits();
        header.sequence_number = self.sequence;
        header.port_number = self.port;
        header
    }
}

/// One open channel to a [`MockKernel`].
///
/// Replies are queued when a request is sent and handed out one datagram
/// per `recv`. Receiving from an empty queue reports a timeout instead of
/// blocking.
pub struct MockChannel {
    state: Arc<Mutex<State>>,
    port: u32,
    queue: VecDeque<Bytes>,
    recv_timeout: Option<Duration>,
}

impl MockChannel {
    /// Datagrams queued but not yet received.
    pub fn pending_datagrams(&self) -> usize {
        self.queue.len()
    }

    /// Queue a raw datagram for the next `recv`.
    pub fn push_datagram(&mut self, datagram: impl Into<Bytes>) {
        self.queue.push_back(datagram.into());
    }

    fn dispatch(&mut self, message: Request) -> Result<()> {
        let request = Incoming::new(&message.header);
        let NetlinkPayload::InnerMessage(genl) = message.payload else {
            self.push_error(&request, libc::EINVAL);
            return Ok(());
        };
        let genl = genl.payload;

        let family = lock(&self.state)
            .families
            .iter()
            .find(|family| family.id == request.family)
            .cloned();
        if let Some(errno) = family.as_ref().and_then(|family| family.send_error) {
            trace!(family = request.family, errno, "mock kernel refusing send");
            return Err(TransportError::Send(io::Error::from_raw_os_error(errno)));
        }

        let attributes: Vec<Attribute> = match genl.attributes().collect() {
            Ok(attributes) => attributes,
            Err(_) => {
                self.push_error(&request, libc::EINVAL);
                return Ok(());
            }
        };

        lock(&self.state).requests.push(RecordedRequest {
            family: request.family,
            flags: request.flags,
            sequence: request.sequence,
            port: request.port,
            command: genl.command,
            version: genl.version,
            attributes: attributes.clone(),
        });

        if request.family == GENL_ID_CTRL {
            self.controller(&request, genl.command, &attributes);
            return Ok(());
        }

        let Some(family) = family else {
            self.push_error(&request, libc::ENOENT);
            return Ok(());
        };

        let command = CommandRequest {
            command: genl.command,
            version: genl.version,
            flags: request.flags,
            attributes,
        };
        let encode = |replies: &[AttributeEncoder]| -> Option<Vec<GenlPayload>> {
            replies
                .iter()
                .map(|reply| reply.encode().ok())
                .map(|data| data.map(|data| GenlPayload::new(genl.command, family.version, data)))
                .collect()
        };

        match (family.handler)(&command) {
            CommandReply::Messages(replies) => {
                let Some(payloads) = encode(&replies) else {
                    self.push_error(&request, libc::EINVAL);
                    return Ok(());
                };
                let multi = payloads.len() > 1;
                self.push_data(&request, payloads, multi);
                if request.flags.expects_ack() {
                    self.push_ack(&request);
                }
            }
            CommandReply::Error(errno) => self.push_error(&request, errno),
            CommandReply::MessagesThenError { messages, errno } => {
                let Some(payloads) = encode(&messages) else {
                    self.push_error(&request, libc::EINVAL);
                    return Ok(());
                };
                self.push_data(&request, payloads, true);
                self.push_error(&request, errno);
            }
        }
        Ok(())
    }

    fn controller(&mut self, request: &Incoming, command: u8, attributes: &[Attribute]) {
        if command != CTRL_CMD_GETFAMILY {
            return self.push_error(request, libc::EOPNOTSUPP);
        }

        let (error, mut families) = {
            let state = lock(&self.state);
            (state.controller_error, state.families.clone())
        };
        if let Some(errno) = error {
            return self.push_error(request, errno);
        }

        let controller = MockFamily::new(GENL_ID_CTRL, CTRL_NAME, 2, |_| {
            CommandReply::Error(libc::EOPNOTSUPP)
        })
        .with_max_attr(10);
        families.insert(0, controller);

        if request.flags.is_dump() {
            // A dump always ends with DONE and is never acknowledged.
            self.push_data(request, families.iter().map(describe).collect(), true);
            return;
        }

        let wanted = attributes
            .iter()
            .find(|attr| attr.kind() == CTRL_ATTR_FAMILY_NAME)
            .and_then(|attr| attr.string().ok());
        match families
            .iter()
            .find(|family| Some(family.name.as_str()) == wanted)
        {
            Some(family) => {
                self.push_data(request, vec![describe(family)], false);
                if request.flags.expects_ack() {
                    self.push_ack(request);
                }
            }
            None => self.push_error(request, libc::ENOENT),
        }
    }

    /// Queue `payloads` as one datagram. A multi-part reply is flagged and
    /// terminated by `NLMSG_DONE`, even when empty.
    fn push_data<F: Payload>(&mut self, request: &Incoming, payloads: Vec<F>, multi: bool) {
        if payloads.is_empty() && !multi {
            return;
        }
        let flags = if multi {
            HeaderFlags::MULTI
        } else {
            HeaderFlags::empty()
        };

        let mut wire = Vec::new();
        for payload in payloads {
            let mut genl = GenlMessage::from_payload(payload);
            genl.set_resolved_family_id(request.family);
            frame(
                &mut wire,
                request.reply_header(flags),
                NetlinkPayload::InnerMessage(genl),
            );
        }
        if multi {
            frame::<GenlMessage<GenlPayload>>(
                &mut wire,
                request.reply_header(HeaderFlags::MULTI),
                NetlinkPayload::Done(DoneMessage::default()),
            );
        }
        self.queue.push_back(Bytes::from(wire));
    }

    fn push_ack(&mut self, request: &Incoming) {
        self.push_error(request, 0);
    }

    fn push_error(&mut self, request: &Incoming, errno: i32) {
        let mut error = ErrorMessage::default();
        error.code = NonZeroI32::new(errno.wrapping_neg());
        error.header = request.raw_header.clone();

        let mut wire = Vec::new();
        frame::<GenlMessage<GenlPayload>>(
            &mut wire,
            request.reply_header(HeaderFlags::empty()),
            NetlinkPayload::Error(error),
        );
        self.queue.push_back(Bytes::from(wire));
    }
}

/// Append one padded message to `wire`.
fn frame<I: NetlinkSerializable>(
    wire: &mut Vec<u8>,
    header: NetlinkHeader,
    payload: NetlinkPayload<I>,
) {
    wire.extend(encode_message(&mut NetlinkMessage::new(header, payload)));
    wire.resize(align(wire.len()), 0);
}

fn describe(family: &MockFamily) -> GenlCtrl {
    GenlCtrl {
        cmd: GenlCtrlCmd::NewFamily,
        nlas: vec![
            GenlCtrlAttrs::FamilyId(family.id),
            GenlCtrlAttrs::FamilyName(family.name.clone()),
            GenlCtrlAttrs::Version(u32::from(family.version)),
            GenlCtrlAttrs::HdrSize(0),
            GenlCtrlAttrs::MaxAttr(family.max_attr),
        ],
    }
}

impl NetlinkTransport for MockChannel {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        let messages = decode_datagram::<GenlMessage<GenlPayload>>(datagram).map_err(|err| {
            TransportError::Send(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
        })?;
        for message in messages {
            self.dispatch(message)?;
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<Bytes> {
        self.queue
            .pop_front()
            .ok_or_else(|| TransportError::Timeout(self.recv_timeout.unwrap_or_default()))
    }

    fn local_port(&self) -> u32 {
        self.port
    }

    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.recv_timeout = timeout;
        Ok(())
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.open -= 1;
        state.closed += 1;
        trace!(port = self.port, "mock channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_to(family: u16, flags: HeaderFlags, port: u32) -> Vec<u8> {
        let mut genl = GenlMessage::from_payload(GenlPayload::new(1, 1, Vec::new()));
        genl.set_resolved_family_id(family);
        let mut header = NetlinkHeader::default();
        header.flags = flags.bits();
        header.sequence_number = 1;
        header.port_number = port;
        encode_message(&mut NetlinkMessage::new(
            header,
            NetlinkPayload::InnerMessage(genl),
        ))
    }

    fn replies(channel: &mut MockChannel) -> Vec<Request> {
        decode_datagram(&channel.recv().unwrap()).unwrap()
    }

    #[test]
    fn connect_and_drop_are_counted() {
        let kernel = MockKernel::new();
        let a = kernel.connect().unwrap();
        let b = kernel.connect().unwrap();
        assert_ne!(a.local_port(), b.local_port());
        assert_eq!(kernel.open_channels(), 2);

        drop(a);
        assert_eq!(kernel.open_channels(), 1);
        assert_eq!(kernel.closed_channels(), 1);
        drop(b);
        assert_eq!(kernel.open_channels(), 0);
        assert_eq!(kernel.opened_channels(), 2);
    }

    #[test]
    fn unavailable_kernel_refuses_channels() {
        let kernel = MockKernel::new().unavailable();
        assert!(matches!(
            kernel.connect(),
            Err(TransportError::Unavailable(_))
        ));
        assert_eq!(kernel.opened_channels(), 0);
    }

    #[test]
    fn empty_queue_reports_timeout() {
        let kernel = MockKernel::new();
        let mut channel = kernel.connect().unwrap();
        channel
            .set_recv_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        assert!(matches!(
            channel.recv(),
            Err(TransportError::Timeout(d)) if d == Duration::from_millis(10)
        ));
    }

    #[test]
    fn unknown_family_id_gets_enoent() {
        let kernel = MockKernel::new();
        let mut channel = kernel.connect().unwrap();

        let port = channel.local_port();
        channel
            .send(&request_to(0x40, HeaderFlags::REQUEST, port))
            .unwrap();

        let reply = replies(&mut channel);
        let NetlinkPayload::Error(error) = &reply[0].payload else {
            panic!("expected an error message, got {:?}", reply[0].payload);
        };
        assert_eq!(error.code.map(NonZeroI32::get), Some(-libc::ENOENT));
        assert_eq!(error.header.len(), 16);
        assert_eq!(kernel.requests_for(0x40).len(), 1);
    }

    #[test]
    fn multi_part_reply_is_followed_by_separate_ack() {
        let kernel = MockKernel::new().with_family(MockFamily::new(0x30, "pair", 1, |_| {
            let mut a = AttributeEncoder::new();
            a.u32(1, 1);
            let mut b = AttributeEncoder::new();
            b.u32(1, 2);
            CommandReply::Messages(vec![a, b])
        }));
        let mut channel = kernel.connect().unwrap();

        let port = channel.local_port();
        let flags = HeaderFlags::REQUEST | HeaderFlags::ACK;
        channel.send(&request_to(0x30, flags, port)).unwrap();
        assert_eq!(channel.pending_datagrams(), 2);

        let data = replies(&mut channel);
        assert_eq!(data.len(), 3);
        assert!(matches!(data[2].payload, NetlinkPayload::Done(_)));
        let ack = replies(&mut channel);
        assert!(matches!(&ack[0].payload, NetlinkPayload::Error(e) if e.code.is_none()));
    }

    #[test]
    fn send_error_refuses_datagram() {
        let kernel = MockKernel::new().with_family(
            MockFamily::new(0x30, "full", 1, |_| CommandReply::Messages(Vec::new()))
                .with_send_error(libc::ENOBUFS),
        );
        let mut channel = kernel.connect().unwrap();

        let port = channel.local_port();
        let err = channel
            .send(&request_to(0x30, HeaderFlags::REQUEST, port))
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Send(ref e) if e.raw_os_error() == Some(libc::ENOBUFS)
        ));
        assert_eq!(channel.pending_datagrams(), 0);
        assert!(kernel.requests().is_empty());
    }

    #[test]
    fn pushed_datagrams_are_received_in_order() {
        let kernel = MockKernel::new();
        let mut channel = kernel.connect().unwrap();
        channel.push_datagram(Bytes::from_static(b"first"));
        channel.push_datagram(Bytes::from_static(b"second"));

        assert_eq!(channel.recv().unwrap().as_ref(), b"first");
        assert_eq!(channel.recv().unwrap().as_ref(), b"second");
    }
}
