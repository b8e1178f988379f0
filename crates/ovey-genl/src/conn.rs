use ovey_netlink::{
    decode_datagram, encode_message, GenlMessage, HeaderFlags, NetlinkHeader,
    NetlinkMessage, NetlinkPayload, Payload,
};
use ovey_transport::NetlinkTransport;
use tracing::{debug, trace};

use crate::error::{GenlError, Result};

/// A generic netlink connection over one channel.
///
/// Requests are strictly sequential: [`execute`](Self::execute) sends one
/// message and blocks until its complete reply set has arrived. Sharing a
/// connection between threads requires external locking.
pub struct Conn<T> {
    transport: T,
    sequence: u32,
}

/// A request that has been sent and is waiting for its replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    /// Family id the request was addressed to.
    pub family: u16,
    pub flags: HeaderFlags,
    pub sequence: u32,
    /// Local port the request was sent from.
    pub port: u32,
}

impl<T: NetlinkTransport> Conn<T> {
    /// Wrap an open channel.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            sequence: 0,
        }
    }

    /// Port id of the underlying channel.
    pub fn local_port(&self) -> u32 {
        self.transport.local_port()
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the connection and return the channel.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send `payload` to `family` and collect every reply.
    ///
    /// The returned payloads exclude acknowledgements and end-of-dump
    /// markers. A kernel error anywhere in the reply set fails the whole
    /// exchange.
    pub fn execute<F: Payload>(
        &mut self,
        family: u16,
        payload: F,
        flags: HeaderFlags,
    ) -> Result<Vec<F>> {
        let request = self.send(family, payload, flags)?;
        self.receive(&request)
    }

    /// Send `payload` and return what is needed to match its replies.
    pub fn send<F: Payload>(
        &mut self,
        family: u16,
        payload: F,
        flags: HeaderFlags,
    ) -> Result<Pending> {
        self.sequence = self.sequence.wrapping_add(1);
        let pending = Pending {
            family,
            flags,
            sequence: self.sequence,
            port: self.local_port(),
        };

        let command = payload.command();
        let mut genl = GenlMessage::from_payload(payload);
        genl.set_resolved_family_id(family);

        let mut header = NetlinkHeader::default();
        header.flags = flags.bits();
        header.sequence_number = pending.sequence;
        header.port_number = pending.port;
        let wire = encode_message(&mut NetlinkMessage::new(
            header,
            NetlinkPayload::InnerMessage(genl),
        ));

        debug!(
            family,
            command,
            sequence = pending.sequence,
            ?flags,
            len = wire.len(),
            "sending generic netlink request"
        );
        self.transport.send(&wire)?;
        Ok(pending)
    }

    /// Receive the complete reply set for `request`.
    ///
    /// A dump ends at `NLMSG_DONE`. Any other request sent with
    /// [`HeaderFlags::ACK`] ends only at the acknowledgement, which the
    /// kernel sends after the data, including after the `NLMSG_DONE` of a
    /// multi-part reply.
    pub fn receive<F: Payload>(&mut self, request: &Pending) -> Result<Vec<F>> {
        let wants_ack = request.flags.expects_ack();
        let mut replies = Vec::new();

        loop {
            let datagram = self.transport.recv()?;
            let mut done = false;

            for message in decode_datagram::<GenlMessage<F>>(&datagram)? {
                validate(&message.header, request)?;
                let flags = HeaderFlags::from_bits_retain(message.header.flags);
                trace!(
                    kind = message.header.message_type,
                    ?flags,
                    len = message.header.length,
                    "received netlink message"
                );

                match message.payload {
                    NetlinkPayload::Noop => {}
                    NetlinkPayload::Error(error) => match error.code {
                        None => done = true,
                        Some(code) => {
                            return Err(GenlError::Kernel {
                                errno: code.get().wrapping_neg(),
                            })
                        }
                    },
                    NetlinkPayload::Done(end) => {
                        // A dump may report a failure in the DONE payload.
                        if end.code < 0 {
                            return Err(GenlError::Kernel {
                                errno: end.code.wrapping_neg(),
                            });
                        }
                        if !wants_ack {
                            done = true;
                        }
                    }
                    NetlinkPayload::Overrun(_) => return Err(GenlError::Overrun),
                    NetlinkPayload::InnerMessage(genl) => {
                        if message.header.message_type != request.family {
                            return Err(GenlError::UnexpectedReply {
                                expected: request.family,
                                got: message.header.message_type,
                            });
                        }
                        replies.push(genl.payload);
                        if !wants_ack && !flags.contains(HeaderFlags::MULTI) {
                            done = true;
                        }
                    }
                    _ => {
                        return Err(GenlError::UnexpectedReply {
                            expected: request.family,
                            got: message.header.message_type,
                        })
                    }
                }
            }

            if done {
                break;
            }
        }

        debug!(
            sequence = request.sequence,
            replies = replies.len(),
            "generic netlink exchange complete"
        );
        Ok(replies)
    }
}

fn validate(reply: &NetlinkHeader, request: &Pending) -> Result<()> {
    if reply.sequence_number != request.sequence {
        return Err(GenlError::SequenceMismatch {
            expected: request.sequence,
            got: reply.sequence_number,
        });
    }
    if reply.port_number != request.port {
        return Err(GenlError::PortMismatch {
            expected: request.port,
            got: reply.port_number,
        });
    }
    Ok(())
}

impl<T> std::fmt::Debug for Conn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("sequence", &self.sequence)
            .finish()
    }
}
