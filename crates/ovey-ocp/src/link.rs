use bytes::Bytes;
use ovey_genl::{Conn, Family, GenlError, CTRL_NAME};
use ovey_transport::{NetlinkTransport, TransportError};
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::DialError;
use crate::properties::OveyOperation;
use crate::request::Request;

/// Opens channels to the generic netlink multiplexer.
///
/// Implemented by [`SystemDialer`] for the real kernel and by any
/// `Fn() -> Result<T, TransportError>` closure, which is how tests plug in a
/// simulated kernel.
pub trait Dialer {
    type Transport: NetlinkTransport;

    fn open(&self) -> Result<Self::Transport, TransportError>;
}

impl<F, T> Dialer for F
where
    F: Fn() -> Result<T, TransportError>,
    T: NetlinkTransport,
{
    type Transport = T;

    fn open(&self) -> Result<T, TransportError> {
        self()
    }
}

/// Dials the running kernel over a `NETLINK_GENERIC` socket.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDialer;

#[cfg(target_os = "linux")]
impl Dialer for SystemDialer {
    type Transport = ovey_transport::NetlinkSocket;

    fn open(&self) -> Result<Self::Transport, TransportError> {
        ovey_transport::NetlinkSocket::connect()
    }
}

/// An open channel bound to a resolved family.
///
/// A `Link` only exists fully initialized. Dropping it, or calling
/// [`close`](Self::close), releases the channel.
pub struct Link<T> {
    conn: Conn<T>,
    family: Family,
}

impl<T: NetlinkTransport> Link<T> {
    /// Open a channel and resolve `config.family_name` on it.
    pub fn dial_with<D>(dialer: &D, config: &LinkConfig) -> Result<Self, DialError>
    where
        D: Dialer<Transport = T>,
    {
        let mut conn = open_conn(dialer, config)?;
        let family = resolve(&mut conn, &config.family_name)?;
        Ok(Self::from_parts(conn, family))
    }

    pub(crate) fn from_parts(conn: Conn<T>, family: Family) -> Self {
        debug!(
            family = %family.name,
            id = family.id,
            version = family.version,
            port = conn.local_port(),
            "link established"
        );
        Self { conn, family }
    }

    /// The family this link is bound to.
    pub fn family(&self) -> &Family {
        &self.family
    }

    /// Port id of the underlying channel.
    pub fn local_port(&self) -> u32 {
        self.conn.local_port()
    }

    /// Build a request for `operation` with an encoded attribute payload.
    ///
    /// No I/O happens until [`Request::execute`].
    pub fn new_request(&mut self, operation: OveyOperation, payload: Bytes) -> Request<'_, T> {
        Request::new(self, operation, payload)
    }

    /// List every family registered with the controller.
    pub fn list_families(&mut self) -> Result<Vec<Family>, GenlError> {
        self.conn.list_families()
    }

    /// Release the channel.
    pub fn close(self) {
        debug!(port = self.conn.local_port(), "closing link");
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Conn<T> {
        &mut self.conn
    }
}

#[cfg(target_os = "linux")]
impl Link<ovey_transport::NetlinkSocket> {
    /// Dial the running kernel.
    pub fn dial(config: &LinkConfig) -> Result<Self, DialError> {
        Self::dial_with(&SystemDialer, config)
    }
}

impl<T> std::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("family", &self.family.name)
            .field("id", &self.family.id)
            .field("version", &self.family.version)
            .finish()
    }
}

/// Open a channel and apply the configured receive timeout.
pub(crate) fn open_conn<D: Dialer>(
    dialer: &D,
    config: &LinkConfig,
) -> Result<Conn<D::Transport>, DialError> {
    let mut transport = dialer.open().map_err(DialError::TransportUnavailable)?;
    transport
        .set_recv_timeout(config.recv_timeout)
        .map_err(DialError::TransportUnavailable)?;
    Ok(Conn::new(transport))
}

/// Resolve `name`, mapping absence and other failures to their dial errors.
pub(crate) fn resolve<T: NetlinkTransport>(
    conn: &mut Conn<T>,
    name: &str,
) -> Result<Family, DialError> {
    match conn.get_family(name) {
        Ok(family) => Ok(family),
        Err(GenlError::FamilyNotFound(name)) => Err(DialError::FamilyNotFound(name)),
        Err(source) => Err(DialError::FamilyQueryFailed {
            name: name.to_string(),
            source,
        }),
    }
}

/// Enumerate registered families. A failure is a query failure on the controller.
pub(crate) fn enumerate<T: NetlinkTransport>(conn: &mut Conn<T>) -> Result<Vec<Family>, DialError> {
    conn.list_families()
        .map_err(|source| DialError::FamilyQueryFailed {
            name: CTRL_NAME.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use ovey_genl_mock::{CommandReply, MockFamily, MockKernel};

    use super::*;
    use crate::properties::FAMILY_NAME;

    fn kernel() -> MockKernel {
        MockKernel::new().with_family(MockFamily::new(0x1d, FAMILY_NAME, 1, |_| {
            CommandReply::Messages(Vec::new())
        }))
    }

    #[test]
    fn dial_resolves_family() {
        let kernel = kernel();
        let dialer = || kernel.connect();

        let link = Link::dial_with(&dialer, &LinkConfig::default()).unwrap();
        assert_eq!(link.family().name, FAMILY_NAME);
        assert_eq!(link.family().id, 0x1d);
        assert_eq!(link.family().version, 1);
        assert_eq!(kernel.open_channels(), 1);

        link.close();
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn dial_absent_family_releases_channel() {
        let kernel = MockKernel::new();
        let dialer = || kernel.connect();

        let err = Link::dial_with(&dialer, &LinkConfig::default()).unwrap_err();
        assert!(matches!(err, DialError::FamilyNotFound(ref name) if name == FAMILY_NAME));
        assert_eq!(kernel.opened_channels(), 1);
        assert_eq!(kernel.open_channels(), 0);
        assert_eq!(kernel.closed_channels(), 1);
    }

    #[test]
    fn controller_failure_is_query_failure() {
        let kernel = kernel().with_controller_error(libc::EPERM);
        let dialer = || kernel.connect();

        let err = Link::dial_with(&dialer, &LinkConfig::default()).unwrap_err();
        match err {
            DialError::FamilyQueryFailed { name, source } => {
                assert_eq!(name, FAMILY_NAME);
                assert_eq!(source.errno(), Some(libc::EPERM));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(kernel.open_channels(), 0);
    }

    #[test]
    fn unavailable_multiplexer() {
        let kernel = MockKernel::new().unavailable();
        let dialer = || kernel.connect();

        let err = Link::dial_with(&dialer, &LinkConfig::default()).unwrap_err();
        assert!(matches!(err, DialError::TransportUnavailable(_)));
        assert_eq!(kernel.opened_channels(), 0);
    }

    #[test]
    fn resolution_is_stable_across_dials() {
        let kernel = kernel();
        let dialer = || kernel.connect();
        let config = LinkConfig::default();

        let first = Link::dial_with(&dialer, &config).unwrap();
        let (id, version) = (first.family().id, first.family().version);
        first.close();

        let second = Link::dial_with(&dialer, &config).unwrap();
        assert_eq!(second.family().id, id);
        assert_eq!(second.family().version, version);
        assert_ne!(second.local_port(), 0);
    }

    #[test]
    fn custom_family_name() {
        let kernel = kernel().with_family(MockFamily::new(0x22, "ovey-test", 3, |_| {
            CommandReply::Messages(Vec::new())
        }));
        let dialer = || kernel.connect();
        let config = LinkConfig {
            family_name: "ovey-test".into(),
            ..LinkConfig::default()
        };

        let link = Link::dial_with(&dialer, &config).unwrap();
        assert_eq!(link.family().id, 0x22);
        assert_eq!(link.family().version, 3);
    }
}
