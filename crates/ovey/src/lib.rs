//! Control-plane client for Ovey virtual RDMA devices.
//!
//! The Ovey kernel module layers virtual RDMA devices on top of physical
//! ones and is managed over a generic netlink family.
//!
//! # Crate Structure
//!
//! - [`transport`]: `NETLINK_GENERIC` datagram channel
//! - [`netlink`]: netlink message and attribute codec
//! - [`genl`]: generic netlink connection and controller queries
//! - [`ocp`]: the Ovey Control Protocol (links, requests, device operations)

/// Re-export transport types.
pub mod transport {
    pub use ovey_transport::*;
}

/// Re-export codec types.
pub mod netlink {
    pub use ovey_netlink::*;
}

/// Re-export generic netlink types.
pub mod genl {
    pub use ovey_genl::*;
}

/// Re-export protocol types.
pub mod ocp {
    pub use ovey_ocp::*;
}
