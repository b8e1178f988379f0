//! Generic netlink on top of a datagram channel.
//!
//! [`Conn`] sends one request at a time and gathers the complete reply set
//! for it, translating kernel error messages into [`GenlError`]. The
//! [`controller`] module resolves family names to runtime ids through the
//! kernel's built-in `nlctrl` family.

pub mod conn;
pub mod controller;
pub mod error;

pub use conn::{Conn, Pending};
pub use controller::{parse_family, Family, MulticastGroup, Operation, CTRL_NAME, GENL_ID_CTRL};
pub use error::{GenlError, Result};
