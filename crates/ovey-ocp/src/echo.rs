use ovey_genl::Family;
use serde::Serialize;

/// Outcome of the echo diagnostic.
///
/// An absent Ovey family is a normal outcome here, reported as
/// `ovey_family: None` rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EchoReport {
    /// Every family the controller lists.
    pub families: Vec<Family>,
    /// The resolved Ovey family, if the kernel module is loaded.
    pub ovey_family: Option<Family>,
    /// `Msg` attributes of the echo reply, in order.
    pub messages: Vec<String>,
}

impl EchoReport {
    pub fn module_loaded(&self) -> bool {
        self.ovey_family.is_some()
    }
}
