use std::fmt;

use ovey_genl::GenlError;
use ovey_ocp::{ErrorKind, OcpError};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const MODULE_NOT_LOADED: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn ocp_error(context: &str, err: OcpError) -> CliError {
    if err.is_timeout() {
        return CliError::new(TIMEOUT, format!("{context}: {err}"));
    }
    if matches!(err.errno(), Some(libc::EPERM) | Some(libc::EACCES)) {
        return CliError::new(PERMISSION_DENIED, format!("{context}: {err}"));
    }

    match &err {
        // The kernel understood the command and refused it.
        OcpError::Send(GenlError::Kernel { .. }) => {
            return CliError::new(FAILURE, format!("{context}: {err}"))
        }
        OcpError::Send(GenlError::AlreadyExecuted) => {
            return CliError::new(INTERNAL, format!("{context}: {err}"))
        }
        _ => {}
    }

    match err.kind() {
        ErrorKind::FamilyNotFound => CliError::new(
            MODULE_NOT_LOADED,
            format!("{context}: {err} (is the ovey kernel module loaded?)"),
        ),
        ErrorKind::TransportUnavailable
        | ErrorKind::FamilyQueryFailed
        | ErrorKind::TransportError => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ErrorKind::EncodingError | ErrorKind::DecodingError => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}
