use core::fmt;
use std::io;

use serde_json::Value;

/// The result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can go wrong while parsing IDL, validating values,
/// framing messages or dispatching calls.
///
/// This is the crate's single error type: every fallible public function
/// returns it rather than a bespoke per-module error.
#[derive(Debug)]
pub enum Error {
    /// No interface by this name is registered.
    InterfaceNotFound(String),
    /// The interface exists but declares no method by this name.
    MethodNotFound(String),
    /// The method is declared but the handler does not implement it.
    MethodNotImplemented(String),
    /// A value failed validation against its expected type; carries the
    /// dotted field path (or parameter/field name) that failed.
    InvalidParameter(String),
    /// A declared `error` member was raised by a handler, or received from
    /// a peer. `name` is the fully-qualified `<iface>.<Name>`.
    Reply {
        /// Fully-qualified error name.
        name: String,
        /// The error's payload, already validated/normalized.
        parameters: Value,
    },
    /// The transport was closed, locally or by the peer, while a call or
    /// streaming reply was in progress. Never sent on the wire.
    Disconnected,
    /// A handler failed unexpectedly. The connection remains usable.
    InternalError(String),
    /// The peer violated the wire protocol (malformed JSON, oversize
    /// frame, `continues` on a call that didn't ask for `more`). Fatal:
    /// the connection must be closed.
    Protocol(String),
    /// A second call was attempted on a connection that already has one
    /// in flight.
    ConnectionBusy,
    /// A syntax error while scanning or parsing IDL text.
    Syntax(String),
    /// Underlying I/O failure.
    Io(io::Error),
    /// JSON encoding/decoding failure.
    Json(serde_json::Error),
    /// An address string didn't match any recognized form (§6).
    InvalidAddress(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InterfaceNotFound(name) => write!(f, "interface not found: {name}"),
            Error::MethodNotFound(name) => write!(f, "method not found: {name}"),
            Error::MethodNotImplemented(name) => write!(f, "method not implemented: {name}"),
            Error::InvalidParameter(path) => write!(f, "invalid parameter: {path}"),
            Error::Reply { name, .. } => write!(f, "error reply: {name}"),
            Error::Disconnected => write!(f, "connection disconnected"),
            Error::InternalError(msg) => write!(f, "internal error: {msg}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::ConnectionBusy => write!(f, "a call is already in progress on this connection"),
            Error::Syntax(msg) => write!(f, "syntax error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::InvalidAddress(addr) => write!(f, "invalid varlink address: {addr}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::UnexpectedEof => Error::Disconnected,
            _ => Error::Io(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl Error {
    /// The standard error's wire name, if this is one of the four
    /// `org.varlink.service` errors or a `Reply`.
    pub fn wire_name(&self) -> Option<&str> {
        match self {
            Error::InterfaceNotFound(_) => Some("org.varlink.service.InterfaceNotFound"),
            Error::MethodNotFound(_) => Some("org.varlink.service.MethodNotFound"),
            Error::MethodNotImplemented(_) => Some("org.varlink.service.MethodNotImplemented"),
            Error::InvalidParameter(_) => Some("org.varlink.service.InvalidParameter"),
            Error::InternalError(_) => Some("InternalError"),
            Error::Reply { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The wire parameters object for this error, if it has one.
    pub fn wire_parameters(&self) -> Value {
        match self {
            Error::InterfaceNotFound(name) => serde_json::json!({ "interface": name }),
            Error::MethodNotFound(name) => serde_json::json!({ "method": name }),
            Error::MethodNotImplemented(name) => serde_json::json!({ "method": name }),
            Error::InvalidParameter(path) => serde_json::json!({ "parameter": path }),
            Error::Reply { parameters, .. } => parameters.clone(),
            _ => Value::Object(Default::default()),
        }
    }
}
