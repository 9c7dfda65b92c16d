//! Core Varlink protocol implementation: IDL scanning/parsing, value
//! validation, NUL-delimited framing, the client call state machine and
//! the server dispatcher.
//!
//! This crate is transport-agnostic: it works over anything implementing
//! [`std::io::Read`] and [`std::io::Write`]. Opening sockets, spawning
//! `exec:` bridges and running accept loops are the embedding crate's job
//! (see the `varlink` crate in this workspace).

#![deny(missing_debug_implementations, rust_2018_idioms)]
#![warn(unreachable_pub)]

#[macro_use]
#[doc(hidden)]
pub mod log;

mod address;
mod call;
#[cfg(feature = "idl")]
mod dispatch;
mod error;
mod framer;
#[cfg(feature = "idl")]
pub mod idl;
#[cfg(feature = "idl")]
mod service;
#[cfg(feature = "idl")]
mod validator;
mod wire;

pub use address::Address;
pub use call::{CallMode, CallStream, Connection};
#[cfg(feature = "idl")]
pub use call::CheckedCallStream;
#[cfg(feature = "idl")]
pub use dispatch::{dispatch, single, CallContext, Dispatch, Handler, HandlerReply};
pub use error::{Error, Result};
pub use framer::Framer;
#[cfg(feature = "idl")]
pub use service::{Service, ServiceInfo};
#[cfg(feature = "idl")]
pub use validator::validate;
pub use wire::{Reply, Request};

#[doc(hidden)]
pub mod test_utils;
