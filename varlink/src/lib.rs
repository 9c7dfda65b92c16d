//! Blocking Unix/TCP transport for the varlink protocol (§6), built on top
//! of the transport-agnostic `varlink-core` crate. This crate supplies the
//! one thing `varlink-core` deliberately does not: opening and accepting
//! `std::io::{Read, Write}` sockets for a parsed address, plus the
//! connection/listener wrappers that drive `varlink-core`'s call state
//! machine and dispatcher over them.
//!
//! Grounded on the reference crate's own split between a generic protocol
//! layer and a concrete `Connection`/`Listener` pair
//! (`examples/varlink-rust/varlink/src/lib.rs`).

#![deny(missing_debug_implementations, rust_2018_idioms)]
#![warn(unreachable_pub)]

mod address_io;
mod connection;
mod listener;

pub use address_io::{Socket, SocketListener};
pub use connection::Connection;
pub use listener::{serve, Listener};

pub use varlink_core::{
    dispatch, single, Address, CallContext, CallMode, CallStream, Dispatch, Error, Handler,
    HandlerReply, Reply, Request, Result, Service, ServiceInfo,
};

#[cfg(feature = "idl")]
pub use varlink_core::idl;
#[cfg(feature = "idl")]
pub use varlink_core::validate;
#[cfg(feature = "idl")]
pub use varlink_core::CheckedCallStream;
