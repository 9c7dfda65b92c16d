//! A blocking accept loop over a Unix or TCP listener (§4.6, §6). Grounded
//! on the reference crate's `do_listen`/`VarlinkListener`
//! (`examples/varlink-rust/varlink/src/server.rs`) for the accept-loop
//! shape; the thread pool it drives requests through is left out — which
//! concurrency model to run connections under is the embedding
//! application's decision, not this crate's (§1).

use varlink_core::{Address, Dispatch, Framer, Result};

use crate::address_io::{self, Socket, SocketListener};

/// Listens on `address` (§6) and hands out accepted connections.
pub struct Listener {
    address: String,
    inner: SocketListener,
}

impl Listener {
    pub fn bind(address: &str) -> Result<Self> {
        let parsed = Address::parse(address)?;
        let inner = address_io::bind(&parsed)?;
        Ok(Listener { address: address.to_string(), inner })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Accepts one connection, blocking until a client connects.
    pub fn accept(&self) -> Result<Socket> {
        self.inner.accept()
    }

    /// Accepts one connection and serves every request on it, in order,
    /// until the client disconnects.
    pub fn serve_one<D: Dispatch>(&self, registry: &D) -> Result<()> {
        let socket = self.accept()?;
        serve(socket, registry)
    }
}

/// Drives one already-open connection's request/reply loop against
/// `registry` until the peer disconnects cleanly.
pub fn serve<D: Dispatch>(socket: Socket, registry: &D) -> Result<()> {
    let mut framer = Framer::new(socket);
    loop {
        let message = match framer.read_message()? {
            Some(message) => message,
            None => return Ok(()),
        };
        let raw = serde_json::to_vec(&message)?;
        for reply in varlink_core::dispatch(registry, message, &raw) {
            framer.write_message(&serde_json::to_value(&reply)?)?;
        }
    }
}
