//! A blocking client connection over a Unix or TCP socket (§4.5, §6),
//! adapting `varlink_core::Connection`'s call state machine to an opened
//! transport. Grounded on the reference crate's `Connection::with_address`
//! (`examples/varlink-rust/varlink/src/lib.rs`), minus the `exec:`/bridge
//! activation constructors, which require spawning a subprocess — out of
//! scope here (§6).

use serde_json::Value;
use varlink_core::{Address, CallStream, Result};
#[cfg(feature = "idl")]
use varlink_core::{CheckedCallStream, idl::Interface};

use crate::address_io::{self, Socket};

/// A client connection to a varlink service, opened from an address
/// string.
#[derive(Debug)]
pub struct Connection {
    address: String,
    inner: varlink_core::Connection<Socket>,
}

impl Connection {
    /// Connects to `address`, e.g. `"unix:/run/org.example.ftl"`,
    /// `"unix:@org.example.ftl"` or `"tcp:127.0.0.1:12345"` (§6).
    pub fn connect(address: &str) -> Result<Self> {
        let parsed = Address::parse(address)?;
        let socket = address_io::connect(&parsed)?;
        Ok(Connection { address: address.to_string(), inner: varlink_core::Connection::new(socket) })
    }

    /// The address string this connection was opened from.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Issues a single-reply call, e.g. `conn.call("org.example.ping.Ping",
    /// json!({"ping": "hi"}))`.
    pub fn call(&mut self, method: &str, parameters: Value) -> Result<Value> {
        self.inner.call(method, parameters)
    }

    /// Issues a `more`-mode call and returns an iterator over its replies.
    pub fn call_more(&mut self, method: &str, parameters: Value) -> Result<CallStream<'_, Socket>> {
        self.inner.call_more(method, parameters)
    }

    /// Issues a oneway call: the request is sent with no reply read back.
    pub fn call_oneway(&mut self, method: &str, parameters: Value) -> Result<()> {
        self.inner.call_oneway(method, parameters)
    }

    /// Like [`Connection::call`], but validated against `interface`'s
    /// declared input/output types (§4.3, §4.5).
    #[cfg(feature = "idl")]
    pub fn call_checked(&mut self, interface: &Interface, method: &str, parameters: Value) -> Result<Value> {
        self.inner.call_checked(interface, method, parameters)
    }

    /// Like [`Connection::call_more`], but every reply is validated
    /// against `interface`'s declared output type as it is yielded.
    #[cfg(feature = "idl")]
    pub fn call_more_checked<'a>(
        &'a mut self,
        interface: &'a Interface,
        method: &str,
        parameters: Value,
    ) -> Result<CheckedCallStream<'a, Socket>> {
        self.inner.call_more_checked(interface, method, parameters)
    }

    /// Like [`Connection::call_oneway`], but `parameters` is validated
    /// against `interface`'s declared input type before it is sent.
    #[cfg(feature = "idl")]
    pub fn call_oneway_checked(&mut self, interface: &Interface, method: &str, parameters: Value) -> Result<()> {
        self.inner.call_oneway_checked(interface, method, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::net::UnixListener;
    use std::thread;

    #[test]
    fn connects_and_calls_over_a_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                stream.read_exact(&mut byte).unwrap();
                if byte[0] == 0 {
                    break;
                }
                buf.push(byte[0]);
            }
            let request: serde_json::Value = serde_json::from_slice(&buf).unwrap();
            assert_eq!(request["method"], "org.example.ping.Ping");
            use std::io::Write;
            stream.write_all(br#"{"parameters":{"pong":"hi"}}"#).unwrap();
            stream.write_all(&[0]).unwrap();
        });

        let mut conn = Connection::connect(&format!("unix:{}", path.display())).unwrap();
        let reply = conn
            .call("org.example.ping.Ping", serde_json::json!({"ping": "hi"}))
            .unwrap();
        assert_eq!(reply, serde_json::json!({"pong": "hi"}));
        server.join().unwrap();
    }
}
