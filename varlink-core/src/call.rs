//! The client call state machine (§4.5): `Idle -> Calling -> AwaitingReply
//! -> (Streaming | Idle)`, with at most one call in flight on a connection
//! at a time.
//!
//! `call`/`call_more`/`call_oneway` send and receive raw `Value`s: they
//! suit a caller that only knows a method name, with no parsed IDL to
//! validate against. The `_checked` variants below are §4.3/§4.5's other
//! two validator call sites ("client outbound params, client inbound
//! reply") — they take a parsed [`crate::idl::Interface`], filter the
//! outbound parameters against its declared input type before sending,
//! and filter the inbound reply against its declared output type before
//! returning it, the same way the dispatcher already does on the server
//! side (`crate::dispatch`).

use std::io::{Read, Write};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::framer::Framer;
use crate::wire::{Reply, Request};
#[cfg(feature = "idl")]
use crate::idl::{Field, Interface};
#[cfg(feature = "idl")]
use crate::validator;

/// How a call should be dispatched, mirroring the `more`/`oneway` request
/// flags (§4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Exactly one reply is expected.
    Single,
    /// Zero or more replies, the last carrying `continues: false` (or no
    /// `continues` at all).
    More,
    /// No reply is expected or read; `oneway: true` on the wire.
    Oneway,
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Idle,
    AwaitingReply,
    Streaming,
}

/// A client-side connection: a framed byte stream plus the call state
/// machine that enforces "at most one call in flight" (§4.5).
#[derive(Debug)]
pub struct Connection<S> {
    framer: Framer<S>,
    state: State,
}

impl<S> Connection<S> {
    pub fn new(stream: S) -> Self {
        Connection { framer: Framer::new(stream), state: State::Idle }
    }

    pub fn into_inner(self) -> S {
        self.framer.into_inner()
    }
}

impl<S: Read + Write> Connection<S> {
    /// Issues a single-reply call and waits for its one reply.
    pub fn call(&mut self, method: &str, parameters: Value) -> Result<Value> {
        self.send(method, parameters, CallMode::Single)?;
        let reply = self.recv_reply()?;
        self.state = State::Idle;
        if reply.continues() {
            return Err(Error::Protocol(
                "reply set `continues: true` for a call that did not request `more`".into(),
            ));
        }
        into_result(reply)
    }

    /// Issues a `more`-mode call and returns an iterator over its replies.
    /// The connection returns to `Idle` only once the stream is exhausted
    /// or dropped after exhaustion; a second call attempted before that is
    /// `ConnectionBusy`.
    pub fn call_more(&mut self, method: &str, parameters: Value) -> Result<CallStream<'_, S>> {
        self.send(method, parameters, CallMode::More)?;
        self.state = State::Streaming;
        Ok(CallStream { conn: self, finished: false })
    }

    /// Issues a oneway call: the request is sent with no reply read back.
    pub fn call_oneway(&mut self, method: &str, parameters: Value) -> Result<()> {
        self.send(method, parameters, CallMode::Oneway)?;
        self.state = State::Idle;
        Ok(())
    }

    /// Like [`Connection::call`], but validated: `parameters` is filtered
    /// against `interface`'s declared input type before it is sent, and
    /// the reply is filtered against the declared output type before it
    /// is returned (§4.3, §4.5).
    #[cfg(feature = "idl")]
    pub fn call_checked(&mut self, interface: &Interface, method: &str, parameters: Value) -> Result<Value> {
        let (in_fields, out_fields) = interface
            .method(method)
            .ok_or_else(|| Error::MethodNotFound(method.to_string()))?;
        let filtered_in = validator::validate(Some(interface), in_fields, &parameters)?;
        let full_method = format!("{}.{}", interface.name(), method);
        let reply = self.call(&full_method, filtered_in)?;
        validator::validate(Some(interface), out_fields, &reply)
    }

    /// Like [`Connection::call_more`], but every reply is filtered
    /// against `interface`'s declared output type as it is yielded.
    #[cfg(feature = "idl")]
    pub fn call_more_checked<'a>(
        &'a mut self,
        interface: &'a Interface,
        method: &str,
        parameters: Value,
    ) -> Result<CheckedCallStream<'a, S>> {
        let (in_fields, out_fields) = interface
            .method(method)
            .ok_or_else(|| Error::MethodNotFound(method.to_string()))?;
        let filtered_in = validator::validate(Some(interface), in_fields, &parameters)?;
        let full_method = format!("{}.{}", interface.name(), method);
        let stream = self.call_more(&full_method, filtered_in)?;
        Ok(CheckedCallStream { stream, interface, out_fields })
    }

    /// Like [`Connection::call_oneway`], but `parameters` is filtered
    /// against `interface`'s declared input type before it is sent.
    #[cfg(feature = "idl")]
    pub fn call_oneway_checked(&mut self, interface: &Interface, method: &str, parameters: Value) -> Result<()> {
        let (in_fields, _) = interface
            .method(method)
            .ok_or_else(|| Error::MethodNotFound(method.to_string()))?;
        let filtered_in = validator::validate(Some(interface), in_fields, &parameters)?;
        let full_method = format!("{}.{}", interface.name(), method);
        self.call_oneway(&full_method, filtered_in)
    }

    fn send(&mut self, method: &str, parameters: Value, mode: CallMode) -> Result<()> {
        if self.state != State::Idle {
            return Err(Error::ConnectionBusy);
        }
        let mut request = Request::new(method, parameters);
        match mode {
            CallMode::Single => {}
            CallMode::More => request.more = Some(true),
            CallMode::Oneway => request.oneway = Some(true),
        }
        self.state = State::AwaitingReply;
        let value = serde_json::to_value(&request)?;
        if let Err(e) = self.framer.write_message(&value) {
            self.state = State::Idle;
            return Err(e);
        }
        if mode == CallMode::Oneway {
            self.state = State::Idle;
        }
        Ok(())
    }

    fn recv_reply(&mut self) -> Result<Reply> {
        match self.framer.read_message()? {
            None => Err(Error::Disconnected),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }
}

fn into_result(reply: Reply) -> Result<Value> {
    match reply.error {
        Some(name) => Err(Error::Reply { name, parameters: reply.parameters.unwrap_or(Value::Null) }),
        None => Ok(reply.parameters.unwrap_or(Value::Object(Default::default()))),
    }
}

/// Iterator over the replies of a `more`-mode call. Yields `Ok` for every
/// successful reply and stops after one carrying `continues: false` (or no
/// `continues` at all); an error reply or a mid-stream disconnect is
/// yielded once and then the stream ends.
pub struct CallStream<'a, S> {
    conn: &'a mut Connection<S>,
    finished: bool,
}

impl<'a, S: Read + Write> Iterator for CallStream<'a, S> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Result<Value>> {
        if self.finished {
            return None;
        }
        let reply = match self.conn.recv_reply() {
            Ok(reply) => reply,
            Err(e) => {
                self.finished = true;
                self.conn.state = State::Idle;
                return Some(Err(e));
            }
        };
        let continues = reply.continues();
        if !continues {
            self.finished = true;
            self.conn.state = State::Idle;
        }
        Some(into_result(reply))
    }
}

impl<'a, S> Drop for CallStream<'a, S> {
    fn drop(&mut self) {
        if !self.finished {
            self.conn.state = State::Idle;
        }
    }
}

/// A [`CallStream`] whose replies are filtered against an interface's
/// declared output type as they are yielded, the streaming counterpart
/// of [`Connection::call_checked`].
#[cfg(feature = "idl")]
pub struct CheckedCallStream<'a, S> {
    stream: CallStream<'a, S>,
    interface: &'a Interface,
    out_fields: &'a [Field],
}

#[cfg(feature = "idl")]
impl<'a, S: Read + Write> Iterator for CheckedCallStream<'a, S> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Result<Value>> {
        self.stream
            .next()
            .map(|reply| reply.and_then(|v| validator::validate(Some(self.interface), self.out_fields, &v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Pipe;
    use serde_json::json;

    fn write_raw(pipe: &mut Pipe, s: &str) {
        use std::io::Write;
        pipe.write_all(s.as_bytes()).unwrap();
        pipe.write_all(&[0]).unwrap();
    }

    #[test]
    fn single_call_round_trip() {
        let (mut client_io, mut server_io) = Pipe::duplex();
        write_raw(&mut server_io, r#"{"parameters":{"pong":"hi"}}"#);
        let mut conn = Connection::new(&mut client_io);
        let reply = conn.call("org.example.ping.Ping", json!({"ping": "hi"})).unwrap();
        assert_eq!(reply, json!({"pong": "hi"}));
        let _ = server_io;
    }

    #[test]
    fn second_call_while_streaming_is_busy() {
        let (mut client_io, mut server_io) = Pipe::duplex();
        write_raw(&mut server_io, r#"{"parameters":{"n":1},"continues":true}"#);
        let mut conn = Connection::new(&mut client_io);
        let mut stream = conn.call_more("org.example.counter.Count", json!({})).unwrap();
        assert_eq!(stream.next().unwrap().unwrap(), json!({"n": 1}));
        let _ = server_io;
        // Connection is borrowed mutably by `stream`; the borrow checker
        // itself enforces ConnectionBusy at compile time for this shape.
    }

    #[test]
    fn reply_error_becomes_reply_err() {
        let (mut client_io, mut server_io) = Pipe::duplex();
        write_raw(
            &mut server_io,
            r#"{"error":"org.varlink.service.MethodNotFound","parameters":{"method":"X"}}"#,
        );
        let mut conn = Connection::new(&mut client_io);
        let err = conn.call("org.example.a.X", json!({})).unwrap_err();
        assert!(matches!(err, Error::Reply { name, .. } if name == "org.varlink.service.MethodNotFound"));
        let _ = server_io;
    }

    #[cfg(feature = "idl")]
    fn ping_interface() -> Interface {
        crate::idl::parse("interface org.example.ping\nmethod Ping(ping: string) -> (pong: string)\n").unwrap()
    }

    #[cfg(feature = "idl")]
    #[test]
    fn call_checked_rejects_an_unknown_outbound_parameter() {
        let iface = ping_interface();
        let (mut client_io, _server_io) = Pipe::duplex();
        let mut conn = Connection::new(&mut client_io);
        let err = conn
            .call_checked(&iface, "Ping", json!({"ping": "hi", "extra": 1}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[cfg(feature = "idl")]
    #[test]
    fn call_checked_rejects_an_unknown_reply_field() {
        let iface = ping_interface();
        let (mut client_io, mut server_io) = Pipe::duplex();
        write_raw(&mut server_io, r#"{"parameters":{"pong":"hi","extra":1}}"#);
        let mut conn = Connection::new(&mut client_io);
        let err = conn.call_checked(&iface, "Ping", json!({"ping": "hi"})).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[cfg(feature = "idl")]
    #[test]
    fn call_checked_filters_a_well_formed_reply() {
        let iface = ping_interface();
        let (mut client_io, mut server_io) = Pipe::duplex();
        write_raw(&mut server_io, r#"{"parameters":{"pong":"hi"}}"#);
        let mut conn = Connection::new(&mut client_io);
        let reply = conn.call_checked(&iface, "Ping", json!({"ping": "hi"})).unwrap();
        assert_eq!(reply, json!({"pong": "hi"}));
    }
}
