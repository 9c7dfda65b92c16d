//! The server-side dispatcher (§4.6): interface/method resolution,
//! parameter validation, and the generator-style reply protocol. Grounded
//! on the reference binding's `Service._handle`, which resolves
//! `interface.method` on the last dot, validates parameters against the
//! method's declared input fields, calls the handler with special
//! `_more`/`_oneway`/`_upgrade`/`_raw`/`_message` context, and turns a
//! generator of output dicts into a stream of `{parameters, continues}`
//! reply frames.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::idl::Interface;
use crate::log::error;
use crate::validator;
use crate::wire::{Reply, Request};

/// Everything a handler is told about the call it is answering, mirroring
/// the reference binding's special keyword arguments.
#[derive(Debug, Clone)]
pub struct CallContext {
    interface: String,
    method: String,
    more: bool,
    oneway: bool,
    upgrade: bool,
    raw: Vec<u8>,
    message: Value,
}

impl CallContext {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// `more: true` was set on the request: the handler may yield more
    /// than one reply.
    pub fn more(&self) -> bool {
        self.more
    }

    /// `oneway: true` was set: whatever the handler yields is run for its
    /// side effects only, no reply is written back.
    pub fn oneway(&self) -> bool {
        self.oneway
    }

    pub fn upgrade(&self) -> bool {
        self.upgrade
    }

    /// The exact bytes of the request frame, NUL excluded.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The decoded request frame before parameter validation.
    pub fn message(&self) -> &Value {
        &self.message
    }
}

/// One reply a handler yields. `continues: true` means another
/// [`HandlerReply`] follows; the dispatcher rejects `continues: true` on a
/// call that did not set `more` (§4.6).
#[derive(Debug, Clone)]
pub struct HandlerReply {
    pub parameters: Value,
    pub continues: bool,
}

impl HandlerReply {
    /// The final (or only) reply.
    pub fn done(parameters: Value) -> Self {
        HandlerReply { parameters, continues: false }
    }

    /// One reply in a `more`-mode stream, with further replies to come.
    pub fn more(parameters: Value) -> Self {
        HandlerReply { parameters, continues: true }
    }
}

/// Builds the single-reply iterator most handlers need.
pub fn single(result: Result<Value>) -> Box<dyn Iterator<Item = Result<HandlerReply>>> {
    Box::new(std::iter::once(result.map(HandlerReply::done)))
}

/// Implements one interface's methods. Registered against a `Service`
/// under the interface name it answers for.
pub trait Handler: Send + Sync {
    /// Handles one call with already-validated input `parameters`,
    /// returning a stream of replies. Most methods return exactly one
    /// item; use [`single`] to build that stream from a plain `Result`.
    fn handle(
        &self,
        ctx: &CallContext,
        parameters: Value,
    ) -> Box<dyn Iterator<Item = Result<HandlerReply>>>;
}

/// Resolves an interface name to its parsed description and handler.
/// Implemented by the call registry (`Service`); kept as a trait so the
/// dispatch loop doesn't need to know how the registry stores entries.
pub trait Dispatch {
    fn resolve(&self, interface: &str) -> Option<(&Interface, &dyn Handler)>;
}

fn to_reply(e: Error) -> Reply {
    if let Error::InternalError(msg) = &e {
        error!(error = %msg, "handler failed, connection stays usable");
    }
    let name = e.wire_name().unwrap_or("org.varlink.service.InternalError");
    Reply::error(name, e.wire_parameters())
}

/// Dispatches one decoded request frame, returning the stream of reply
/// frames to write back in order. For a `oneway` request the handler's
/// stream is still fully driven for its side effects, but the returned
/// iterator yields nothing.
pub fn dispatch<'a, D: Dispatch>(
    registry: &'a D,
    message: Value,
    raw: &[u8],
) -> Box<dyn Iterator<Item = Reply> + 'a> {
    match dispatch_inner(registry, message, raw) {
        Ok(replies) => replies,
        Err(e) => Box::new(std::iter::once(to_reply(e))),
    }
}

fn dispatch_inner<'a, D: Dispatch>(
    registry: &'a D,
    message: Value,
    raw: &[u8],
) -> Result<Box<dyn Iterator<Item = Reply> + 'a>> {
    let request: Request = serde_json::from_value(message.clone())?;
    let (iface_name, method_name) = request
        .split_method()
        .ok_or_else(|| Error::InterfaceNotFound(request.method.clone()))?;
    let iface_name = iface_name.to_string();
    let method_name = method_name.to_string();

    let (interface, handler) = registry
        .resolve(&iface_name)
        .ok_or_else(|| Error::InterfaceNotFound(iface_name.clone()))?;

    let (input_fields, output_fields) = interface
        .method(&method_name)
        .ok_or_else(|| Error::MethodNotFound(method_name.clone()))?;

    let more = request.more.unwrap_or(false);
    let oneway = request.oneway.unwrap_or(false);
    let upgrade = request.upgrade.unwrap_or(false);

    if upgrade {
        return Err(Error::MethodNotImplemented(format!("{iface_name}.{method_name}")));
    }

    let params = request.parameters.unwrap_or(Value::Object(Default::default()));
    let validated_in = validator::validate(Some(interface), input_fields, &params)?;

    let ctx = CallContext {
        interface: iface_name.clone(),
        method: method_name.clone(),
        more,
        oneway,
        upgrade,
        raw: raw.to_vec(),
        message,
    };

    let stream = handler.handle(&ctx, validated_in);
    let replies = stream.scan(false, move |done, item| {
        if *done {
            return None;
        }
        let reply = match item {
            Err(e) => {
                *done = true;
                to_reply(e)
            }
            Ok(handler_reply) if handler_reply.continues && !more => {
                *done = true;
                to_reply(Error::Protocol(format!(
                    "{iface_name}.{method_name} yielded continues without the caller requesting more"
                )))
            }
            Ok(handler_reply) => {
                if !handler_reply.continues {
                    *done = true;
                }
                match validator::validate(Some(interface), output_fields, &handler_reply.parameters) {
                    Ok(v) => Reply::success(v, handler_reply.continues),
                    Err(e) => {
                        *done = true;
                        to_reply(e)
                    }
                }
            }
        };
        Some(reply)
    });

    if oneway {
        replies.for_each(drop);
        Ok(Box::new(std::iter::empty()))
    } else {
        Ok(Box::new(replies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl;
    use serde_json::json;
    use std::collections::HashMap;

    const PING: &str = "\
interface org.example.ping

method Ping(ping: string) -> (pong: string)
";

    struct PingHandler;

    impl Handler for PingHandler {
        fn handle(
            &self,
            _ctx: &CallContext,
            parameters: Value,
        ) -> Box<dyn Iterator<Item = Result<HandlerReply>>> {
            let ping = parameters["ping"].as_str().unwrap_or_default().to_string();
            single(Ok(json!({ "pong": ping })))
        }
    }

    struct Registry(HashMap<String, (Interface, Box<dyn Handler>)>);

    impl Dispatch for Registry {
        fn resolve(&self, interface: &str) -> Option<(&Interface, &dyn Handler)> {
            self.0.get(interface).map(|(i, h)| (i, h.as_ref()))
        }
    }

    fn registry() -> Registry {
        let iface = idl::parse(PING).unwrap();
        let mut map = HashMap::new();
        map.insert(iface.name().to_string(), (iface, Box::new(PingHandler) as Box<dyn Handler>));
        Registry(map)
    }

    #[test]
    fn dispatches_a_single_reply() {
        let reg = registry();
        let msg = json!({ "method": "org.example.ping.Ping", "parameters": { "ping": "hi" } });
        let replies: Vec<Reply> = dispatch(&reg, msg, b"").collect();
        assert_eq!(replies.len(), 1);
        assert!(!replies[0].is_error());
        assert_eq!(replies[0].parameters, Some(json!({ "pong": "hi" })));
    }

    #[test]
    fn unknown_interface_is_an_error_reply() {
        let reg = registry();
        let msg = json!({ "method": "org.example.nope.Foo", "parameters": {} });
        let replies: Vec<Reply> = dispatch(&reg, msg, b"").collect();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].error.as_deref(), Some("org.varlink.service.InterfaceNotFound"));
    }

    #[test]
    fn unknown_parameter_is_an_invalid_parameter_error() {
        let reg = registry();
        let msg = json!({ "method": "org.example.ping.Ping", "parameters": { "ping": "hi", "extra": 1 } });
        let replies: Vec<Reply> = dispatch(&reg, msg, b"").collect();
        assert_eq!(replies[0].error.as_deref(), Some("org.varlink.service.InvalidParameter"));
    }

    #[test]
    fn oneway_call_yields_no_replies() {
        let reg = registry();
        let msg = json!({ "method": "org.example.ping.Ping", "parameters": { "ping": "hi" }, "oneway": true });
        let replies: Vec<Reply> = dispatch(&reg, msg, b"").collect();
        assert!(replies.is_empty());
    }
}
