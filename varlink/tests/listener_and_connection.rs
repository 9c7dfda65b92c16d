//! Drives a real `Listener`/`Connection` pair over a Unix socket end to
//! end (§8), the one integration surface `varlink-core`'s own tests
//! can't exercise since it has no transport of its own.

use std::thread;

use serde_json::json;
use varlink::idl::{self, Interface};
use varlink::{single, CallContext, Handler, HandlerReply, Listener, Result, Service,
    ServiceInfo};

const PING_IFACE: &str = "\
interface org.example.ping

method Ping(ping: string) -> (pong: string)
";

struct PingHandler;

impl Handler for PingHandler {
    fn handle(
        &self,
        _ctx: &CallContext,
        parameters: serde_json::Value,
    ) -> Box<dyn Iterator<Item = Result<HandlerReply>>> {
        let ping = parameters["ping"].as_str().unwrap_or_default().to_string();
        single(Ok(json!({ "pong": ping })))
    }
}

fn build_service() -> Service {
    let mut service = Service::new(ServiceInfo {
        vendor: "Test".into(),
        product: "varlink-tests".into(),
        version: "0".into(),
        url: "".into(),
    });
    let iface: Interface = idl::parse(PING_IFACE).unwrap();
    service.register(iface, Box::new(PingHandler)).unwrap();
    service
}

#[test]
fn ping_round_trips_over_a_real_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ping.sock");
    let address = format!("unix:{}", path.display());

    let listener = Listener::bind(&address).unwrap();
    let service = build_service();
    let server = thread::spawn(move || {
        listener.serve_one(&service).unwrap();
    });

    // `Listener::bind` above already created and started listening on
    // the socket, so connecting here only races the server's `accept`
    // call, which the OS backlog queues for us.
    let mut conn = varlink::Connection::connect(&address).unwrap();

    let reply = conn.call("org.example.ping.Ping", json!({ "ping": "hi" })).unwrap();
    assert_eq!(reply, json!({ "pong": "hi" }));

    // The server's accept loop only returns once it reads EOF, which
    // happens when the client socket closes; drop it before joining.
    drop(conn);
    server.join().unwrap();
}

#[test]
fn built_in_service_interface_answers_get_info() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("info.sock");
    let address = format!("unix:{}", path.display());

    let listener = Listener::bind(&address).unwrap();
    let service = build_service();
    let server = thread::spawn(move || {
        listener.serve_one(&service).unwrap();
    });

    let mut conn = varlink::Connection::connect(&address).unwrap();

    let reply = conn.call("org.varlink.service.GetInfo", json!({})).unwrap();
    assert_eq!(reply["vendor"], "Test");
    assert_eq!(reply["interfaces"].as_array().unwrap().len(), 2);

    drop(conn);
    server.join().unwrap();
}
