//! Demo service exposing `org.example.more`'s `Ping` and `TestMore`, the
//! same shape as the reference project's `server-simple.py`.
//!
//! Run with: `cargo run --bin server -- unix:/tmp/org.example.more`

use serde_json::{json, Value};
use varlink::{single, CallContext, Handler, HandlerReply, Listener, Result, Service, ServiceInfo};
use varlink_core::idl;

const MORE_INTERFACE: &str = "\
interface org.example.more

method Ping(ping: string) -> (pong: string)

method TestMore(n: int) -> (state: object)

method StopServing() -> ()
";

struct MoreHandler;

impl Handler for MoreHandler {
    fn handle(
        &self,
        ctx: &CallContext,
        parameters: Value,
    ) -> Box<dyn Iterator<Item = Result<HandlerReply>>> {
        match ctx.method() {
            "Ping" => {
                let ping = parameters["ping"].as_str().unwrap_or_default().to_string();
                single(Ok(json!({ "pong": ping })))
            }
            "TestMore" => {
                let n = parameters["n"].as_u64().unwrap_or(0);
                if !ctx.more() {
                    return single(Err(varlink_core::Error::InvalidParameter("n".into())));
                }
                let mut replies = vec![HandlerReply::more(json!({ "state": { "start": true } }))];
                for i in 0..n {
                    replies.push(HandlerReply::more(
                        json!({ "state": { "progress": i * 100 / n.max(1) } }),
                    ));
                }
                replies.push(HandlerReply::done(json!({ "state": { "end": true } })));
                Box::new(replies.into_iter().map(Ok))
            }
            "StopServing" => {
                eprintln!("server ends");
                std::process::exit(0);
            }
            other => single(Err(varlink_core::Error::MethodNotFound(other.to_string()))),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let address = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: server <address>, e.g. unix:/tmp/org.example.more");
        std::process::exit(1);
    });

    let mut service = Service::new(ServiceInfo {
        vendor: "Varlink".into(),
        product: "Varlink Demos".into(),
        version: "1".into(),
        url: "https://varlink.org".into(),
    });
    let interface = idl::parse(MORE_INTERFACE).expect("built-in demo interface is valid IDL");
    service.register(interface, Box::new(MoreHandler)).expect("first registration never collides");

    let listener = Listener::bind(&address)?;
    println!("listening on {}", listener.address());
    loop {
        match listener.serve_one(&service) {
            Ok(()) | Err(varlink::Error::Disconnected) => {}
            Err(e) => eprintln!("connection error: {e}"),
        }
    }
}
