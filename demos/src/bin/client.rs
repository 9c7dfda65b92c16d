//! Demo client driving `org.example.more`'s streaming `TestMore` and
//! plain `Ping`, mirroring the reference project's `client-simple.py`.
//!
//! Run with: `cargo run --bin client -- unix:/tmp/org.example.more`

use serde_json::json;
use varlink::{Connection, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let address = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: client <address>, e.g. unix:/tmp/org.example.more");
        std::process::exit(1);
    });

    println!("connecting to {address}");
    let mut conn = Connection::connect(&address)?;

    for reply in conn.call_more("org.example.more.TestMore", json!({ "n": 10 }))? {
        let reply = reply?;
        let state = &reply["state"];
        if state.get("start").is_some() {
            eprintln!("--- start ---");
        }
        if let Some(progress) = state.get("progress").and_then(|v| v.as_u64()) {
            eprintln!("progress: {progress}");
        }
        if state.get("end").is_some() {
            eprintln!("--- end ---");
        }
    }

    let pong = conn.call("org.example.more.Ping", json!({ "ping": "Test" }))?;
    println!("ping: {}", pong["pong"]);

    Ok(())
}
