//! The Varlink address string grammar (§6): a pure parse from string to a
//! typed [`Address`]. Opening the actual socket (or spawning an `exec:`
//! bridge) is the embedding crate's job; this module only understands the
//! string forms.

use std::fmt;

use crate::error::{Error, Result};

/// A parsed Varlink address (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// `unix:<path>[;mode=<octal>]`
    UnixPath { path: String, mode: Option<u32> },
    /// `unix:@<name>`, a Linux abstract-namespace socket.
    UnixAbstract { name: String },
    /// `tcp:<host>:<port>`, host either a name or an IPv4/IPv6 literal
    /// (brackets accepted around the latter).
    Tcp { host: String, port: u16 },
    /// `exec:<argv>` and other bridge/activation command lines. Kept
    /// opaque: spawning a subprocess and wiring up `LISTEN_FDS` is a
    /// transport concern outside this crate (§6).
    Exec { command: String },
}

impl Address {
    /// Parses one of the four address forms. Returns
    /// [`Error::InvalidAddress`] for anything else.
    pub fn parse(s: &str) -> Result<Address> {
        if let Some(rest) = s.strip_prefix("unix:") {
            return parse_unix(s, rest);
        }
        if let Some(rest) = s.strip_prefix("tcp:") {
            return parse_tcp(s, rest);
        }
        if let Some(rest) = s.strip_prefix("exec:") {
            return Ok(Address::Exec { command: rest.to_string() });
        }
        Err(Error::InvalidAddress(s.to_string()))
    }
}

fn parse_unix(whole: &str, rest: &str) -> Result<Address> {
    if let Some(name) = rest.strip_prefix('@') {
        if name.is_empty() {
            return Err(Error::InvalidAddress(whole.to_string()));
        }
        return Ok(Address::UnixAbstract { name: name.to_string() });
    }

    match rest.split_once(";mode=") {
        Some((path, mode)) if !path.is_empty() => {
            let mode = u32::from_str_radix(mode, 8).map_err(|_| Error::InvalidAddress(whole.to_string()))?;
            Ok(Address::UnixPath { path: path.to_string(), mode: Some(mode) })
        }
        Some(_) => Err(Error::InvalidAddress(whole.to_string())),
        None if !rest.is_empty() => Ok(Address::UnixPath { path: rest.to_string(), mode: None }),
        None => Err(Error::InvalidAddress(whole.to_string())),
    }
}

fn parse_tcp(whole: &str, rest: &str) -> Result<Address> {
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let (host, after) = after_bracket
            .split_once(']')
            .ok_or_else(|| Error::InvalidAddress(whole.to_string()))?;
        let port_str = after.strip_prefix(':').ok_or_else(|| Error::InvalidAddress(whole.to_string()))?;
        let port = parse_port(port_str, whole)?;
        return Ok(Address::Tcp { host: host.to_string(), port });
    }

    let (host, port_str) = rest.rsplit_once(':').ok_or_else(|| Error::InvalidAddress(whole.to_string()))?;
    if host.is_empty() {
        return Err(Error::InvalidAddress(whole.to_string()));
    }
    let port = parse_port(port_str, whole)?;
    Ok(Address::Tcp { host: host.to_string(), port })
}

fn parse_port(s: &str, whole: &str) -> Result<u16> {
    s.parse().map_err(|_| Error::InvalidAddress(whole.to_string()))
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::UnixPath { path, mode: None } => write!(f, "unix:{path}"),
            Address::UnixPath { path, mode: Some(mode) } => write!(f, "unix:{path};mode={mode:o}"),
            Address::UnixAbstract { name } => write!(f, "unix:@{name}"),
            Address::Tcp { host, port } if host.contains(':') => write!(f, "tcp:[{host}]:{port}"),
            Address::Tcp { host, port } => write!(f, "tcp:{host}:{port}"),
            Address::Exec { command } => write!(f, "exec:{command}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unix_path() {
        assert_eq!(
            Address::parse("unix:/run/foo.sock").unwrap(),
            Address::UnixPath { path: "/run/foo.sock".into(), mode: None }
        );
    }

    #[test]
    fn parses_unix_path_with_mode() {
        assert_eq!(
            Address::parse("unix:/run/foo.sock;mode=0600").unwrap(),
            Address::UnixPath { path: "/run/foo.sock".into(), mode: Some(0o600) }
        );
    }

    #[test]
    fn parses_unix_abstract() {
        assert_eq!(
            Address::parse("unix:@foo").unwrap(),
            Address::UnixAbstract { name: "foo".into() }
        );
    }

    #[test]
    fn parses_tcp_host_port() {
        assert_eq!(
            Address::parse("tcp:localhost:1234").unwrap(),
            Address::Tcp { host: "localhost".into(), port: 1234 }
        );
    }

    #[test]
    fn parses_tcp_bracketed_ipv6() {
        assert_eq!(
            Address::parse("tcp:[::1]:1234").unwrap(),
            Address::Tcp { host: "::1".into(), port: 1234 }
        );
    }

    #[test]
    fn parses_exec_as_opaque() {
        assert_eq!(
            Address::parse("exec:/usr/bin/foo --bar").unwrap(),
            Address::Exec { command: "/usr/bin/foo --bar".into() }
        );
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(matches!(Address::parse("ftp:nope"), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn rejects_garbage_port() {
        assert!(matches!(Address::parse("tcp:localhost:notaport"), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn display_round_trips() {
        for s in ["unix:/run/foo.sock", "unix:@foo", "tcp:localhost:1234"] {
            assert_eq!(Address::parse(s).unwrap().to_string(), s);
        }
    }
}
