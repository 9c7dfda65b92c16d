//! Opens a `std::io` transport for a parsed [`varlink_core::Address`]
//! (§6). The one genuinely transport-specific piece of this crate —
//! everything in `varlink-core` is agnostic over `Read + Write`.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::net::{UnixListener, UnixStream};

use varlink_core::{Address, Error, Result};

/// Either side of a Unix or TCP connection, so callers can hand a single
/// concrete type to `varlink_core::Connection<Socket>`.
#[derive(Debug)]
pub enum Socket {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Read for Socket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Unix(s) => s.read(buf),
            Socket::Tcp(s) => s.read(buf),
        }
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Socket::Unix(s) => s.write(buf),
            Socket::Tcp(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Socket::Unix(s) => s.flush(),
            Socket::Tcp(s) => s.flush(),
        }
    }
}

/// Connects to `address`, the client side of §6's address grammar.
pub fn connect(address: &Address) -> Result<Socket> {
    match address {
        Address::UnixPath { path, .. } => Ok(Socket::Unix(UnixStream::connect(path)?)),
        Address::UnixAbstract { name } => Ok(Socket::Unix(connect_abstract(name)?)),
        Address::Tcp { host, port } => {
            Ok(Socket::Tcp(TcpStream::connect((host.as_str(), *port))?))
        }
        Address::Exec { command } => Err(Error::InvalidAddress(format!(
            "exec:{command} requires spawning a subprocess, which this crate does not do"
        ))),
    }
}

/// Either side of a Unix or TCP listener.
#[derive(Debug)]
pub enum SocketListener {
    Unix(UnixListener),
    Tcp(TcpListener),
}

impl SocketListener {
    pub fn accept(&self) -> Result<Socket> {
        match self {
            SocketListener::Unix(l) => Ok(Socket::Unix(l.accept()?.0)),
            SocketListener::Tcp(l) => Ok(Socket::Tcp(l.accept()?.0)),
        }
    }
}

/// Binds and listens on `address`, the server side of §6's address
/// grammar. An existing socket file at a `unix:` path is removed first,
/// matching how varlink services are conventionally (re)started.
pub fn bind(address: &Address) -> Result<SocketListener> {
    match address {
        Address::UnixPath { path, mode } => {
            if std::path::Path::new(path).exists() {
                std::fs::remove_file(path)?;
            }
            let listener = UnixListener::bind(path)?;
            if let Some(mode) = mode {
                set_unix_mode(path, *mode)?;
            }
            Ok(SocketListener::Unix(listener))
        }
        Address::UnixAbstract { name } => Ok(SocketListener::Unix(bind_abstract(name)?)),
        Address::Tcp { host, port } => {
            Ok(SocketListener::Tcp(TcpListener::bind((host.as_str(), *port))?))
        }
        Address::Exec { command } => Err(Error::InvalidAddress(format!(
            "exec:{command} is a client-only activation form, not something to bind"
        ))),
    }
}

#[cfg(target_os = "linux")]
fn connect_abstract(name: &str) -> Result<UnixStream> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())
        .map_err(|e| Error::InvalidAddress(format!("unix:@{name}: {e}")))?;
    Ok(UnixStream::connect_addr(&addr)?)
}

#[cfg(not(target_os = "linux"))]
fn connect_abstract(name: &str) -> Result<UnixStream> {
    Err(Error::InvalidAddress(format!(
        "unix:@{name}: abstract-namespace sockets are Linux-only"
    )))
}

#[cfg(target_os = "linux")]
fn bind_abstract(name: &str) -> Result<UnixListener> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())
        .map_err(|e| Error::InvalidAddress(format!("unix:@{name}: {e}")))?;
    Ok(UnixListener::bind_addr(&addr)?)
}

#[cfg(not(target_os = "linux"))]
fn bind_abstract(name: &str) -> Result<UnixListener> {
    Err(Error::InvalidAddress(format!(
        "unix:@{name}: abstract-namespace sockets are Linux-only"
    )))
}

fn set_unix_mode(path: &str, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}
