//! NUL-delimited message framing over a generic byte stream (§4.4).

use std::io::{Read, Write};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::log::trace;

/// Default cap on a single inbound message, chosen to bound memory use
/// against a misbehaving or hostile peer while comfortably fitting any
/// realistic interface description or parameter payload.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 32 * 1024 * 1024;

const READ_CHUNK: usize = 8192;

/// Reads and writes NUL-terminated JSON frames over any
/// [`Read`]/[`Write`] transport. Partial trailing bytes from a short read
/// are retained across calls to [`Framer::read_message`].
#[derive(Debug)]
pub struct Framer<S> {
    stream: S,
    buf: Vec<u8>,
    max_message_size: usize,
}

impl<S> Framer<S> {
    pub fn new(stream: S) -> Self {
        Self::with_max_message_size(stream, DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(stream: S, max_message_size: usize) -> Self {
        Framer { stream, buf: Vec::new(), max_message_size }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

impl<S: Read> Framer<S> {
    /// Reads the next complete frame, blocking on the underlying stream as
    /// needed. Returns `Ok(None)` on a clean close (EOF with no partial
    /// message buffered); an EOF in the middle of a message is reported as
    /// [`Error::Disconnected`], and an oversize message as
    /// [`Error::Protocol`] (both fatal to the connection, per §4.4).
    pub fn read_message(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(pos) = memchr::memchr(0, &self.buf) {
                let rest = self.buf.split_off(pos + 1);
                let mut frame = std::mem::replace(&mut self.buf, rest);
                frame.pop(); // drop the NUL
                let value = serde_json::from_slice(&frame)?;
                return Ok(Some(value));
            }

            if self.buf.len() >= self.max_message_size {
                return Err(Error::Protocol(format!(
                    "message exceeds the {} byte limit",
                    self.max_message_size
                )));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return if self.buf.is_empty() {
                    trace!("peer closed the connection cleanly");
                    Ok(None)
                } else {
                    trace!(buffered = self.buf.len(), "peer closed mid-message");
                    Err(Error::Disconnected)
                };
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

impl<S: Write> Framer<S> {
    /// Serializes `value` to JSON, appends the NUL delimiter, and writes
    /// the frame in one go.
    pub fn write_message(&mut self, value: &Value) -> Result<()> {
        let mut bytes = serde_json::to_vec(value)?;
        bytes.push(0);
        self.stream.write_all(&bytes)?;
        self.stream.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn reads_one_frame_per_nul() {
        let data = b"{\"method\":\"a\"}\0{\"method\":\"b\"}\0".to_vec();
        let mut framer = Framer::new(Cursor::new(data));
        assert_eq!(framer.read_message().unwrap(), Some(json!({"method": "a"})));
        assert_eq!(framer.read_message().unwrap(), Some(json!({"method": "b"})));
        assert_eq!(framer.read_message().unwrap(), None);
    }

    #[test]
    fn eof_before_nul_on_empty_buffer_is_clean_close() {
        let mut framer = Framer::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(framer.read_message().unwrap(), None);
    }

    #[test]
    fn eof_mid_message_is_disconnected() {
        let mut framer = Framer::new(Cursor::new(b"{\"method\":\"a\"".to_vec()));
        assert!(matches!(framer.read_message(), Err(Error::Disconnected)));
    }

    #[test]
    fn oversize_message_is_a_protocol_error() {
        let mut framer = Framer::with_max_message_size(Cursor::new(vec![b'a'; 100]), 10);
        assert!(matches!(framer.read_message(), Err(Error::Protocol(_))));
    }

    #[test]
    fn write_message_appends_nul() {
        let mut buf = Vec::new();
        {
            let mut framer = Framer::new(&mut buf);
            framer.write_message(&json!({"method": "a"})).unwrap();
        }
        assert_eq!(buf.last(), Some(&0u8));
        assert_eq!(&buf[..buf.len() - 1], br#"{"method":"a"}"#);
    }

    #[test]
    fn partial_reads_carry_over() {
        struct Dribble(std::vec::IntoIter<Vec<u8>>);
        impl Read for Dribble {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.0.next() {
                    Some(chunk) => {
                        buf[..chunk.len()].copy_from_slice(&chunk);
                        Ok(chunk.len())
                    }
                    None => Ok(0),
                }
            }
        }
        let chunks = vec![b"{\"a\":1}".to_vec(), b"\0".to_vec()];
        let mut framer = Framer::new(Dribble(chunks.into_iter()));
        assert_eq!(framer.read_message().unwrap(), Some(json!({"a": 1})));
    }
}
