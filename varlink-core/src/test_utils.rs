//! In-memory duplex byte stream for driving the framer, call state machine
//! and dispatcher against each other without real sockets.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

/// One end of an in-memory duplex pipe. Single-threaded only: reads never
/// block, they return `Ok(0)` immediately if nothing is buffered, so tests
/// must write everything a read expects before issuing it.
#[derive(Debug, Clone)]
pub struct Pipe {
    read_buf: Rc<RefCell<VecDeque<u8>>>,
    write_buf: Rc<RefCell<VecDeque<u8>>>,
}

impl Pipe {
    /// Creates a connected pair; bytes written to one side are read from
    /// the other.
    pub fn duplex() -> (Pipe, Pipe) {
        let a = Rc::new(RefCell::new(VecDeque::new()));
        let b = Rc::new(RefCell::new(VecDeque::new()));
        (
            Pipe { read_buf: Rc::clone(&a), write_buf: Rc::clone(&b) },
            Pipe { read_buf: b, write_buf: a },
        )
    }
}

impl Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut rb = self.read_buf.borrow_mut();
        let n = buf.len().min(rb.len());
        for slot in &mut buf[..n] {
            *slot = rb.pop_front().expect("checked len above");
        }
        Ok(n)
    }
}

impl Write for Pipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_buf.borrow_mut().extend(buf.iter().copied());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
