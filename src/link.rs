//! The dispatcher's view of a connected client.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use crate::protocol::{self, ACKNOWLEDGMENT, MAX_BATCH_ORDERS, ORDER_WIRE_SIZE};

/// What a timed poll of the client observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Nothing arrived before the timeout.
    Quiet,
    /// End of stream.
    Closed,
    Cancelled,
    /// Bytes that mean nothing to the shop.
    Ignored(usize),
}

/// A client connection as the dispatcher needs it.
pub trait ClientLink {
    /// One read of the order batch. `None` means the client closed the
    /// connection before sending anything.
    fn read_batch(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Wait up to `timeout` for a message from the client.
    fn poll(&mut self, timeout: Duration) -> io::Result<LinkEvent>;

    /// Tell the client every order was delivered.
    fn acknowledge(&mut self) -> io::Result<()>;
}

impl ClientLink for TcpStream {
    fn read_batch(&mut self) -> io::Result<Option<Vec<u8>>> {
        // One spare order of room so oversized batches are detectable.
        let mut buffer = vec![0u8; (MAX_BATCH_ORDERS + 1) * ORDER_WIRE_SIZE];
        self.set_read_timeout(None)?;
        let read = loop {
            match self.read(&mut buffer) {
                Ok(read) => break read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };
        if read == 0 {
            return Ok(None);
        }
        buffer.truncate(read);
        Ok(Some(buffer))
    }

    fn poll(&mut self, timeout: Duration) -> io::Result<LinkEvent> {
        self.set_read_timeout(Some(timeout))?;
        let mut buffer = [0u8; 1024];
        match self.read(&mut buffer) {
            Ok(0) => Ok(LinkEvent::Closed),
            Ok(read) if protocol::is_cancel(&buffer[..read]) => Ok(LinkEvent::Cancelled),
            Ok(read) => Ok(LinkEvent::Ignored(read)),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(LinkEvent::Quiet)
            }
            Err(err) => Err(err),
        }
    }

    fn acknowledge(&mut self) -> io::Result<()> {
        self.write_all(ACKNOWLEDGMENT.as_bytes())?;
        self.flush()
    }
}

/// In-process client used by the demo and by tests. Polls follow a script;
/// once the script runs out every poll sleeps for its timeout and reports
/// [`LinkEvent::Quiet`].
pub struct MemoryLink {
    batch: Option<Vec<u8>>,
    script: VecDeque<LinkEvent>,
    polls: usize,
    acknowledgments: usize,
}

impl MemoryLink {
    pub fn new(batch: Vec<u8>) -> Self {
        Self {
            batch: Some(batch),
            script: VecDeque::new(),
            polls: 0,
            acknowledgments: 0,
        }
    }

    /// A client that hangs up before sending a batch.
    pub fn closed() -> Self {
        Self {
            batch: None,
            ..Self::new(Vec::new())
        }
    }

    /// Report `event` after `quiet_polls` uneventful polls.
    pub fn then_after(mut self, quiet_polls: usize, event: LinkEvent) -> Self {
        self.script
            .extend(std::iter::repeat(LinkEvent::Quiet).take(quiet_polls));
        self.script.push_back(event);
        self
    }

    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn acknowledgments(&self) -> usize {
        self.acknowledgments
    }
}

impl ClientLink for MemoryLink {
    fn read_batch(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.batch.take())
    }

    fn poll(&mut self, timeout: Duration) -> io::Result<LinkEvent> {
        self.polls += 1;
        match self.script.pop_front() {
            Some(LinkEvent::Quiet) | None => {
                thread::sleep(timeout);
                Ok(LinkEvent::Quiet)
            }
            Some(event) => Ok(event),
        }
    }

    fn acknowledge(&mut self) -> io::Result<()> {
        self.acknowledgments += 1;
        Ok(())
    }
}
