//! Order-placing client for the shop.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;

use crate::protocol::{self, ACKNOWLEDGMENT, CANCEL_TOKEN};
use crate::types::Order;

/// Orders for customers `0..count` at random spots in `[0, max_x) x [0, max_y)`.
pub fn generate_orders<R: Rng + ?Sized>(
    count: usize,
    max_x: i32,
    max_y: i32,
    rng: &mut R,
) -> Vec<Order> {
    (0..count)
        .map(|customer| {
            Order::new(
                customer as i32,
                rng.gen_range(0..max_x.max(1)),
                rng.gen_range(0..max_y.max(1)),
            )
        })
        .collect()
}

/// How a wait for the shop's acknowledgment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckWait {
    Acknowledged,
    /// The shop closed the connection without acknowledging.
    Closed,
    /// The caller's stop flag was raised first.
    Interrupted,
}

pub struct OrderClient {
    stream: TcpStream,
    received: Vec<u8>,
}

impl OrderClient {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Ok(Self {
            stream,
            received: Vec::new(),
        })
    }

    /// Send the whole batch in one write.
    pub fn submit(&mut self, orders: &[Order]) -> io::Result<()> {
        self.stream.write_all(&protocol::encode_batch(orders))?;
        self.stream.flush()
    }

    /// Read until the shop's acknowledgment arrives (`true`) or the shop
    /// closes the connection without it (`false`).
    pub fn wait_for_ack(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        self.stream.set_read_timeout(timeout)?;
        loop {
            match self.read_some() {
                Ok(Some(wait)) => return Ok(wait == AckWait::Acknowledged),
                Ok(None) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Like [`wait_for_ack`](Self::wait_for_ack), but checks `stop` every
    /// `poll` and gives up once it is raised.
    pub fn wait_for_ack_unless(
        &mut self,
        stop: &AtomicBool,
        poll: Duration,
    ) -> io::Result<AckWait> {
        self.stream.set_read_timeout(Some(poll))?;
        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(AckWait::Interrupted);
            }
            match self.read_some() {
                Ok(Some(wait)) => return Ok(wait),
                Ok(None) => {}
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// One read. `None` means more bytes are needed.
    fn read_some(&mut self) -> io::Result<Option<AckWait>> {
        let mut buffer = [0u8; 1024];
        let read = self.stream.read(&mut buffer)?;
        if read == 0 {
            return Ok(Some(AckWait::Closed));
        }
        self.received.extend_from_slice(&buffer[..read]);
        let acknowledged = self
            .received
            .windows(ACKNOWLEDGMENT.len())
            .any(|window| window == ACKNOWLEDGMENT.as_bytes());
        Ok(acknowledged.then_some(AckWait::Acknowledged))
    }

    /// Ask the shop to abandon this session.
    pub fn cancel(&mut self) -> io::Result<()> {
        self.stream.write_all(CANCEL_TOKEN)?;
        self.stream.flush()
    }
}
