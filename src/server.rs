//! TCP front door: accepts one client at a time and runs its session.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::config::ShopConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, ShopError};
use crate::report::SessionReport;

pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    pub fn bind(addr: impl ToSocketAddrs, config: ShopConfig) -> Result<Self> {
        let dispatcher = Dispatcher::new(config)?;
        let listener = TcpListener::bind(addr)?;
        log::info!("[SERVER] listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            dispatcher,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Stop serving once `flag` is raised. A session in progress is aborted,
    /// its workers joined and its queues swept.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.dispatcher = self.dispatcher.with_shutdown(Arc::clone(&flag));
        self.shutdown = flag;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept exactly one client and serve its session. The connection is
    /// closed when this returns.
    pub fn serve_one(&self) -> Result<SessionReport> {
        log::info!("[SERVER] waiting for new orders");
        let (stream, peer) = self.listener.accept().map_err(ShopError::Accept)?;
        self.serve_client(stream, peer)
    }

    fn serve_client(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<SessionReport> {
        log::info!("[SERVER] accepted orders from {peer}, shop is closed for new orders");
        let report = self.dispatcher.serve(&mut stream)?;
        report.log_stats();
        log::info!("[SERVER] done serving {peer}");
        Ok(report)
    }

    /// Serve clients one after another until the shutdown flag is raised or
    /// the listener fails. A failed session never stops the server.
    pub fn run(&self) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        log::info!("[SERVER] waiting for new orders");
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                log::info!("[SERVER] shutting down, no session left to clean up");
                return Ok(());
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    match self.serve_client(stream, peer) {
                        Ok(report) if self.shutdown.load(Ordering::SeqCst) => {
                            log::info!(
                                "[SERVER] session ended ({}), workers joined and queues swept",
                                report.outcome
                            );
                        }
                        Ok(_) => log::info!("[SERVER] waiting for new orders"),
                        Err(err) => log::error!("[SERVER] session failed: {err}"),
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.dispatcher.config().poll_timeout());
                }
                Err(err) if is_accept_fatal(&err) => return Err(ShopError::Accept(err)),
                Err(err) => log::warn!("[SERVER] accept failed: {err}"),
            }
        }
    }
}

fn is_accept_fatal(err: &io::Error) -> bool {
    use std::io::ErrorKind;
    !matches!(
        err.kind(),
        ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::BrokenPipe
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}
