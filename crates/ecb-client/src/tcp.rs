//! TCP socket transport.
//!
//! Badges running the Wi-Fi access point firmware expose the serial protocol
//! on a plain TCP socket. A reader thread forwards every received chunk to
//! the handler.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::TransportError;
use crate::transport::{Transport, TransportHandler};

const READ_BUFFER_SIZE: usize = 4096;

/// A connected TCP transport.
pub struct TcpTransport {
    peer: SocketAddr,
    writer: Mutex<Option<TcpStream>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.peer)
            .field("open", &self.writer.lock().is_some())
            .finish()
    }
}

impl TcpTransport {
    /// Connect to `addr` and start delivering received bytes to `handler`.
    ///
    /// Each resolved address is tried in turn with `timeout`.
    pub fn connect(
        addr: impl ToSocketAddrs,
        handler: Arc<dyn TransportHandler>,
        timeout: Duration,
    ) -> Result<Arc<Self>, TransportError> {
        let mut last_err = None;
        let mut connected = None;
        for candidate in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(stream) => {
                    connected = Some((candidate, stream));
                    break;
                }
                Err(e) => {
                    debug!("connect to {} failed: {}", candidate, e);
                    last_err = Some(e);
                }
            }
        }

        let (peer, stream) = connected.ok_or_else(|| {
            last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address resolved"))
        })?;
        stream.set_nodelay(true)?;
        info!("connected to badge at {}", peer);

        let read_half = stream.try_clone()?;
        let reader = thread::Builder::new()
            .name(format!("ecb-tcp-{}", peer))
            .spawn(move || read_loop(read_half, handler))?;

        Ok(Arc::new(TcpTransport {
            peer,
            writer: Mutex::new(Some(stream)),
            reader: Mutex::new(Some(reader)),
        }))
    }

    /// Address of the badge.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

fn read_loop(mut stream: TcpStream, handler: Arc<dyn TransportHandler>) {
    handler.on_connection_changed(true);

    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => {
                debug!("badge closed the connection");
                break;
            }
            Ok(n) => {
                trace!("received {} bytes", n);
                handler.on_receive(&buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("read failed: {}", e);
                break;
            }
        }
    }

    handler.on_connection_changed(false);
}

impl Transport for TcpTransport {
    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock();
        let stream = writer.as_mut().ok_or(TransportError::Closed)?;
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }

    fn close(&self) {
        if let Some(stream) = self.writer.lock().take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                if e.kind() != io::ErrorKind::NotConnected {
                    warn!("shutdown of {} failed: {}", self.peer, e);
                }
            }
        }

        let reader = self.reader.lock().take();
        if let Some(handle) = reader {
            // The reader may itself end up here through its handler.
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("reader thread for {} panicked", self.peer);
            }
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Sender};
    use std::net::TcpListener;

    struct Recorder {
        events: Sender<Result<Vec<u8>, bool>>,
    }

    impl TransportHandler for Recorder {
        fn on_receive(&self, data: &[u8]) {
            let _ = self.events.send(Ok(data.to_vec()));
        }

        fn on_connection_changed(&self, connected: bool) {
            let _ = self.events.send(Err(connected));
        }
    }

    #[test]
    fn test_tcp_roundtrip_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (events_tx, events_rx) = unbounded();

        let transport = TcpTransport::connect(
            addr,
            Arc::new(Recorder { events: events_tx }),
            Duration::from_secs(2),
        )
        .unwrap();
        let (mut peer, _) = listener.accept().unwrap();
        assert_eq!(transport.peer(), addr);

        let wait = Duration::from_secs(2);
        assert_eq!(events_rx.recv_timeout(wait).unwrap(), Err(true));

        transport.send(b"hello").unwrap();
        let mut buf = [0u8; 5];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        peer.write_all(b"world").unwrap();
        let mut received = Vec::new();
        while received.len() < 5 {
            match events_rx.recv_timeout(wait).unwrap() {
                Ok(chunk) => received.extend(chunk),
                Err(state) => panic!("unexpected connection change {}", state),
            }
        }
        assert_eq!(received, b"world");

        transport.close();
        assert_eq!(events_rx.recv_timeout(wait).unwrap(), Err(false));
        assert!(matches!(transport.send(b"x"), Err(TransportError::Closed)));
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (events_tx, _events_rx) = unbounded();
        let result = TcpTransport::connect(
            addr,
            Arc::new(Recorder { events: events_tx }),
            Duration::from_millis(500),
        );
        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}
