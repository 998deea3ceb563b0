//! Command/response session with a badge.
//!
//! ## Architecture
//!
//! ```text
//!   transport thread                        caller thread
//!   ────────────────                        ─────────────
//!   on_receive(chunk)                       send_command(cmd)
//!     │                                       │ drain stale mailbox
//!     ├─ Normal: FrameCodec ──► message       │ write 68-byte frame
//!     │            │                          ▼
//!     │            ├─ before handshake: "PONG" marks the session connected
//!     │            └─ after: ──► mailbox (capacity 1) ──► receive(timeout)
//!     │
//!     └─ Raw: RawReceiver ──► ack byte per chunk
//!                  └─ complete ──► raw slot ──► fetch_raw(cmd, timeout)
//! ```
//!
//! Exactly one request is in flight. The mailbox holds a single response;
//! the delivery thread waits up to the turnstile timeout for the caller to
//! take the previous one and drops the new message if it does not.
//!
//! Every blocking wait is bounded and also wakes when
//! [`Session::cancel_connect`] runs, so tearing a connection down never
//! leaves a caller stuck.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use ecb_protocol::{
    Command, FrameCodec, RawProgress, RawReceiver, ResyncMode, HANDSHAKE_TOKEN, RAW_ACK_BYTE,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::BadgeError;
use crate::transport::{Transport, TransportHandler};

// ============================================================================
// Receive state
// ============================================================================

/// How incoming bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveMode {
    /// Framed responses.
    Normal,
    /// A single length-prefixed blob.
    Raw,
}

struct RxState {
    mode: ReceiveMode,
    codec: FrameCodec,
    raw: RawReceiver,
}

impl RxState {
    fn new(resync: ResyncMode) -> Self {
        RxState {
            mode: ReceiveMode::Normal,
            codec: FrameCodec::with_resync(resync),
            raw: RawReceiver::new(),
        }
    }
}

/// One-shot broadcasts. Dropping a sender wakes every receiver.
struct Signals {
    connected_tx: Option<Sender<()>>,
    connected_rx: Receiver<()>,
    cancel_tx: Option<Sender<()>>,
    cancel_rx: Receiver<()>,
}

impl Signals {
    fn new() -> Self {
        let (connected_tx, connected_rx) = bounded(0);
        let (cancel_tx, cancel_rx) = bounded(0);
        Signals {
            connected_tx: Some(connected_tx),
            connected_rx,
            cancel_tx: Some(cancel_tx),
            cancel_rx,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

struct Inner {
    resync: ResyncMode,
    turnstile_timeout: Duration,
    raw_ack_delay: Duration,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    rx: Mutex<RxState>,
    connected: AtomicBool,
    mailbox_tx: Sender<Vec<u8>>,
    mailbox_rx: Receiver<Vec<u8>>,
    raw_tx: Sender<Vec<u8>>,
    raw_rx: Receiver<Vec<u8>>,
    signals: Mutex<Signals>,
}

/// A connection-scoped protocol engine.
///
/// Cloning yields another handle to the same session. The session is also
/// the [`TransportHandler`] its transport delivers to.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connected", &self.is_connected())
            .field("attached", &self.inner.transport.read().is_some())
            .finish()
    }
}

impl Session {
    /// Create an unattached session.
    pub fn new(config: &ClientConfig) -> Self {
        let (mailbox_tx, mailbox_rx) = bounded(1);
        let (raw_tx, raw_rx) = bounded(1);
        Session {
            inner: Arc::new(Inner {
                resync: config.resync,
                turnstile_timeout: config.turnstile_timeout(),
                raw_ack_delay: config.raw_ack_delay(),
                transport: RwLock::new(None),
                rx: Mutex::new(RxState::new(config.resync)),
                connected: AtomicBool::new(false),
                mailbox_tx,
                mailbox_rx,
                raw_tx,
                raw_rx,
                signals: Mutex::new(Signals::new()),
            }),
        }
    }

    /// Handle to give to a transport for delivery.
    pub fn handler(&self) -> Arc<dyn TransportHandler> {
        Arc::new(self.clone())
    }

    /// Start using `transport` and send the handshake ping.
    pub fn attach(&self, transport: Arc<dyn Transport>) -> Result<(), BadgeError> {
        *self.inner.transport.write() = Some(Arc::clone(&transport));
        debug!("transport attached, sending handshake ping");
        let frame = Command::Ping.to_frame()?;
        transport.send(frame.as_bytes())?;
        Ok(())
    }

    /// Whether the handshake has completed on the current connection.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Current receive mode.
    pub fn receive_mode(&self) -> ReceiveMode {
        self.inner.rx.lock().mode
    }

    /// Block until the handshake completes, the connection is cancelled or
    /// `timeout` elapses. Returns immediately once connected.
    pub fn wait_for_connection(&self, timeout: Duration) -> bool {
        if self.is_connected() {
            return true;
        }

        let (connected, cancel) = {
            let signals = self.inner.signals.lock();
            (signals.connected_rx.clone(), signals.cancel_rx.clone())
        };
        if self.is_connected() {
            return true;
        }

        select! {
            recv(connected) -> _ => {}
            recv(cancel) -> _ => debug!("connection cancelled while waiting for handshake"),
            default(timeout) => warn!("no handshake within {:?}", timeout),
        }
        self.is_connected()
    }

    /// Send `command` and wait up to `timeout` for its response.
    pub fn send_command(&self, command: &Command, timeout: Duration) -> Result<Vec<u8>, BadgeError> {
        self.ensure_connected()?;
        self.discard_stale();
        self.write_command(command)?;
        self.receive(timeout)
    }

    /// Send a command the badge does not answer.
    pub fn send_command_no_reply(&self, command: &Command) -> Result<(), BadgeError> {
        self.ensure_connected()?;
        self.write_command(command)
    }

    /// Send unframed data, such as an image or firmware chunk.
    pub fn transmit(&self, data: &[u8]) -> Result<(), BadgeError> {
        self.ensure_connected()?;
        trace!("transmitting {} raw bytes", data.len());
        self.transport()?.send(data)?;
        Ok(())
    }

    /// Wait up to `timeout` for the next framed response.
    pub fn receive(&self, timeout: Duration) -> Result<Vec<u8>, BadgeError> {
        self.ensure_connected()?;
        let cancel = self.inner.signals.lock().cancel_rx.clone();

        select! {
            recv(self.inner.mailbox_rx) -> message => {
                let message = message.map_err(|_| BadgeError::Cancelled)?;
                debug!("received {} byte response", message.len());
                Ok(message)
            }
            recv(cancel) -> _ => Err(BadgeError::Cancelled),
            default(timeout) => {
                warn!("no response within {:?}", timeout);
                Err(BadgeError::Timeout(timeout))
            }
        }
    }

    /// Send `command` and receive its reply as a raw transfer.
    ///
    /// The session is back in normal mode when this returns, whatever the
    /// outcome.
    pub fn fetch_raw(&self, command: &Command, timeout: Duration) -> Result<Vec<u8>, BadgeError> {
        self.ensure_connected()?;
        self.discard_stale();
        self.set_mode(ReceiveMode::Raw);

        let result = self
            .write_command(command)
            .and_then(|()| self.wait_raw(timeout));

        self.set_mode(ReceiveMode::Normal);
        result
    }

    /// Tear down the transport and return to the initial state.
    ///
    /// Safe to call at any time. Wakes every waiting caller.
    pub fn cancel_connect(&self) {
        let transport = self.inner.transport.write().take();
        if transport.is_some() {
            info!("closing badge connection");
        }

        self.inner.connected.store(false, Ordering::Release);
        *self.inner.signals.lock() = Signals::new();

        if let Some(transport) = transport {
            transport.close();
        }

        *self.inner.rx.lock() = RxState::new(self.inner.resync);
        while self.inner.mailbox_rx.try_recv().is_ok() {}
        while self.inner.raw_rx.try_recv().is_ok() {}
    }

    fn ensure_connected(&self) -> Result<(), BadgeError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BadgeError::NotConnected)
        }
    }

    fn transport(&self) -> Result<Arc<dyn Transport>, BadgeError> {
        self.inner
            .transport
            .read()
            .clone()
            .ok_or(BadgeError::NotConnected)
    }

    fn write_command(&self, command: &Command) -> Result<(), BadgeError> {
        let frame = command.to_frame()?;
        debug!("sending command {}", command.code());
        self.transport()?.send(frame.as_bytes())?;
        Ok(())
    }

    fn discard_stale(&self) {
        while let Ok(stale) = self.inner.mailbox_rx.try_recv() {
            warn!("discarding stale {} byte response", stale.len());
        }
    }

    fn set_mode(&self, mode: ReceiveMode) {
        let mut rx = self.inner.rx.lock();
        rx.mode = mode;
        rx.raw = RawReceiver::new();
        drop(rx);
        while self.inner.raw_rx.try_recv().is_ok() {}
    }

    fn wait_raw(&self, timeout: Duration) -> Result<Vec<u8>, BadgeError> {
        let cancel = self.inner.signals.lock().cancel_rx.clone();

        select! {
            recv(self.inner.raw_rx) -> data => {
                let data = data.map_err(|_| BadgeError::Cancelled)?;
                debug!("raw transfer of {} bytes complete", data.len());
                Ok(data)
            }
            recv(cancel) -> _ => Err(BadgeError::Cancelled),
            default(timeout) => {
                warn!("raw transfer not complete within {:?}", timeout);
                Err(BadgeError::Timeout(timeout))
            }
        }
    }
}

// ============================================================================
// Delivery path
// ============================================================================

impl Inner {
    fn deliver(&self, message: Vec<u8>) {
        if !self.connected.load(Ordering::Acquire) {
            if message == HANDSHAKE_TOKEN {
                info!("badge handshake complete");
                self.connected.store(true, Ordering::Release);
                self.signals.lock().connected_tx.take();
            } else {
                debug!("dropping {} byte message received before handshake", message.len());
            }
            return;
        }

        let len = message.len();
        let cancel = self.signals.lock().cancel_rx.clone();
        select! {
            send(self.mailbox_tx, message) -> sent => {
                if sent.is_err() {
                    warn!("mailbox closed, dropping {} byte response", len);
                }
            }
            recv(cancel) -> _ => debug!("connection cancelled, dropping {} byte response", len),
            default(self.turnstile_timeout) => {
                warn!("previous response never taken, dropping {} byte response", len);
            }
        }
    }

    fn acknowledge_raw(&self) {
        thread::sleep(self.raw_ack_delay);
        let transport = self.transport.read().clone();
        match transport {
            Some(transport) => {
                if let Err(e) = transport.send(&[RAW_ACK_BYTE]) {
                    warn!("raw acknowledgement failed: {}", e);
                }
            }
            None => debug!("no transport for raw acknowledgement"),
        }
    }

    fn complete_raw(&self, data: Vec<u8>) {
        if self.raw_tx.try_send(data).is_err() {
            warn!("raw transfer completed with no caller waiting");
        }
    }
}

impl TransportHandler for Session {
    fn on_receive(&self, data: &[u8]) {
        let mut rx = self.inner.rx.lock();
        match rx.mode {
            ReceiveMode::Raw => {
                let progress = rx.raw.push(data);
                drop(rx);
                match progress {
                    RawProgress::NeedMore => {}
                    RawProgress::Ack => self.inner.acknowledge_raw(),
                    RawProgress::Complete(blob) => self.inner.complete_raw(blob),
                }
            }
            ReceiveMode::Normal => {
                rx.codec.push(data);
                let mut messages = Vec::new();
                while let Some(message) = rx.codec.decode() {
                    messages.push(message);
                }
                drop(rx);

                for message in messages {
                    self.inner.deliver(message);
                }
            }
        }
    }

    fn on_connection_changed(&self, connected: bool) {
        if connected {
            debug!("transport link up");
            return;
        }

        if self.is_connected() {
            warn!("transport link lost");
        }
        self.inner.connected.store(false, Ordering::Release);
        *self.inner.signals.lock() = Signals::new();
    }
}
