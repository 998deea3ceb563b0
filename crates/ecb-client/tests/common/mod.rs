//! A simulated badge behind an in-memory transport.
//!
//! The badge runs on its own thread, like a real transport's delivery
//! thread, and answers requests the way the firmware does.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use ecb_client::{
    BadgeClient, ClientConfig, Session, Transport, TransportError, TransportHandler,
    UpdateServer, UpdateServerError,
};
use ecb_image::PACKED_IMAGE_SIZE;
use ecb_protocol::{
    AnimationModel, Command, DeviceInfo, FrameCodec, LedBorderPattern, RequestFrame,
    RAW_ACK_BYTE, REQUEST_FRAME_SIZE, UPDATE_PACKET_HEADER_SIZE, UPDATE_PACKET_MARKER_END,
};
use parking_lot::Mutex;

/// What the badge stores and what the test can inspect afterwards.
#[derive(Debug, Clone)]
pub struct BadgeState {
    pub info: DeviceInfo,
    pub led_enabled: bool,
    pub pattern: LedBorderPattern,
    pub brightness_wire: u8,
    pub animations: Vec<AnimationModel>,
    pub images: Vec<(String, Vec<u8>)>,
    pub current_image: Vec<u8>,
    pub firmware: Vec<u8>,
    pub firmware_packets: usize,
    pub commands: Vec<Command>,
    pub cancel_count: usize,
    pub acks_received: usize,
    /// Stop answering requests.
    pub mute: bool,
    /// Reply text overriding the normal answer to the next request.
    pub next_reply: Option<Vec<u8>>,
    /// Bytes sent before every framed response.
    pub noise: Vec<u8>,
    /// Size of the chunks responses are delivered in.
    pub delivery_chunk: usize,
    /// Raw transfer chunk size for image downloads.
    pub raw_chunk: usize,
}

impl Default for BadgeState {
    fn default() -> Self {
        BadgeState {
            info: DeviceInfo {
                owner: "Ada".to_string(),
                contact: "ada@example.com".to_string(),
                sw_version: "v1.1.0".to_string(),
                hw_version: "HW2".to_string(),
                led_enabled: true,
                current_image: "logo".to_string(),
                bt_pin: "1234".to_string(),
            },
            led_enabled: true,
            pattern: LedBorderPattern::default(),
            brightness_wire: 128,
            animations: Vec::new(),
            images: vec![("logo".to_string(), Vec::new()), ("cat".to_string(), Vec::new())],
            current_image: (0..PACKED_IMAGE_SIZE).map(|i| (i % 7) as u8 * 0x11).collect(),
            firmware: Vec::new(),
            firmware_packets: 0,
            commands: Vec::new(),
            cancel_count: 0,
            acks_received: 0,
            mute: false,
            next_reply: None,
            noise: Vec::new(),
            delivery_chunk: 3,
            raw_chunk: 8192,
        }
    }
}

enum Mode {
    Command,
    Image { name: String, data: Vec<u8> },
    Firmware,
    RawSend { data: Vec<u8>, offset: usize },
}

/// Transport end the session writes to.
pub struct SimulatedBadge {
    tx: Mutex<Option<Sender<Vec<u8>>>>,
    pub state: Arc<Mutex<BadgeState>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedBadge {
    pub fn spawn(handler: Arc<dyn TransportHandler>, state: BadgeState) -> Arc<Self> {
        let (tx, rx) = unbounded();
        let state = Arc::new(Mutex::new(state));
        let device_state = Arc::clone(&state);
        let thread = thread::spawn(move || run_device(rx, handler, device_state));

        Arc::new(SimulatedBadge {
            tx: Mutex::new(Some(tx)),
            state,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Whether the session closed this transport.
    pub fn send_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl Transport for SimulatedBadge {
    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let tx = self.tx.lock();
        let tx = tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(data.to_vec()).map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        self.tx.lock().take();
        if let Some(handle) = self.thread.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Config with short timeouts for tests.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        connection_timeout_secs: 2,
        command_timeout_secs: 2,
        long_timeout_secs: 2,
        turnstile_timeout_secs: 2,
        raw_ack_delay_ms: 0,
        ..ClientConfig::default()
    }
}

/// Connect a client to a fresh simulated badge.
pub fn connect(state: BadgeState) -> (BadgeClient, Arc<SimulatedBadge>) {
    connect_with(test_config(), state)
}

pub fn connect_with(config: ClientConfig, state: BadgeState) -> (BadgeClient, Arc<SimulatedBadge>) {
    let session = Session::new(&config);
    let badge = SimulatedBadge::spawn(session.handler(), state);
    let client = BadgeClient::attach(session, badge.clone(), config).expect("handshake");
    (client, badge)
}

fn respond(handler: &dyn TransportHandler, state: &BadgeState, payload: &[u8]) {
    let mut bytes = state.noise.clone();
    bytes.extend(FrameCodec::encode_response(payload).expect("response fits"));
    for chunk in bytes.chunks(state.delivery_chunk.max(1)) {
        handler.on_receive(chunk);
    }
}

fn led_info_reply(state: &BadgeState) -> Vec<u8> {
    let mut reply = vec![u8::from(state.led_enabled)];
    reply.extend_from_slice(&state.pattern.encode());
    reply.push(state.brightness_wire);
    reply.push(state.animations.len() as u8);
    for animation in &state.animations {
        reply.push(animation.anim_type);
        reply.push(animation.param);
    }
    reply
}

fn send_raw_chunk(handler: &dyn TransportHandler, chunk: usize, data: &[u8], offset: &mut usize) {
    let end = (*offset + chunk).min(data.len());
    let mut bytes = Vec::new();
    if *offset == 0 {
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
    }
    bytes.extend_from_slice(&data[*offset..end]);
    *offset = end;
    handler.on_receive(&bytes);
}

fn run_device(rx: Receiver<Vec<u8>>, handler: Arc<dyn TransportHandler>, state: Arc<Mutex<BadgeState>>) {
    let mut mode = Mode::Command;

    while let Ok(data) = rx.recv() {
        let mut st = state.lock();

        match &mut mode {
            Mode::Image { name, data: image } => {
                image.extend_from_slice(&data);
                respond(&*handler, &st, b"OK");
                if image.len() >= PACKED_IMAGE_SIZE {
                    let stored = (name.clone(), std::mem::take(image));
                    st.images.push(stored);
                    respond(&*handler, &st, b"UPDATED");
                    mode = Mode::Command;
                }
                continue;
            }
            Mode::Firmware => {
                let marker = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
                let len = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
                assert_eq!(len, data.len(), "packet length header");
                st.firmware.extend_from_slice(&data[UPDATE_PACKET_HEADER_SIZE..]);
                st.firmware_packets += 1;
                respond(&*handler, &st, b"OK");
                if marker == UPDATE_PACKET_MARKER_END {
                    respond(&*handler, &st, b"UPDATE_SUCCESS");
                    mode = Mode::Command;
                }
                continue;
            }
            Mode::RawSend { data: blob, offset } => {
                assert_eq!(data, [RAW_ACK_BYTE], "raw acknowledgement");
                st.acks_received += 1;
                let chunk = st.raw_chunk;
                send_raw_chunk(&*handler, chunk, blob, offset);
                if *offset >= blob.len() {
                    mode = Mode::Command;
                }
                continue;
            }
            Mode::Command => {}
        }

        assert_eq!(data.len(), REQUEST_FRAME_SIZE, "request frame size");
        let frame = RequestFrame::decode(&data).expect("request frame");
        let command = Command::decode(&frame).expect("known command");
        st.commands.push(command.clone());

        if st.mute {
            continue;
        }
        if let Some(reply) = st.next_reply.take() {
            respond(&*handler, &st, &reply);
            continue;
        }

        let reply: Option<Vec<u8>> = match command {
            Command::Ping => Some(b"PONG".to_vec()),
            Command::GetInfo => {
                let mut info = st.info.clone();
                info.led_enabled = st.led_enabled;
                Some(info.encode())
            }
            Command::SetOwner { owner } => {
                st.info.owner = owner;
                Some(b"OK".to_vec())
            }
            Command::SetContact { contact } => {
                st.info.contact = contact;
                Some(b"OK".to_vec())
            }
            Command::EnableLedBorder => {
                st.led_enabled = true;
                Some(b"OK".to_vec())
            }
            Command::DisableLedBorder => {
                st.led_enabled = false;
                Some(b"OK".to_vec())
            }
            Command::SetPattern(pattern) => {
                st.pattern = pattern;
                Some(b"OK".to_vec())
            }
            Command::SetBrightness { .. } => {
                st.brightness_wire = frame.payload()[0];
                Some(b"OK".to_vec())
            }
            Command::AddAnimation { anim_type, param } => {
                let index = st.animations.len() as u8;
                st.animations.push(AnimationModel { index, anim_type, param });
                Some(vec![b'O', b'K', index])
            }
            Command::RemoveAnimation { index } => {
                st.animations.retain(|a| a.index != index);
                Some(b"OK".to_vec())
            }
            Command::ClearAnimations => {
                st.animations.clear();
                Some(b"OK".to_vec())
            }
            Command::FactoryReset => Some(b"OK".to_vec()),
            Command::GetLedInfo => Some(led_info_reply(&st)),
            Command::ListImages { start, count } => {
                let names: Vec<&str> = st
                    .images
                    .iter()
                    .skip(start as usize)
                    .take(count as usize)
                    .map(|(name, _)| name.as_str())
                    .collect();
                Some(names.join("\0").into_bytes())
            }
            Command::RemoveImage { name } => {
                let before = st.images.len();
                st.images.retain(|(n, _)| *n != name);
                Some(if st.images.len() < before { b"OK".to_vec() } else { b"NOT_FOUND".to_vec() })
            }
            Command::SelectImage { name } => {
                st.info.current_image = name;
                Some(b"OK".to_vec())
            }
            Command::PushImage { name } => {
                mode = Mode::Image { name, data: Vec::new() };
                Some(b"READY".to_vec())
            }
            Command::GetCurrentImage { .. } => {
                let blob = st.current_image.clone();
                let mut offset = 0;
                send_raw_chunk(&*handler, st.raw_chunk, &blob, &mut offset);
                if offset < blob.len() {
                    mode = Mode::RawSend { data: blob, offset };
                }
                None
            }
            Command::RequestUpdate => Some(b"OK".to_vec()),
            Command::StartUpdate => Some(st.info.sw_version.clone().into_bytes()),
            Command::ValidateUpdate => Some(b"READY".to_vec()),
            Command::StartTransferUpdate => {
                mode = Mode::Firmware;
                Some(b"READY_TRANS".to_vec())
            }
            Command::CancelUpdate => {
                st.cancel_count += 1;
                None
            }
            Command::ClearDisplay | Command::SetBluetoothSettings { .. } => None,
        };

        if let Some(reply) = reply {
            respond(&*handler, &st, &reply);
        }
    }

    handler.on_connection_changed(false);
}

// ============================================================================
// Update server
// ============================================================================

/// Update server serving fixed content.
#[derive(Debug, Clone)]
pub struct FakeUpdateServer {
    pub info: Result<String, u16>,
    pub binary: Result<Vec<u8>, u16>,
    pub binary_requests: Arc<Mutex<usize>>,
}

impl FakeUpdateServer {
    pub fn new(version: &str, binary: Vec<u8>) -> Self {
        let checksum = ecb_client::ChecksumAlgorithm::Sha1.digest_hex(&binary);
        FakeUpdateServer {
            info: Ok(format!("{}\n{}\n", version, checksum)),
            binary: Ok(binary),
            binary_requests: Arc::new(Mutex::new(0)),
        }
    }
}

impl UpdateServer for FakeUpdateServer {
    fn fetch_info(&self) -> Result<String, UpdateServerError> {
        self.info.clone().map_err(|status| UpdateServerError::Status {
            url: "update.txt".to_string(),
            status,
        })
    }

    fn fetch_binary(&self, max_size: usize) -> Result<Vec<u8>, UpdateServerError> {
        *self.binary_requests.lock() += 1;
        let binary = self.binary.clone().map_err(|status| UpdateServerError::Status {
            url: "firmware.bin".to_string(),
            status,
        })?;
        if binary.len() > max_size {
            return Err(UpdateServerError::TooLarge {
                max: max_size,
                actual: binary.len(),
            });
        }
        Ok(binary)
    }
}
