//! Threaded mock FINS/TCP PLC for integration tests.
//!
//! The mock answers the node-address handshake, serves memory reads and
//! writes from an in-memory word map and checks every command frame it
//! receives. Switches on [`MockState`] inject failures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

/// Node number the mock reports for itself.
pub const PLC_NODE: u8 = 0x01;

/// Node number handed to the first client; later handshakes count up.
pub const FIRST_CLIENT_NODE: u8 = 0x22;

/// Shared mock state and failure switches.
#[derive(Default)]
pub struct MockState {
    memory: Mutex<HashMap<(u8, u16), u16>>,
    /// Successful handshakes.
    pub handshakes: AtomicUsize,
    /// Command frames received.
    pub requests: AtomicUsize,
    /// Frames that failed validation.
    pub bad_frames: AtomicUsize,
    /// Answer handshakes with header error 0x01.
    pub reject_handshake: AtomicBool,
    /// End code returned instead of success.
    pub end_code: Mutex<Option<(u8, u8)>>,
    /// Reply with an error frame carrying this header error code.
    pub header_error: Mutex<Option<u8>>,
    /// Echo a wrong SID.
    pub corrupt_sid: AtomicBool,
    /// Echo `0102` for reads and `0101` for writes.
    pub swap_command: AtomicBool,
    /// Close the connection instead of answering the next request.
    pub drop_next: AtomicBool,
    /// Swallow requests without answering.
    pub stall: AtomicBool,
}

fn word_area(code: u8) -> (u8, bool) {
    match code {
        0x30 => (0xB0, true),
        0x31 => (0xB1, true),
        0x32 => (0xB2, true),
        0x33 => (0xB3, true),
        0x02 => (0x82, true),
        0x09 => (0x89, true),
        other => (other, false),
    }
}

impl MockState {
    /// Returns a stored word (0 when never written).
    pub fn word(&self, word_code: u8, channel: u16) -> u16 {
        self.memory
            .lock()
            .get(&(word_code, channel))
            .copied()
            .unwrap_or(0)
    }

    /// Stores a word.
    pub fn set_word(&self, word_code: u8, channel: u16, value: u16) {
        self.memory.lock().insert((word_code, channel), value);
    }

    fn valid_command(frame: &[u8], client_node: u8) -> bool {
        if frame.len() < 34 || &frame[0..4] != b"FINS" {
            return false;
        }
        let length = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]) as usize;
        let count = u16::from_be_bytes([frame[32], frame[33]]) as usize;
        let (_, is_bit) = word_area(frame[28]);
        let payload = frame.len() - 34;
        let payload_ok = match frame[27] {
            0x01 => payload == 0,
            0x02 if is_bit => payload == count,
            0x02 => payload == count * 2,
            _ => false,
        };
        length == frame.len() - 8
            && frame[8..16] == [0, 0, 0, 2, 0, 0, 0, 0]
            && frame[16] == 0x80
            && frame[18] == 0x02
            && frame[20] == PLC_NODE
            && frame[23] == client_node
            && frame[26] == 0x01
            && (1..=999).contains(&count)
            && payload_ok
    }

    fn execute(&self, frame: &[u8]) -> Vec<u8> {
        let (area, is_bit) = word_area(frame[28]);
        let channel = u16::from_be_bytes([frame[29], frame[30]]);
        let bit = u32::from(frame[31]);
        let count = u16::from_be_bytes([frame[32], frame[33]]);
        let payload = &frame[34..];
        let mut memory = self.memory.lock();
        let mut data = Vec::new();

        for i in 0..count {
            if is_bit {
                let absolute = bit + u32::from(i);
                let key = (area, channel.wrapping_add((absolute / 16) as u16));
                let mask = 1u16 << (absolute % 16);
                let word = memory.entry(key).or_insert(0);
                if frame[27] == 0x01 {
                    data.push(u8::from(*word & mask != 0));
                } else if payload[i as usize] != 0 {
                    *word |= mask;
                } else {
                    *word &= !mask;
                }
            } else {
                let key = (area, channel.wrapping_add(i));
                if frame[27] == 0x01 {
                    let word = memory.get(&key).copied().unwrap_or(0);
                    data.extend_from_slice(&word.to_be_bytes());
                } else {
                    let at = i as usize * 2;
                    memory.insert(key, u16::from_be_bytes([payload[at], payload[at + 1]]));
                }
            }
        }
        data
    }

    fn respond(&self, frame: &[u8], client_node: u8) -> Vec<u8> {
        if let Some(code) = *self.header_error.lock() {
            let mut reply = b"FINS".to_vec();
            reply.extend_from_slice(&[0, 0, 0, 8, 0, 0, 0, 3, 0, 0, 0, code]);
            return reply;
        }

        let sid = if self.corrupt_sid.load(Ordering::SeqCst) {
            frame[25] ^ 0xFF
        } else {
            frame[25]
        };
        let src = if self.swap_command.load(Ordering::SeqCst) {
            frame[27] ^ 0x03
        } else {
            frame[27]
        };
        let (main, sub) = self.end_code.lock().unwrap_or((0, 0));
        let data = if main == 0 && (sub == 0 || sub == 0x40) {
            self.execute(frame)
        } else {
            Vec::new()
        };

        let mut body = vec![
            0xC0, 0x00, 0x02, 0x00, client_node, 0x00, 0x00, PLC_NODE, 0x00, sid, frame[26], src,
            main, sub,
        ];
        body.extend_from_slice(&data);

        let mut reply = b"FINS".to_vec();
        reply.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
        reply.extend_from_slice(&[0, 0, 0, 2, 0, 0, 0, 0]);
        reply.extend_from_slice(&body);
        reply
    }
}

fn handshake_reply(error: u8, client_node: u8) -> Vec<u8> {
    let mut reply = b"FINS".to_vec();
    reply.extend_from_slice(&[0, 0, 0, 0x10, 0, 0, 0, 1, 0, 0, 0, error]);
    reply.extend_from_slice(&[0, 0, 0, client_node, 0, 0, 0, PLC_NODE]);
    reply
}

fn serve(mut stream: TcpStream, state: Arc<MockState>) {
    let mut request = [0u8; 20];
    if stream.read_exact(&mut request).is_err() {
        // Reachability probes connect and hang up.
        return;
    }
    if &request[0..4] != b"FINS" || request[4..12] != [0, 0, 0, 0x0C, 0, 0, 0, 0] {
        state.bad_frames.fetch_add(1, Ordering::SeqCst);
        return;
    }
    if state.reject_handshake.load(Ordering::SeqCst) {
        let _ = stream.write_all(&handshake_reply(0x01, 0));
        return;
    }
    let index = state.handshakes.fetch_add(1, Ordering::SeqCst);
    let client_node = FIRST_CLIENT_NODE.wrapping_add(index as u8);
    if stream.write_all(&handshake_reply(0, client_node)).is_err() {
        return;
    }

    loop {
        let mut prefix = [0u8; 8];
        if stream.read_exact(&mut prefix).is_err() {
            return;
        }
        let length = u32::from_be_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]) as usize;
        let mut frame = prefix.to_vec();
        frame.resize(8 + length, 0);
        if stream.read_exact(&mut frame[8..]).is_err() {
            return;
        }
        state.requests.fetch_add(1, Ordering::SeqCst);

        if !MockState::valid_command(&frame, client_node) {
            state.bad_frames.fetch_add(1, Ordering::SeqCst);
            return;
        }
        if state.drop_next.swap(false, Ordering::SeqCst) {
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
        if state.stall.load(Ordering::SeqCst) {
            continue;
        }
        if stream.write_all(&state.respond(&frame, client_node)).is_err() {
            return;
        }
    }
}

/// A mock PLC listening on a loopback port.
pub struct MockPlc {
    addr: SocketAddr,
    state: Arc<MockState>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockPlc {
    /// Starts the mock on an ephemeral port.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock PLC");
        let addr = listener.local_addr().expect("mock address");
        let state = Arc::new(MockState::default());
        let stop = Arc::new(AtomicBool::new(false));

        let server_state = Arc::clone(&state);
        let server_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            for stream in listener.incoming() {
                if server_stop.load(Ordering::SeqCst) {
                    break;
                }
                if let Ok(stream) = stream {
                    let state = Arc::clone(&server_state);
                    thread::spawn(move || serve(stream, state));
                }
            }
        });

        Self {
            addr,
            state,
            stop,
            handle: Some(handle),
        }
    }

    /// Returns the listening address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the shared state.
    pub fn state(&self) -> &MockState {
        &self.state
    }
}

impl Drop for MockPlc {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the accept loop.
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
