//! Test helpers: an in-process fake detection service
//!
//! The fake speaks the service side of the protocol from a script and records
//! what it received, so tests can assert on both ends of the exchange.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the fake sends after the second ready signal
#[derive(Debug, Clone)]
pub enum Reply {
    /// Announce and send this JSON text
    Json(String),
    /// Announce a zero-length payload
    ZeroLength,
    /// Announce `announced` bytes, send `sent`, then close
    Truncated { announced: i32, sent: Vec<u8> },
    /// Announce an arbitrary length and send nothing
    Length(i32),
}

/// Service behaviour for one connection
#[derive(Debug, Clone)]
pub struct Script {
    /// Status answered after each body transfer, in order; the last repeats
    pub statuses: Vec<i32>,
    pub reply: Reply,
    /// Send the payload in pieces of this size with a pause between them
    pub fragment: Option<usize>,
    /// Stop responding after the extension ack
    pub stall_after_extension: bool,
}

impl Script {
    pub fn json(json: &str) -> Self {
        Self {
            statuses: vec![0],
            reply: Reply::Json(json.to_string()),
            fragment: None,
            stall_after_extension: false,
        }
    }

    pub fn reply(reply: Reply) -> Self {
        Self {
            statuses: vec![0],
            reply,
            fragment: None,
            stall_after_extension: false,
        }
    }

    pub fn with_statuses(mut self, statuses: &[i32]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn fragmented(mut self, size: usize) -> Self {
        self.fragment = Some(size);
        self
    }

    pub fn stalling(mut self) -> Self {
        self.stall_after_extension = true;
        self
    }
}

/// What the fake received on one connection
#[derive(Debug, Clone, Default)]
pub struct Received {
    pub extension: String,
    pub size: String,
    /// One entry per body transfer
    pub bodies: Vec<Vec<u8>>,
    pub ready_signals: Vec<u8>,
}

/// Handle to a running fake service
pub struct FakeService {
    pub address: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl FakeService {
    /// Start a fake answering connections with `scripts` in order
    ///
    /// The last script is reused once the queue runs out. Connections that
    /// close without sending anything (reachability probes) are ignored.
    pub async fn start(scripts: Vec<Script>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = received.clone();
        tokio::spawn(async move {
            let mut queue: VecDeque<Script> = scripts.into();
            let mut last = queue.back().cloned();

            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };

                let mut first = [0u8; 256];
                let n = stream.read(&mut first).await.unwrap_or(0);
                if n == 0 {
                    continue;
                }

                let script = match queue.pop_front() {
                    Some(script) => {
                        last = Some(script.clone());
                        script
                    }
                    None => match &last {
                        Some(script) => script.clone(),
                        None => return,
                    },
                };

                let extension = String::from_utf8_lossy(&first[..n]).into_owned();
                let record = serve(&mut stream, extension, &script).await;
                log.lock().unwrap().push(record);
            }
        });

        Self { address, received }
    }

    /// Connections served so far
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// Wait until `count` connections have been served
    pub async fn wait_for(&self, count: usize) -> Vec<Received> {
        for _ in 0..200 {
            let received = self.received();
            if received.len() >= count {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.received()
    }
}

async fn serve(stream: &mut TcpStream, extension: String, script: &Script) -> Received {
    let mut record = Received {
        extension,
        ..Default::default()
    };

    stream.write_i32(1).await.unwrap();

    if script.stall_after_extension {
        tokio::time::sleep(Duration::from_secs(5)).await;
        return record;
    }

    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).await.unwrap();
    record.size = String::from_utf8_lossy(&buf[..n]).into_owned();
    stream.write_i32(1).await.unwrap();

    let size: usize = record.size.parse().unwrap();
    let mut attempt = 0;
    loop {
        let mut body = vec![0u8; size];
        if stream.read_exact(&mut body).await.is_err() {
            return record;
        }
        record.bodies.push(body);

        let status = script.statuses[attempt.min(script.statuses.len() - 1)];
        attempt += 1;
        if stream.write_i32(status).await.is_err() {
            return record;
        }
        if status != -1 {
            break;
        }
    }

    let mut ready = [0u8; 1];
    if stream.read_exact(&mut ready).await.is_err() {
        return record;
    }
    record.ready_signals.push(ready[0]);

    match &script.reply {
        Reply::Json(json) => {
            stream.write_i32(json.len() as i32).await.unwrap();
            stream.read_exact(&mut ready).await.unwrap();
            record.ready_signals.push(ready[0]);

            match script.fragment {
                Some(size) => {
                    for piece in json.as_bytes().chunks(size) {
                        stream.write_all(piece).await.unwrap();
                        stream.flush().await.unwrap();
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                }
                None => stream.write_all(json.as_bytes()).await.unwrap(),
            }
        }
        Reply::ZeroLength => {
            stream.write_i32(0).await.unwrap();
            stream.read_exact(&mut ready).await.unwrap();
            record.ready_signals.push(ready[0]);
        }
        Reply::Truncated { announced, sent } => {
            stream.write_i32(*announced).await.unwrap();
            stream.read_exact(&mut ready).await.unwrap();
            record.ready_signals.push(ready[0]);
            stream.write_all(sent).await.unwrap();
        }
        Reply::Length(length) => {
            stream.write_i32(*length).await.unwrap();
            let _ = stream.read_exact(&mut ready).await;
            record.ready_signals.push(ready[0]);
        }
    }

    let _ = stream.shutdown().await;
    record
}

/// An address nothing listens on
pub fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);
    address
}

/// Default settings pointed at `address`
pub fn settings_for(address: &str) -> triage_common::Settings {
    let (host, port) = address.rsplit_once(':').unwrap();
    let mut settings = triage_common::Settings::default();
    settings.server = triage_common::ServerEndpoint {
        host: host.to_string(),
        port: port.parse().unwrap(),
    };
    settings
}

/// Transport options with short timeouts and no backoff
pub fn fast_options() -> triage_ic::services::TransportOptions {
    triage_ic::services::TransportOptions {
        connect_timeout: Duration::from_millis(500),
        io_timeout: Duration::from_millis(500),
        max_resend_attempts: 3,
        resend_backoff: Duration::ZERO,
        max_payload_bytes: 64 * 1024,
    }
}

/// Deterministic image body of `len` bytes
pub fn image_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
