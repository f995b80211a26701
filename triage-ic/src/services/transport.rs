//! Detection service transport
//!
//! One TCP connection per classified file. The exchange, with every integer
//! a 4-byte big-endian `i32`:
//!
//! | Step | Dir | Payload |
//! |---|---|---|
//! | 1 | → | extension with leading dot, raw bytes |
//! | 1 | ← | ack |
//! | 2 | → | file size as decimal text, raw bytes |
//! | 2 | ← | ack |
//! | 3 | → | body in 1024-byte chunks |
//! | 3 | ← | status: `-1` resend the whole body, `>= 0` accepted |
//! | 4 | → | ready byte (`1`) |
//! | 5 | ← | payload length `N` |
//! | 6 | → | ready byte (`1`) |
//! | 7 | ← | `N` bytes of UTF-8 JSON |
//!
//! The service has no retry ceiling of its own; resends are bounded by
//! [`TransportOptions::max_resend_attempts`] and every socket operation by
//! [`TransportOptions::io_timeout`].

use std::future::Future;
use std::io::SeekFrom;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use triage_common::config::TransportConfig;
use triage_common::Settings;

use crate::error::ClassifyError;
use crate::models::{DetectionResult, ScannedFile};
use crate::services::decoder::decode;

/// Body chunk size
pub const CHUNK_SIZE: usize = 1024;

/// Status the service sends when the body must be transferred again
pub const RESEND_STATUS: i32 = -1;

const READY_SIGNAL: [u8; 1] = [1];

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Timeouts and resend bounds for one classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
    /// Retransmissions allowed after the first body transfer
    pub max_resend_attempts: u32,
    pub resend_backoff: Duration,
    /// Announced payload lengths above this are rejected before reading
    pub max_payload_bytes: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

impl From<&TransportConfig> for TransportOptions {
    fn from(config: &TransportConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            io_timeout: Duration::from_millis(config.io_timeout_ms),
            max_resend_attempts: config.max_resend_attempts,
            resend_backoff: Duration::from_millis(config.resend_backoff_ms),
            max_payload_bytes: config.max_payload_bytes,
        }
    }
}

/// Detection service client
#[derive(Debug, Clone, Default)]
pub struct DetectionClient {
    options: TransportOptions,
}

impl DetectionClient {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Classify the local copy of `file`
    ///
    /// Settings are snapshotted on entry; the socket is closed on every exit
    /// path when the session is dropped.
    pub async fn classify(
        &self,
        settings: &Settings,
        file: &ScannedFile,
    ) -> Result<DetectionResult, ClassifyError> {
        let settings = settings.clone();
        let extension = file.dotted_extension();

        let mut body = tokio::fs::File::open(&file.path).await?;
        let size = body.metadata().await?.len();

        info!(file = %file.path.display(), bytes = size, "Classifying image");
        self.classify_reader(&settings, &extension, &mut body, size).await
    }

    /// Classify `size` bytes read from `body`
    ///
    /// `body` must be seekable: a resend restarts the transfer from offset 0.
    pub async fn classify_reader<R>(
        &self,
        settings: &Settings,
        extension: &str,
        body: &mut R,
        size: u64,
    ) -> Result<DetectionResult, ClassifyError>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        let mut session = TransportSession::connect(&settings.server.address(), &self.options).await?;
        session.exchange(extension, body, size).await
    }
}

/// Check whether the detection service accepts connections
///
/// Opens and immediately closes a connection; no protocol exchange.
pub async fn probe(address: &str, connect_timeout: Duration) -> bool {
    match timeout(connect_timeout, TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => {
            debug!(address, "Detection service reachable");
            true
        }
        Ok(Err(e)) => {
            debug!(address, error = %e, "Detection service unreachable");
            false
        }
        Err(_) => {
            debug!(address, "Detection service probe timed out");
            false
        }
    }
}

/// A single connection to the detection service
///
/// Owned by one classification and never reused.
struct TransportSession {
    stream: TcpStream,
    options: TransportOptions,
}

impl TransportSession {
    async fn connect(address: &str, options: &TransportOptions) -> Result<Self, ClassifyError> {
        let stream = match timeout(options.connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ClassifyError::Connect {
                    address: address.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ClassifyError::Connect {
                    address: address.to_string(),
                    reason: format!("timed out after {:?}", options.connect_timeout),
                })
            }
        };

        Ok(Self {
            stream,
            options: options.clone(),
        })
    }

    async fn exchange<R>(
        &mut self,
        extension: &str,
        body: &mut R,
        size: u64,
    ) -> Result<DetectionResult, ClassifyError>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        self.send(extension.as_bytes(), "sending extension").await?;
        self.recv_i32("reading extension ack").await?;

        self.send(size.to_string().as_bytes(), "sending file size").await?;
        self.recv_i32("reading file size ack").await?;

        self.transfer_body(body, size).await?;

        self.send(&READY_SIGNAL, "signalling ready").await?;
        let length = self.recv_i32("reading payload length").await?;
        self.send(&READY_SIGNAL, "signalling ready").await?;

        if length < 0 {
            return Err(ClassifyError::Protocol(format!(
                "negative payload length {}",
                length
            )));
        }
        if length == 0 {
            debug!("Service sent no payload");
            return Ok(DetectionResult::Empty);
        }

        let length = length as usize;
        if length > self.options.max_payload_bytes {
            return Err(ClassifyError::Protocol(format!(
                "payload length {} exceeds the {} byte limit",
                length, self.options.max_payload_bytes
            )));
        }

        let payload = self.recv_payload(length).await?;
        decode(&payload)
    }

    /// Send the body until the service accepts it
    async fn transfer_body<R>(&mut self, body: &mut R, size: u64) -> Result<(), ClassifyError>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        let mut resends = 0u32;

        loop {
            body.seek(SeekFrom::Start(0)).await?;
            self.send_chunks(body, size).await?;

            let status = self.recv_i32("reading transfer status").await?;
            if status >= 0 {
                if resends > 0 {
                    info!(resends, "Body accepted after resend");
                }
                return Ok(());
            }
            if status != RESEND_STATUS {
                return Err(ClassifyError::Protocol(format!(
                    "unexpected transfer status {}",
                    status
                )));
            }

            resends += 1;
            if resends > self.options.max_resend_attempts {
                return Err(ClassifyError::Transfer { attempts: resends });
            }

            warn!(
                attempt = resends,
                max = self.options.max_resend_attempts,
                "Service requested resend"
            );
            tokio::time::sleep(self.options.resend_backoff).await;
        }
    }

    async fn send_chunks<R>(&mut self, body: &mut R, size: u64) -> Result<(), ClassifyError>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut remaining = size;

        while remaining > 0 {
            let len = remaining.min(CHUNK_SIZE as u64) as usize;
            body.read_exact(&mut chunk[..len]).await?;
            self.send(&chunk[..len], "sending body").await?;
            remaining -= len as u64;
        }

        Ok(())
    }

    /// Read exactly `expected` bytes, looping over partial reads
    ///
    /// The buffer grows with the bytes actually received.
    async fn recv_payload(&mut self, expected: usize) -> Result<Vec<u8>, ClassifyError> {
        debug!(bytes = expected, "Receiving payload");

        let mut payload = Vec::with_capacity(expected.min(READ_BUFFER_SIZE));
        let mut buf = [0u8; READ_BUFFER_SIZE];

        while payload.len() < expected {
            let want = (expected - payload.len()).min(READ_BUFFER_SIZE);
            let io_timeout = self.options.io_timeout;
            let n = with_timeout(io_timeout, "reading payload", self.stream.read(&mut buf[..want])).await?;

            if n == 0 {
                return Err(ClassifyError::TruncatedResponse {
                    received: payload.len(),
                    expected,
                });
            }
            payload.extend_from_slice(&buf[..n]);

            if payload.len() < expected {
                debug!(received = payload.len(), expected, "Partial payload read");
            }
        }

        Ok(payload)
    }

    async fn send(&mut self, bytes: &[u8], operation: &'static str) -> Result<(), ClassifyError> {
        let io_timeout = self.options.io_timeout;
        with_timeout(io_timeout, operation, self.stream.write_all(bytes)).await
    }

    async fn recv_i32(&mut self, operation: &'static str) -> Result<i32, ClassifyError> {
        let io_timeout = self.options.io_timeout;
        let value = with_timeout(io_timeout, operation, self.stream.read_i32()).await?;
        debug!(operation, value, "Received integer");
        Ok(value)
    }
}

async fn with_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    future: F,
) -> Result<T, ClassifyError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match timeout(limit, future).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ClassifyError::Timeout {
            operation,
            timeout: limit,
        }),
    }
}
