//! Unix socket client for communicating with the driveguard daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};
use uuid::Uuid;

use driveguard_protocol::{
    Envelope, Request, Response, StatusInfo, decode_payload, encode_frame, frame_len,
};

use crate::error::{ClientError, ClientResult};

/// Client for communicating with the driveguard daemon over a Unix socket.
pub struct SocketClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl SocketClient {
    /// Creates a new socket client.
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Checks if the daemon socket exists.
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Sends a request and waits for a response.
    pub async fn send(&self, request: Request) -> ClientResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        let envelope = Envelope::request(&request_id, request);

        debug!(
            socket = %self.socket_path.display(),
            request_id = %request_id,
            "connecting to daemon"
        );

        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| {
                ClientError::Connection(format!(
                    "connection timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                ClientError::Connection(format!(
                    "failed to connect to {}: {}",
                    self.socket_path.display(),
                    e
                ))
            })?;

        let response = self.exchange(stream, &envelope).await?;

        if response.request_id != request_id {
            warn!(
                expected = %request_id,
                received = %response.request_id,
                "response request_id mismatch"
            );
        }

        Ok(response.payload)
    }

    /// Sends a request and fails on a wire-level error response.
    pub async fn send_expecting_ok(&self, request: Request) -> ClientResult<Response> {
        match self.send(request).await? {
            Response::Error { error } => Err(ClientError::Server(error)),
            other => Ok(other),
        }
    }

    /// Performs the framed request-response exchange on a connected stream.
    async fn exchange(
        &self,
        mut stream: UnixStream,
        envelope: &Envelope<Request>,
    ) -> ClientResult<Envelope<Response>> {
        let frame = encode_frame(envelope)
            .map_err(|e| ClientError::Protocol(format!("failed to encode request: {}", e)))?;

        tokio::time::timeout(self.timeout, async {
            stream.write_all(&frame).await?;
            stream.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        .map_err(|_| ClientError::Timeout("sending request".into()))?
        .map_err(ClientError::Io)?;

        debug!("request sent, waiting for response");

        let mut prefix = [0u8; 4];
        tokio::time::timeout(self.timeout, stream.read_exact(&mut prefix))
            .await
            .map_err(|_| ClientError::Timeout("reading response length".into()))?
            .map_err(ClientError::Io)?;

        let len = frame_len(prefix)
            .map_err(|e| ClientError::Protocol(format!("bad response frame: {}", e)))?;

        let mut payload = vec![0u8; len];
        tokio::time::timeout(self.timeout, stream.read_exact(&mut payload))
            .await
            .map_err(|_| ClientError::Timeout("reading response".into()))?
            .map_err(ClientError::Io)?;

        let envelope: Envelope<Response> = decode_payload(&payload)
            .map_err(|e| ClientError::Protocol(format!("failed to decode response: {}", e)))?;

        debug!(request_id = %envelope.request_id, "response received");

        Ok(envelope)
    }

    /// Pings the daemon to check if it's alive.
    pub async fn ping(&self) -> ClientResult<bool> {
        match self.send(Request::Ping).await {
            Ok(Response::Pong) => Ok(true),
            Ok(_) => Ok(false),
            Err(_) => Ok(false),
        }
    }

    /// Fetches the daemon status.
    pub async fn status(&self) -> ClientResult<StatusInfo> {
        match self.send_expecting_ok(Request::Status).await? {
            Response::Status { info } => Ok(info),
            other => Err(ClientError::Protocol(format!(
                "unexpected response to Status: {:?}",
                other
            ))),
        }
    }

    /// Asks the daemon to shut down.
    pub async fn shutdown(&self) -> ClientResult<()> {
        match self.send_expecting_ok(Request::Shutdown).await? {
            Response::Ok => Ok(()),
            other => Err(ClientError::Protocol(format!(
                "unexpected response to Shutdown: {:?}",
                other
            ))),
        }
    }
}
