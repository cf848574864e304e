//! Unix socket listener for the daemon.
//!
//! [`SocketServer`] owns the listening socket (removing the socket file when
//! dropped) and runs the accept loop until shutdown. [`Connection`] wraps one
//! accepted client and speaks the framed envelope exchange with a deadline on
//! every read and write.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use driveguard_protocol::{
    Envelope, PROTOCOL_VERSION, ProtocolError, Request, Response, decode_payload, encode_frame,
    frame_len,
};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Upper bound on concurrently served clients.
const MAX_ACTIVE_CONNECTIONS: usize = 64;

/// The daemon's listening socket.
pub struct SocketServer {
    config: ServerConfig,
    listener: UnixListener,
    permits: Arc<Semaphore>,
}

impl SocketServer {
    /// Binds the daemon socket.
    ///
    /// A leftover socket file is checked first: if something answers on it, a
    /// daemon is already running and binding fails; if nothing does, the
    /// stale file is removed and the path reclaimed.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        let path = &config.socket_path;

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            return Err(ServerError::config(format!(
                "socket directory {} does not exist",
                parent.display()
            )));
        }

        if path.exists() {
            if UnixStream::connect(path).await.is_ok() {
                return Err(ServerError::socket_busy(path.to_string_lossy()));
            }
            info!(path = %path.display(), "removing stale socket file");
            std::fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(path)?;
        info!(path = %path.display(), "listening");

        Ok(Self {
            listener,
            permits: Arc::new(Semaphore::new(MAX_ACTIVE_CONNECTIONS)),
            config,
        })
    }

    /// Returns the bound socket path.
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Accepts one client, waiting for a free connection slot.
    pub async fn accept(&self) -> ServerResult<Connection> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("connection semaphore closed");

        let (stream, _) = self.listener.accept().await?;
        debug!("client connected");

        Ok(Connection {
            stream,
            timeout: self.config.connection_timeout,
            _permit: permit,
        })
    }

    /// Accepts clients and spawns `handler` for each until `shutdown` fires.
    ///
    /// Accept failures are logged and the loop keeps going; only the
    /// shutdown future ends it.
    pub async fn serve<F, Fut, S>(&self, handler: F, shutdown: S) -> ServerResult<()>
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
        S: std::future::Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown signal received, closing listener");
                    return Ok(());
                }
                accepted = self.accept() => match accepted {
                    Ok(connection) => {
                        tokio::spawn(handler(connection));
                    }
                    Err(e) => error!(error = %e, "failed to accept connection"),
                },
            }
        }
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.config.socket_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(
                path = %self.config.socket_path.display(),
                error = %e,
                "failed to remove socket file"
            );
        }
    }
}

/// One accepted client connection.
pub struct Connection {
    stream: UnixStream,
    timeout: Duration,
    _permit: OwnedSemaphorePermit,
}

impl Connection {
    /// Reads the next request envelope, or `None` once the client hangs up.
    pub async fn read_request(&mut self) -> ServerResult<Option<Envelope<Request>>> {
        let mut prefix = [0u8; 4];
        match timeout(self.timeout, self.stream.read_exact(&mut prefix)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(deadline_missed("read request length")),
        }

        let len = frame_len(prefix)?;
        let mut payload = vec![0u8; len];
        match timeout(self.timeout, self.stream.read_exact(&mut payload)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(deadline_missed("read request payload")),
        }

        let envelope: Envelope<Request> = decode_payload(&payload)?;
        if !envelope.is_compatible() {
            warn!(
                version = %envelope.protocol_version,
                expected = %PROTOCOL_VERSION,
                "client speaks a different protocol version"
            );
        }

        Ok(Some(envelope))
    }

    /// Frames and writes the response for a handled request.
    pub async fn respond(
        &mut self,
        request_id: impl Into<String>,
        response: Response,
    ) -> ServerResult<()> {
        let frame = encode_frame(&Envelope::response(request_id, response))?;

        match timeout(self.timeout, self.stream.write_all(&frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(deadline_missed("write response")),
        }
    }
}

fn deadline_missed(operation: &str) -> ServerError {
    ServerError::Protocol(ProtocolError::Timeout {
        operation: operation.to_string(),
    })
}
