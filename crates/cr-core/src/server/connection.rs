//! Line-oriented terminal exchange for one client.
//!
//! Login prompts, echo and line splitting live here; what to answer is
//! decided by [`SimulatedSession`].

use super::auth::Authenticator;
use super::session::{Effect, SimulatedSession};
use super::ServerError;
use crate::catalog::EventCatalog;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Longest accepted input line, terminator included.
pub const MAX_LINE_BYTES: usize = 4096;

/// One accepted client.
pub struct Connection<S> {
    stream: BufReader<S>,
    peer: String,
    id: Uuid,
    catalog: Arc<EventCatalog>,
    auth: Arc<Authenticator>,
    secondary_credential: String,
    shutdown_rx: broadcast::Receiver<()>,
    echo: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        catalog: Arc<EventCatalog>,
        auth: Arc<Authenticator>,
        secondary_credential: impl Into<String>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            stream: BufReader::new(stream),
            peer: peer.into(),
            id: Uuid::new_v4(),
            catalog,
            auth,
            secondary_credential: secondary_credential.into(),
            shutdown_rx,
            echo: true,
        }
    }

    /// Serve the client until it disconnects, a closing input is received,
    /// or the server shuts down.
    pub async fn handle(mut self) -> Result<(), ServerError> {
        let Some(username) = self.login().await? else {
            debug!(id = %self.id, peer = %self.peer, "client left during login");
            return Ok(());
        };
        info!(id = %self.id, peer = %self.peer, %username, "session started");

        let mut session = SimulatedSession::new(
            Arc::clone(&self.catalog),
            self.secondary_credential.clone(),
        );
        self.apply(session.start()).await?;

        while let Some(line) = self.read_line().await? {
            if self.echo {
                self.send(&format!("{}\n", line.trim_end_matches('\n'))).await?;
            }
            if self.apply(session.handle_input(&line)).await? {
                info!(id = %self.id, peer = %self.peer, "session closed by input");
                break;
            }
        }

        self.stream.get_mut().shutdown().await.ok();
        Ok(())
    }

    async fn login(&mut self) -> Result<Option<String>, ServerError> {
        let max_attempts = self.auth.max_attempts().max(1);
        let mut username = String::new();

        for attempt in 1..=max_attempts {
            self.send("Username: ").await?;
            let Some(line) = self.read_line().await? else {
                return Ok(None);
            };
            username = if line == "\n" { String::new() } else { line };
            self.send(&format!("{}\n", username)).await?;

            self.send("Password: ").await?;
            let Some(password) = self.read_line().await? else {
                return Ok(None);
            };
            self.send("\n").await?;

            if self.auth.validate_secret(&username, &password) {
                return Ok(Some(username));
            }
            warn!(id = %self.id, peer = %self.peer, %username, attempt, "login rejected");
            self.send("Login incorrect\n").await?;
        }

        self.stream.get_mut().shutdown().await.ok();
        Err(ServerError::AuthFailed { username })
    }

    /// Next input line without its terminator; an empty line is the bare
    /// terminator. `None` on EOF or shutdown.
    async fn read_line(&mut self) -> Result<Option<String>, ServerError> {
        let mut buf = Vec::new();
        let mut limited = (&mut self.stream).take(MAX_LINE_BYTES as u64);
        let read = tokio::select! {
            read = limited.read_until(b'\n', &mut buf) => read?,
            _ = self.shutdown_rx.recv() => {
                debug!(id = %self.id, "shutdown during read");
                return Ok(None);
            }
        };
        if read == 0 {
            return Ok(None);
        }
        if read == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            warn!(id = %self.id, peer = %self.peer, "input line too long");
            return Err(ServerError::LineTooLong {
                limit: MAX_LINE_BYTES,
            });
        }

        let line: String = String::from_utf8_lossy(&buf)
            .chars()
            .filter(|&c| c != '\r' && c != '\n')
            .collect();
        Ok(Some(if line.is_empty() { "\n".to_string() } else { line }))
    }

    async fn send(&mut self, text: &str) -> Result<(), ServerError> {
        let stream = self.stream.get_mut();
        stream.write_all(text.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Apply effects; returns true once the session must close.
    async fn apply(&mut self, effects: Vec<Effect>) -> Result<bool, ServerError> {
        for effect in effects {
            match effect {
                Effect::Write(text) => self.send(&text).await?,
                Effect::SetEcho(echo) => self.echo = echo,
                Effect::Close => {
                    self.send("\n").await?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
