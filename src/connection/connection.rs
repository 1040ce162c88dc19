use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, Receiver};
use tokio::sync::oneshot;
use crate::connection::session::{Session, SessionId};
use crate::connection::state::SessionState;
use crate::server::{ServerContext, ShutdownSignal, StreamEvent};
use crate::{Error, Result};

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Upper bound on a sleep when no timer is scheduled
const IDLE_WAIT: Duration = Duration::from_secs(3600);

type AuthReceiver = oneshot::Receiver<std::result::Result<(), String>>;

/// Drives one [`Session`] over a socket.
///
/// Socket reads, registry events, timer deadlines and pending authorization
/// decisions all feed the session from a single task, so the session never
/// needs a lock.
pub struct Connection<S> {
    stream: S,
    session: Session,
    events: Receiver<StreamEvent>,
    shutdown: Option<Arc<ShutdownSignal>>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create new connection
    pub fn new(stream: S, context: Arc<ServerContext>) -> Self {
        let (events_tx, events) = mpsc::channel(context.config().subscriber_queue_size);

        Connection {
            stream,
            session: Session::new(context, events_tx),
            events,
            shutdown: None,
        }
    }

    /// Close the connection when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: Arc<ShutdownSignal>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn id(&self) -> SessionId {
        self.session.id()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until the peer disconnects, the session stops or shutdown is
    /// signalled. The session is always stopped on return.
    pub async fn run(mut self) -> Result<()> {
        let result = self.process().await;
        self.session.stop();
        if result.is_ok() {
            // Last status messages, best effort
            if let Err(e) = self.flush().await {
                debug!("Session {} final flush failed: {}", self.session.id(), e);
            }
        }
        result
    }

    async fn process(&mut self) -> Result<()> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut pending_auth: Option<AuthReceiver> = None;
        let shutdown = self.shutdown.clone();

        loop {
            self.flush().await?;
            if !self.session.is_active() {
                return Ok(());
            }

            if pending_auth.is_none() {
                pending_auth = self.session.take_pending_authorization();
            }
            let deadline = self
                .session
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + IDLE_WAIT);

            tokio::select! {
                read = self.stream.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        if self.session.state() == SessionState::Handshaking {
                            return Err(Error::connection("Peer closed during handshake"));
                        }
                        debug!("Session {} peer closed the connection", self.session.id());
                        return Ok(());
                    }
                    self.session.feed(&buf[..n])?;
                }
                Some(event) = self.events.recv() => {
                    self.session.handle_stream_event(event)?;
                }
                _ = tokio::time::sleep_until(deadline.into()) => {
                    self.session.poll_timers(Instant::now())?;
                }
                verdict = async {
                    match pending_auth.as_mut() {
                        Some(receiver) => receiver.await,
                        None => std::future::pending().await,
                    }
                }, if pending_auth.is_some() => {
                    pending_auth = None;
                    let verdict = verdict.unwrap_or_else(|_| {
                        warn!("Session {} authorizer dropped its decision", self.session.id());
                        Err(String::new())
                    });
                    self.session.resolve_authorization(verdict)?;
                }
                _ = async {
                    match &shutdown {
                        Some(signal) => signal.wait().await,
                        None => std::future::pending().await,
                    }
                } => {
                    debug!("Session {} closing for shutdown", self.session.id());
                    return Ok(());
                }
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        if self.session.has_output() {
            let output = self.session.take_output();
            self.stream.write_all(&output).await?;
            self.stream.flush().await?;
        }
        Ok(())
    }
}
