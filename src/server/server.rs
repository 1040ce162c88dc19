use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use crate::connection::Connection;
use crate::server::bind_server;
use crate::server::config::ServerConfig;
use crate::server::context::ServerContext;
use crate::Result;

/// One-shot shutdown flag that async tasks can wait on
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        ShutdownSignal::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once [`trigger`](Self::trigger) has been called
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent trigger is not lost
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

pub struct RtmpServer {
    /// Shared by every connection
    context: Arc<ServerContext>,

    shutdown: Arc<ShutdownSignal>,
}

impl RtmpServer {
    /// Create new server with default hooks
    pub fn new(config: ServerConfig) -> Self {
        RtmpServer::with_context(ServerContext::new(config))
    }

    /// Create a server around a context carrying custom authorizer,
    /// listener or handlers
    pub fn with_context(context: ServerContext) -> Self {
        RtmpServer {
            context: Arc::new(context),
            shutdown: Arc::new(ShutdownSignal::new()),
        }
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        self.context.config()
    }

    /// Get server context
    pub fn context(&self) -> Arc<ServerContext> {
        self.context.clone()
    }

    /// Bind the configured address and accept connections until shutdown
    pub async fn listen(&self) -> Result<()> {
        self.config().validate()?;
        let listener = bind_server(self.config()).await?;
        info!("RTMP server listening on {}", listener.local_addr()?);

        self.serve(listener).await
    }

    /// Accept connections from an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => self.handle_connection(stream, peer_addr),
                    Err(e) => {
                        error!("Accept error: {}", e);
                        continue;
                    }
                },
                _ = self.shutdown.wait() => break,
            }
        }

        info!("RTMP server stopped");
        Ok(())
    }

    fn handle_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        if !self.context.try_open_connection() {
            warn!("Connection limit reached, rejecting {}", peer_addr);
            return;
        }

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
        }

        let connection = Connection::new(stream, self.context.clone())
            .with_shutdown(self.shutdown.clone());
        let session_id = connection.id();
        info!("New connection {} from {}", session_id, peer_addr);

        let context = self.context.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.run().await {
                debug!("Connection {} error: {}", session_id, e);
            }
            context.close_connection();
            info!("Connection {} from {} closed", session_id, peer_addr);
        });
    }

    /// Stop accepting and close every open connection
    pub fn shutdown(&self) {
        info!("Shutting down server...");
        self.shutdown.trigger();
    }

    /// Get active connections count
    pub fn connection_count(&self) -> usize {
        self.context.active_connections()
    }
}
