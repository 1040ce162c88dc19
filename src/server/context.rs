use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use crate::handlers::CommandHandlerRegistry;
use crate::server::auth::{AllowAll, Authorizer};
use crate::server::config::ServerConfig;
use crate::server::listener::{NoopListener, SessionListener};
use crate::server::registry::StreamRegistry;

/// Everything sessions of one server share
pub struct ServerContext {
    /// Server configuration
    config: Arc<ServerConfig>,

    /// Publish/play registry
    registry: Arc<StreamRegistry>,

    authorizer: Arc<dyn Authorizer>,

    listener: Arc<dyn SessionListener>,

    handlers: Arc<CommandHandlerRegistry>,

    /// Open connections
    active_connections: AtomicUsize,
}

impl ServerContext {
    /// Create new context
    pub fn new(config: ServerConfig) -> Self {
        ServerContext {
            registry: Arc::new(StreamRegistry::new(config.gop_cache_max_frames)),
            config: Arc::new(config),
            authorizer: Arc::new(AllowAll),
            listener: Arc::new(NoopListener),
            handlers: Arc::new(CommandHandlerRegistry::new()),
            active_connections: AtomicUsize::new(0),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_handlers(mut self, handlers: CommandHandlerRegistry) -> Self {
        self.handlers = Arc::new(handlers);
        self
    }

    /// Get configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    pub fn authorizer(&self) -> &Arc<dyn Authorizer> {
        &self.authorizer
    }

    pub fn listener(&self) -> &Arc<dyn SessionListener> {
        &self.listener
    }

    pub fn handlers(&self) -> &Arc<CommandHandlerRegistry> {
        &self.handlers
    }

    /// Count a new connection unless the limit is reached
    pub fn try_open_connection(&self) -> bool {
        let max = self.config.max_connections;
        self.active_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .is_ok()
    }

    pub fn close_connection(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}
