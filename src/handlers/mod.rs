mod connect;
mod create_stream;
mod publish;
mod play;
mod delete_stream;
mod stream_control;

use std::collections::HashMap;
use std::sync::Arc;
use log::debug;
use crate::connection::Session;
use crate::protocol::RtmpCommand;
use crate::Result;

pub use connect::ConnectHandler;
pub use create_stream::CreateStreamHandler;
pub use delete_stream::{CloseStreamHandler, DeleteStreamHandler};
pub use play::PlayHandler;
pub use publish::PublishHandler;
pub use stream_control::{IgnoredCommand, PauseHandler, ReceiveAudioHandler, ReceiveVideoHandler};

/// Commands accepted and ignored
pub const IGNORED_COMMANDS: [&str; 4] = ["releaseStream", "FCPublish", "FCUnpublish", "getStreamLength"];

pub trait CommandHandler: Send + Sync {
    /// Get command name this handler processes
    fn command_name(&self) -> &str;

    /// Handle the command. `stream_id` is the message stream it arrived on.
    /// Rejections are reported to the peer as status messages; an error
    /// return means the session cannot go on.
    fn handle(&self, session: &mut Session, command: RtmpCommand, stream_id: u32) -> Result<()>;
}

/// Command handler registry
pub struct CommandHandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl Default for CommandHandlerRegistry {
    fn default() -> Self {
        CommandHandlerRegistry::new()
    }
}

impl CommandHandlerRegistry {
    /// Registry with every built-in handler
    pub fn new() -> Self {
        let mut registry = CommandHandlerRegistry::empty();

        registry.register(Arc::new(ConnectHandler));
        registry.register(Arc::new(CreateStreamHandler));
        registry.register(Arc::new(PublishHandler));
        registry.register(Arc::new(PlayHandler));
        registry.register(Arc::new(DeleteStreamHandler));
        registry.register(Arc::new(CloseStreamHandler));
        registry.register(Arc::new(PauseHandler));
        registry.register(Arc::new(ReceiveAudioHandler));
        registry.register(Arc::new(ReceiveVideoHandler));
        for name in IGNORED_COMMANDS {
            registry.register(Arc::new(IgnoredCommand(name)));
        }

        registry
    }

    pub fn empty() -> Self {
        CommandHandlerRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Add a handler, replacing any handler of the same command
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(
            handler.command_name().to_string(),
            handler,
        );
    }

    pub fn contains(&self, command_name: &str) -> bool {
        self.handlers.contains_key(command_name)
    }

    /// Run the handler for `command`. Unknown commands are logged and
    /// ignored.
    pub fn handle(&self, session: &mut Session, command: RtmpCommand, stream_id: u32) -> Result<()> {
        match self.handlers.get(&command.name) {
            Some(handler) => handler.handle(session, command, stream_id),
            None => {
                debug!("Session {} unknown command {}", session.id(), command.name);
                Ok(())
            }
        }
    }
}
