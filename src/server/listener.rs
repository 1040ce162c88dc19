use crate::amf::Amf0Value;
use crate::connection::SessionId;
use crate::processing::MediaFrame;

/// Observer of session lifecycle events. All methods default to no-ops.
pub trait SessionListener: Send + Sync {
    /// Called with the `connect` command object before the session replies.
    /// Returning false refuses the connection and stops the session.
    fn on_pre_connect(&self, _session_id: SessionId, _command_object: &Amf0Value) -> bool {
        true
    }

    /// A session became the publisher of `path`
    fn on_publish_ready(&self, _session_id: SessionId, _path: &str) {}

    /// A publisher produced a frame
    fn on_frame(&self, _session_id: SessionId, _path: &str, _frame: &MediaFrame) {}

    /// A session stopped; called once per session
    fn on_close(&self, _session_id: SessionId) {}
}

/// Listener that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SessionListener for NoopListener {}
