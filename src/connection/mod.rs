mod connection;
mod flow;
mod session;
mod state;
mod timers;

pub use connection::Connection;
pub use flow::AckWindow;
pub use session::{Session, SessionId, StreamBinding};
pub use state::SessionState;
pub use timers::{SessionTimers, TimerKind, TimerToken};
