use tokio::net::TcpListener;
use crate::{Error, Result};

mod auth;
mod config;
mod context;
mod listener;
mod registry;
mod server;

pub use auth::*;
pub use config::{ServerConfig, ServerConfigBuilder};
pub use context::ServerContext;
pub use listener::{NoopListener, SessionListener};
pub use registry::*;
pub use server::{RtmpServer, ShutdownSignal};

/// Bind the configured address with SO_REUSEADDR
pub async fn bind_server(config: &ServerConfig) -> Result<TcpListener> {
    let addr = config.bind_address();

    let socket = match addr.parse::<std::net::SocketAddr>() {
        Ok(addr) => {
            let socket = if addr.is_ipv4() {
                tokio::net::TcpSocket::new_v4()?
            } else {
                tokio::net::TcpSocket::new_v6()?
            };

            socket.set_reuseaddr(true)?;
            socket.bind(addr)?;
            socket
        }
        Err(e) => {
            return Err(Error::config(format!("Invalid address {}: {}", addr, e)));
        }
    };

    let listener = socket.listen(1024)?;
    Ok(listener)
}
