// Simple RTMP Server Example
//
// Starts a live server on port 1935. Streams published with a `key=demo`
// query argument (`rtmp://host/live/name?key=demo`) are accepted; players
// need no key.
//
// Usage:
//   cargo run --example simple_server

use std::sync::Arc;
use log::info;
use rtmp::{
    AuthAction, AuthDecision, AuthRequest, MediaFrame, Result, RtmpServer, ServerConfig,
    ServerContext, SessionId, SessionListener,
};

struct LogListener;

impl SessionListener for LogListener {
    fn on_publish_ready(&self, session_id: SessionId, path: &str) {
        info!("{} is live, published by {}", path, session_id);
    }

    fn on_frame(&self, _session_id: SessionId, path: &str, frame: &MediaFrame) {
        if frame.is_keyframe() {
            log::debug!("{} key frame at {} ms", path, frame.timestamp());
        }
    }
}

fn authorize(request: &AuthRequest) -> AuthDecision {
    match request.action {
        AuthAction::Play => AuthDecision::Allow,
        AuthAction::Publish if request.args.get("key").map(String::as_str) == Some("demo") => {
            AuthDecision::Allow
        }
        AuthAction::Publish => AuthDecision::Deny("Publishing requires a key.".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = ServerConfig::builder()
        .host("0.0.0.0")
        .port(1935)
        .max_connections(100)
        .out_chunk_size(4096)
        .build()?;

    info!("Starting RTMP server on {}", config.bind_address());
    info!("  - Max connections: {}", config.max_connections);
    info!("  - Chunk size: {}", config.out_chunk_size);
    info!("  - GOP cache enabled: {}", config.gop_cache_enabled);

    let context = ServerContext::new(config)
        .with_authorizer(Arc::new(authorize))
        .with_listener(Arc::new(LogListener));
    let server = Arc::new(RtmpServer::with_context(context));

    // Setup graceful shutdown
    let server_clone = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down server...");
                server_clone.shutdown();
            }
            Err(err) => {
                log::error!("Error setting up signal handler: {}", err);
            }
        }
    });

    info!("Press Ctrl+C to stop");
    server.listen().await?;

    for stream in server.context().registry().summaries() {
        info!("{} still had {} players", stream.path, stream.subscribers);
    }
    Ok(())
}
