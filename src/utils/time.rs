use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds, truncated to 32 bits as the
/// handshake timestamp fields require
pub fn current_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
}

/// Milliseconds elapsed since `start`, wrapping like an RTMP timestamp
pub fn elapsed_ms(start: Instant, now: Instant) -> u32 {
    now.saturating_duration_since(start).as_millis() as u32
}
