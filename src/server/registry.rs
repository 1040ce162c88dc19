use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use crate::connection::SessionId;
use crate::processing::MediaFrame;
use crate::stream::GopCache;

/// Notification delivered to a playing session
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A frame produced by the stream's publisher
    Frame(Arc<MediaFrame>),
    /// A publisher started on the path
    PublishStart,
    /// The publisher of the path stopped
    PublishStop,
}

/// Outcome of a publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishResult {
    Accepted,
    /// Another session already publishes the path
    PathTaken,
}

/// Snapshot of one active stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub path: String,
    pub publisher: SessionId,
    pub subscribers: usize,
    pub started_at: DateTime<Utc>,
}

struct PublisherEntry {
    session_id: SessionId,
    started_at: DateTime<Utc>,
}

struct StreamEntry {
    publisher: Option<PublisherEntry>,
    subscribers: HashMap<SessionId, Sender<StreamEvent>>,
    gop: GopCache,
}

impl StreamEntry {
    fn new(max_frames: usize) -> Self {
        StreamEntry {
            publisher: None,
            subscribers: HashMap::new(),
            gop: GopCache::new(max_frames),
        }
    }

    fn is_idle(&self) -> bool {
        self.publisher.is_none() && self.subscribers.is_empty()
    }

    /// Send to every subscriber, forgetting those whose receiver is gone
    /// or whose queue is full
    fn notify(&mut self, event: StreamEvent) {
        self.subscribers
            .retain(|session_id, sender| match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("{} fell behind its stream and was dropped", session_id);
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            });
    }
}

/// Path to publisher and subscribers map shared by all sessions of a server.
///
/// Every operation takes one short lock, so a subscriber registered by
/// [`subscribe`](Self::subscribe) sees the cached frames followed by every
/// frame broadcast afterwards, with nothing lost or repeated in between.
pub struct StreamRegistry {
    streams: Mutex<HashMap<String, StreamEntry>>,
    gop_max_frames: usize,
}

impl Default for StreamRegistry {
    fn default() -> Self {
        StreamRegistry::new(8192)
    }
}

impl StreamRegistry {
    /// Create new registry
    pub fn new(gop_max_frames: usize) -> Self {
        StreamRegistry {
            streams: Mutex::new(HashMap::new()),
            gop_max_frames,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StreamEntry>> {
        self.streams.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `path` for `session_id`. Waiting subscribers are told that
    /// publishing started.
    pub fn publish(&self, path: &str, session_id: SessionId) -> PublishResult {
        let mut streams = self.lock();
        let entry = streams
            .entry(path.to_string())
            .or_insert_with(|| StreamEntry::new(self.gop_max_frames));

        if entry.publisher.is_some() {
            return PublishResult::PathTaken;
        }

        entry.publisher = Some(PublisherEntry {
            session_id,
            started_at: Utc::now(),
        });
        entry.gop.clear();
        entry.notify(StreamEvent::PublishStart);

        info!("Stream {} published by {}", path, session_id);
        PublishResult::Accepted
    }

    /// Release `path` if `session_id` publishes it. The cache is dropped and
    /// subscribers are told that publishing stopped.
    pub fn unpublish(&self, path: &str, session_id: SessionId) -> bool {
        let mut streams = self.lock();
        let Some(entry) = streams.get_mut(path) else {
            return false;
        };
        if entry.publisher.as_ref().map(|p| p.session_id) != Some(session_id) {
            return false;
        }

        entry.publisher = None;
        entry.gop.clear();
        entry.notify(StreamEvent::PublishStop);
        if entry.is_idle() {
            streams.remove(path);
        }

        info!("Stream {} unpublished by {}", path, session_id);
        true
    }

    /// Add a subscriber and return the frames it must receive before any
    /// live frame. Empty when nobody publishes the path yet.
    pub fn subscribe(
        &self,
        path: &str,
        session_id: SessionId,
        sender: Sender<StreamEvent>,
    ) -> Vec<Arc<MediaFrame>> {
        let mut streams = self.lock();
        let entry = streams
            .entry(path.to_string())
            .or_insert_with(|| StreamEntry::new(self.gop_max_frames));

        entry.subscribers.insert(session_id, sender);
        debug!("{} subscribed to {} ({} subscribers)", session_id, path, entry.subscribers.len());

        if entry.publisher.is_some() {
            entry.gop.join_frames()
        } else {
            Vec::new()
        }
    }

    pub fn unsubscribe(&self, path: &str, session_id: SessionId) -> bool {
        let mut streams = self.lock();
        let Some(entry) = streams.get_mut(path) else {
            return false;
        };

        let removed = entry.subscribers.remove(&session_id).is_some();
        if entry.is_idle() {
            streams.remove(path);
        }
        removed
    }

    /// Fan a publisher's frame out to the path's subscribers, caching it
    /// first when `cache` is set. Returns the number of subscribers reached.
    pub fn broadcast(&self, path: &str, session_id: SessionId, frame: MediaFrame, cache: bool) -> usize {
        let mut streams = self.lock();
        let Some(entry) = streams.get_mut(path) else {
            return 0;
        };
        if entry.publisher.as_ref().map(|p| p.session_id) != Some(session_id) {
            return 0;
        }

        let frame = Arc::new(frame);
        if cache {
            entry.gop.push(frame.clone());
        }
        entry.notify(StreamEvent::Frame(frame));
        entry.subscribers.len()
    }

    pub fn is_publishing(&self, path: &str) -> bool {
        self.lock()
            .get(path)
            .is_some_and(|entry| entry.publisher.is_some())
    }

    pub fn publisher(&self, path: &str) -> Option<SessionId> {
        self.lock()
            .get(path)
            .and_then(|entry| entry.publisher.as_ref().map(|p| p.session_id))
    }

    pub fn subscriber_count(&self, path: &str) -> usize {
        self.lock()
            .get(path)
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// Number of frames cached for `path`, sequence headers excluded
    pub fn cached_frames(&self, path: &str) -> usize {
        self.lock().get(path).map_or(0, |entry| entry.gop.len())
    }

    /// Active streams sorted by path
    pub fn summaries(&self) -> Vec<StreamSummary> {
        let streams = self.lock();
        let mut out: Vec<StreamSummary> = streams
            .iter()
            .filter_map(|(path, entry)| {
                entry.publisher.as_ref().map(|publisher| StreamSummary {
                    path: path.clone(),
                    publisher: publisher.session_id,
                    subscribers: entry.subscribers.len(),
                    started_at: publisher.started_at,
                })
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use crate::processing::VideoFrame;

    fn video(timestamp: u32, tag: u8, packet_type: u8) -> MediaFrame {
        MediaFrame::Video(VideoFrame::parse(timestamp, vec![tag, packet_type, 0, 0, 0]))
    }

    fn channel() -> (mpsc::Sender<StreamEvent>, mpsc::Receiver<StreamEvent>) {
        mpsc::channel(64)
    }

    fn drain(rx: &mut mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_publish_exclusive() {
        let registry = StreamRegistry::default();
        let (first, second) = (SessionId::new(), SessionId::new());

        assert_eq!(registry.publish("/live/test", first), PublishResult::Accepted);
        assert_eq!(registry.publish("/live/test", second), PublishResult::PathTaken);
        assert_eq!(registry.publisher("/live/test"), Some(first));

        assert!(!registry.unpublish("/live/test", second));
        assert!(registry.unpublish("/live/test", first));
        assert!(!registry.is_publishing("/live/test"));
        assert_eq!(registry.publish("/live/test", second), PublishResult::Accepted);
    }

    #[test]
    fn test_late_joiner_gets_cache_then_live() {
        let registry = StreamRegistry::default();
        let publisher = SessionId::new();
        registry.publish("/live/a", publisher);

        registry.broadcast("/live/a", publisher, video(0, 0x17, 0x00), true);
        registry.broadcast("/live/a", publisher, video(0, 0x17, 0x01), true);
        registry.broadcast("/live/a", publisher, video(40, 0x27, 0x01), true);

        let (tx, mut rx) = channel();
        let joined = registry.subscribe("/live/a", SessionId::new(), tx);
        assert_eq!(joined.len(), 3);
        assert!(joined[0].is_sequence_header());

        assert_eq!(registry.broadcast("/live/a", publisher, video(80, 0x27, 0x01), true), 1);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Frame(f) if f.timestamp() == 80));
    }

    #[test]
    fn test_waiting_subscriber_notified() {
        let registry = StreamRegistry::default();
        let (tx, mut rx) = channel();
        assert!(registry.subscribe("/live/b", SessionId::new(), tx).is_empty());

        let publisher = SessionId::new();
        registry.publish("/live/b", publisher);
        registry.unpublish("/live/b", publisher);

        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [StreamEvent::PublishStart, StreamEvent::PublishStop]));
        assert_eq!(registry.subscriber_count("/live/b"), 1);
    }

    #[test]
    fn test_broadcast_from_non_publisher_ignored() {
        let registry = StreamRegistry::default();
        let publisher = SessionId::new();
        registry.publish("/live/c", publisher);
        assert_eq!(registry.broadcast("/live/c", SessionId::new(), video(0, 0x17, 0x01), true), 0);
        assert_eq!(registry.cached_frames("/live/c"), 0);
    }

    #[test]
    fn test_cache_disabled() {
        let registry = StreamRegistry::default();
        let publisher = SessionId::new();
        registry.publish("/live/d", publisher);
        registry.broadcast("/live/d", publisher, video(0, 0x17, 0x01), false);
        assert_eq!(registry.cached_frames("/live/d"), 0);
    }

    #[test]
    fn test_closed_subscriber_dropped() {
        let registry = StreamRegistry::default();
        let publisher = SessionId::new();
        registry.publish("/live/e", publisher);

        let (tx, rx) = channel();
        registry.subscribe("/live/e", SessionId::new(), tx);
        drop(rx);

        registry.broadcast("/live/e", publisher, video(0, 0x17, 0x01), true);
        assert_eq!(registry.subscriber_count("/live/e"), 0);
    }

    #[test]
    fn test_summaries() {
        let registry = StreamRegistry::default();
        let (a, b) = (SessionId::new(), SessionId::new());
        registry.publish("/live/z", a);
        registry.publish("/live/y", b);
        let (tx, _rx) = channel();
        registry.subscribe("/live/z", SessionId::new(), tx);
        registry.subscribe("/live/idle", SessionId::new(), channel().0);

        let summaries = registry.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].path, "/live/y");
        assert_eq!(summaries[1].publisher, a);
        assert_eq!(summaries[1].subscribers, 1);
        assert!(summaries[1].started_at <= Utc::now());
    }

    #[test]
    fn test_lagging_subscriber_dropped() {
        let registry = StreamRegistry::default();
        let publisher = SessionId::new();
        registry.publish("/live/f", publisher);

        let (slow_tx, _slow_rx) = mpsc::channel(2);
        let (tx, mut rx) = channel();
        registry.subscribe("/live/f", SessionId::new(), slow_tx);
        registry.subscribe("/live/f", SessionId::new(), tx);

        for ts in 0..3 {
            registry.broadcast("/live/f", publisher, video(ts, 0x27, 0x01), true);
        }
        assert_eq!(registry.subscriber_count("/live/f"), 1);
        assert_eq!(drain(&mut rx).len(), 3);
    }
}
