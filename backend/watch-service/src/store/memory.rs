//! In-memory record store
//!
//! Keeps the four tables in process. Failures and latency can be injected
//! per operation and every call is counted, which is what the session tests
//! lean on ("no store call was attempted", "persistence failed but the
//! viewer still got in").

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Channel, NewViewer, StoredChatMessage, Stream, Viewer};

/// Operations of the `RecordStore` port, used as keys for injection and counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetChannel,
    GetLatestActiveStream,
    InsertViewer,
    InsertChatMessage,
    StartStream,
    EndStream,
}

#[derive(Default)]
struct Tables {
    channels: HashMap<Uuid, Channel>,
    streams: Vec<Stream>,
    viewers: Vec<Viewer>,
    chat_messages: Vec<StoredChatMessage>,
}

#[derive(Default)]
struct Faults {
    failing: HashSet<StoreOp>,
    delays: HashMap<StoreOp, Duration>,
    calls: HashMap<StoreOp, usize>,
}

#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Seeding and inspection
    // =========================================================================

    pub fn insert_channel(&self, channel: Channel) {
        self.tables.lock().channels.insert(channel.id, channel);
    }

    pub fn insert_stream(&self, stream: Stream) {
        self.tables.lock().streams.push(stream);
    }

    pub fn channel(&self, id: Uuid) -> Option<Channel> {
        self.tables.lock().channels.get(&id).cloned()
    }

    pub fn streams(&self) -> Vec<Stream> {
        self.tables.lock().streams.clone()
    }

    pub fn viewers(&self) -> Vec<Viewer> {
        self.tables.lock().viewers.clone()
    }

    pub fn chat_messages(&self) -> Vec<StoredChatMessage> {
        self.tables.lock().chat_messages.clone()
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Make every subsequent call of `op` fail with `StoreError::Unavailable`
    pub fn fail_on(&self, op: StoreOp) {
        self.faults.lock().failing.insert(op);
    }

    pub fn recover(&self, op: StoreOp) {
        self.faults.lock().failing.remove(&op);
    }

    /// Delay every subsequent call of `op` before it touches the tables
    pub fn delay_on(&self, op: StoreOp, delay: Duration) {
        self.faults.lock().delays.insert(op, delay);
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.faults.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.faults.lock().calls.values().sum()
    }

    async fn enter(&self, op: StoreOp) -> StoreResult<()> {
        let (delay, failing) = {
            let mut faults = self.faults.lock();
            *faults.calls.entry(op).or_insert(0) += 1;
            (faults.delays.get(&op).copied(), faults.failing.contains(&op))
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if failing {
            return Err(StoreError::Unavailable(format!("{:?} failed", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_channel_by_id(&self, id: Uuid) -> StoreResult<Option<Channel>> {
        self.enter(StoreOp::GetChannel).await?;
        Ok(self.tables.lock().channels.get(&id).cloned())
    }

    async fn get_latest_active_stream(&self, channel_id: Uuid) -> StoreResult<Option<Stream>> {
        self.enter(StoreOp::GetLatestActiveStream).await?;
        let tables = self.tables.lock();
        // max_by_key keeps the last of equal keys, so the newest insert wins ties
        Ok(tables
            .streams
            .iter()
            .filter(|s| s.channel_id == channel_id && s.is_live)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn insert_viewer(&self, viewer: NewViewer) -> StoreResult<()> {
        self.enter(StoreOp::InsertViewer).await?;
        self.tables
            .lock()
            .viewers
            .push(Viewer::from_new(Uuid::new_v4(), viewer));
        Ok(())
    }

    async fn insert_chat_message(&self, stream_id: Uuid, text: &str) -> StoreResult<()> {
        self.enter(StoreOp::InsertChatMessage).await?;
        self.tables.lock().chat_messages.push(StoredChatMessage {
            id: Uuid::new_v4(),
            stream_id,
            text: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn start_stream(&self, channel_id: Uuid) -> StoreResult<Stream> {
        self.enter(StoreOp::StartStream).await?;
        let mut tables = self.tables.lock();
        let channel = tables
            .channels
            .get_mut(&channel_id)
            .ok_or_else(|| StoreError::NotFound(format!("channel {}", channel_id)))?;
        channel.is_live = true;

        let stream = Stream {
            id: Uuid::new_v4(),
            channel_id,
            is_live: true,
            viewer_count: Some(0),
            created_at: Utc::now(),
        };
        tables.streams.push(stream.clone());
        Ok(stream)
    }

    async fn end_stream(&self, channel_id: Uuid, stream_id: Uuid) -> StoreResult<()> {
        self.enter(StoreOp::EndStream).await?;
        let mut tables = self.tables.lock();
        let stream = tables
            .streams
            .iter_mut()
            .find(|s| s.id == stream_id && s.channel_id == channel_id)
            .ok_or_else(|| StoreError::NotFound(format!("stream {}", stream_id)))?;
        stream.is_live = false;

        if let Some(channel) = tables.channels.get_mut(&channel_id) {
            channel.is_live = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn channel(is_live: bool) -> Channel {
        Channel {
            id: Uuid::new_v4(),
            display_name: "Tech Talks".to_string(),
            description: Some("AI and more".to_string()),
            is_live,
        }
    }

    fn stream(channel_id: Uuid, is_live: bool, minutes: i64, viewers: i64) -> Stream {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Stream {
            id: Uuid::new_v4(),
            channel_id,
            is_live,
            viewer_count: Some(viewers),
            created_at: base + ChronoDuration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn test_latest_active_stream_prefers_newest_live_row() {
        let store = InMemoryRecordStore::new();
        let ch = channel(true);
        store.insert_channel(ch.clone());
        store.insert_stream(stream(ch.id, true, 0, 3));
        store.insert_stream(stream(ch.id, false, 30, 9));
        let newest_live = stream(ch.id, true, 10, 5);
        store.insert_stream(newest_live.clone());
        store.insert_stream(stream(Uuid::new_v4(), true, 60, 1));

        let found = store.get_latest_active_stream(ch.id).await.unwrap();
        assert_eq!(found, Some(newest_live));
    }

    #[tokio::test]
    async fn test_latest_active_stream_tie_goes_to_last_inserted() {
        let store = InMemoryRecordStore::new();
        let ch = channel(true);
        let first = stream(ch.id, true, 5, 1);
        let mut second = stream(ch.id, true, 5, 2);
        second.created_at = first.created_at;
        store.insert_stream(first);
        store.insert_stream(second.clone());

        let found = store.get_latest_active_stream(ch.id).await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(second.id));
    }

    #[tokio::test]
    async fn test_fail_on_counts_and_fails() {
        let store = InMemoryRecordStore::new();
        store.fail_on(StoreOp::GetChannel);

        let err = store.get_channel_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.calls(StoreOp::GetChannel), 1);

        store.recover(StoreOp::GetChannel);
        assert_eq!(store.get_channel_by_id(Uuid::new_v4()).await.unwrap(), None);
        assert_eq!(store.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_start_and_end_stream_flip_channel() {
        let store = InMemoryRecordStore::new();
        let ch = channel(false);
        store.insert_channel(ch.clone());

        let started = store.start_stream(ch.id).await.unwrap();
        assert!(store.channel(ch.id).unwrap().is_live);
        assert_eq!(
            store.get_latest_active_stream(ch.id).await.unwrap(),
            Some(started.clone())
        );

        store.end_stream(ch.id, started.id).await.unwrap();
        assert!(!store.channel(ch.id).unwrap().is_live);
        assert_eq!(store.get_latest_active_stream(ch.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_start_stream_unknown_channel() {
        let store = InMemoryRecordStore::new();
        let err = store.start_stream(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
