//! Chat pipeline
//!
//! The local log is what the viewer sees. Appends are synchronous and only
//! ever happen on the session actor; persistence to the store runs in a
//! detached task and cannot affect the log.

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{ChatMessage, MessageOrigin};
use crate::store::{with_timeout, SharedStore};

/// Blank or whitespace-only text is never sent
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[derive(Debug, Default, Clone)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    seq: u64,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        author: &str,
        text: &str,
        origin: MessageOrigin,
        stream_id: Option<Uuid>,
    ) -> &ChatMessage {
        let created_at = Utc::now();
        self.seq += 1;
        let message = ChatMessage {
            id: format!("{}-{}", created_at.timestamp_millis(), self.seq),
            stream_id,
            author: author.to_string(),
            text: text.to_string(),
            origin,
            created_at,
        };
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.seq = 0;
    }
}

/// Persist one chat line against the channel's active stream.
///
/// "No active stream" and store errors are both logged and dropped.
pub async fn persist_chat_message(
    store: SharedStore,
    channel_id: Uuid,
    text: String,
    timeout: Duration,
) {
    let stream = match with_timeout(timeout, store.get_latest_active_stream(channel_id)).await {
        Ok(Some(stream)) => stream,
        Ok(None) => {
            debug!(%channel_id, "no active stream, chat message kept local only");
            return;
        }
        Err(e) => {
            warn!(%channel_id, error = %e, "active stream lookup for chat failed");
            return;
        }
    };

    if let Err(e) = with_timeout(timeout, store.insert_chat_message(stream.id, &text)).await {
        warn!(%channel_id, stream_id = %stream.id, error = %e, "failed to persist chat message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, Stream};
    use crate::store::{InMemoryRecordStore, StoreOp};
    use std::sync::Arc;

    #[test]
    fn test_append_keeps_insertion_order_and_unique_ids() {
        let mut log = ChatLog::new();
        log.append("You", "first", MessageOrigin::Local, None);
        log.append("John", "second", MessageOrigin::Peer, None);
        log.append("You", "first", MessageOrigin::Local, None);

        let texts: Vec<&str> = log.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "first"]);

        let ids: std::collections::HashSet<&str> =
            log.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_blank_detection() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\n"));
        assert!(!is_blank(" hi "));
    }

    fn live_store() -> (InMemoryRecordStore, Uuid) {
        let store = InMemoryRecordStore::new();
        let channel_id = Uuid::new_v4();
        store.insert_channel(Channel {
            id: channel_id,
            display_name: "Tech Talks".into(),
            description: None,
            is_live: true,
        });
        (store, channel_id)
    }

    #[tokio::test]
    async fn test_persist_without_active_stream_is_dropped() {
        let (store, channel_id) = live_store();
        persist_chat_message(
            Arc::new(store.clone()),
            channel_id,
            "hello".into(),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(store.calls(StoreOp::InsertChatMessage), 0);
        assert!(store.chat_messages().is_empty());
    }

    #[tokio::test]
    async fn test_persist_against_active_stream() {
        let (store, channel_id) = live_store();
        let stream_id = Uuid::new_v4();
        store.insert_stream(Stream {
            id: stream_id,
            channel_id,
            is_live: true,
            viewer_count: Some(3),
            created_at: Utc::now(),
        });

        persist_chat_message(
            Arc::new(store.clone()),
            channel_id,
            "hello".into(),
            Duration::from_secs(1),
        )
        .await;

        let stored = store.chat_messages();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].stream_id, stream_id);
        assert_eq!(stored[0].text, "hello");
    }
}
