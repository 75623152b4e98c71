//! Channel resolution
//!
//! Turns the raw identifier a viewer arrived with into one of the terminal
//! outcomes the session can display. Validation happens before any store
//! call; the viewer-count lookup is a second, best-effort stage.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Channel;
use crate::store::{with_timeout, SharedStore};

pub const UNEXPECTED_RESOLUTION_ERROR: &str = "unexpected error while loading channel";

/// Why an identifier did not resolve to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// No identifier, or only whitespace
    Missing,
    /// Not a canonical UUID; the store was never queried
    Malformed,
    /// Well-formed but no matching channel row
    Absent,
}

impl NotFoundReason {
    pub fn message(&self) -> &'static str {
        match self {
            NotFoundReason::Missing => "no identifier supplied",
            NotFoundReason::Malformed => "malformed identifier",
            NotFoundReason::Absent => "not present in store",
        }
    }
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChannel {
    pub channel: Channel,
    /// Latest live stream of the channel, when one was found
    pub active_stream_id: Option<Uuid>,
    pub viewer_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    NotFound(NotFoundReason),
    Error(String),
    Resolved(ResolvedChannel),
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved(_))
    }
}

#[derive(Clone)]
pub struct ChannelResolver {
    store: SharedStore,
    request_timeout: Duration,
}

impl ChannelResolver {
    pub fn new(store: SharedStore, request_timeout: Duration) -> Self {
        Self {
            store,
            request_timeout,
        }
    }

    pub async fn resolve(&self, identifier: Option<&str>) -> ResolutionOutcome {
        let channel_id = match uuid_utils::parse_uuid_opt(identifier, "channel_id") {
            Ok(Some(id)) => id,
            Ok(None) => return ResolutionOutcome::NotFound(NotFoundReason::Missing),
            Err(e) => {
                debug!(error = %e, "rejecting identifier before store lookup");
                return ResolutionOutcome::NotFound(NotFoundReason::Malformed);
            }
        };

        let channel = match with_timeout(
            self.request_timeout,
            self.store.get_channel_by_id(channel_id),
        )
        .await
        {
            Ok(Some(channel)) => channel,
            Ok(None) => return ResolutionOutcome::NotFound(NotFoundReason::Absent),
            Err(e) => {
                warn!(%channel_id, error = %e, "channel lookup failed");
                return ResolutionOutcome::Error(e.to_string());
            }
        };

        let (active_stream_id, viewer_count) = if channel.is_live {
            self.lookup_presence(channel.id).await
        } else {
            (None, 0)
        };

        ResolutionOutcome::Resolved(ResolvedChannel {
            channel,
            active_stream_id,
            viewer_count,
        })
    }

    /// Second stage: never downgrades the outcome, only the count
    async fn lookup_presence(&self, channel_id: Uuid) -> (Option<Uuid>, u64) {
        match with_timeout(
            self.request_timeout,
            self.store.get_latest_active_stream(channel_id),
        )
        .await
        {
            Ok(Some(stream)) => (Some(stream.id), stream.displayed_viewers()),
            Ok(None) => {
                debug!(%channel_id, "live channel has no active stream row");
                (None, 0)
            }
            Err(e) => {
                warn!(%channel_id, error = %e, "viewer count lookup failed, showing 0");
                (None, 0)
            }
        }
    }
}
