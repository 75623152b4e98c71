//! Broadcaster side: taking the signed-in broadcaster's channel live and
//! back offline. This is what flips the `is_live` flags the viewer session
//! reads.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use super::auth::AuthContext;
use super::share_link::share_link;
use crate::error::{AppError, Result};
use crate::models::Stream;
use crate::store::{with_timeout, SharedStore};

struct OnAir {
    stream: Stream,
    started: Instant,
}

pub struct BroadcastController {
    store: SharedStore,
    auth: Arc<AuthContext>,
    public_origin: String,
    request_timeout: Duration,
    on_air: Mutex<Option<OnAir>>,
}

impl BroadcastController {
    pub fn new(
        store: SharedStore,
        auth: Arc<AuthContext>,
        public_origin: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store,
            auth,
            public_origin: public_origin.into(),
            request_timeout,
            on_air: Mutex::new(None),
        }
    }

    pub async fn go_live(&self) -> Result<Stream> {
        let user = self.auth.current_user().await.ok_or(AppError::Unauthorized)?;
        if self.is_on_air() {
            return Err(AppError::Conflict("already on air".into()));
        }

        let stream = with_timeout(self.request_timeout, self.store.start_stream(user.channel_id)).await?;
        if let Err(e) = self.auth.set_live(true).await {
            warn!(error = %e, "failed to mark broadcaster live");
        }

        *self.on_air.lock() = Some(OnAir {
            stream: stream.clone(),
            started: Instant::now(),
        });
        info!(channel_id = %user.channel_id, stream_id = %stream.id, "broadcast started");
        Ok(stream)
    }

    /// End the broadcast; returns how long it ran
    pub async fn end(&self) -> Result<Duration> {
        let user = self.auth.current_user().await.ok_or(AppError::Unauthorized)?;
        let on_air = self
            .on_air
            .lock()
            .take()
            .ok_or_else(|| AppError::Conflict("not on air".into()))?;

        let elapsed = on_air.started.elapsed();
        if let Err(e) = with_timeout(
            self.request_timeout,
            self.store.end_stream(user.channel_id, on_air.stream.id),
        )
        .await
        {
            // Keep the broadcast recorded so the caller can retry
            *self.on_air.lock() = Some(on_air);
            return Err(e.into());
        }

        if let Err(e) = self.auth.set_live(false).await {
            warn!(error = %e, "failed to mark broadcaster offline");
        }
        info!(
            channel_id = %user.channel_id,
            duration = %format_duration(elapsed),
            "broadcast ended"
        );
        Ok(elapsed)
    }

    pub fn is_on_air(&self) -> bool {
        self.on_air.lock().is_some()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.on_air.lock().as_ref().map(|on_air| on_air.started.elapsed())
    }

    pub fn current_stream(&self) -> Option<Stream> {
        self.on_air.lock().as_ref().map(|on_air| on_air.stream.clone())
    }

    /// Link viewers use to open this broadcaster's channel
    pub async fn share_link(&self) -> Result<String> {
        let user = self.auth.current_user().await.ok_or(AppError::Unauthorized)?;
        Ok(share_link(&self.public_origin, user.channel_id))
    }
}

/// `MM:SS`, minutes not capped at 59
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "00:00");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "00:59");
        assert_eq!(format_duration(Duration::from_secs(61)), "01:01");
        assert_eq!(format_duration(Duration::from_secs(100 * 60 + 5)), "100:05");
    }
}
