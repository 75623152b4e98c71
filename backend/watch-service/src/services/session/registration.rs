//! Registration gate
//!
//! A local UX gate in front of chat, not an authorization boundary. Once a
//! submission passes validation the gate stays open, whatever happens to the
//! best-effort viewer insert that follows.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::NewViewer;
use crate::store::{with_timeout, SharedStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ViewerIdentity {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationRejection {
    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Channel is not ready for registration")]
    NotReady,
}

/// Trim and check a submission.
///
/// The email rule only asks for an `@` and a `.` somewhere in the value.
pub fn validate_registration(
    first_name: &str,
    last_name: &str,
    email: &str,
) -> Result<ViewerIdentity, RegistrationRejection> {
    let first_name = first_name.trim();
    let last_name = last_name.trim();
    let email = email.trim();

    if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
        return Err(RegistrationRejection::MissingFields);
    }

    if !email.contains('@') || !email.contains('.') {
        return Err(RegistrationRejection::InvalidEmail);
    }

    Ok(ViewerIdentity {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
    })
}

/// Outcome of a submission against the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// First accepted submission; persistence should be attempted
    Opened(ViewerIdentity),
    /// Gate was already open; nothing is persisted again
    AlreadyOpen(ViewerIdentity),
}

impl GateDecision {
    pub fn identity(&self) -> &ViewerIdentity {
        match self {
            GateDecision::Opened(identity) | GateDecision::AlreadyOpen(identity) => identity,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RegistrationGate {
    identity: Option<ViewerIdentity>,
}

impl RegistrationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&ViewerIdentity> {
        self.identity.as_ref()
    }

    pub fn submit(
        &mut self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<GateDecision, RegistrationRejection> {
        if let Some(identity) = &self.identity {
            return Ok(GateDecision::AlreadyOpen(identity.clone()));
        }

        let identity = validate_registration(first_name, last_name, email)?;
        self.identity = Some(identity.clone());
        Ok(GateDecision::Opened(identity))
    }

    pub fn reset(&mut self) {
        self.identity = None;
    }
}

/// Write the viewer row; failures are logged and dropped.
pub async fn persist_viewer(
    store: SharedStore,
    stream_id: Uuid,
    identity: ViewerIdentity,
    timeout: Duration,
) {
    let email = identity.email.clone();
    let viewer = NewViewer {
        stream_id,
        first_name: identity.first_name,
        last_name: identity.last_name,
        email: identity.email,
    };

    match with_timeout(timeout, store.insert_viewer(viewer)).await {
        Ok(()) => info!(%stream_id, %email, "viewer registered"),
        Err(e) => warn!(%stream_id, error = %e, "failed to persist viewer registration"),
    }
}
