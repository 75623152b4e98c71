//! Messages consumed by the session actor

use tokio::sync::oneshot;

use super::registration::{RegistrationRejection, ViewerIdentity};
use super::resolver::ResolutionOutcome;

/// Requests sent by `SessionHandle`
#[derive(Debug)]
pub enum SessionCommand {
    /// Replace the session with a new one for `identifier`
    Navigate { identifier: Option<String> },

    /// Re-run resolution for the current identifier
    Refresh,

    /// Submit the registration form
    Register {
        first_name: String,
        last_name: String,
        email: String,
        responder: oneshot::Sender<Result<ViewerIdentity, RegistrationRejection>>,
    },

    /// Fire-and-forget chat send
    SendMessage { text: String },
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Refresh => "refresh",
            Self::Register { .. } => "register",
            Self::SendMessage { .. } => "send_message",
        }
    }
}

/// Result of a resolution task, tagged with the session it was started for
#[derive(Debug)]
pub(crate) struct ResolutionReport {
    pub generation: u64,
    pub identifier: Option<String>,
    pub outcome: ResolutionOutcome,
}
