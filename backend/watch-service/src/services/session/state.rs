//! Per-session state owned by the session actor
//!
//! Nothing here is shared: the actor holds the only `SessionState` and hands
//! out `SessionSnapshot` copies. Phase, chat availability and telemetry
//! visibility are all derived from the same fields so they cannot disagree.

use serde::Serialize;
use uuid::Uuid;

use super::chat::{is_blank, ChatLog};
use super::peers::PeerMessage;
use super::presence::Presence;
use super::registration::{GateDecision, RegistrationGate, RegistrationRejection, ViewerIdentity};
use super::resolver::{NotFoundReason, ResolutionOutcome};
use super::telemetry::Mood;
use crate::models::{Channel, ChatMessage, MessageOrigin};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStatus {
    Loading,
    NotFound(NotFoundReason),
    Error(String),
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    NotFound { reason: NotFoundReason },
    Error { message: String },
    /// Channel known, registration form pending
    Resolved,
    ActiveLive,
    ActiveOffline,
    Closed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::NotFound { .. } | SessionPhase::Error { .. } | SessionPhase::Closed
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionPhase::ActiveLive | SessionPhase::ActiveOffline)
    }
}

/// Read-only copy published after every mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub identifier: Option<String>,
    pub generation: u64,
    #[serde(flatten)]
    pub phase: SessionPhase,
    pub channel: Option<Channel>,
    pub viewer_count: u64,
    pub registration: Option<ViewerIdentity>,
    pub registration_complete: bool,
    pub chat_enabled: bool,
    /// Present only while the session is active and live
    pub current_caption: Option<String>,
    pub current_mood: Option<Mood>,
    pub caption_ticks: u64,
    pub mood_ticks: u64,
    pub messages: Vec<ChatMessage>,
}

pub struct SessionState {
    identifier: Option<String>,
    generation: u64,
    status: ResolutionStatus,
    channel: Option<Channel>,
    active_stream_id: Option<Uuid>,
    presence: Presence,
    gate: RegistrationGate,
    chat: ChatLog,
    caption: String,
    mood: Mood,
    caption_ticks: u64,
    mood_ticks: u64,
    refreshing: bool,
    closed: bool,
}

impl SessionState {
    pub fn new(caption: &str, mood: Mood) -> Self {
        Self {
            identifier: None,
            generation: 0,
            status: ResolutionStatus::Loading,
            channel: None,
            active_stream_id: None,
            presence: Presence::default(),
            gate: RegistrationGate::new(),
            chat: ChatLog::new(),
            caption: caption.to_string(),
            mood,
            caption_ticks: 0,
            mood_ticks: 0,
            refreshing: false,
            closed: false,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a fresh session for `identifier`; returns its generation
    pub fn begin(&mut self, identifier: Option<String>, caption: &str, mood: Mood) -> u64 {
        self.generation += 1;
        self.identifier = identifier;
        self.status = ResolutionStatus::Loading;
        self.channel = None;
        self.active_stream_id = None;
        self.presence.reset();
        self.gate.reset();
        self.chat.clear();
        self.caption = caption.to_string();
        self.mood = mood;
        self.caption_ticks = 0;
        self.mood_ticks = 0;
        self.refreshing = false;
        self.generation
    }

    /// Re-resolve the same identifier, keeping registration and chat
    pub fn begin_refresh(&mut self) -> u64 {
        self.generation += 1;
        self.refreshing = self.status == ResolutionStatus::Resolved;
        if !self.refreshing {
            self.status = ResolutionStatus::Loading;
        }
        self.generation
    }

    /// Stale-response guard
    pub fn accepts(&self, generation: u64, identifier: &Option<String>) -> bool {
        !self.closed && self.generation == generation && &self.identifier == identifier
    }

    /// Returns `false` when a failed refresh left the resolved session as it was
    pub fn apply_resolution(&mut self, outcome: ResolutionOutcome) -> bool {
        let refreshing = std::mem::take(&mut self.refreshing);
        match outcome {
            ResolutionOutcome::Resolved(resolved) => {
                self.presence.record(resolved.viewer_count);
                self.active_stream_id = resolved.active_stream_id;
                self.channel = Some(resolved.channel);
                self.status = ResolutionStatus::Resolved;
            }
            ResolutionOutcome::NotFound(reason) => {
                self.channel = None;
                self.active_stream_id = None;
                self.presence.reset();
                self.status = ResolutionStatus::NotFound(reason);
            }
            ResolutionOutcome::Error(_) if refreshing => return false,
            ResolutionOutcome::Error(message) => {
                self.channel = None;
                self.active_stream_id = None;
                self.presence.reset();
                self.status = ResolutionStatus::Error(message);
            }
        }
        true
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    // =========================================================================
    // Derived state
    // =========================================================================

    pub fn phase(&self) -> SessionPhase {
        if self.closed {
            return SessionPhase::Closed;
        }

        match &self.status {
            ResolutionStatus::Loading => SessionPhase::Loading,
            ResolutionStatus::NotFound(reason) => SessionPhase::NotFound { reason: *reason },
            ResolutionStatus::Error(message) => SessionPhase::Error {
                message: message.clone(),
            },
            ResolutionStatus::Resolved if !self.gate.is_complete() => SessionPhase::Resolved,
            ResolutionStatus::Resolved => match &self.channel {
                Some(channel) if channel.is_live => SessionPhase::ActiveLive,
                _ => SessionPhase::ActiveOffline,
            },
        }
    }

    pub fn is_active_live(&self) -> bool {
        self.phase() == SessionPhase::ActiveLive
    }

    /// Chat composition requires completed registration on a live channel
    pub fn chat_enabled(&self) -> bool {
        self.is_active_live()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    pub fn active_stream_id(&self) -> Option<Uuid> {
        self.active_stream_id
    }

    pub fn viewer_count(&self) -> u64 {
        self.presence.current_count()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.chat.messages()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn register(
        &mut self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<GateDecision, RegistrationRejection> {
        if self.closed || self.status != ResolutionStatus::Resolved {
            return Err(RegistrationRejection::NotReady);
        }
        self.gate.submit(first_name, last_name, email)
    }

    /// Append a locally authored message; `None` when nothing was appended
    pub fn compose(&mut self, text: &str) -> Option<&ChatMessage> {
        if is_blank(text) || !self.chat_enabled() {
            return None;
        }

        let author = self
            .gate
            .identity()
            .map(|identity| identity.first_name.clone())
            .unwrap_or_else(|| "You".to_string());
        let stream_id = self.active_stream_id;
        Some(
            self.chat
                .append(&author, text, MessageOrigin::Local, stream_id),
        )
    }

    /// Append a simulated peer message through the same log
    pub fn inject_peer(&mut self, message: PeerMessage) -> bool {
        if !self.is_active_live() {
            return false;
        }
        let stream_id = self.active_stream_id;
        self.chat
            .append(&message.author, &message.text, MessageOrigin::Peer, stream_id);
        true
    }

    pub fn set_caption(&mut self, caption: &str) {
        self.caption = caption.to_string();
        self.caption_ticks += 1;
    }

    pub fn set_mood(&mut self, mood: Mood) {
        self.mood = mood;
        self.mood_ticks += 1;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let phase = self.phase();
        let live = phase == SessionPhase::ActiveLive;

        SessionSnapshot {
            identifier: self.identifier.clone(),
            generation: self.generation,
            channel: self.channel.clone(),
            viewer_count: self.presence.current_count(),
            registration: self.gate.identity().cloned(),
            registration_complete: self.gate.is_complete(),
            chat_enabled: live,
            current_caption: live.then(|| self.caption.clone()),
            current_mood: live.then_some(self.mood),
            caption_ticks: self.caption_ticks,
            mood_ticks: self.mood_ticks,
            messages: self.chat.messages().to_vec(),
            phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session::resolver::ResolvedChannel;

    fn resolved(is_live: bool) -> ResolutionOutcome {
        ResolutionOutcome::Resolved(ResolvedChannel {
            channel: Channel {
                id: Uuid::new_v4(),
                display_name: "Tech Talks".into(),
                description: None,
                is_live,
            },
            active_stream_id: is_live.then(Uuid::new_v4),
            viewer_count: 5,
        })
    }

    fn state_for(id: &str) -> (SessionState, u64) {
        let mut state = SessionState::new("welcome", Mood::Happy);
        let generation = state.begin(Some(id.to_string()), "welcome", Mood::Happy);
        (state, generation)
    }

    #[test]
    fn test_chat_enabled_only_when_registered_and_live() {
        let (mut live, _) = state_for("a");
        live.apply_resolution(resolved(true));
        assert_eq!(live.phase(), SessionPhase::Resolved);
        assert!(!live.chat_enabled());

        live.register("Ada", "Lovelace", "a@b.c").unwrap();
        assert_eq!(live.phase(), SessionPhase::ActiveLive);
        assert!(live.chat_enabled());

        let (mut offline, _) = state_for("b");
        offline.apply_resolution(resolved(false));
        offline.register("Ada", "Lovelace", "a@b.c").unwrap();
        assert_eq!(offline.phase(), SessionPhase::ActiveOffline);
        assert!(!offline.chat_enabled());
    }

    #[test]
    fn test_register_before_resolution_is_not_ready() {
        let (mut state, _) = state_for("a");
        assert_eq!(
            state.register("Ada", "Lovelace", "a@b.c"),
            Err(RegistrationRejection::NotReady)
        );
    }

    #[test]
    fn test_failed_refresh_keeps_active_session() {
        let (mut state, _) = state_for("a");
        state.apply_resolution(resolved(true));
        state.register("Ada", "Lovelace", "a@b.c").unwrap();
        state.compose("hi").unwrap();

        state.begin_refresh();
        assert_eq!(state.phase(), SessionPhase::ActiveLive);
        assert!(!state.apply_resolution(ResolutionOutcome::Error("down".into())));
        assert_eq!(state.phase(), SessionPhase::ActiveLive);
        assert!(state.chat_enabled());
        assert!(state.channel().is_some());
        assert_eq!(state.viewer_count(), 5);
        assert_eq!(state.messages().len(), 1);

        state.begin_refresh();
        assert!(state.apply_resolution(ResolutionOutcome::NotFound(NotFoundReason::Absent)));
        assert_eq!(
            state.phase(),
            SessionPhase::NotFound {
                reason: NotFoundReason::Absent
            }
        );
    }

    #[test]
    fn test_failed_first_resolution_is_an_error() {
        let (mut state, _) = state_for("a");
        state.begin_refresh();
        assert!(state.apply_resolution(ResolutionOutcome::Error("down".into())));
        assert_eq!(
            state.phase(),
            SessionPhase::Error {
                message: "down".into()
            }
        );
    }

    #[test]
    fn test_compose_ignores_blank_and_disabled() {
        let (mut state, _) = state_for("a");
        state.apply_resolution(resolved(true));
        assert!(state.compose("hello").is_none());

        state.register("Ada", "Lovelace", "a@b.c").unwrap();
        assert!(state.compose("   \t").is_none());
        assert!(state.messages().is_empty());

        let message = state.compose(" hello ").unwrap();
        assert_eq!(message.author, "Ada");
        assert_eq!(message.text, " hello ");
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_stale_generation_or_identifier_rejected() {
        let (mut state, first) = state_for("a");
        let second = state.begin(Some("b".into()), "welcome", Mood::Happy);

        assert!(!state.accepts(first, &Some("a".into())));
        assert!(!state.accepts(second, &Some("a".into())));
        assert!(state.accepts(second, &Some("b".into())));

        state.close();
        assert!(!state.accepts(second, &Some("b".into())));
        assert_eq!(state.phase(), SessionPhase::Closed);
    }

    #[test]
    fn test_begin_resets_session_scoped_fields() {
        let (mut state, _) = state_for("a");
        state.apply_resolution(resolved(true));
        state.register("Ada", "Lovelace", "a@b.c").unwrap();
        state.compose("hi");
        state.set_caption("next");
        state.set_mood(Mood::Neutral);

        state.begin(Some("b".into()), "welcome", Mood::Happy);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Loading);
        assert!(snapshot.messages.is_empty());
        assert!(!snapshot.registration_complete);
        assert_eq!(snapshot.caption_ticks, 0);
        assert_eq!(snapshot.viewer_count, 0);
    }

    #[test]
    fn test_refresh_keeps_registration_and_chat() {
        let (mut state, _) = state_for("a");
        state.apply_resolution(resolved(true));
        state.register("Ada", "Lovelace", "a@b.c").unwrap();
        state.compose("hi");

        state.begin_refresh();
        assert_eq!(state.phase(), SessionPhase::ActiveLive);
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_telemetry_hidden_unless_active_live() {
        let (mut state, _) = state_for("a");
        state.apply_resolution(resolved(true));
        assert!(state.snapshot().current_caption.is_none());

        state.register("Ada", "Lovelace", "a@b.c").unwrap();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.current_caption.as_deref(), Some("welcome"));
        assert_eq!(snapshot.current_mood, Some(Mood::Happy));
    }

    #[test]
    fn test_peer_injection_requires_active_live() {
        let (mut state, _) = state_for("a");
        state.apply_resolution(resolved(true));
        let message = PeerMessage {
            author: "John".into(),
            text: "hi".into(),
        };
        assert!(!state.inject_peer(message.clone()));

        state.register("Ada", "Lovelace", "a@b.c").unwrap();
        assert!(state.inject_peer(message));
        assert_eq!(state.messages()[0].origin, MessageOrigin::Peer);
    }

    #[test]
    fn test_snapshot_serializes_phase_tag() {
        let (mut state, _) = state_for("not-a-uuid");
        state.apply_resolution(ResolutionOutcome::NotFound(NotFoundReason::Malformed));
        let value = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(value["phase"], "not_found");
        assert_eq!(value["reason"], "malformed");
    }
}
