//! Viewer session lifecycle
//!
//! A session starts from the identifier a viewer arrived with and ends on
//! navigation or teardown:
//!
//! ```text
//! Loading -> NotFound | Error            (terminal)
//! Loading -> Resolved -> ActiveLive      (telemetry + chat)
//!                     -> ActiveOffline   (chat disabled)
//! any     -> Loading (navigate) | Closed (teardown)
//! ```
//!
//! `SessionActor` owns the state; `SessionHandle` is the only way in.

pub mod actor;
pub mod chat;
pub mod commands;
pub mod peers;
pub mod presence;
pub mod registration;
pub mod resolver;
pub mod state;
pub mod telemetry;

pub use actor::{SessionActor, SessionDeps, SessionHandle};
pub use peers::{PeerFeed, PeerMessage, SimulatedPeers};
pub use registration::{RegistrationRejection, ViewerIdentity};
pub use resolver::{ChannelResolver, NotFoundReason, ResolutionOutcome};
pub use state::{SessionPhase, SessionSnapshot};
pub use telemetry::{Mood, SimulatedTelemetry, TelemetrySource};
