//! Service Layer for the watch service
//!
//! - `session` - viewer session lifecycle (resolution, registration, chat, telemetry)
//! - `auth` - process-scoped broadcaster auth context
//! - `broadcast` - going live / ending a stream
//! - `share_link` - `{origin}/watch/{channel_id}` links

pub mod auth;
pub mod broadcast;
pub mod session;
pub mod share_link;

pub use auth::{AuthContext, AuthError, AuthUser};
pub use broadcast::{format_duration, BroadcastController};
pub use session::{SessionActor, SessionDeps, SessionHandle, SessionPhase, SessionSnapshot};
pub use share_link::{parse_share_link, share_link};
