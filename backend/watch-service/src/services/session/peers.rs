//! Simulated chat traffic from other viewers
//!
//! Placeholder for a real multi-viewer feed. Messages produced here go
//! through the same append path as the viewer's own sends; removing this
//! module only means passing a different `PeerFeed`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMessage {
    pub author: String,
    pub text: String,
}

pub trait PeerFeed: Send {
    fn interval(&self) -> Duration;

    /// Return to the start-of-session position
    fn reset(&mut self);

    /// Called once per tick; `None` means nobody spoke this tick
    fn poll(&mut self) -> Option<PeerMessage>;
}

pub static PRESET_MESSAGES: [(&str, &str); 5] = [
    ("John", "This is amazing technology!"),
    ("Emma", "How long did it take you to build this?"),
    ("Alex", "The captions are working really well"),
    ("Sophia", "Are you using TensorFlow.js for the mood detection?"),
    ("Michael", "Can you explain how the WebRTC setup works?"),
];

pub struct SimulatedPeers {
    interval: Duration,
    admission_probability: f64,
    cursor: usize,
    rng: StdRng,
}

impl SimulatedPeers {
    pub fn new(interval: Duration, admission_probability: f64) -> Result<Self, AppError> {
        Self::with_rng(interval, admission_probability, StdRng::from_entropy())
    }

    /// Deterministic admission sequence for reproducible runs
    pub fn with_seed(
        interval: Duration,
        admission_probability: f64,
        seed: u64,
    ) -> Result<Self, AppError> {
        Self::with_rng(interval, admission_probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        interval: Duration,
        admission_probability: f64,
        rng: StdRng,
    ) -> Result<Self, AppError> {
        if interval.is_zero() {
            return Err(AppError::Config(
                "peer chat interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            interval,
            admission_probability: admission_probability.clamp(0.0, 1.0),
            cursor: 0,
            rng,
        })
    }
}

impl PeerFeed for SimulatedPeers {
    fn interval(&self) -> Duration {
        self.interval
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn poll(&mut self) -> Option<PeerMessage> {
        if !self.rng.gen_bool(self.admission_probability) {
            return None;
        }

        let (author, text) = PRESET_MESSAGES[self.cursor % PRESET_MESSAGES.len()];
        self.cursor += 1;
        Some(PeerMessage {
            author: author.to_string(),
            text: text.to_string(),
        })
    }
}
