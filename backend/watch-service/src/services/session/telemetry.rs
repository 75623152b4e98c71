//! Caption and mood signals shown over the player
//!
//! `TelemetrySource` is the two-output interface the session consumes
//! (`current_caption`, `current_mood`). `SimulatedTelemetry` cycles fixed
//! lists on two independent periods; a real speech-to-text or mood detector
//! implements the same trait.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Neutral,
    Surprised,
    Sad,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Neutral => "Neutral",
            Mood::Surprised => "Surprised",
            Mood::Sad => "Sad",
        }
    }

    /// Presentation hint for the mood badge
    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Sad => "😔",
            _ => "😐",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(Mood::Happy),
            "neutral" => Ok(Mood::Neutral),
            "surprised" => Ok(Mood::Surprised),
            "sad" => Ok(Mood::Sad),
            other => Err(format!("unknown mood label: {}", other)),
        }
    }
}

pub trait TelemetrySource: Send {
    fn caption_interval(&self) -> Duration;

    fn mood_interval(&self) -> Duration;

    /// Return to the start-of-session values
    fn reset(&mut self);

    fn advance_caption(&mut self);

    fn advance_mood(&mut self);

    fn current_caption(&self) -> &str;

    fn current_mood(&self) -> Mood;
}

/// Shown from session start until the first caption tick
pub static INITIAL_CAPTION: &str =
    "Welcome to my live stream! Today we are talking about AI-powered features.";

pub static CAPTIONS: [&str; 6] = [
    "Let me show you how this AI mood detection works.",
    "It uses computer vision to analyze facial expressions.",
    "The speech recognition is another amazing feature we're using.",
    "Everything gets processed in real-time right in your browser.",
    "No servers needed for these AI features!",
    "What do you all think about these features?",
];

pub static INITIAL_MOOD: Mood = Mood::Happy;

pub static MOODS: [Mood; 5] = [
    Mood::Happy,
    Mood::Neutral,
    Mood::Happy,
    Mood::Surprised,
    Mood::Neutral,
];

/// Cyclic cursor over a fixed, non-empty list.
///
/// Each tick shows the item under the cursor and then moves it, so after
/// N ticks the cursor sits at `N mod len` and the shown item is
/// `items[(N - 1) mod len]`. Before the first tick `initial` is shown.
#[derive(Debug, Clone)]
pub struct Rotation<T: Copy + 'static> {
    initial: T,
    items: &'static [T],
    index: usize,
    shown: T,
}

impl<T: Copy + 'static> Rotation<T> {
    pub fn new(initial: T, items: &'static [T]) -> Self {
        assert!(!items.is_empty(), "rotation needs at least one item");
        Self {
            initial,
            items,
            index: 0,
            shown: initial,
        }
    }

    pub fn advance(&mut self) -> T {
        self.shown = self.items[self.index];
        self.index = (self.index + 1) % self.items.len();
        self.shown
    }

    pub fn current(&self) -> T {
        self.shown
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.shown = self.initial;
    }
}

pub struct SimulatedTelemetry {
    caption_interval: Duration,
    mood_interval: Duration,
    captions: Rotation<&'static str>,
    moods: Rotation<Mood>,
}

impl SimulatedTelemetry {
    /// Both periods must be non-zero
    pub fn new(caption_interval: Duration, mood_interval: Duration) -> Result<Self, AppError> {
        if caption_interval.is_zero() || mood_interval.is_zero() {
            return Err(AppError::Config(
                "telemetry intervals must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            caption_interval,
            mood_interval,
            captions: Rotation::new(INITIAL_CAPTION, &CAPTIONS),
            moods: Rotation::new(INITIAL_MOOD, &MOODS),
        })
    }

    pub fn caption_index(&self) -> usize {
        self.captions.index()
    }

    pub fn mood_index(&self) -> usize {
        self.moods.index()
    }
}

impl Default for SimulatedTelemetry {
    fn default() -> Self {
        Self {
            caption_interval: Duration::from_secs(5),
            mood_interval: Duration::from_secs(8),
            captions: Rotation::new(INITIAL_CAPTION, &CAPTIONS),
            moods: Rotation::new(INITIAL_MOOD, &MOODS),
        }
    }
}

impl TelemetrySource for SimulatedTelemetry {
    fn caption_interval(&self) -> Duration {
        self.caption_interval
    }

    fn mood_interval(&self) -> Duration {
        self.mood_interval
    }

    fn reset(&mut self) {
        self.captions.reset();
        self.moods.reset();
    }

    fn advance_caption(&mut self) {
        self.captions.advance();
    }

    fn advance_mood(&mut self) {
        self.moods.advance();
    }

    fn current_caption(&self) -> &str {
        self.captions.current()
    }

    fn current_mood(&self) -> Mood {
        self.moods.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_tick_count_modulo_length() {
        for ticks in 1..40usize {
            let mut telemetry = SimulatedTelemetry::default();
            for _ in 0..ticks {
                telemetry.advance_caption();
                telemetry.advance_mood();
            }
            assert_eq!(telemetry.caption_index(), ticks % CAPTIONS.len());
            assert_eq!(telemetry.mood_index(), ticks % MOODS.len());
            assert_eq!(
                telemetry.current_caption(),
                CAPTIONS[(ticks - 1) % CAPTIONS.len()]
            );
            assert_eq!(telemetry.current_mood(), MOODS[(ticks - 1) % MOODS.len()]);
        }
    }

    #[test]
    fn test_initial_values_before_first_tick() {
        let telemetry = SimulatedTelemetry::default();
        assert_eq!(telemetry.caption_index(), 0);
        assert_eq!(telemetry.current_caption(), INITIAL_CAPTION);
        assert_eq!(telemetry.current_mood(), Mood::Happy);
    }

    #[test]
    fn test_welcome_line_never_returns() {
        let mut telemetry = SimulatedTelemetry::default();
        for _ in 0..(CAPTIONS.len() * 3) {
            telemetry.advance_caption();
            assert_ne!(telemetry.current_caption(), INITIAL_CAPTION);
        }
    }

    #[test]
    fn test_mood_sequence_from_fresh_start() {
        let mut telemetry = SimulatedTelemetry::default();
        let seen: Vec<Mood> = (0..3)
            .map(|_| {
                telemetry.advance_mood();
                telemetry.current_mood()
            })
            .collect();
        assert_eq!(seen, vec![Mood::Happy, Mood::Neutral, Mood::Happy]);
    }

    #[test]
    fn test_rotations_are_independent() {
        let mut telemetry = SimulatedTelemetry::default();
        for _ in 0..3 {
            telemetry.advance_caption();
        }
        telemetry.advance_mood();

        assert_eq!(telemetry.caption_index(), 3);
        assert_eq!(telemetry.mood_index(), 1);
        assert_eq!(telemetry.current_caption(), CAPTIONS[2]);
        assert_eq!(telemetry.current_mood(), Mood::Happy);
    }

    #[test]
    fn test_reset_returns_to_start() {
        let mut telemetry = SimulatedTelemetry::default();
        telemetry.advance_caption();
        telemetry.advance_mood();
        telemetry.advance_mood();
        telemetry.reset();

        assert_eq!(telemetry.caption_index(), 0);
        assert_eq!(telemetry.mood_index(), 0);
        assert_eq!(telemetry.current_caption(), INITIAL_CAPTION);
        assert_eq!(telemetry.current_mood(), INITIAL_MOOD);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(SimulatedTelemetry::new(Duration::ZERO, Duration::from_secs(8)).is_err());
        assert!(SimulatedTelemetry::new(Duration::from_secs(5), Duration::ZERO).is_err());
        assert!(SimulatedTelemetry::new(Duration::from_secs(5), Duration::from_secs(8)).is_ok());
    }

    #[test]
    fn test_mood_labels() {
        assert_eq!("SURPRISED".parse::<Mood>(), Ok(Mood::Surprised));
        assert!("angry".parse::<Mood>().is_err());
        assert_eq!(Mood::Happy.emoji(), "😊");
        assert_eq!(Mood::Sad.emoji(), "😔");
        assert_eq!(Mood::Surprised.emoji(), "😐");
        assert_eq!(Mood::Neutral.to_string(), "Neutral");
    }

    #[test]
    fn test_default_periods() {
        let telemetry = SimulatedTelemetry::default();
        assert_eq!(telemetry.caption_interval(), Duration::from_secs(5));
        assert_eq!(telemetry.mood_interval(), Duration::from_secs(8));
    }
}
