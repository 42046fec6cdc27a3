//! Randomised pauses and typing plans.

use std::time::Duration;

use nice_core_types::SpeedProfile;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chance of an extra 0-100 ms hesitation on any pause.
const HESITATION_CHANCE: f64 = 0.1;
const HESITATION_MAX_MS: f64 = 100.0;

/// One keystroke burst of a typing plan.
#[derive(Clone, Debug, PartialEq)]
pub struct TypingStep {
    /// Characters added by this step.
    pub chunk: String,
    /// Full field value after this step.
    pub typed: String,
    pub delay_ms: u64,
    /// Extra pause after a chunk containing a space, `.` or `,`.
    pub word_pause_ms: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypingPlan {
    pub steps: Vec<TypingStep>,
}

impl TypingPlan {
    pub fn total_delay(&self) -> Duration {
        let ms: u64 = self
            .steps
            .iter()
            .map(|s| s.delay_ms + s.word_pause_ms.unwrap_or(0))
            .sum();
        Duration::from_millis(ms)
    }
}

/// Source of human-like delays.
pub struct Pacer {
    rng: Mutex<StdRng>,
}

impl Pacer {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic pacing for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pause_ms(rng: &mut StdRng, min_ms: u64, max_ms: u64) -> u64 {
        let (lo, hi) = if min_ms <= max_ms {
            (min_ms as f64, max_ms as f64)
        } else {
            (max_ms as f64, min_ms as f64)
        };
        let base = if hi > lo { rng.gen_range(lo..hi) } else { lo };
        let extra = if rng.gen_bool(HESITATION_CHANCE) {
            rng.gen_range(0.0..HESITATION_MAX_MS)
        } else {
            0.0
        };
        (base + extra).round() as u64
    }

    /// A pause in `[min_ms, max_ms)` plus the occasional hesitation.
    pub fn pause(&self, min_ms: u64, max_ms: u64) -> Duration {
        let mut rng = self.rng.lock();
        Duration::from_millis(Self::pause_ms(&mut rng, min_ms, max_ms))
    }

    /// Split `text` into keystroke bursts of the profile's chunk size.
    pub fn typing_plan(&self, text: &str, profile: &SpeedProfile) -> TypingPlan {
        let chars: Vec<char> = text.chars().collect();
        let chunk_size = profile.chunk_size.max(1);
        let (min, max) = profile.char_delay_ms;
        let mut rng = self.rng.lock();
        let mut steps = Vec::with_capacity(chars.chunks(chunk_size).len());
        let mut typed = String::with_capacity(text.len());

        for chunk_chars in chars.chunks(chunk_size) {
            let chunk: String = chunk_chars.iter().collect();
            typed.push_str(&chunk);
            let delay_ms = Self::pause_ms(&mut rng, min, max);
            let word_pause_ms = chunk
                .contains(|c: char| matches!(c, ' ' | '.' | ','))
                .then(|| Self::pause_ms(&mut rng, min * 2, max * 2));
            steps.push(TypingStep {
                chunk,
                typed: typed.clone(),
                delay_ms,
                word_pause_ms,
            });
        }
        TypingPlan { steps }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::from_entropy()
    }
}
