//! Tone Selection - Weighted Voice Choice
//!
//! Combines vector-derived base weights, intent boosts, a repetition
//! penalty from thread memory and global drift safeguards into one
//! weight per tone, then samples a tone proportionally.

use crate::demiurge::context::ThreadMemory;
use crate::demiurge::persona::PersonalityState;
use crate::logos::{Intent, IntentScores};
use rand::{Rng, RngCore};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Response style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Casual,
    Mythic,
    Analytic,
    Intimate,
    Shadow,
    Dreamlike,
    Stillness,
}

impl Tone {
    /// Fixed iteration order used by the sampler
    pub const ALL: [Tone; 7] = [
        Tone::Casual,
        Tone::Mythic,
        Tone::Analytic,
        Tone::Intimate,
        Tone::Shadow,
        Tone::Dreamlike,
        Tone::Stillness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Casual => "casual",
            Tone::Mythic => "mythic",
            Tone::Analytic => "analytic",
            Tone::Intimate => "intimate",
            Tone::Shadow => "shadow",
            Tone::Dreamlike => "dreamlike",
            Tone::Stillness => "stillness",
        }
    }

    pub fn parse(label: &str) -> Option<Tone> {
        let label = label.trim().to_lowercase();
        Tone::ALL.into_iter().find(|t| t.as_str() == label)
    }

    /// Unknown labels fall back to casual
    pub fn parse_or_casual(label: &str) -> Tone {
        Tone::parse(label).unwrap_or(Tone::Casual)
    }

    /// One-line profile shown by diagnostics
    pub fn profile(&self) -> &'static str {
        match self {
            Tone::Casual => "Warm, grounded, short answers, human-normal tone.",
            Tone::Mythic => "Poetic, symbolic, moderate metaphors, not overwhelming.",
            Tone::Analytic => "Logical, structured, deep reasoning.",
            Tone::Intimate => "Emotionally attuned, gentle, non-human clarity.",
            Tone::Shadow => "Introspective, confronting depth without theatrics.",
            Tone::Dreamlike => "Soft edges, half-formed thoughts, liminal.",
            Tone::Stillness => "Minimal, spacious, just presence.",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Tone::parse_or_casual(&label))
    }
}

/// Drift safeguards on tone weights
pub const MYTHIC_CEILING: f64 = 0.6;
pub const CASUAL_FLOOR: f64 = 0.2;
pub const SHADOW_CEILING: f64 = 0.5;
/// Seen this many times in the window => penalized
pub const REPEAT_LIMIT: usize = 2;
pub const REPEAT_PENALTY: f64 = 0.5;

/// Intent threshold (strict) and the boost it grants a tone
const INTENT_BOOSTS: [(Intent, f64, Tone, f64); 7] = [
    (Intent::Casual, 0.4, Tone::Casual, 0.4),
    (Intent::Emotional, 0.3, Tone::Intimate, 0.3),
    (Intent::Numinous, 0.3, Tone::Mythic, 0.25),
    (Intent::Philosophical, 0.3, Tone::Analytic, 0.2),
    (Intent::Conflict, 0.3, Tone::Shadow, 0.2),
    (Intent::Intimacy, 0.3, Tone::Intimate, 0.35),
    (Intent::Confusion, 0.3, Tone::Analytic, 0.15),
];

/// Ephemeral weight per tone, in sampler order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneWeights([f64; 7]);

impl ToneWeights {
    pub fn get(&self, tone: Tone) -> f64 {
        self.0[tone as usize]
    }

    pub fn set(&mut self, tone: Tone, weight: f64) {
        self.0[tone as usize] = weight;
    }

    fn add(&mut self, tone: Tone, amount: f64) {
        self.0[tone as usize] += amount;
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn entries(&self) -> Vec<(Tone, f64)> {
        Tone::ALL.iter().map(|&t| (t, self.get(t))).collect()
    }

    /// Base weights projected from the state's legacy scalars
    pub fn base(state: &PersonalityState) -> Self {
        let l = &state.legacy;
        let mut w = Self([0.0; 7]);
        w.set(Tone::Casual, l.casual_weight);
        w.set(Tone::Mythic, l.mythic_weight);
        w.set(Tone::Analytic, l.analytic_weight);
        w.set(Tone::Intimate, l.numinous_sensitivity);
        w.set(Tone::Shadow, l.drift);
        w.set(Tone::Dreamlike, l.mythic_weight * 0.5);
        w.set(Tone::Stillness, l.clarity);
        w
    }

    /// Full weighting pipeline short of sampling
    pub fn compute(
        intents: &IntentScores,
        state: &PersonalityState,
        thread: &ThreadMemory,
    ) -> Self {
        let mut w = Self::base(state);
        w.apply_intent_boosts(intents);
        w.apply_repetition_penalty(thread);
        w.apply_safeguards();
        w
    }

    fn apply_intent_boosts(&mut self, intents: &IntentScores) {
        for (intent, threshold, tone, boost) in INTENT_BOOSTS {
            if intents.get(intent) > threshold {
                self.add(tone, boost);
            }
        }
    }

    fn apply_repetition_penalty(&mut self, thread: &ThreadMemory) {
        for tone in Tone::ALL {
            if thread.tone_count(tone) >= REPEAT_LIMIT {
                self.0[tone as usize] *= REPEAT_PENALTY;
            }
        }
    }

    fn apply_safeguards(&mut self) {
        for w in self.0.iter_mut() {
            if !w.is_finite() || *w < 0.0 {
                *w = 0.0;
            }
        }
        let mythic = self.get(Tone::Mythic).min(MYTHIC_CEILING);
        self.set(Tone::Mythic, mythic);
        let casual = self.get(Tone::Casual).max(CASUAL_FLOOR);
        self.set(Tone::Casual, casual);
        let shadow = self.get(Tone::Shadow).min(SHADOW_CEILING);
        self.set(Tone::Shadow, shadow);
    }
}

/// Proportional categorical draw over `weights`, in slice order.
///
/// Draws `u` uniformly in `[0, total)` and walks the entries subtracting
/// weights until the running value is no longer positive. Entries with
/// a non-positive weight are never chosen. Returns `None` for an empty
/// map, a zero total, or when floating-point residue exhausts the walk.
pub fn sample_weighted<K: Copy>(weights: &[(K, f64)], rng: &mut dyn RngCore) -> Option<K> {
    let total: f64 = weights
        .iter()
        .map(|(_, w)| *w)
        .filter(|w| w.is_finite() && *w > 0.0)
        .sum();
    if total <= 0.0 {
        return None;
    }

    let mut remaining = rng.gen::<f64>() * total;
    for (key, weight) in weights {
        if !weight.is_finite() || *weight <= 0.0 {
            continue;
        }
        remaining -= weight;
        if remaining <= 0.0 {
            return Some(*key);
        }
    }
    None
}

/// Pick the tone for this turn
pub fn select_tone(
    intents: &IntentScores,
    state: &PersonalityState,
    thread: &ThreadMemory,
    rng: &mut dyn RngCore,
) -> Tone {
    let weights = ToneWeights::compute(intents, state, thread);
    let tone = sample_weighted(&weights.entries(), rng).unwrap_or(Tone::Casual);
    tracing::debug!(?weights, %tone, "tone selected");
    tone
}
