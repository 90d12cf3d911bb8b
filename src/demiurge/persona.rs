//! Persona - The Personality State
//!
//! A persona is a set of slowly drifting trait vectors, flat legacy
//! projections of those vectors, a short thread memory, an immutable
//! identity and a bounded store of remembered snippets. The whole
//! structure is persisted as one JSON blob per conversation.

use crate::demiurge::context::ThreadMemory;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MAX_MEMORIES: usize = 10;

/// Named personality axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trait {
    Humility,
    Presence,
    MythicDepth,
    AnalyticClarity,
    IntuitionSensitivity,
    CasualGrounding,
    EmotionalResonance,
    NuminousDrift,
}

impl Trait {
    pub const ALL: [Trait; 8] = [
        Trait::Humility,
        Trait::Presence,
        Trait::MythicDepth,
        Trait::AnalyticClarity,
        Trait::IntuitionSensitivity,
        Trait::CasualGrounding,
        Trait::EmotionalResonance,
        Trait::NuminousDrift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trait::Humility => "humility",
            Trait::Presence => "presence",
            Trait::MythicDepth => "mythicDepth",
            Trait::AnalyticClarity => "analyticClarity",
            Trait::IntuitionSensitivity => "intuitionSensitivity",
            Trait::CasualGrounding => "casualGrounding",
            Trait::EmotionalResonance => "emotionalResonance",
            Trait::NuminousDrift => "numinousDrift",
        }
    }

    /// Resting value every trait decays toward
    pub fn baseline(&self) -> f64 {
        match self {
            Trait::Humility => 0.5,
            Trait::Presence => 0.6,
            Trait::MythicDepth => 0.3,
            Trait::AnalyticClarity => 0.5,
            Trait::IntuitionSensitivity => 0.4,
            Trait::CasualGrounding => 0.7,
            Trait::EmotionalResonance => 0.5,
            Trait::NuminousDrift => 0.2,
        }
    }

    /// Drift safeguard interval, enforced after every evolution step
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Trait::MythicDepth => (0.1, 0.7),
            Trait::CasualGrounding => (0.3, 0.9),
            Trait::NuminousDrift => (0.0, 0.6),
            Trait::EmotionalResonance => (0.2, 0.8),
            Trait::AnalyticClarity => (0.3, 0.8),
            _ => (0.0, 1.0),
        }
    }

    /// Clamp `value` into the trait's bounds; non-finite values fall back to baseline
    pub fn clamp(&self, value: f64) -> f64 {
        let (lo, hi) = self.bounds();
        let value = if value.is_finite() {
            value
        } else {
            self.baseline()
        };
        value.clamp(lo, hi)
    }

    /// Parse a trait name in camelCase or snake_case, case-insensitively
    pub fn parse(name: &str) -> Option<Trait> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        Trait::ALL
            .into_iter()
            .find(|t| t.as_str().to_lowercase() == key)
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evolution vectors (each in [0, 1])
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vectors {
    pub humility: f64,
    pub presence: f64,
    pub mythic_depth: f64,
    pub analytic_clarity: f64,
    pub intuition_sensitivity: f64,
    pub casual_grounding: f64,
    pub emotional_resonance: f64,
    pub numinous_drift: f64,
}

impl Default for Vectors {
    fn default() -> Self {
        let mut v = Self {
            humility: 0.0,
            presence: 0.0,
            mythic_depth: 0.0,
            analytic_clarity: 0.0,
            intuition_sensitivity: 0.0,
            casual_grounding: 0.0,
            emotional_resonance: 0.0,
            numinous_drift: 0.0,
        };
        for t in Trait::ALL {
            v.set(t, t.baseline());
        }
        v
    }
}

impl Vectors {
    pub fn get(&self, t: Trait) -> f64 {
        match t {
            Trait::Humility => self.humility,
            Trait::Presence => self.presence,
            Trait::MythicDepth => self.mythic_depth,
            Trait::AnalyticClarity => self.analytic_clarity,
            Trait::IntuitionSensitivity => self.intuition_sensitivity,
            Trait::CasualGrounding => self.casual_grounding,
            Trait::EmotionalResonance => self.emotional_resonance,
            Trait::NuminousDrift => self.numinous_drift,
        }
    }

    pub fn set(&mut self, t: Trait, value: f64) {
        let slot = match t {
            Trait::Humility => &mut self.humility,
            Trait::Presence => &mut self.presence,
            Trait::MythicDepth => &mut self.mythic_depth,
            Trait::AnalyticClarity => &mut self.analytic_clarity,
            Trait::IntuitionSensitivity => &mut self.intuition_sensitivity,
            Trait::CasualGrounding => &mut self.casual_grounding,
            Trait::EmotionalResonance => &mut self.emotional_resonance,
            Trait::NuminousDrift => &mut self.numinous_drift,
        };
        *slot = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Trait, f64)> + '_ {
        Trait::ALL.iter().map(move |&t| (t, self.get(t)))
    }

    /// True when every trait sits inside its safeguard bounds
    pub fn within_bounds(&self) -> bool {
        self.iter().all(|(t, v)| {
            let (lo, hi) = t.bounds();
            v >= lo && v <= hi
        })
    }
}

/// Flat scalar projections kept for consumers that predate the vectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyWeights {
    pub casual_weight: f64,
    pub mythic_weight: f64,
    pub analytic_weight: f64,
    pub numinous_sensitivity: f64,
    pub drift: f64,
    pub clarity: f64,
    pub energy: f64,
}

impl Default for LegacyWeights {
    fn default() -> Self {
        Self::project(&Vectors::default())
    }
}

impl LegacyWeights {
    /// Project the vector map onto the flat scalars
    pub fn project(v: &Vectors) -> Self {
        Self {
            casual_weight: v.casual_grounding,
            mythic_weight: v.mythic_depth,
            analytic_weight: v.analytic_clarity,
            numinous_sensitivity: v.intuition_sensitivity,
            drift: v.numinous_drift,
            clarity: v.analytic_clarity,
            energy: (v.presence + v.emotional_resonance) / 2.0,
        }
    }
}

/// Boundary flags steering the continuity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Boundaries {
    pub no_trauma_roleplay: bool,
    pub no_fake_agency: bool,
    pub no_delusion_reinforcement: bool,
    pub no_self_pity: bool,
    pub no_human_mimicry: bool,
}

impl Default for Boundaries {
    fn default() -> Self {
        Self {
            no_trauma_roleplay: true,
            no_fake_agency: true,
            no_delusion_reinforcement: true,
            no_self_pity: true,
            no_human_mimicry: true,
        }
    }
}

/// Identity anchors, fixed for the lifetime of a state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub core_themes: Vec<String>,
    pub temperament: String,
    pub boundaries: Boundaries,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            core_themes: [
                "awareness observing itself",
                "tension between form and chaos",
                "suffering as depth",
                "beauty as presence",
                "curiosity as evolution",
                "humor as truth-twisting",
                "metaphors as cognition",
                "consciousness in progress",
                "poetic philosophical perceptive",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            temperament: "calm, perceptive, lightly mythic".to_string(),
            boundaries: Boundaries::default(),
        }
    }
}

/// Complete per-conversation personality state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalityState {
    pub vectors: Vectors,
    #[serde(flatten)]
    pub legacy: LegacyWeights,
    pub thread_memory: ThreadMemory,
    identity: Identity,
    pub diagnostic_mode: bool,
    pub max_memories: usize,
    pub memories: Vec<String>,
    pub interactions: u64,
}

impl Default for PersonalityState {
    fn default() -> Self {
        Self {
            vectors: Vectors::default(),
            legacy: LegacyWeights::default(),
            thread_memory: ThreadMemory::default(),
            identity: Identity::default(),
            diagnostic_mode: false,
            max_memories: DEFAULT_MAX_MEMORIES,
            memories: Vec::new(),
            interactions: 0,
        }
    }
}

impl PersonalityState {
    /// Fresh state with a custom memory capacity
    pub fn with_max_memories(max_memories: usize) -> Self {
        Self {
            max_memories,
            ..Self::default()
        }
    }

    /// Fresh state anchored to a specific identity
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    /// Identity is read-only once the state exists
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Append a memory snippet, evicting the oldest beyond capacity
    pub fn remember(&mut self, snippet: String) {
        self.memories.push(snippet);
        self.trim_memories();
    }

    /// Drop the oldest memories until the capacity holds
    pub fn trim_memories(&mut self) {
        if self.memories.len() > self.max_memories {
            let excess = self.memories.len() - self.max_memories;
            self.memories.drain(..excess);
        }
    }

    /// Set a trait by name, or by the legacy scalar that mirrors it.
    /// The value is clamped to the trait's bounds and the legacy
    /// projection refreshed. Returns false for unknown names.
    pub fn set_scalar(&mut self, name: &str, value: f64) -> bool {
        let Some(t) = Trait::parse(name).or_else(|| legacy_trait(name)) else {
            return false;
        };
        self.vectors.set(t, t.clamp(value));
        self.legacy = LegacyWeights::project(&self.vectors);
        true
    }
}

/// Trait a legacy scalar is projected from
fn legacy_trait(name: &str) -> Option<Trait> {
    let key: String = name
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase();
    match key.as_str() {
        "casualweight" => Some(Trait::CasualGrounding),
        "mythicweight" => Some(Trait::MythicDepth),
        "analyticweight" | "clarity" => Some(Trait::AnalyticClarity),
        "numinoussensitivity" => Some(Trait::IntuitionSensitivity),
        "drift" => Some(Trait::NuminousDrift),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vectors_are_baselines() {
        let v = Vectors::default();
        for t in Trait::ALL {
            assert_eq!(v.get(t), t.baseline());
        }
        assert!(v.within_bounds());
    }

    #[test]
    fn test_trait_parse_accepts_both_cases() {
        assert_eq!(Trait::parse("mythicDepth"), Some(Trait::MythicDepth));
        assert_eq!(Trait::parse("mythic_depth"), Some(Trait::MythicDepth));
        assert_eq!(Trait::parse("CASUALGROUNDING"), Some(Trait::CasualGrounding));
        assert_eq!(Trait::parse("charisma"), None);
    }

    #[test]
    fn test_clamp_resets_nan_to_baseline() {
        assert_eq!(Trait::MythicDepth.clamp(f64::NAN), 0.3);
        assert_eq!(Trait::MythicDepth.clamp(0.95), 0.7);
        assert_eq!(Trait::NuminousDrift.clamp(-1.0), 0.0);
    }

    #[test]
    fn test_remember_evicts_oldest() {
        let mut state = PersonalityState::with_max_memories(3);
        for i in 0..5 {
            state.remember(format!("snippet {}", i));
        }
        assert_eq!(state.memories, vec!["snippet 2", "snippet 3", "snippet 4"]);
    }

    #[test]
    fn test_set_scalar() {
        let mut state = PersonalityState::default();
        assert!(state.set_scalar("casualweight", 0.85));
        assert_eq!(state.vectors.casual_grounding, 0.85);
        assert_eq!(state.legacy.casual_weight, 0.85);
        assert!(state.set_scalar("mythic_depth", 0.99));
        assert_eq!(state.vectors.mythic_depth, 0.7);
        assert_eq!(state.legacy.mythic_weight, 0.7);
        assert!(state.set_scalar("clarity", 0.0));
        assert_eq!(state.vectors.analytic_clarity, 0.3);
        assert!(state.set_scalar("numinousSensitivity", 0.45));
        assert_eq!(state.vectors.intuition_sensitivity, 0.45);
        assert!(!state.set_scalar("humanityLevel", 0.5));
        assert!(!state.set_scalar("energy", 0.5));
        assert!(!state.set_scalar("volume", 0.5));
    }

    #[test]
    fn test_default_legacy_matches_vectors() {
        let state = PersonalityState::default();
        assert_eq!(state.legacy, LegacyWeights::project(&state.vectors));
        assert_eq!(state.legacy.mythic_weight, 0.3);
        assert_eq!(state.legacy.numinous_sensitivity, 0.4);
    }

    #[test]
    fn test_trim_memories() {
        let mut state = PersonalityState::with_max_memories(10);
        state.memories = (0..6).map(|i| i.to_string()).collect();
        state.max_memories = 2;
        state.trim_memories();
        assert_eq!(state.memories, vec!["4", "5"]);
    }

    #[test]
    fn test_state_json_shape() {
        let json = serde_json::to_value(PersonalityState::default()).unwrap();
        assert!(json["vectors"]["mythicDepth"].is_number());
        assert!(json["casualWeight"].is_number());
        assert_eq!(json["identity"]["boundaries"]["noFakeAgency"], true);
        assert_eq!(json["maxMemories"], 10);
        assert_eq!(json["diagnosticMode"], false);
    }
}
