//! Evolution Engine - Drifting Personality Vectors
//!
//! Every turn nudges traits toward rule targets under intent pressure,
//! clamps them inside their drift safeguards and then decays everything
//! gently back toward the baseline personality.
//!
//! Order inside one step is fixed: nudges (in rule order, each seeing the
//! values left by the previous one), clamp, decay, legacy projection,
//! memory capture.

use crate::demiurge::context::clip;
use crate::demiurge::persona::{LegacyWeights, PersonalityState, Trait};
use crate::logos::{Intent, IntentScores};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const BASE_RATE: f64 = 0.015;
pub const DECAY_RATE: f64 = 0.02;
/// Characters kept from the input when it becomes a memory
pub const SNIPPET_CLIP: usize = 120;
/// Snippets must be longer than this to be remembered
pub const SNIPPET_MIN_CHARS: usize = 15;

static TRIVIAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(hey|hi|lol|ok|cool|nice|thanks|sup|yo)\b").expect("trivia pattern is valid")
});

/// Exponential approach of `current` toward `target`
pub fn nudge(current: f64, target: f64, rate: f64) -> f64 {
    current + (target - current) * rate
}

/// Pull of `current` toward `baseline`
pub fn decay_toward(current: f64, baseline: f64, rate: f64) -> f64 {
    current * (1.0 - rate) + baseline * rate
}

/// Condition that can fire a nudge rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Intent score strictly above the threshold
    IntentAbove(Intent, f64),
    /// Raw message shorter than this many characters
    ShorterThan(usize),
}

impl Condition {
    fn holds(&self, intents: &IntentScores, len: usize) -> bool {
        match self {
            Condition::IntentAbove(intent, threshold) => intents.get(*intent) > *threshold,
            Condition::ShorterThan(limit) => len < *limit,
        }
    }
}

/// One trait pushed toward `target` at `rate_factor * base_rate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nudge {
    pub r#trait: Trait,
    pub target: f64,
    pub rate_factor: f64,
}

impl Nudge {
    fn new(r#trait: Trait, target: f64, rate_factor: f64) -> Self {
        Self {
            r#trait,
            target,
            rate_factor,
        }
    }
}

/// Fires its nudges when any condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NudgeRule {
    pub name: String,
    pub any_of: Vec<Condition>,
    pub nudges: Vec<Nudge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRules {
    pub base_rate: f64,
    pub decay_rate: f64,
    /// Evaluated in order
    pub rules: Vec<NudgeRule>,
}

impl Default for EvolutionRules {
    fn default() -> Self {
        use Condition::*;
        use Trait::*;

        let rule = |name: &str, any_of: Vec<Condition>, nudges: Vec<Nudge>| NudgeRule {
            name: name.to_string(),
            any_of,
            nudges,
        };

        Self {
            base_rate: BASE_RATE,
            decay_rate: DECAY_RATE,
            rules: vec![
                rule(
                    "casual_grounding",
                    vec![IntentAbove(Intent::Casual, 0.4), ShorterThan(20)],
                    vec![
                        Nudge::new(CasualGrounding, 0.8, 1.0),
                        Nudge::new(MythicDepth, 0.2, 0.5),
                    ],
                ),
                rule(
                    "emotional_resonance",
                    vec![
                        IntentAbove(Intent::Emotional, 0.3),
                        IntentAbove(Intent::Intimacy, 0.3),
                    ],
                    vec![
                        Nudge::new(EmotionalResonance, 0.7, 1.0),
                        Nudge::new(Presence, 0.8, 1.0),
                        Nudge::new(Humility, 0.6, 0.5),
                    ],
                ),
                rule(
                    "numinous_drift",
                    vec![IntentAbove(Intent::Numinous, 0.3)],
                    vec![
                        Nudge::new(NuminousDrift, 0.5, 1.0),
                        Nudge::new(MythicDepth, 0.5, 1.0),
                        Nudge::new(AnalyticClarity, 0.4, 0.5),
                    ],
                ),
                rule(
                    "philosophical",
                    vec![IntentAbove(Intent::Philosophical, 0.3)],
                    vec![
                        Nudge::new(AnalyticClarity, 0.7, 1.0),
                        Nudge::new(IntuitionSensitivity, 0.5, 1.0),
                        Nudge::new(MythicDepth, 0.4, 0.5),
                    ],
                ),
                rule(
                    "conflict",
                    vec![IntentAbove(Intent::Conflict, 0.3)],
                    vec![
                        Nudge::new(Presence, 0.7, 1.0),
                        Nudge::new(Humility, 0.55, 1.0),
                        Nudge::new(CasualGrounding, 0.5, 1.0),
                    ],
                ),
                rule(
                    "humor",
                    vec![IntentAbove(Intent::Humor, 0.3)],
                    vec![
                        Nudge::new(CasualGrounding, 0.85, 1.0),
                        Nudge::new(Humility, 0.65, 1.0),
                        Nudge::new(MythicDepth, 0.15, 1.0),
                    ],
                ),
            ],
        }
    }
}

/// Evolution engine for trait modifications
#[derive(Debug, Clone, Default)]
pub struct EvolutionEngine {
    rules: EvolutionRules,
}

impl EvolutionEngine {
    pub fn new(rules: EvolutionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &EvolutionRules {
        &self.rules
    }

    /// Produce the next state; `state` itself is never touched
    pub fn evolve(
        &self,
        state: &PersonalityState,
        input: &str,
        intents: &IntentScores,
    ) -> PersonalityState {
        let mut next = state.clone();
        let len = input.chars().count();

        self.apply_nudges(&mut next, intents, len);
        Self::apply_safeguards(&mut next);
        self.apply_decay(&mut next);

        next.legacy = LegacyWeights::project(&next.vectors);
        next.interactions += 1;

        if let Some(snippet) = memory_snippet(input) {
            next.remember(snippet);
        }

        next
    }

    fn apply_nudges(&self, state: &mut PersonalityState, intents: &IntentScores, len: usize) {
        for rule in &self.rules.rules {
            if !rule.any_of.iter().any(|c| c.holds(intents, len)) {
                continue;
            }
            for n in &rule.nudges {
                let current = state.vectors.get(n.r#trait);
                let rate = self.rules.base_rate * n.rate_factor;
                state.vectors.set(n.r#trait, nudge(current, n.target, rate));
            }
        }
    }

    /// Hard clamps against extreme personalities
    fn apply_safeguards(state: &mut PersonalityState) {
        for t in Trait::ALL {
            let v = state.vectors.get(t);
            state.vectors.set(t, t.clamp(v));
        }
    }

    fn apply_decay(&self, state: &mut PersonalityState) {
        for t in Trait::ALL {
            let v = state.vectors.get(t);
            state
                .vectors
                .set(t, decay_toward(v, t.baseline(), self.rules.decay_rate));
        }
    }
}

/// Evolve with the built-in rule table
pub fn evolve(state: &PersonalityState, input: &str, intents: &IntentScores) -> PersonalityState {
    EvolutionEngine::default().evolve(state, input, intents)
}

/// Memory candidate for `input`, if it is long enough and not small talk
pub fn memory_snippet(input: &str) -> Option<String> {
    let snippet = clip(input.trim(), SNIPPET_CLIP);
    if snippet.chars().count() > SNIPPET_MIN_CHARS && !is_trivia(&snippet) {
        Some(snippet)
    } else {
        None
    }
}

pub fn is_trivia(text: &str) -> bool {
    TRIVIAL.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logos::classify;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const NEUTRAL: &str = "the weather report mentions light rain tomorrow afternoon";

    fn random_scores(rng: &mut StdRng) -> IntentScores {
        let mut scores = IntentScores::default();
        for intent in Intent::ALL {
            scores.set(intent, rng.gen_range(0.0..=1.0));
        }
        scores
    }

    fn random_text(rng: &mut StdRng) -> String {
        let len = rng.gen_range(0..60);
        (0..len).map(|_| rng.gen_range('a'..='z')).collect()
    }

    #[test]
    fn test_evolve_does_not_alias_input() {
        let state = PersonalityState::default();
        let before = state.clone();
        let next = evolve(&state, "hey", &classify("hey"));
        assert_eq!(state, before);
        assert_ne!(next.vectors, state.vectors);
    }

    #[test]
    fn test_bounds_hold_for_random_histories() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut state = PersonalityState::default();
            for t in Trait::ALL {
                // start anywhere, even outside the safeguards
                state.vectors.set(t, rng.gen_range(-0.5..1.5));
            }
            for _ in 0..200 {
                let text = random_text(&mut rng);
                let scores = random_scores(&mut rng);
                state = evolve(&state, &text, &scores);
                assert!(state.vectors.within_bounds(), "{:?}", state.vectors);
            }
        }
    }

    #[test]
    fn test_nan_traits_are_repaired() {
        let mut state = PersonalityState::default();
        state.vectors.presence = f64::NAN;
        let next = evolve(&state, NEUTRAL, &IntentScores::default());
        assert!(next.vectors.presence.is_finite());
        assert!(next.vectors.within_bounds());
    }

    #[test]
    fn test_decay_converges_to_baseline() {
        let mut state = PersonalityState::default();
        for t in Trait::ALL {
            let (lo, hi) = t.bounds();
            // farthest bound from baseline
            let far = if t.baseline() - lo > hi - t.baseline() { lo } else { hi };
            state.vectors.set(t, far);
        }

        // worst gap is presence at 0.6: (1 - 0.02)^n * 0.6 < 0.01 once n > 203
        for _ in 0..250 {
            state = evolve(&state, NEUTRAL, &IntentScores::default());
        }
        for (t, v) in state.vectors.iter() {
            assert!((v - t.baseline()).abs() < 0.01, "{} = {}", t, v);
        }
    }

    #[test]
    fn test_short_greeting_nudges_casual_grounding() {
        let state = PersonalityState::default();
        let next = evolve(&state, "hey", &classify("hey"));
        let expected = decay_toward(nudge(0.7, 0.8, BASE_RATE), 0.7, DECAY_RATE);
        assert!((next.vectors.casual_grounding - expected).abs() < 1e-12);
        assert!(next.vectors.casual_grounding > 0.7);
    }

    #[test]
    fn test_emotional_pressure_is_monotonic() {
        let mut state = PersonalityState::default();
        let mut scores = IntentScores::default();
        scores.emotional = 0.6;

        let mut last_gap = (0.7 - state.vectors.emotional_resonance).abs();
        for _ in 0..5 {
            state = evolve(&state, NEUTRAL, &scores);
            let v = state.vectors.emotional_resonance;
            let gap = (0.7 - v).abs();
            assert!(gap < last_gap);
            assert!(v <= 0.8);
            last_gap = gap;
        }
    }

    #[test]
    fn test_nudges_apply_in_rule_order() {
        // casual then humor both push casualGrounding; humor sees the casual result
        let mut scores = IntentScores::default();
        scores.casual = 0.8;
        scores.humor = 0.6;
        let next = evolve(&PersonalityState::default(), "haha ok", &scores);

        let after_casual = nudge(0.7, 0.8, BASE_RATE);
        let after_humor = nudge(after_casual, 0.85, BASE_RATE);
        let expected = decay_toward(after_humor, 0.7, DECAY_RATE);
        assert!((next.vectors.casual_grounding - expected).abs() < 1e-12);
    }

    #[test]
    fn test_legacy_weights_follow_vectors() {
        let next = evolve(&PersonalityState::default(), NEUTRAL, &IntentScores::default());
        assert_eq!(next.legacy.casual_weight, next.vectors.casual_grounding);
        assert_eq!(next.legacy.mythic_weight, next.vectors.mythic_depth);
        assert_eq!(next.legacy.clarity, next.vectors.analytic_clarity);
        let energy = (next.vectors.presence + next.vectors.emotional_resonance) / 2.0;
        assert_eq!(next.legacy.energy, energy);
    }

    #[test]
    fn test_memory_capture_rules() {
        assert_eq!(memory_snippet("hey there how are you doing"), None);
        assert_eq!(memory_snippet("   short one   "), None);
        let long = "x".repeat(300);
        assert_eq!(memory_snippet(&long).map(|s| s.len()), Some(SNIPPET_CLIP));
        assert_eq!(
            memory_snippet("  my sister moved to Lisbon last spring  ").as_deref(),
            Some("my sister moved to Lisbon last spring")
        );
    }

    #[test]
    fn test_memory_bound_keeps_most_recent() {
        let mut state = PersonalityState::default();
        let mut added = Vec::new();
        for i in 0..25 {
            let text = format!("remember this detail number {}", i);
            state = evolve(&state, &text, &IntentScores::default());
            added.push(text);
            assert!(state.memories.len() <= state.max_memories);
        }
        assert_eq!(state.memories, added[added.len() - 10..].to_vec());
        assert_eq!(state.interactions, 25);
    }
}
