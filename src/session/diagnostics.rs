//! Diagnostic report
//!
//! A JSON mirror of the personality state. The key set is stable; tools
//! read it.

use crate::demiurge::context::ThreadMemory;
use crate::demiurge::evolution::EvolutionRules;
use crate::demiurge::persona::{Identity, PersonalityState, Trait, Vectors};
use crate::demiurge::tone::Tone;
use crate::logos::{Intent, IntentScores};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSnapshot {
    pub casual: f64,
    pub mythic: f64,
    pub analytic: f64,
    pub numinous_sensitivity: f64,
    pub drift: f64,
}

/// Soft warnings, tighter than the hard safeguards
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftCorrection {
    pub mythic_too_high: bool,
    pub casual_too_low: bool,
    pub numinous_too_high: bool,
    pub emotional_imbalance: bool,
}

impl DriftCorrection {
    pub fn assess(v: &Vectors) -> Self {
        Self {
            mythic_too_high: v.mythic_depth > 0.6,
            casual_too_low: v.casual_grounding < 0.4,
            numinous_too_high: v.numinous_drift > 0.5,
            emotional_imbalance: v.emotional_resonance > 0.75 || v.emotional_resonance < 0.25,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemoryReport<'a> {
    pub stored: &'a [String],
    pub count: usize,
    pub max: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRules {
    pub intent_types: Vec<&'static str>,
    pub tone_options: Vec<&'static str>,
    pub evolution_rate: String,
    pub drift_safeguards: BTreeMap<&'static str, [f64; 2]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport<'a> {
    pub evolution_vectors: &'a Vectors,
    pub weights: WeightSnapshot,
    pub last_intent: Option<IntentScores>,
    pub last_tone: Option<Tone>,
    pub thread_memory: &'a ThreadMemory,
    pub identity: &'a Identity,
    pub drift_correction: DriftCorrection,
    pub memory: MemoryReport<'a>,
    pub recent_inputs: Vec<String>,
    pub profiles: BTreeMap<&'static str, &'static str>,
    pub rules: SelectionRules,
    pub interactions: u64,
}

impl<'a> DiagnosticReport<'a> {
    pub fn build(
        state: &'a PersonalityState,
        last_intent: Option<IntentScores>,
        recent_inputs: Vec<String>,
        evolution: &EvolutionRules,
    ) -> Self {
        let legacy = &state.legacy;
        Self {
            evolution_vectors: &state.vectors,
            weights: WeightSnapshot {
                casual: legacy.casual_weight,
                mythic: legacy.mythic_weight,
                analytic: legacy.analytic_weight,
                numinous_sensitivity: legacy.numinous_sensitivity,
                drift: legacy.drift,
            },
            last_intent,
            last_tone: state.thread_memory.last_tone(),
            thread_memory: &state.thread_memory,
            identity: state.identity(),
            drift_correction: DriftCorrection::assess(&state.vectors),
            memory: MemoryReport {
                stored: &state.memories,
                count: state.memories.len(),
                max: state.max_memories,
            },
            recent_inputs,
            profiles: Tone::ALL.iter().map(|t| (t.as_str(), t.profile())).collect(),
            rules: SelectionRules {
                intent_types: Intent::ALL.iter().map(|i| i.as_str()).collect(),
                tone_options: Tone::ALL.iter().map(|t| t.as_str()).collect(),
                evolution_rate: format!(
                    "nudge {} / decay {} per message",
                    evolution.base_rate, evolution.decay_rate
                ),
                drift_safeguards: Trait::ALL
                    .iter()
                    .map(|t| {
                        let (lo, hi) = t.bounds();
                        (t.as_str(), [lo, hi])
                    })
                    .collect(),
            },
            interactions: state.interactions,
        }
    }

    /// Pretty JSON inside a ```json fence
    pub fn render(&self) -> serde_json::Result<String> {
        Ok(format!("```json\n{}\n```", serde_json::to_string_pretty(self)?))
    }
}
