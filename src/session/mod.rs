//! Session Controller - The Turn State Machine
//!
//! A session is NORMAL or DIAGNOSTIC (the flag lives in the persisted
//! state). Each turn is checked, in order, for: entering diagnostics,
//! leaving diagnostics, the diagnostic short-circuit, an upgrade
//! directive, and finally the normal flow of
//! classify → evolve → select tone → consult oracle → compose → persist.

pub mod commands;
pub mod diagnostics;
pub mod registry;

pub use commands::{Adjustment, CommandSet};
pub use diagnostics::DiagnosticReport;
pub use registry::SessionRegistry;

use crate::demiurge::evolution::EvolutionEngine;
use crate::demiurge::tone::{select_tone, Tone};
use crate::demiurge::voice::{ComposeRequest, Composer};
use crate::demiurge::PersonalityState;
use crate::logos::{classify, IntentScores};
use crate::priests::oracle::{Oracle, OracleRequest};
use crate::totems::{load_state, save_state, StateStore};
use anyhow::Result;
use rand::RngCore;
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

pub const EXIT_DIAGNOSTICS_REPLY: &str = "Diagnostic mode disabled. Returning to normal operation.";
pub const UPGRADE_REPLY: &str = "Upgrades accepted.";
/// Raw inputs kept for the diagnostic report
pub const RECENT_INPUTS: usize = 5;

/// What kind of turn produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    Tone(Tone),
    Diagnostic,
    Upgrade,
}

impl ReplyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyMode::Tone(t) => t.as_str(),
            ReplyMode::Diagnostic => "diagnostic",
            ReplyMode::Upgrade => "upgrade",
        }
    }
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ReplyMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Where the core statement came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineHint {
    Augmented,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub reply: String,
    pub mode: ReplyMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_hint: Option<EngineHint>,
}

impl TurnReply {
    fn new(reply: impl Into<String>, mode: ReplyMode, engine_hint: Option<EngineHint>) -> Self {
        Self {
            reply: reply.into(),
            mode,
            engine_hint,
        }
    }
}

/// Collaborators shared by every session
pub struct Engine {
    composer: Composer,
    evolution: EvolutionEngine,
    commands: CommandSet,
    store: Arc<dyn StateStore>,
    oracle: Option<Arc<dyn Oracle>>,
    default_state: PersonalityState,
}

impl Engine {
    pub fn new(composer: Composer, store: Arc<dyn StateStore>, wake_word: &str) -> Result<Self> {
        Ok(Self {
            composer,
            evolution: EvolutionEngine::default(),
            commands: CommandSet::new(wake_word)?,
            store,
            oracle: None,
            default_state: PersonalityState::default(),
        })
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_evolution(mut self, evolution: EvolutionEngine) -> Self {
        self.evolution = evolution;
        self
    }

    /// State used for fresh or unreadable storage
    pub fn with_default_state(mut self, state: PersonalityState) -> Self {
        self.default_state = state;
        self
    }

    pub fn load(&self, conversation: &str) -> PersonalityState {
        load_state(self.store.as_ref(), conversation, &self.default_state)
    }

    fn save(&self, conversation: &str, state: &PersonalityState) {
        save_state(self.store.as_ref(), conversation, state);
    }
}

/// One conversation's controller. Turns take `&mut self`, so a session
/// never runs two turns at once.
pub struct Session {
    conversation: String,
    engine: Arc<Engine>,
    rng: Box<dyn RngCore + Send>,
    recent_inputs: VecDeque<String>,
}

impl Session {
    pub fn new(
        conversation: impl Into<String>,
        engine: Arc<Engine>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            conversation: conversation.into(),
            engine,
            rng,
            recent_inputs: VecDeque::with_capacity(RECENT_INPUTS + 1),
        }
    }

    pub fn conversation(&self) -> &str {
        &self.conversation
    }

    /// Current persisted state
    pub fn state(&self) -> PersonalityState {
        self.engine.load(&self.conversation)
    }

    pub fn is_diagnostic(&self) -> bool {
        self.state().diagnostic_mode
    }

    pub fn recent_inputs(&self) -> Vec<String> {
        self.recent_inputs.iter().cloned().collect()
    }

    fn track(&mut self, message: &str) {
        self.recent_inputs.push_back(message.to_string());
        while self.recent_inputs.len() > RECENT_INPUTS {
            self.recent_inputs.pop_front();
        }
    }

    /// Process one message; always produces a reply
    pub fn turn(&mut self, message: &str) -> TurnReply {
        self.track(message);
        let engine = Arc::clone(&self.engine);
        let mut state = engine.load(&self.conversation);

        if engine.commands.is_enter_diagnostics(message) {
            if !state.diagnostic_mode {
                state.diagnostic_mode = true;
                engine.save(&self.conversation, &state);
                tracing::info!(conversation = %self.conversation, "diagnostic mode enabled");
            }
            return self.diagnostic_reply(&state, None);
        }

        if engine.commands.is_exit_diagnostics(message) {
            if state.diagnostic_mode {
                state.diagnostic_mode = false;
                engine.save(&self.conversation, &state);
                tracing::info!(conversation = %self.conversation, "diagnostic mode disabled");
            }
            return TurnReply::new(EXIT_DIAGNOSTICS_REPLY, ReplyMode::Tone(Tone::Casual), None);
        }

        if state.diagnostic_mode {
            return self.diagnostic_reply(&state, Some(classify(message)));
        }

        if let Some(adjustments) = engine.commands.parse_upgrade(message) {
            let mut upgraded = state.clone();
            let applied = adjustments
                .iter()
                .filter(|a| upgraded.set_scalar(&a.key, a.value))
                .count();
            if applied > 0 {
                engine.save(&self.conversation, &upgraded);
                tracing::info!(conversation = %self.conversation, applied, "upgrade applied");
                return TurnReply::new(UPGRADE_REPLY, ReplyMode::Upgrade, None);
            }
            tracing::debug!("upgrade directive without usable adjustments");
        }

        self.normal_turn(&engine, state, message)
    }

    fn normal_turn(&mut self, engine: &Engine, state: PersonalityState, message: &str) -> TurnReply {
        let intents = classify(message);
        let mut evolved = engine.evolution.evolve(&state, message, &intents);
        let tone = select_tone(&intents, &evolved, &evolved.thread_memory, self.rng.as_mut());
        tracing::debug!(?intents, %tone, "turn classified");

        let insight = engine.oracle.as_ref().and_then(|oracle| {
            oracle.consult(&OracleRequest {
                message,
                tone,
                intents: &intents,
                recent_messages: &evolved.thread_memory.last_messages,
                vectors: &evolved.vectors,
            })
        });
        let answer = insight
            .as_ref()
            .and_then(|i| i.answer.as_deref())
            .filter(|a| !a.trim().is_empty());

        let mut reply = engine.composer.compose(
            &ComposeRequest {
                text: message,
                tone,
                intents: &intents,
                state: &evolved,
                oracle_answer: answer,
            },
            self.rng.as_mut(),
        );
        let hint = if answer.is_some() {
            EngineHint::Augmented
        } else {
            EngineHint::Local
        };

        if let Some(warning) = insight.as_ref().and_then(|i| i.budget_warning.as_ref()) {
            if warning.injects() {
                reply.push_str(&warning.footnote());
            }
        }

        evolved.thread_memory.record(message, tone, intents);
        engine.save(&self.conversation, &evolved);

        TurnReply::new(reply, ReplyMode::Tone(tone), Some(hint))
    }

    fn diagnostic_reply(&self, state: &PersonalityState, intents: Option<IntentScores>) -> TurnReply {
        let report = DiagnosticReport::build(
            state,
            intents,
            self.recent_inputs(),
            self.engine.evolution.rules(),
        );
        let reply = report.render().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to render diagnostics");
            "```json\n{}\n```".to_string()
        });
        TurnReply::new(reply, ReplyMode::Diagnostic, None)
    }
}
