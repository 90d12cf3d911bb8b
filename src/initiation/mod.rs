//! 🜂 Level 0: Initiation
//!
//! Loads the configuration and wires every level into a session
//! registry:
//! - Phrase book and reflective corpus (Demiurge)
//! - State store (Totems)
//! - Oracle and token ledger (Priests)

pub mod config;

use crate::demiurge::archetype::{parse_reflections, PhraseBook};
use crate::demiurge::directives::DirectiveEngine;
use crate::demiurge::voice::Composer;
use crate::demiurge::PersonalityState;
use crate::priests::budget::TokenLedger;
use crate::priests::oracle::AnthropicOracle;
use crate::session::{Engine, SessionRegistry};
use crate::totems::{FileStateStore, StateStore};
use anyhow::{Context, Result};
use std::sync::Arc;

pub use config::SystemConfig;

/// Main orchestrator of system start-up
pub struct InitiationManager {
    config: SystemConfig,
}

impl InitiationManager {
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Built-in phrase book with the configured overrides applied
    pub fn phrase_book(&self) -> Result<PhraseBook> {
        let mut book = match &self.config.phrasebook_path {
            Some(path) => PhraseBook::load(path)?,
            None => PhraseBook::default(),
        };

        if let Some(path) = &self.config.reflections_path {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read reflections {}", path))?;
            book.reflections = parse_reflections(&text);
            book.validate()
                .with_context(|| format!("Invalid reflections {}", path))?;
        }
        Ok(book)
    }

    /// Full system on the file-backed store
    pub fn init_system(&self) -> Result<SessionRegistry> {
        let store = FileStateStore::new(&self.config.data_dir);
        store.initialize()?;
        self.init_with_store(Arc::new(store))
    }

    pub fn init_with_store(&self, store: Arc<dyn StateStore>) -> Result<SessionRegistry> {
        tracing::info!(wake_word = %self.config.wake_word, "initializing Orpheus");

        let book = self.phrase_book()?;
        let composer = Composer::new(Arc::new(book), DirectiveEngine::standard()?);

        let mut engine = Engine::new(composer, store, &self.config.wake_word)?
            .with_default_state(PersonalityState::with_max_memories(self.config.max_memories));

        if self.config.oracle.enabled {
            let ledger = Arc::new(TokenLedger::open(
                self.config.ledger_path(),
                self.config.budget.monthly_tokens,
            ));
            let oracle = AnthropicOracle::from_env(self.config.oracle.clone(), Some(ledger));
            if oracle.has_key() {
                tracing::info!(model = %self.config.oracle.model, "oracle active");
                engine = engine.with_oracle(Arc::new(oracle));
            } else {
                tracing::info!(
                    env = %self.config.oracle.api_key_env,
                    "no API key, running on local templates only"
                );
            }
        } else {
            tracing::info!("oracle disabled");
        }

        Ok(SessionRegistry::new(Arc::new(engine), self.config.seed))
    }
}
