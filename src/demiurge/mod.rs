//! Demiurge Level - Personality & Voice
//!
//! The Demiurge owns the evolving personality state and everything that
//! turns it into a reply: trait evolution, thread memory, tone selection
//! and the layered composer.

pub mod archetype;
pub mod context;
pub mod directives;
pub mod evolution;
pub mod persona;
pub mod tone;
pub mod voice;

pub use archetype::{PhraseBook, TonePhrases};
pub use context::ThreadMemory;
pub use directives::DirectiveEngine;
pub use evolution::{evolve, EvolutionEngine};
pub use persona::{Identity, PersonalityState, Trait, Vectors};
pub use tone::{select_tone, Tone, ToneWeights};
pub use voice::{ComposeRequest, Composer};
