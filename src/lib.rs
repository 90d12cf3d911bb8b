//! ORPHEUS MIND - stateful tone-selection and response-composition engine
//!
//! Layers, leaves first:
//! - Logos: intent scoring from free text
//! - Demiurge: personality vectors, thread memory, tone selection, voice
//! - Totems: persisted personality state
//! - Priests: optional LLM collaborator and its token ledger
//! - Session: the per-conversation turn state machine
//! - Initiation: configuration and wiring

pub mod demiurge;
pub mod initiation;
pub mod logos;
pub mod priests;
pub mod session;
pub mod totems;

pub use demiurge::{PersonalityState, Tone};
pub use logos::{classify, Intent, IntentScores};
pub use session::{ReplyMode, Session, SessionRegistry, TurnReply};
