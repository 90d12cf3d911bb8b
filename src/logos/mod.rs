//! Logos Level - Reading the User
//!
//! Shallow lexical scoring of incoming text. No state, no model:
//! every signal is a pattern or a length threshold.

pub mod intent;

pub use intent::{classify, Intent, IntentScores};
