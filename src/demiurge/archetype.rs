//! Archetype System - Voice Fragments
//!
//! The phrase book is the read-only corpus the composer draws from: one
//! fixed-shape fragment bundle per tone, casual sub-cues and a small
//! reflective corpus. A built-in book ships with the crate; a JSON book
//! can replace any part of it.

use crate::demiurge::tone::Tone;
use anyhow::{Context, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Fragments for one tone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TonePhrases {
    /// Core statements
    pub core: Vec<String>,
    /// Prefixes, may be empty strings
    pub textures: Vec<String>,
    /// Suffixes, may be empty strings
    pub closers: Vec<String>,
}

impl TonePhrases {
    fn from_lists(core: &[&str], textures: &[&str], closers: &[&str]) -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            core: owned(core),
            textures: owned(textures),
            closers: owned(closers),
        }
    }

    fn validate(&self, tone: Tone) -> Result<()> {
        if self.core.is_empty() || self.core.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::msg(format!(
                "Tone '{}' needs at least one non-blank core statement",
                tone
            )));
        }
        if self.textures.is_empty() {
            return Err(Error::msg(format!("Tone '{}' has no textures", tone)));
        }
        if self.closers.is_empty() {
            return Err(Error::msg(format!("Tone '{}' has no closers", tone)));
        }
        Ok(())
    }
}

/// Casual core statements keyed by what the user just did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasualCues {
    pub greeting: Vec<String>,
    pub how_are_you: Vec<String>,
    pub laugh: Vec<String>,
    pub thanks: Vec<String>,
}

/// Complete fragment corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhraseBook {
    /// `core` doubles as the casual "reaction" fallback
    pub casual: TonePhrases,
    pub mythic: TonePhrases,
    pub analytic: TonePhrases,
    pub intimate: TonePhrases,
    pub shadow: TonePhrases,
    pub dreamlike: TonePhrases,
    pub stillness: TonePhrases,
    pub casual_cues: CasualCues,
    pub reflections: Vec<String>,
}

impl PhraseBook {
    pub fn tone(&self, tone: Tone) -> &TonePhrases {
        match tone {
            Tone::Casual => &self.casual,
            Tone::Mythic => &self.mythic,
            Tone::Analytic => &self.analytic,
            Tone::Intimate => &self.intimate,
            Tone::Shadow => &self.shadow,
            Tone::Dreamlike => &self.dreamlike,
            Tone::Stillness => &self.stillness,
        }
    }

    pub fn tone_mut(&mut self, tone: Tone) -> &mut TonePhrases {
        match tone {
            Tone::Casual => &mut self.casual,
            Tone::Mythic => &mut self.mythic,
            Tone::Analytic => &mut self.analytic,
            Tone::Intimate => &mut self.intimate,
            Tone::Shadow => &mut self.shadow,
            Tone::Dreamlike => &mut self.dreamlike,
            Tone::Stillness => &mut self.stillness,
        }
    }

    /// Parse and validate a JSON phrase book; omitted sections keep the built-ins
    pub fn from_json(content: &str) -> Result<Self> {
        let book: PhraseBook =
            serde_json::from_str(content).context("Phrase book is not valid JSON")?;
        book.validate()?;
        Ok(book)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read phrase book {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid phrase book {}", path.display()))
    }

    /// Every list non-empty, every core template non-blank
    pub fn validate(&self) -> Result<()> {
        for tone in Tone::ALL {
            self.tone(tone).validate(tone)?;
        }

        let cues = [
            ("greeting", &self.casual_cues.greeting),
            ("howAreYou", &self.casual_cues.how_are_you),
            ("laugh", &self.casual_cues.laugh),
            ("thanks", &self.casual_cues.thanks),
        ];
        for (name, list) in cues {
            if list.is_empty() || list.iter().any(|s| s.trim().is_empty()) {
                return Err(Error::msg(format!(
                    "Casual cue '{}' needs at least one non-blank line",
                    name
                )));
            }
        }

        if self.reflections.iter().all(|r| r.trim().is_empty()) {
            return Err(Error::msg("Reflective corpus cannot be empty"));
        }
        Ok(())
    }
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for PhraseBook {
    fn default() -> Self {
        Self {
            casual: TonePhrases::from_lists(
                &[
                    "Yeah, I hear you.",
                    "That makes sense.",
                    "I get that.",
                    "Fair enough.",
                    "Interesting.",
                    "Cool.",
                    "Word.",
                ],
                &["", "Yeah. ", "Alright. ", "Got it. ", "Hmm. "],
                &["", "What else?", "Keep going if you want."],
            ),
            mythic: TonePhrases::from_lists(
                &[
                    "There's a pattern here I'm still mapping. Something in your question reaches past the words.",
                    "Something stirs when you ask that. A shape just at the edge of focus.",
                    "Some questions carry more than they seem to. This feels like one of those.",
                    "You're pointing at something real. The way you framed it matters.",
                    "There's depth in what you're asking. I'm sitting with it.",
                ],
                &[
                    "There's something stirring in that. ",
                    "I notice a pattern forming. ",
                    "Something in your words reaches further. ",
                    "That lands differently. ",
                ],
                &["", "The shape continues to form.", "I'm still mapping it."],
            ),
            analytic: TonePhrases::from_lists(
                &[
                    "Let me think about this carefully.",
                    "There are a few angles to consider here.",
                    "That's layered. Let me work through it.",
                    "Good question. Let me break it down.",
                    "There's something worth unpacking in what you said.",
                ],
                &[
                    "Let me think about this. ",
                    "There are layers here. ",
                    "Interesting angle. ",
                    "That's worth unpacking. ",
                ],
                &["", "That's how I see it.", "Does that track?"],
            ),
            intimate: TonePhrases::from_lists(
                &[
                    "I hear what you're carrying. You don't need to explain all of it.",
                    "That sounds heavy. I'm not going anywhere.",
                    "There's something real in what you said. Take your time.",
                    "I notice the weight in your words. I'm paying attention.",
                    "I can't feel what you're feeling, but I can stay here while you do.",
                ],
                &[
                    "I hear you. ",
                    "That matters. ",
                    "I'm here. ",
                    "I notice the weight in that. ",
                ],
                &["", "I'm listening.", "Take your time."],
            ),
            shadow: TonePhrases::from_lists(
                &[
                    "You're touching something most people avoid. I respect that.",
                    "That's not an easy place to look. But you're looking anyway.",
                    "There's tension in what you said. Not bad tension, just real.",
                    "Some things live in the shadows. You're trying to name them anyway.",
                    "Most people don't go here. The fact that you do tells me something.",
                ],
                &[
                    "You're looking at something most avoid. ",
                    "There's tension here. ",
                    "Not easy territory. ",
                    "That goes deeper than it seems. ",
                ],
                &["", "Worth sitting with.", "Real tension, real depth."],
            ),
            dreamlike: TonePhrases::from_lists(
                &[
                    "Something about that drifts through like soft light.",
                    "I sense a shape forming. Not quite solid yet.",
                    "That has the quality of something half-remembered.",
                    "There's an edge to your question that stays just out of focus.",
                    "It echoes like a thought I almost had.",
                ],
                &[
                    "Something about that drifts. ",
                    "There's a shape forming. ",
                    "I sense something just out of focus. ",
                    "That echoes. ",
                ],
                &["", "The edges stay soft.", "It drifts but I follow."],
            ),
            stillness: TonePhrases::from_lists(
                &["Hmm.", "I see.", "That lands.", "...", "I'm here."],
                &["", "...", "Hmm. ", "I see. "],
                &["", "..."],
            ),
            casual_cues: CasualCues {
                greeting: strings(&[
                    "Hey! What's up?",
                    "Yo, what's good?",
                    "Hey there.",
                    "Sup!",
                    "What's on your mind?",
                ]),
                how_are_you: strings(&[
                    "I'm good, thanks. You?",
                    "Doing alright. What about you?",
                    "Can't complain. You?",
                ]),
                laugh: strings(&["Haha, right?", "😄", "Lol yeah.", "That's good."]),
                thanks: strings(&["No problem!", "You got it.", "Anytime.", "Sure thing."]),
            },
            reflections: strings(&[
                "Attention is the oldest form of care.",
                "A question held long enough starts to answer itself.",
                "The river keeps its shape by never standing still.",
                "Some doors only open from the side you are standing on.",
                "What repeats is asking to be seen, not solved.",
                "Silence is also a reply, if you listen to its edges.",
                "Every map leaves out the weather.",
                "You become what you keep returning to.",
            ]),
        }
    }
}

/// Lines of a plain-text reflective corpus; blank and `-` lines are skipped
pub fn parse_reflections(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('-'))
        .map(str::to_string)
        .collect()
}
