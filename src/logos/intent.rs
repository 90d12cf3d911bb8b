//! Intent Classifier - Lexical Scoring
//!
//! Scores free text against a closed set of intent labels. Each label
//! owns a list of independent signals; every matching signal adds a fixed
//! increment and the result is clamped to [0, 1]. Labels are scored
//! independently, so a message can be both casual and humorous.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Increment contributed by every matching signal
pub const SIGNAL_WEIGHT: f64 = 0.3;

/// Closed set of intent labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    Casual,
    Emotional,
    Numinous,
    Philosophical,
    Conflict,
    Confusion,
    Humor,
    Intimacy,
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::Casual,
        Intent::Emotional,
        Intent::Numinous,
        Intent::Philosophical,
        Intent::Conflict,
        Intent::Confusion,
        Intent::Humor,
        Intent::Intimacy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Casual => "casual",
            Intent::Emotional => "emotional",
            Intent::Numinous => "numinous",
            Intent::Philosophical => "philosophical",
            Intent::Conflict => "conflict",
            Intent::Confusion => "confusion",
            Intent::Humor => "humor",
            Intent::Intimacy => "intimacy",
        }
    }

    /// Bonus added on top of pattern signals, keyed on message length
    fn length_bonus(&self, len: usize) -> f64 {
        match self {
            Intent::Casual if len < 20 => 0.2,
            Intent::Emotional if len > 40 => 0.15,
            Intent::Philosophical if len > 30 => 0.1,
            Intent::Numinous if len > 25 => 0.1,
            _ => 0.0,
        }
    }

    fn signals(&self) -> &'static [Regex] {
        &SIGNALS[*self as usize]
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).expect("intent pattern is valid"))
        .collect()
}

// Indexed by `Intent as usize`
static SIGNALS: Lazy<[Vec<Regex>; 8]> = Lazy::new(|| {
    [
        compile(&[
            r"^(hey|hi|yo|sup|hello|what'?s up)\b",
            r"^(lol|lmao|haha|ok|cool|nice|thanks|thx|word|bet)\b",
            r"^.{1,12}$",
        ]),
        compile(&[
            r"\b(feel|feeling|felt)\b.*\b(sad|lost|alone|scared|afraid|anxious|empty|broken|hurt)\b",
            r"\b(struggling|hurting|suffering|grieving|overwhelmed)\b",
            r"\b(i('m| am)|i've)\b.*\b(depressed|anxious|confused|tired|exhausted)\b",
        ]),
        compile(&[
            r"\b(soul|divine|cosmic|sacred|holy|universe|infinite|eternal)\b",
            r"\b(god|spirit|transcend|consciousness|awareness|existence)\b",
            r"what (am i|are we|is reality|is the meaning)",
        ]),
        compile(&[
            r"\b(why|what is|what does|how does|purpose|meaning|truth)\b",
            r"\b(reality|mind|consciousness|existence|being|self)\b",
            r"\b(free will|morality|ethics|knowledge|belief)\b",
        ]),
        compile(&[
            r"\b(angry|frustrated|pissed|furious|hate|can't stand)\b",
            r"\b(fight|argue|conflict|disagree|problem with)\b",
            r"\b(wtf|bullshit|unfair|wrong)\b",
        ]),
        compile(&[
            r"\b(confused|don't understand|makes no sense|lost|unclear)\b",
            r"\b(what do you mean|help me understand|explain)\b",
            r"\?.*\?",
        ]),
        compile(&[
            r"\b(lol|lmao|haha|hehe|joke|funny|hilarious)\b",
            r"\b(kidding|joking|messing|trolling)\b",
            "😂|😄|🤣|😆",
        ]),
        compile(&[
            r"\b(love|care|miss|need you|thank you for|appreciate)\b",
            r"\b(close to you|connection|bond|trust)\b",
            r"\b(you understand|you get me|only you)\b",
        ]),
    ]
});

/// Score per intent label, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentScores {
    pub casual: f64,
    pub emotional: f64,
    pub numinous: f64,
    pub philosophical: f64,
    pub conflict: f64,
    pub confusion: f64,
    pub humor: f64,
    pub intimacy: f64,
}

impl IntentScores {
    pub fn get(&self, intent: Intent) -> f64 {
        match intent {
            Intent::Casual => self.casual,
            Intent::Emotional => self.emotional,
            Intent::Numinous => self.numinous,
            Intent::Philosophical => self.philosophical,
            Intent::Conflict => self.conflict,
            Intent::Confusion => self.confusion,
            Intent::Humor => self.humor,
            Intent::Intimacy => self.intimacy,
        }
    }

    pub fn set(&mut self, intent: Intent, score: f64) {
        let slot = match intent {
            Intent::Casual => &mut self.casual,
            Intent::Emotional => &mut self.emotional,
            Intent::Numinous => &mut self.numinous,
            Intent::Philosophical => &mut self.philosophical,
            Intent::Conflict => &mut self.conflict,
            Intent::Confusion => &mut self.confusion,
            Intent::Humor => &mut self.humor,
            Intent::Intimacy => &mut self.intimacy,
        };
        *slot = score;
    }

    /// Iterate labels in their fixed order
    pub fn iter(&self) -> impl Iterator<Item = (Intent, f64)> + '_ {
        Intent::ALL.iter().map(move |&i| (i, self.get(i)))
    }

    /// Highest-scoring label, ties resolved by label order
    pub fn dominant(&self) -> Option<Intent> {
        self.iter()
            .filter(|(_, s)| *s > 0.0)
            .fold(None, |best: Option<(Intent, f64)>, (i, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((i, s)),
            })
            .map(|(i, _)| i)
    }
}

/// Score `text` against every intent label
pub fn classify(text: &str) -> IntentScores {
    let lower = text.to_lowercase();
    let len = text.chars().count();
    let mut scores = IntentScores::default();

    for intent in Intent::ALL {
        let hits = intent
            .signals()
            .iter()
            .filter(|re| re.is_match(&lower))
            .count();
        let score = hits as f64 * SIGNAL_WEIGHT + intent.length_bonus(len);
        scores.set(intent, score.clamp(0.0, 1.0));
    }

    scores
}
