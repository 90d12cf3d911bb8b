//! Thread Memory - Short-Term Continuity
//!
//! Rolling window of the last few tones, intent maps and raw messages.
//! Used by the tone selector to detect and penalize repetition.

use crate::demiurge::tone::Tone;
use crate::logos::IntentScores;
use serde::{Deserialize, Serialize};

/// Entries kept per window
pub const THREAD_WINDOW: usize = 3;
/// Characters kept per remembered message
pub const MESSAGE_CLIP: usize = 100;

/// Ordered windows, most recent last
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadMemory {
    pub last_tones: Vec<Tone>,
    pub last_intents: Vec<IntentScores>,
    #[serde(rename = "last3Messages")]
    pub last_messages: Vec<String>,
}

impl ThreadMemory {
    /// Record one completed turn
    pub fn record(&mut self, message: &str, tone: Tone, intents: IntentScores) {
        push_window(&mut self.last_tones, tone);
        push_window(&mut self.last_intents, intents);
        push_window(&mut self.last_messages, clip(message, MESSAGE_CLIP));
    }

    /// How often `tone` appears in the tone window
    pub fn tone_count(&self, tone: Tone) -> usize {
        self.last_tones.iter().filter(|t| **t == tone).count()
    }

    pub fn last_tone(&self) -> Option<Tone> {
        self.last_tones.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.last_tones.is_empty() && self.last_intents.is_empty() && self.last_messages.is_empty()
    }
}

fn push_window<T>(window: &mut Vec<T>, item: T) {
    window.push(item);
    if window.len() > THREAD_WINDOW {
        let excess = window.len() - THREAD_WINDOW;
        window.drain(..excess);
    }
}

/// First `max_chars` characters of `text`
pub fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => text[..byte_pos].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_keep_last_three() {
        let mut tm = ThreadMemory::default();
        let tones = [Tone::Casual, Tone::Mythic, Tone::Shadow, Tone::Stillness];
        for (i, tone) in tones.iter().enumerate() {
            tm.record(&format!("message {}", i), *tone, IntentScores::default());
        }

        assert_eq!(tm.last_tones, vec![Tone::Mythic, Tone::Shadow, Tone::Stillness]);
        assert_eq!(tm.last_messages, vec!["message 1", "message 2", "message 3"]);
        assert_eq!(tm.last_intents.len(), THREAD_WINDOW);
        assert_eq!(tm.last_tone(), Some(Tone::Stillness));
    }

    #[test]
    fn test_messages_are_clipped() {
        let mut tm = ThreadMemory::default();
        let long = "ж".repeat(250);
        tm.record(&long, Tone::Casual, IntentScores::default());
        assert_eq!(tm.last_messages[0].chars().count(), MESSAGE_CLIP);
    }

    #[test]
    fn test_tone_count() {
        let mut tm = ThreadMemory::default();
        tm.record("a", Tone::Casual, IntentScores::default());
        tm.record("b", Tone::Casual, IntentScores::default());
        tm.record("c", Tone::Intimate, IntentScores::default());
        assert_eq!(tm.tone_count(Tone::Casual), 2);
        assert_eq!(tm.tone_count(Tone::Mythic), 0);
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(ThreadMemory::default()).unwrap();
        assert!(json.get("lastTones").is_some());
        assert!(json.get("last3Messages").is_some());
    }
}
