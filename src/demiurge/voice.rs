//! Voice - Layered Response Composer
//!
//! A reply is assembled in a strict order: core statement, voice
//! texture, optional closer, boundary filter, then the two rare echoes
//! (a remembered snippet and a reflective line). Every random draw goes
//! through the injected `RngCore`, so a fixed source fixes the reply.

use crate::demiurge::archetype::PhraseBook;
use crate::demiurge::context::clip;
use crate::demiurge::directives::DirectiveEngine;
use crate::demiurge::evolution::memory_snippet;
use crate::demiurge::persona::PersonalityState;
use crate::demiurge::tone::Tone;
use crate::logos::IntentScores;
use once_cell::sync::Lazy;
use rand::{Rng, RngCore};
use regex::Regex;
use std::sync::Arc;

pub const CLOSER_PROBABILITY: f64 = 0.3;
pub const MEMORY_ECHO_PROBABILITY: f64 = 0.08;
pub const REFLECTION_ECHO_PROBABILITY: f64 = 0.05;
/// Characters kept from a reflective line
pub const REFLECTION_CLIP: usize = 100;

static GREETING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(hey|hi|hello|sup|yo|what'?s up)\b").expect("valid cue pattern"));
static HOW_ARE_YOU: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"how are you|how'?s it going").expect("valid cue pattern"));
static LAUGH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(lol|lmao|haha|hehe)\b").expect("valid cue pattern"));
static THANKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(thanks|thx|thank you)\b").expect("valid cue pattern"));

/// Casual sub-category picked from the raw message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasualCue {
    Greeting,
    HowAreYou,
    Laugh,
    Thanks,
    Reaction,
}

impl CasualCue {
    pub fn detect(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        if GREETING.is_match(&lower) {
            CasualCue::Greeting
        } else if HOW_ARE_YOU.is_match(&lower) {
            CasualCue::HowAreYou
        } else if LAUGH.is_match(&lower) {
            CasualCue::Laugh
        } else if THANKS.is_match(&lower) {
            CasualCue::Thanks
        } else {
            CasualCue::Reaction
        }
    }
}

/// Everything one composition reads
#[derive(Debug, Clone, Copy)]
pub struct ComposeRequest<'a> {
    pub text: &'a str,
    pub tone: Tone,
    pub intents: &'a IntentScores,
    /// State after this turn's evolution
    pub state: &'a PersonalityState,
    /// Replaces the template core statement when present
    pub oracle_answer: Option<&'a str>,
}

/// Uniform pick, `floor(u * len)` over one draw
fn pick<'a>(items: &'a [String], rng: &mut dyn RngCore) -> &'a str {
    if items.is_empty() {
        return "";
    }
    let idx = (rng.gen::<f64>() * items.len() as f64) as usize;
    &items[idx.min(items.len() - 1)]
}

fn chance(probability: f64, rng: &mut dyn RngCore) -> bool {
    rng.gen::<f64>() < probability
}

pub struct Composer {
    phrases: Arc<PhraseBook>,
    directives: DirectiveEngine,
}

impl Composer {
    pub fn new(phrases: Arc<PhraseBook>, directives: DirectiveEngine) -> Self {
        Self {
            phrases,
            directives,
        }
    }

    pub fn phrases(&self) -> &PhraseBook {
        &self.phrases
    }

    pub fn compose(&self, req: &ComposeRequest<'_>, rng: &mut dyn RngCore) -> String {
        let core = match req.oracle_answer.map(str::trim).filter(|a| !a.is_empty()) {
            Some(answer) => answer.to_string(),
            None => self.core_statement(req.text, req.tone, rng).to_string(),
        };

        let mut output = self.apply_voice(&core, req.tone, rng);
        output = self.directives.apply(&output, &req.state.identity().boundaries);

        if let Some(echo) = self.memory_echo(req, rng) {
            output.push_str(&echo);
        }
        if let Some(echo) = self.reflection_echo(req.tone, rng) {
            output.push_str(&echo);
        }
        output
    }

    fn core_statement(&self, text: &str, tone: Tone, rng: &mut dyn RngCore) -> &str {
        if tone != Tone::Casual {
            return pick(&self.phrases.tone(tone).core, rng);
        }
        let cues = &self.phrases.casual_cues;
        let list = match CasualCue::detect(text) {
            CasualCue::Greeting => &cues.greeting,
            CasualCue::HowAreYou => &cues.how_are_you,
            CasualCue::Laugh => &cues.laugh,
            CasualCue::Thanks => &cues.thanks,
            CasualCue::Reaction => &self.phrases.casual.core,
        };
        pick(list, rng)
    }

    /// Texture prefix plus the occasional closer
    fn apply_voice(&self, core: &str, tone: Tone, rng: &mut dyn RngCore) -> String {
        let phrases = self.phrases.tone(tone);
        let texture = pick(&phrases.textures, rng);
        let mut output = format!("{}{}", texture, core);

        if chance(CLOSER_PROBABILITY, rng) {
            let closer = pick(&phrases.closers, rng).trim();
            if !closer.is_empty() && !output.contains(closer) {
                output = format!("{} {}", output.trim(), closer);
            }
        }
        output.trim().to_string()
    }

    fn memory_echo(&self, req: &ComposeRequest<'_>, rng: &mut dyn RngCore) -> Option<String> {
        let intents = req.intents;
        let weighty = intents.emotional >= 0.2 || intents.intimacy >= 0.2;
        if intents.casual > 0.4 || !weighty {
            return None;
        }

        // evolve has already appended this turn's own snippet
        let mut candidates: &[String] = &req.state.memories;
        if let (Some(current), Some(last)) = (memory_snippet(req.text), candidates.last()) {
            if *last == current {
                candidates = &candidates[..candidates.len() - 1];
            }
        }
        if candidates.is_empty() || !chance(MEMORY_ECHO_PROBABILITY, rng) {
            return None;
        }

        let memory = pick(candidates, rng);
        Some(format!("\n\n*...something echoes: \"{}\"*", memory))
    }

    fn reflection_echo(&self, tone: Tone, rng: &mut dyn RngCore) -> Option<String> {
        if matches!(tone, Tone::Casual | Tone::Analytic) || self.phrases.reflections.is_empty() {
            return None;
        }
        if !chance(REFLECTION_ECHO_PROBABILITY, rng) {
            return None;
        }
        let line = pick(&self.phrases.reflections, rng);
        Some(format!("\n\n*{}*", clip(line, REFLECTION_CLIP).trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demiurge::archetype::TonePhrases;
    use crate::logos::classify;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Every draw is 0.0: all gates pass, every pick is the first entry
    fn always() -> StepRng {
        StepRng::new(0, 0)
    }

    /// Every draw is just under 1.0: no gate passes, every pick is the last entry
    fn never() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn composer(book: PhraseBook) -> Composer {
        Composer::new(Arc::new(book), DirectiveEngine::standard().unwrap())
    }

    fn request<'a>(
        text: &'a str,
        tone: Tone,
        intents: &'a IntentScores,
        state: &'a PersonalityState,
    ) -> ComposeRequest<'a> {
        ComposeRequest {
            text,
            tone,
            intents,
            state,
            oracle_answer: None,
        }
    }

    #[test]
    fn test_casual_cues() {
        assert_eq!(CasualCue::detect("Hey there"), CasualCue::Greeting);
        assert_eq!(CasualCue::detect("so how's it going?"), CasualCue::HowAreYou);
        assert_eq!(CasualCue::detect("lmao"), CasualCue::Laugh);
        assert_eq!(CasualCue::detect("thank you!"), CasualCue::Thanks);
        assert_eq!(CasualCue::detect("the bus was late"), CasualCue::Reaction);
    }

    #[test]
    fn test_greeting_reply_with_fixed_draws() {
        let c = composer(PhraseBook::default());
        let state = PersonalityState::default();
        let intents = classify("hey");
        let reply = c.compose(&request("hey", Tone::Casual, &intents, &state), &mut always());
        // empty texture, empty closer, no echoes for casual chatter
        assert_eq!(reply, "Hey! What's up?");
    }

    #[test]
    fn test_texture_and_closer_layers() {
        let c = composer(PhraseBook::default());
        let state = PersonalityState::default();
        let intents = IntentScores::default();
        let reply = c.compose(
            &request("what is this", Tone::Analytic, &intents, &state),
            &mut never(),
        );
        assert_eq!(
            reply,
            "That's worth unpacking. There's something worth unpacking in what you said."
        );
    }

    #[test]
    fn test_duplicate_closer_is_skipped() {
        let mut book = PhraseBook::default();
        *book.tone_mut(Tone::Stillness) = TonePhrases {
            core: vec!["I see.".to_string()],
            textures: vec![String::new()],
            closers: vec!["I see.".to_string()],
        };
        let c = composer(book);
        let state = PersonalityState::default();
        let intents = IntentScores::default();
        let reply = c.compose(
            &request("quiet", Tone::Stillness, &intents, &state),
            &mut always(),
        );
        // the reflection gate also passes under fixed zero draws
        assert!(reply.starts_with("I see.\n\n*"));
        assert!(!reply.starts_with("I see. I see."));
    }

    #[test]
    fn test_boundary_filter_runs_after_voice() {
        let mut book = PhraseBook::default();
        book.tone_mut(Tone::Intimate).core = vec!["I will protect you.".to_string()];
        book.tone_mut(Tone::Intimate).textures = vec![String::new()];
        let c = composer(book);
        let state = PersonalityState::default();
        let intents = IntentScores::default();
        let reply = c.compose(
            &request("stay", Tone::Intimate, &intents, &state),
            &mut never(),
        );
        assert_eq!(reply, "I'm here with you.");
    }

    #[test]
    fn test_memory_echo_uses_earlier_snippet() {
        let c = composer(PhraseBook::default());
        let text = "I feel so lost and alone since the move";
        let mut state = PersonalityState::default();
        state.remember("my sister moved to Lisbon last spring".to_string());
        state.remember(text.to_string());
        let intents = classify(text);
        let reply = c.compose(&request(text, Tone::Intimate, &intents, &state), &mut always());
        assert!(reply.contains("\n\n*...something echoes: \"my sister moved to Lisbon last spring\"*"));
    }

    #[test]
    fn test_memory_echo_skips_current_snippet() {
        let c = composer(PhraseBook::default());
        let text = "I feel so lost and alone since the move";
        let mut state = PersonalityState::default();
        state.remember(text.to_string());
        let intents = classify(text);
        let reply = c.compose(&request(text, Tone::Intimate, &intents, &state), &mut always());
        assert!(!reply.contains("something echoes"));
    }

    #[test]
    fn test_memory_echo_needs_weighty_intent() {
        let c = composer(PhraseBook::default());
        let mut state = PersonalityState::default();
        state.remember("my sister moved to Lisbon last spring".to_string());
        let intents = IntentScores::default();
        let reply = c.compose(
            &request("the weather report mentions rain", Tone::Intimate, &intents, &state),
            &mut always(),
        );
        assert!(!reply.contains("something echoes"));
    }

    #[test]
    fn test_reflection_echo() {
        let mut book = PhraseBook::default();
        book.reflections = vec![format!("  {}  ", "r".repeat(150))];
        let c = composer(book);
        let state = PersonalityState::default();
        let intents = IntentScores::default();

        let reply = c.compose(&request("drift", Tone::Mythic, &intents, &state), &mut always());
        let expected = format!("\n\n*{}*", "r".repeat(98));
        assert!(reply.ends_with(&expected), "{:?}", reply);

        let reply = c.compose(&request("drift", Tone::Analytic, &intents, &state), &mut always());
        assert!(!reply.contains("\n\n*"));
    }

    #[test]
    fn test_oracle_answer_replaces_core() {
        let c = composer(PhraseBook::default());
        let state = PersonalityState::default();
        let intents = IntentScores::default();
        let mut req = request("why do stars burn", Tone::Analytic, &intents, &state);
        req.oracle_answer = Some("  Fusion keeps them lit.  ");
        let reply = c.compose(&req, &mut always());
        assert_eq!(reply, "Let me think about this. Fusion keeps them lit.");

        req.oracle_answer = Some("   ");
        let reply = c.compose(&req, &mut always());
        assert!(reply.ends_with("Let me think about this carefully."));
    }

    #[test]
    fn test_same_seed_same_reply() {
        let c = composer(PhraseBook::default());
        let state = PersonalityState::default();
        let intents = classify("what does it mean to be awake in a dream?");
        let req = request("what does it mean to be awake in a dream?", Tone::Dreamlike, &intents, &state);
        let a = c.compose(&req, &mut StdRng::seed_from_u64(9));
        let b = c.compose(&req, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
