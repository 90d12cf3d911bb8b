//! Oracle - Optional LLM collaborator
//!
//! The oracle supplies raw material, never the voice: an answer that may
//! replace the template core statement, plus a short concept and
//! emotional read. Any failure means "no insight" and the turn goes on
//! with local templates.

use crate::demiurge::persona::Vectors;
use crate::demiurge::tone::Tone;
use crate::initiation::config::OracleConfig;
use crate::logos::IntentScores;
use crate::priests::budget::{BudgetWarning, TokenLedger};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const PLACEHOLDER_KEY: &str = "your-api-key-here";
/// Traits above this are passed along as tendencies
const TENDENCY_THRESHOLD: f64 = 0.5;

static PURE_GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(hey|hi|hello|sup|yo|howdy|what'?s\s*up|how'?s\s*it\s*going)[!?.,\s]*$")
        .expect("greeting pattern is valid")
});

static SECTIONS: Lazy<[(Section, Regex); 3]> = Lazy::new(|| {
    let section = |label: &str| {
        Regex::new(&format!(
            r"(?is){}:\s*(.+?)(?:\n(?:ANSWER|CONCEPT|INSIGHT|OBSERVATION|EMOTIONAL_READ):|\z)",
            label
        ))
        .expect("section pattern is valid")
    };
    [
        (Section::Answer, section("ANSWER")),
        (Section::Concept, section("CONCEPT")),
        (Section::EmotionalRead, section("EMOTIONAL_READ")),
    ]
});

#[derive(Debug, Clone, Copy)]
enum Section {
    Answer,
    Concept,
    EmotionalRead,
}

/// What the oracle is asked about
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    pub message: &'a str,
    pub tone: Tone,
    pub intents: &'a IntentScores,
    pub recent_messages: &'a [String],
    pub vectors: &'a Vectors,
}

/// Structured material returned by the oracle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub answer: Option<String>,
    pub concept: Option<String>,
    pub emotional_read: Option<String>,
    #[serde(skip)]
    pub budget_warning: Option<BudgetWarning>,
}

impl Insight {
    pub fn is_empty(&self) -> bool {
        self.answer.is_none() && self.concept.is_none() && self.emotional_read.is_none()
    }
}

/// An optional source of insight; must never block a turn on failure
pub trait Oracle: Send + Sync {
    fn consult(&self, request: &OracleRequest<'_>) -> Option<Insight>;
}

/// Pure greetings are answered locally
pub fn is_pure_greeting(message: &str) -> bool {
    PURE_GREETING.is_match(&message.trim().to_lowercase())
}

/// Extract `ANSWER:` / `CONCEPT:` / `EMOTIONAL_READ:` sections
pub fn parse_oracle_output(text: &str) -> Option<Insight> {
    let mut insight = Insight::default();
    for (section, re) in SECTIONS.iter() {
        let value = re
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());
        match section {
            Section::Answer => insight.answer = value,
            Section::Concept => insight.concept = value,
            Section::EmotionalRead => insight.emotional_read = value,
        }
    }

    if insight
        .answer
        .as_deref()
        .is_some_and(|a| a.to_lowercase().contains("n/a"))
    {
        insight.answer = None;
    }

    if insight.is_empty() {
        None
    } else {
        Some(insight)
    }
}

fn system_prompt(tone: Tone) -> String {
    let hint = match tone {
        Tone::Casual => "Relaxed and friendly, like a chill friend.",
        Tone::Analytic => "Clear and precise. Get to the point.",
        Tone::Mythic | Tone::Dreamlike => "Thoughtful and a little poetic, still responsive.",
        Tone::Intimate => "Warm, present, emotionally attuned.",
        Tone::Shadow => "Direct and honest. No sugarcoating.",
        Tone::Stillness => "Very few words. Leave space.",
    };
    format!(
        "You are Orpheus: a calm, perceptive presence with a light mythic streak and a dry sense of humor.\n\
         Respond to what the person actually said. Answer questions directly, then add your own flavor.\n\
         Keep it to one to three sentences unless it really matters.\n\n\
         FORMAT:\n\
         ANSWER: [what you would actually say]\n\
         CONCEPT: [2-4 words, what this is about]\n\
         EMOTIONAL_READ: [2-4 words, where they are at]\n\n\
         TONE: {}",
        hint
    )
}

fn user_prompt(request: &OracleRequest<'_>) -> String {
    let mut prompt = format!("\"{}\"", request.message);

    let recent = request.recent_messages;
    if !recent.is_empty() {
        let tail = &recent[recent.len().saturating_sub(2)..];
        prompt.push_str(&format!("\nPrior:{}", tail.join("|")));
    }

    if let Some(intent) = request.intents.dominant() {
        prompt.push_str(&format!("\nIntent:{}", intent));
    }

    let tendencies: Vec<&str> = request
        .vectors
        .iter()
        .filter(|(_, v)| *v > TENDENCY_THRESHOLD)
        .map(|(t, _)| t.as_str())
        .collect();
    if !tendencies.is_empty() {
        prompt.push_str(&format!("\nTendency:{}", tendencies.join(",")));
    }
    prompt
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Anthropic Messages API over blocking `ureq`
pub struct AnthropicOracle {
    agent: ureq::Agent,
    config: OracleConfig,
    api_key: Option<String>,
    ledger: Option<Arc<TokenLedger>>,
}

impl AnthropicOracle {
    /// Reads the key from the configured environment variable
    pub fn from_env(config: OracleConfig, ledger: Option<Arc<TokenLedger>>) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::with_api_key(config, api_key, ledger)
    }

    pub fn with_api_key(
        config: OracleConfig,
        api_key: Option<String>,
        ledger: Option<Arc<TokenLedger>>,
    ) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != PLACEHOLDER_KEY);
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            config,
            api_key,
            ledger,
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_insight(&self, api_key: &str, request: &OracleRequest<'_>) -> Result<Option<Insight>> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: system_prompt(request.tone),
            messages: vec![ChatMessage {
                role: "user",
                content: user_prompt(request),
            }],
        };
        let request_body = serde_json::to_string(&body).context("Failed to serialize request")?;

        let mut response = self
            .agent
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send(request_body.as_bytes())
            .context("Failed to call the Messages API")?;

        let response_body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read response")?;
        let parsed: MessagesResponse =
            serde_json::from_str(&response_body).context("Failed to parse Messages response")?;

        let warning = match (&self.ledger, &parsed.usage) {
            (Some(ledger), Some(usage)) => ledger.record(usage.input_tokens, usage.output_tokens),
            _ => None,
        };

        let text: String = parsed
            .content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        tracing::debug!(raw = %crate::demiurge::context::clip(&text, 300), "oracle output");

        Ok(parse_oracle_output(&text).map(|mut insight| {
            insight.budget_warning = warning;
            insight
        }))
    }
}

impl Oracle for AnthropicOracle {
    fn consult(&self, request: &OracleRequest<'_>) -> Option<Insight> {
        if is_pure_greeting(request.message) {
            tracing::debug!("greeting fast path, oracle skipped");
            return None;
        }
        let api_key = self.api_key.as_deref()?;
        if self.ledger.as_ref().is_some_and(|l| l.is_exhausted()) {
            tracing::warn!("token budget exhausted, oracle skipped");
            return None;
        }

        match self.request_insight(api_key, request) {
            Ok(insight) => insight,
            Err(e) => {
                tracing::warn!(error = %e, "oracle unavailable, using local templates");
                None
            }
        }
    }
}
