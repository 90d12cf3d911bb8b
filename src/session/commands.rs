//! Session commands addressed to the wake word
//!
//! All matching runs on the trimmed, lower-cased message.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z][a-z0-9_\-]*)\s*[=:]\s*(\S+)$").expect("pair pattern is valid")
});

/// One `key=value` adjustment from an upgrade directive
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct CommandSet {
    enter: Vec<Regex>,
    exit: Regex,
    upgrade: Regex,
}

impl CommandSet {
    pub fn new(wake_word: &str) -> Result<Self> {
        let wake = regex::escape(&wake_word.trim().to_lowercase());
        let compile = |pattern: String| {
            Regex::new(&pattern).with_context(|| format!("Invalid command pattern '{}'", pattern))
        };

        Ok(Self {
            enter: vec![
                compile(format!(r"^{},?\s*enter diagnostics?", wake))?,
                compile(r"^diagnostics?$".to_string())?,
                compile(format!(r"^{},?\s*diagnostics?$", wake))?,
            ],
            exit: compile(format!(r"^{},?\s*(exit|leave|end)\s+diagnostics?", wake))?,
            upgrade: compile(format!(r"^{},?\s*upgrade\b", wake))?,
        })
    }

    fn normalize(message: &str) -> String {
        message.trim().to_lowercase()
    }

    pub fn is_enter_diagnostics(&self, message: &str) -> bool {
        let m = Self::normalize(message);
        self.enter.iter().any(|re| re.is_match(&m))
    }

    pub fn is_exit_diagnostics(&self, message: &str) -> bool {
        self.exit.is_match(&Self::normalize(message))
    }

    /// `None` when the message is not an upgrade directive at all
    pub fn parse_upgrade(&self, message: &str) -> Option<Vec<Adjustment>> {
        let m = Self::normalize(message);
        let head = self.upgrade.find(&m)?;
        let rest = m[head.end()..].trim_start_matches(|c: char| c == ':' || c.is_whitespace());

        let adjustments = rest
            .split(|c| c == ',' || c == ';' || c == '\n')
            .filter_map(|pair| {
                let caps = PAIR.captures(pair.trim())?;
                let value: f64 = caps[2].parse().ok()?;
                if !value.is_finite() {
                    return None;
                }
                Some(Adjustment {
                    key: caps[1].to_string(),
                    value,
                })
            })
            .collect();
        Some(adjustments)
    }
}
