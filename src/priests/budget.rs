//! Token Ledger - Monthly LLM budget
//!
//! Usage is persisted as one small JSON document and resets when the
//! calendar month (UTC) changes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MONTHLY_BUDGET: u64 = 10_000_000;
/// Per-message estimate when there is no history yet
pub const FALLBACK_TOKENS_PER_MESSAGE: u64 = 28_000;

const CRITICAL_REMAINING: f64 = 0.05;
const LOW_REMAINING: f64 = 0.15;
const NOTICE_REMAINING: f64 = 0.30;

fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// Usage for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUsage {
    pub month: String,
    pub budget: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub message_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl MonthlyUsage {
    fn fresh(budget: u64, now: DateTime<Utc>) -> Self {
        Self {
            month: month_key(now),
            budget,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            message_count: 0,
            last_updated: now,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.total_tokens)
    }

    pub fn fraction_remaining(&self) -> f64 {
        if self.budget == 0 {
            return 0.0;
        }
        self.remaining() as f64 / self.budget as f64
    }

    /// Messages left at the running average
    pub fn messages_remaining(&self) -> u64 {
        let per_message = if self.message_count == 0 {
            FALLBACK_TOKENS_PER_MESSAGE
        } else {
            (self.total_tokens / self.message_count).max(1)
        };
        self.remaining() / per_message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Critical,
    Low,
    Notice,
}

impl fmt::Display for WarningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WarningLevel::Critical => "critical",
            WarningLevel::Low => "low",
            WarningLevel::Notice => "notice",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetWarning {
    pub level: WarningLevel,
    pub message: String,
}

impl BudgetWarning {
    fn check(usage: &MonthlyUsage) -> Option<Self> {
        let left = usage.fraction_remaining();
        let percent = (left * 100.0).round();
        let messages = usage.messages_remaining();

        let (level, message) = if left <= CRITICAL_REMAINING {
            (
                WarningLevel::Critical,
                format!(
                    "Only {}% of the monthly token budget remains, roughly {} messages.",
                    percent, messages
                ),
            )
        } else if left <= LOW_REMAINING {
            (
                WarningLevel::Low,
                format!(
                    "{}% of the monthly token budget remains (~{} messages).",
                    percent, messages
                ),
            )
        } else if left <= NOTICE_REMAINING {
            (
                WarningLevel::Notice,
                format!("Heads up: {}% of the monthly budget remains.", percent),
            )
        } else {
            return None;
        };
        Some(Self { level, message })
    }

    /// Critical and low warnings are shown to the user
    pub fn injects(&self) -> bool {
        matches!(self.level, WarningLevel::Critical | WarningLevel::Low)
    }

    pub fn footnote(&self) -> String {
        format!("\n\n*{}*", self.message)
    }
}

/// Shared monthly ledger; `path = None` keeps it in memory only
pub struct TokenLedger {
    path: Option<PathBuf>,
    budget: u64,
    usage: Mutex<MonthlyUsage>,
}

impl TokenLedger {
    pub fn in_memory(budget: u64) -> Self {
        Self {
            path: None,
            budget,
            usage: Mutex::new(MonthlyUsage::fresh(budget, Utc::now())),
        }
    }

    /// Open the ledger file; unreadable files start a fresh month
    pub fn open<P: AsRef<Path>>(path: P, budget: u64) -> Self {
        let path = path.as_ref().to_path_buf();
        let now = Utc::now();
        let usage = match Self::read(&path) {
            Ok(Some(mut usage)) => {
                usage.budget = budget;
                usage
            }
            Ok(None) => MonthlyUsage::fresh(budget, now),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "token ledger unreadable, starting fresh");
                MonthlyUsage::fresh(budget, now)
            }
        };
        let ledger = Self {
            path: Some(path),
            budget,
            usage: Mutex::new(usage),
        };
        ledger.roll_month(&mut ledger.usage.lock(), now);
        ledger
    }

    fn read(path: &Path) -> Result<Option<MonthlyUsage>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let usage = serde_json::from_str(&content).context("Corrupt token ledger")?;
        Ok(Some(usage))
    }

    fn persist(&self, usage: &MonthlyUsage) {
        let Some(path) = &self.path else {
            return;
        };
        let result = (|| -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string_pretty(usage)?)?;
            Ok(())
        })();
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to save token ledger");
        }
    }

    fn roll_month(&self, usage: &mut MonthlyUsage, now: DateTime<Utc>) {
        if usage.month != month_key(now) {
            tracing::info!(from = %usage.month, to = %month_key(now), "new month, token usage reset");
            *usage = MonthlyUsage::fresh(self.budget, now);
        }
    }

    pub fn record(&self, input_tokens: u64, output_tokens: u64) -> Option<BudgetWarning> {
        self.record_at(input_tokens, output_tokens, Utc::now())
    }

    pub fn record_at(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        now: DateTime<Utc>,
    ) -> Option<BudgetWarning> {
        let mut usage = self.usage.lock();
        self.roll_month(&mut usage, now);

        usage.input_tokens += input_tokens;
        usage.output_tokens += output_tokens;
        usage.total_tokens += input_tokens + output_tokens;
        usage.message_count += 1;
        usage.last_updated = now;
        self.persist(&usage);

        tracing::debug!(
            used = usage.total_tokens,
            budget = usage.budget,
            "token usage recorded"
        );

        let warning = BudgetWarning::check(&usage);
        if let Some(w) = &warning {
            tracing::warn!(level = %w.level, "{}", w.message);
        }
        warning
    }

    pub fn is_exhausted(&self) -> bool {
        self.is_exhausted_at(Utc::now())
    }

    pub fn is_exhausted_at(&self, now: DateTime<Utc>) -> bool {
        let mut usage = self.usage.lock();
        self.roll_month(&mut usage, now);
        usage.remaining() == 0
    }

    pub fn usage(&self) -> MonthlyUsage {
        self.usage.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_record_accumulates() {
        let ledger = TokenLedger::in_memory(1_000_000);
        assert!(ledger.record(1_000, 200).is_none());
        assert!(ledger.record(500, 100).is_none());
        let usage = ledger.usage();
        assert_eq!(usage.total_tokens, 1_800);
        assert_eq!(usage.message_count, 2);
        assert_eq!(usage.messages_remaining(), (1_000_000 - 1_800) / 900);
    }

    #[test]
    fn test_warning_levels() {
        let ledger = TokenLedger::in_memory(1_000);
        let now = Utc::now();

        let notice = ledger.record_at(700, 0, now).unwrap();
        assert_eq!(notice.level, WarningLevel::Notice);
        assert!(!notice.injects());

        let low = ledger.record_at(150, 0, now).unwrap();
        assert_eq!(low.level, WarningLevel::Low);
        assert!(low.injects());

        let critical = ledger.record_at(100, 0, now).unwrap();
        assert_eq!(critical.level, WarningLevel::Critical);
        assert!(critical.footnote().starts_with("\n\n*Only 5%"));

        assert!(!ledger.is_exhausted_at(now));
        ledger.record_at(100, 0, now);
        assert!(ledger.is_exhausted_at(now));
    }

    #[test]
    fn test_new_month_resets() {
        let ledger = TokenLedger::in_memory(100);
        ledger.record_at(100, 0, at(2026, 3, 31));
        assert!(ledger.is_exhausted_at(at(2026, 3, 31)));
        assert!(!ledger.is_exhausted_at(at(2026, 4, 1)));
        assert_eq!(ledger.usage().month, "2026-04");
        assert_eq!(ledger.usage().total_tokens, 0);
    }

    #[test]
    fn test_fallback_estimate() {
        let usage = MonthlyUsage::fresh(DEFAULT_MONTHLY_BUDGET, Utc::now());
        assert_eq!(usage.messages_remaining(), 10_000_000 / 28_000);
    }

    #[test]
    fn test_ledger_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token_usage.json");

        let ledger = TokenLedger::open(&path, 50_000);
        ledger.record(1_200, 300);
        drop(ledger);

        let reopened = TokenLedger::open(&path, 50_000);
        assert_eq!(reopened.usage().total_tokens, 1_500);
        assert_eq!(reopened.usage().message_count, 1);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["inputTokens"], 1_200);
        assert!(json["lastUpdated"].is_string());
    }
}
