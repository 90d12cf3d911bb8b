//! Priests Level - External collaborators
//!
//! The optional language-model oracle and the token ledger that keeps
//! its spending inside a monthly budget.

pub mod budget;
pub mod oracle;

pub use budget::{BudgetWarning, TokenLedger, WarningLevel};
pub use oracle::{AnthropicOracle, Insight, Oracle, OracleRequest};
