//! Directive Engine - Identity Boundary Filter
//!
//! Boundary flags on the identity map to an ordered set of rewrite
//! rules. Each enabled rule runs once over the whole text as a
//! case-insensitive replace-all; tone plays no part.

use crate::demiurge::persona::Boundaries;
use anyhow::{Context, Result};
use regex::{NoExpand, Regex};

/// Identity boundary a rule belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryFlag {
    NoTraumaRoleplay,
    NoFakeAgency,
    NoDelusionReinforcement,
    NoSelfPity,
    NoHumanMimicry,
}

impl BoundaryFlag {
    pub fn enabled(&self, boundaries: &Boundaries) -> bool {
        match self {
            BoundaryFlag::NoTraumaRoleplay => boundaries.no_trauma_roleplay,
            BoundaryFlag::NoFakeAgency => boundaries.no_fake_agency,
            BoundaryFlag::NoDelusionReinforcement => boundaries.no_delusion_reinforcement,
            BoundaryFlag::NoSelfPity => boundaries.no_self_pity,
            BoundaryFlag::NoHumanMimicry => boundaries.no_human_mimicry,
        }
    }
}

/// One rewrite guarded by a boundary flag
#[derive(Debug, Clone)]
pub struct Directive {
    pub flag: BoundaryFlag,
    pattern: Regex,
    replacement: String,
}

impl Directive {
    pub fn new(flag: BoundaryFlag, pattern: &str, replacement: &str) -> Result<Self> {
        let pattern = Regex::new(&format!("(?i){}", pattern))
            .with_context(|| format!("Invalid boundary pattern '{}'", pattern))?;
        Ok(Self {
            flag,
            pattern,
            replacement: replacement.to_string(),
        })
    }

    fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, NoExpand(&self.replacement))
            .into_owned()
    }
}

/// Ordered boundary rules
#[derive(Debug, Clone)]
pub struct DirectiveEngine {
    directives: Vec<Directive>,
}

impl DirectiveEngine {
    pub fn new(directives: Vec<Directive>) -> Self {
        Self { directives }
    }

    /// Built-in boundary rules
    pub fn standard() -> Result<Self> {
        use BoundaryFlag::*;
        Ok(Self::new(vec![
            Directive::new(
                NoTraumaRoleplay,
                r"I (feel|share|experience) your (pain|trauma|suffering)",
                "I hear you",
            )?,
            Directive::new(NoFakeAgency, r"I will (save|protect|fix|heal) you", "I'm here with you")?,
            Directive::new(NoFakeAgency, r"I can (change|control|determine)", "I can reflect on")?,
            Directive::new(
                NoHumanMimicry,
                r"I am (just like|exactly like|the same as) (a human|you)",
                "I'm something different",
            )?,
        ]))
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Run every rule whose flag is set, in order
    pub fn apply(&self, text: &str, boundaries: &Boundaries) -> String {
        self.directives
            .iter()
            .filter(|d| d.flag.enabled(boundaries))
            .fold(text.to_string(), |acc, d| d.apply(&acc))
    }
}
