//! Draft Generator Adapter: assessment in, goals / issues / supports out.
//!
//! The flow is [`prompt::build_prompt`], one call to a
//! [`client::TextGenerator`], then [`parser::parse_draft`]. Any failure along
//! the way yields [`fallback_content`].

pub mod client;
pub mod generator;
pub mod parser;
pub mod prompt;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use careplan_db::models::AdlRatings;

pub use client::{GeminiClient, GenerationError, TextGenerator, UnavailableGenerator};
pub use generator::{DEFAULT_TIMEOUT, DraftGenerator, GeneratorConfig};
pub use parser::{DraftParseError, ParseStage, ParsedDraft, parse_draft};
pub use prompt::build_prompt;

/// Assessment entered by staff before generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub health_status: Option<String>,
    pub adl: AdlRatings,
    pub patient_family_request: Option<String>,
    pub doctor_instructions: Option<String>,
    pub staff_notes: Option<String>,
}

/// One of the three content lists of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftSection {
    Goals,
    Issues,
    Supports,
}

impl DraftSection {
    pub const ALL: [Self; 3] = [Self::Goals, Self::Issues, Self::Supports];

    pub fn key(self) -> &'static str {
        match self {
            Self::Goals => "goals",
            Self::Issues => "issues",
            Self::Supports => "supports",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Goals => "目標",
            Self::Issues => "問題点",
            Self::Supports => "支援内容",
        }
    }
}

impl fmt::Display for DraftSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DraftSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.key() == s || v.label() == s)
            .ok_or_else(|| format!("invalid section {s:?} (expected goals, issues, or supports)"))
    }
}

/// Goals, issues and supports of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftContent {
    pub goals: Vec<String>,
    pub issues: Vec<String>,
    pub supports: Vec<String>,
}

impl DraftContent {
    pub fn section(&self, section: DraftSection) -> &[String] {
        match section {
            DraftSection::Goals => &self.goals,
            DraftSection::Issues => &self.issues,
            DraftSection::Supports => &self.supports,
        }
    }

    pub fn section_mut(&mut self, section: DraftSection) -> &mut Vec<String> {
        match section {
            DraftSection::Goals => &mut self.goals,
            DraftSection::Issues => &mut self.issues,
            DraftSection::Supports => &mut self.supports,
        }
    }
}

/// Content returned when generation fails outright. Always the same.
pub fn fallback_content() -> DraftContent {
    let owned = |items: [&str; 3]| items.iter().map(|s| (*s).to_owned()).collect();
    DraftContent {
        goals: owned([
            "患者の状態を安定させる",
            "日常生活の自立度を向上させる",
            "生活の質を向上させる",
        ]),
        issues: owned(["健康状態の管理", "日常生活動作の制限", "社会的孤立のリスク"]),
        supports: owned([
            "定期的な健康チェック",
            "日常生活動作の支援",
            "社会資源の活用支援",
        ]),
    }
}

/// How the content of a [`DraftOutcome`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOrigin {
    Parsed(ParseStage),
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOutcome {
    pub content: DraftContent,
    pub origin: DraftOrigin,
}

impl DraftOutcome {
    pub fn is_fallback(&self) -> bool {
        self.origin == DraftOrigin::Fallback
    }
}
