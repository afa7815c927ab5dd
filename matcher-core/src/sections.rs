//! Pitch and investor-brief section layouts
//!
//! Both sides of a match are small fixed sets of labeled free-text fields.
//! The `ALL` arrays define the canonical iteration order, which is also the
//! order of the pairwise breakdown produced by the scorer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sections of a startup pitch deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchSection {
    Problem,
    Solution,
    Market,
    Traction,
    Team,
}

impl PitchSection {
    /// Canonical ordering of pitch sections
    pub const ALL: [PitchSection; 5] = [
        PitchSection::Problem,
        PitchSection::Solution,
        PitchSection::Market,
        PitchSection::Traction,
        PitchSection::Team,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchSection::Problem => "problem",
            PitchSection::Solution => "solution",
            PitchSection::Market => "market",
            PitchSection::Traction => "traction",
            PitchSection::Team => "team",
        }
    }
}

impl fmt::Display for PitchSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sections of an investor brief
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestorSection {
    Sectors,
    Stage,
    Geography,
    Themes,
}

impl InvestorSection {
    /// Canonical ordering of investor-brief sections
    pub const ALL: [InvestorSection; 4] = [
        InvestorSection::Sectors,
        InvestorSection::Stage,
        InvestorSection::Geography,
        InvestorSection::Themes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvestorSection::Sectors => "sectors",
            InvestorSection::Stage => "stage",
            InvestorSection::Geography => "geography",
            InvestorSection::Themes => "themes",
        }
    }
}

impl fmt::Display for InvestorSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A startup pitch deck, one free-text field per section
///
/// Text may be empty; validation is not this layer's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PitchDeck {
    pub problem: String,
    pub solution: String,
    pub market: String,
    pub traction: String,
    pub team: String,
}

impl PitchDeck {
    pub fn section_text(&self, section: PitchSection) -> &str {
        match section {
            PitchSection::Problem => &self.problem,
            PitchSection::Solution => &self.solution,
            PitchSection::Market => &self.market,
            PitchSection::Traction => &self.traction,
            PitchSection::Team => &self.team,
        }
    }

    /// Iterate sections in canonical order
    pub fn sections(&self) -> impl Iterator<Item = (PitchSection, &str)> {
        PitchSection::ALL
            .into_iter()
            .map(move |s| (s, self.section_text(s)))
    }
}

/// An investor brief, one free-text field per section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvestorBrief {
    pub sectors: String,
    pub stage: String,
    pub geography: String,
    pub themes: String,
}

impl InvestorBrief {
    pub fn section_text(&self, section: InvestorSection) -> &str {
        match section {
            InvestorSection::Sectors => &self.sectors,
            InvestorSection::Stage => &self.stage,
            InvestorSection::Geography => &self.geography,
            InvestorSection::Themes => &self.themes,
        }
    }

    /// Iterate sections in canonical order
    pub fn sections(&self) -> impl Iterator<Item = (InvestorSection, &str)> {
        InvestorSection::ALL
            .into_iter()
            .map(move |s| (s, self.section_text(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_order_is_stable() {
        let labels: Vec<&str> = PitchSection::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            labels,
            vec!["problem", "solution", "market", "traction", "team"]
        );

        let labels: Vec<&str> = InvestorSection::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(labels, vec!["sectors", "stage", "geography", "themes"]);
    }

    #[test]
    fn test_sections_iterator_matches_accessors() {
        let deck = PitchDeck {
            problem: "p".to_string(),
            solution: "s".to_string(),
            market: "m".to_string(),
            traction: "tr".to_string(),
            team: "te".to_string(),
        };

        let collected: Vec<(PitchSection, &str)> = deck.sections().collect();
        assert_eq!(collected.len(), 5);
        assert_eq!(collected[0], (PitchSection::Problem, "p"));
        assert_eq!(collected[4], (PitchSection::Team, "te"));
    }

    #[test]
    fn test_section_serde_is_lowercase() {
        let json = serde_json::to_string(&InvestorSection::Geography).unwrap();
        assert_eq!(json, "\"geography\"");

        let parsed: PitchSection = serde_json::from_str("\"traction\"").unwrap();
        assert_eq!(parsed, PitchSection::Traction);
    }
}
