//! Core types for the Pitch Matcher
//!
//! This crate defines the shared data structures used across the matcher,
//! including pitch and investor section layouts, the validated investor
//! corpus, and the workspace error type.

pub mod error;
pub mod investor;
pub mod sections;

pub use error::{MatcherError, MatcherResult};
pub use investor::{CorpusSummary, InvestorBook, InvestorRecord, RankedInvestor};
pub use sections::{InvestorBrief, InvestorSection, PitchDeck, PitchSection};
