//! Core types for embeddings and match reports

use chrono::{DateTime, Utc};
use matcher_core::{InvestorSection, PitchSection};
use serde::{Deserialize, Serialize};

/// Embedding vector (1536 dimensions for text-embedding-3-small)
pub type EmbeddingVector = Vec<f32>;

/// Similarity of one (pitch section, investor section) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSimilarity {
    pub pitch_section: PitchSection,
    pub investor_section: InvestorSection,
    /// Cosine similarity (-1.0 to 1.0)
    pub similarity: f64,
    /// Weight applied to this pair in the final score
    pub weight: f64,
}

/// Result of scoring a pitch against an investor brief
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// Weighted average similarity across all section pairs
    pub final_score: f64,
    /// One record per (pitch section, investor section) pair, pitch-section-major
    pub breakdown: Vec<SectionSimilarity>,
    /// Model the embeddings came from
    pub model: String,
    /// When this score was computed
    pub scored_at: DateTime<Utc>,
}

impl MatchReport {
    pub fn new(final_score: f64, breakdown: Vec<SectionSimilarity>, model: String) -> Self {
        Self {
            final_score,
            breakdown,
            model,
            scored_at: Utc::now(),
        }
    }
}
