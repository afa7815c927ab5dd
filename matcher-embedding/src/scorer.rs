//! Section-weighted match scoring
//!
//! Scores a pitch against an investor brief by taking the cosine similarity
//! of every (pitch section, investor section) pair and averaging the full
//! cross product under per-investor-section weights.

use std::collections::HashMap;

use matcher_core::{InvestorSection, PitchSection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{EmbeddingError, Result},
    similarity::cosine_similarity,
    types::{EmbeddingVector, MatchReport, SectionSimilarity},
};

/// Per-investor-section weight table
///
/// Sections absent from the table fall back to `default_weight`. Weights
/// are static configuration; they must be non-negative, and the total
/// across the cross product must be positive for a score to exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionWeights {
    weights: HashMap<InvestorSection, f64>,
    default_weight: f64,
}

impl Default for SectionWeights {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(InvestorSection::Sectors, 1.0);
        weights.insert(InvestorSection::Themes, 1.0);
        weights.insert(InvestorSection::Stage, 0.5);
        weights.insert(InvestorSection::Geography, 0.3);
        Self {
            weights,
            default_weight: 0.2,
        }
    }
}

impl SectionWeights {
    /// Build a weight table from explicit entries
    ///
    /// Rejects negative or non-finite weights.
    pub fn new(weights: HashMap<InvestorSection, f64>, default_weight: f64) -> Result<Self> {
        let table = Self {
            weights,
            default_weight,
        };
        table.validate()?;
        Ok(table)
    }

    /// Check every entry (and the fallback) is finite and non-negative
    ///
    /// Deserialized tables bypass `new`, so callers accepting caller-supplied
    /// weights must validate before scoring.
    pub fn validate(&self) -> Result<()> {
        for (section, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(EmbeddingError::InvalidWeights(format!(
                    "weight for '{}' must be a non-negative number, got {}",
                    section, weight
                )));
            }
        }
        if !self.default_weight.is_finite() || self.default_weight < 0.0 {
            return Err(EmbeddingError::InvalidWeights(format!(
                "default weight must be a non-negative number, got {}",
                self.default_weight
            )));
        }
        Ok(())
    }

    /// Weight for one investor section
    pub fn weight_for(&self, section: InvestorSection) -> f64 {
        self.weights
            .get(&section)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

/// Score embedded pitch sections against embedded investor sections
///
/// Produces one `SectionSimilarity` per cross-product pair, iterating pitch
/// sections outer and investor sections inner in the order given, then
/// aggregates `Σ(sim·w) / Σ(w)`.
///
/// Errors when the weight table is invalid or the total weight is zero;
/// a zero total has no defined average and is never silently divided.
pub fn score_sections(
    pitch: &[(PitchSection, EmbeddingVector)],
    investor: &[(InvestorSection, EmbeddingVector)],
    weights: &SectionWeights,
    model: &str,
) -> Result<MatchReport> {
    weights.validate()?;

    let mut breakdown = Vec::with_capacity(pitch.len() * investor.len());
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for (pitch_section, pitch_embedding) in pitch {
        for (investor_section, investor_embedding) in investor {
            let similarity = cosine_similarity(pitch_embedding, investor_embedding);
            let weight = weights.weight_for(*investor_section);

            weighted_sum += similarity * weight;
            weight_total += weight;

            breakdown.push(SectionSimilarity {
                pitch_section: *pitch_section,
                investor_section: *investor_section,
                similarity,
                weight,
            });
        }
    }

    if weight_total == 0.0 {
        return Err(EmbeddingError::Config(
            "total section weight is zero; no weighted average exists".to_string(),
        ));
    }

    let final_score = weighted_sum / weight_total;
    debug!(
        "Scored {} section pairs: final_score={:.4}",
        breakdown.len(),
        final_score
    );

    Ok(MatchReport::new(final_score, breakdown, model.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit basis vectors make pair similarities exactly 0 or 1
    fn embedded_pitch(vectors: Vec<Vec<f32>>) -> Vec<(PitchSection, EmbeddingVector)> {
        PitchSection::ALL.into_iter().zip(vectors).collect()
    }

    fn embedded_investor(vectors: Vec<Vec<f32>>) -> Vec<(InvestorSection, EmbeddingVector)> {
        InvestorSection::ALL.into_iter().zip(vectors).collect()
    }

    fn same_vector_everywhere() -> (
        Vec<(PitchSection, EmbeddingVector)>,
        Vec<(InvestorSection, EmbeddingVector)>,
    ) {
        let v = vec![1.0, 2.0, 3.0];
        (
            embedded_pitch(vec![v.clone(); 5]),
            embedded_investor(vec![v; 4]),
        )
    }

    #[test]
    fn test_breakdown_covers_full_cross_product() {
        let (pitch, investor) = same_vector_everywhere();
        let report =
            score_sections(&pitch, &investor, &SectionWeights::default(), "test-model").unwrap();

        assert_eq!(report.breakdown.len(), 20);

        // Pitch-section-major ordering: first four pairs share the first pitch section
        for record in &report.breakdown[..4] {
            assert_eq!(record.pitch_section, PitchSection::Problem);
        }
        assert_eq!(report.breakdown[0].investor_section, InvestorSection::Sectors);
        assert_eq!(report.breakdown[3].investor_section, InvestorSection::Themes);
        assert_eq!(report.breakdown[4].pitch_section, PitchSection::Solution);
    }

    #[test]
    fn test_identical_vectors_score_one() {
        let (pitch, investor) = same_vector_everywhere();
        let report =
            score_sections(&pitch, &investor, &SectionWeights::default(), "test-model").unwrap();
        assert!((report.final_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_average_formula() {
        // Pitch sections all along x; investor sections along x, x, y, y.
        // Similarities: sectors=1, stage=1, geography=0, themes=0 for every
        // pitch section. Default weights: 1.0, 0.5, 0.3, 1.0.
        let x = vec![1.0, 0.0];
        let y = vec![0.0, 1.0];
        let pitch = embedded_pitch(vec![x.clone(); 5]);
        let investor = embedded_investor(vec![x.clone(), x, y.clone(), y]);

        let report =
            score_sections(&pitch, &investor, &SectionWeights::default(), "test-model").unwrap();

        // Per pitch section: 1.0*1 + 0.5*1 + 0.3*0 + 1.0*0 = 1.5 over 2.8 weight
        let expected = 1.5 / 2.8;
        assert!((report.final_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_single_label_weight_averages_over_pitch_sections() {
        // Weight 1 on exactly one investor section, 0 elsewhere: the final
        // score is the plain average of that section's similarity to each
        // pitch section.
        let x = vec![1.0, 0.0];
        let y = vec![0.0, 1.0];
        let diag = vec![1.0, 1.0];

        // Pitch: x, x, y, y, diag. Investor stage = x.
        let pitch = embedded_pitch(vec![x.clone(), x.clone(), y.clone(), y.clone(), diag]);
        let investor = embedded_investor(vec![y.clone(), x, y.clone(), y]);

        let mut table = HashMap::new();
        table.insert(InvestorSection::Stage, 1.0);
        table.insert(InvestorSection::Sectors, 0.0);
        table.insert(InvestorSection::Geography, 0.0);
        table.insert(InvestorSection::Themes, 0.0);
        let weights = SectionWeights::new(table, 0.0).unwrap();

        let report = score_sections(&pitch, &investor, &weights, "test-model").unwrap();

        let sims_vs_stage = [1.0, 1.0, 0.0, 0.0, 1.0 / 2.0_f64.sqrt()];
        let expected: f64 = sims_vs_stage.iter().sum::<f64>() / 5.0;
        assert!((report.final_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_absent_labels_use_default_weight() {
        let (pitch, investor) = same_vector_everywhere();
        // Empty table: every pair falls back to the default weight, so the
        // score is a plain average.
        let weights = SectionWeights::new(HashMap::new(), 0.2).unwrap();
        let report = score_sections(&pitch, &investor, &weights, "test-model").unwrap();

        assert!((report.final_score - 1.0).abs() < 1e-9);
        assert!(report.breakdown.iter().all(|r| r.weight == 0.2));
    }

    #[test]
    fn test_zero_total_weight_is_a_config_error() {
        let (pitch, investor) = same_vector_everywhere();
        let weights = SectionWeights::new(HashMap::new(), 0.0).unwrap();

        let err = score_sections(&pitch, &investor, &weights, "test-model").unwrap_err();
        assert!(matches!(err, EmbeddingError::Config(_)));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let mut table = HashMap::new();
        table.insert(InvestorSection::Sectors, -1.0);

        let err = SectionWeights::new(table, 0.2).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidWeights(_)));
    }

    #[test]
    fn test_deserialized_partial_table_keeps_default_fallback() {
        let weights: SectionWeights =
            serde_json::from_str(r#"{"weights": {"stage": 0.8}}"#).unwrap();
        weights.validate().unwrap();

        assert_eq!(weights.weight_for(InvestorSection::Stage), 0.8);
        assert_eq!(weights.weight_for(InvestorSection::Sectors), 0.2);
        assert_eq!(weights.weight_for(InvestorSection::Geography), 0.2);
    }
}
