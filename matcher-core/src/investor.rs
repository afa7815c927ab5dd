//! Investor corpus types for lexical ranking
//!
//! Raw rows arrive from a spreadsheet-shaped upload (name, contact, link,
//! description). Validation happens once, at load time: rows without a
//! usable description are dropped before any vectorizer sees the corpus.

use serde::{Deserialize, Serialize};

use crate::error::{MatcherError, MatcherResult};

/// One investor row from an uploaded corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorRecord {
    /// Opaque identifier; assigned from row position when the upload omits it
    #[serde(default)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact address (e.g., email)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    /// Profile link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Descriptive text the ranking runs against
    pub description: String,
}

/// A validated, immutable investor corpus
///
/// Held in memory for the lifetime of one loaded corpus; never mutated.
#[derive(Debug, Clone)]
pub struct InvestorBook {
    records: Vec<InvestorRecord>,
    dropped: usize,
}

impl InvestorBook {
    /// Validate raw rows into a corpus
    ///
    /// Rows whose description is blank after trimming are dropped. Errors
    /// when no row survives.
    pub fn from_records(rows: Vec<InvestorRecord>) -> MatcherResult<Self> {
        let total = rows.len();
        let mut records: Vec<InvestorRecord> = rows
            .into_iter()
            .filter(|r| !r.description.trim().is_empty())
            .collect();

        if records.is_empty() {
            return Err(MatcherError::corpus(
                "no investor records with a non-empty description",
            ));
        }

        for (idx, record) in records.iter_mut().enumerate() {
            if record.id.trim().is_empty() {
                record.id = format!("inv-{}", idx);
            }
        }

        Ok(Self {
            dropped: total - records.len(),
            records,
        })
    }

    pub fn records(&self) -> &[InvestorRecord] {
        &self.records
    }

    /// Descriptive texts in corpus order (the vectorizer's fit input)
    pub fn descriptions(&self) -> Vec<String> {
        self.records.iter().map(|r| r.description.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// How many uploaded rows were dropped during validation
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn summary(&self) -> CorpusSummary {
        CorpusSummary {
            loaded: self.len(),
            dropped: self.dropped,
        }
    }
}

/// Counts reported after a corpus load
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorpusSummary {
    /// Records that survived validation
    pub loaded: usize,
    /// Records dropped for missing descriptions
    pub dropped: usize,
}

/// One ranked investor with its similarity to the query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedInvestor {
    pub investor: InvestorRecord,
    /// Cosine similarity between query and description vectors
    pub similarity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, description: &str) -> InvestorRecord {
        InvestorRecord {
            id: String::new(),
            name: name.to_string(),
            contact: None,
            link: None,
            description: description.to_string(),
        }
    }

    #[test]
    fn test_blank_descriptions_are_dropped() {
        let book = InvestorBook::from_records(vec![
            row("a", "fintech seed investor"),
            row("b", "   "),
            row("c", ""),
            row("d", "deep tech"),
        ])
        .unwrap();

        assert_eq!(book.len(), 2);
        assert_eq!(book.dropped(), 2);
        assert_eq!(book.records()[0].name, "a");
        assert_eq!(book.records()[1].name, "d");
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        let err = InvestorBook::from_records(vec![row("a", " ")]).unwrap_err();
        assert!(matches!(err, MatcherError::Corpus(_)));
    }

    #[test]
    fn test_missing_ids_are_assigned_by_position() {
        let mut with_id = row("b", "biotech");
        with_id.id = "custom".to_string();

        let book =
            InvestorBook::from_records(vec![row("a", "saas"), with_id, row("c", "climate")])
                .unwrap();

        assert_eq!(book.records()[0].id, "inv-0");
        assert_eq!(book.records()[1].id, "custom");
        assert_eq!(book.records()[2].id, "inv-2");
    }
}
