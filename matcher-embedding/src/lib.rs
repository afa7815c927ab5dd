//! Embedding and Section-Weighted Scoring for the Pitch Matcher
//!
//! This crate provides the semantic half of pitch/investor matching using
//! vector embeddings from OpenAI's text-embedding-3-small model.
//!
//! ## Features
//! - Generate embeddings for pitch and investor-brief sections
//! - Calculate cosine similarity between embeddings
//! - Score a pitch against an investor brief as a weighted average over
//!   every section pair

pub mod client;
pub mod error;
pub mod scorer;
pub mod similarity;
pub mod types;

pub use client::EmbeddingClient;
pub use error::{EmbeddingError, Result};
pub use scorer::{score_sections, SectionWeights};
pub use similarity::cosine_similarity;
pub use types::{EmbeddingVector, MatchReport, SectionSimilarity};
