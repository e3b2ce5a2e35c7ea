//! Document match list with similarity buckets.

use std::fmt;

use crate::query::DocumentMatch;

/// Scores above this are `High`.
pub const HIGH_SIMILARITY: f64 = 0.7;

/// Scores above this (and not `High`) are `Medium`.
pub const MEDIUM_SIMILARITY: f64 = 0.5;

/// Display emphasis for a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityBucket {
    High,
    Medium,
    Low,
}

impl SimilarityBucket {
    /// Buckets a score. Anything not above 0.5 (including NaN) is `Low`.
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_SIMILARITY {
            Self::High
        } else if score > MEDIUM_SIMILARITY {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for SimilarityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A document match paired with its bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentRow<'a> {
    pub document: &'a DocumentMatch,
    pub bucket: SimilarityBucket,
}

/// Buckets every match, keeping server order.
pub fn document_rows(documents: &[DocumentMatch]) -> Vec<DocumentRow<'_>> {
    documents
        .iter()
        .map(|document| DocumentRow {
            document,
            bucket: SimilarityBucket::from_score(document.similarity_score),
        })
        .collect()
}
