//! Pairwise product similarity.
//!
//! Scores are symmetric and live in `[0.0, 1.0]`. A pair that was never
//! recorded scores `0.0`; a product compared with itself scores `1.0`, but that
//! value is never stored.

use crate::{Error, Product, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Score returned for a product compared with itself.
pub const SELF_SIMILARITY: f64 = 1.0;

/// One recorded pair, as it appears in catalog documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEntry {
    pub a: String,
    pub b: String,
    pub score: f64,
}

/// Symmetric `name -> name -> score` mapping. Both directions are stored so a
/// lookup never allocates.
#[derive(Debug, Clone, Default)]
pub struct SimilarityTable {
    scores: AHashMap<String, AHashMap<String, f64>>,
    pairs: usize,
}

impl SimilarityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the similarity of `a` and `b`, replacing any earlier value.
    pub fn set(&mut self, a: &str, b: &str, score: f64) -> Result<()> {
        if a == b || !(0.0..=1.0).contains(&score) {
            return Err(Error::InvalidSimilarity {
                a: a.to_string(),
                b: b.to_string(),
                score,
            });
        }
        self.insert(a, b, score);
        Ok(())
    }

    fn insert(&mut self, a: &str, b: &str, score: f64) {
        let previous = self
            .scores
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), score);
        self.scores
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string(), score);
        if previous.is_none() {
            self.pairs += 1;
        }
    }

    pub fn with(mut self, a: &str, b: &str, score: f64) -> Result<Self> {
        self.set(a, b, score)?;
        Ok(self)
    }

    pub fn score(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return SELF_SIMILARITY;
        }
        self.scores
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(0.0)
    }

    /// True if a score was recorded for the pair, even a score of `0.0`.
    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.scores.get(a).is_some_and(|row| row.contains_key(b))
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }

    /// Recorded pairs in a stable (sorted) order.
    pub fn entries(&self) -> Vec<SimilarityEntry> {
        let mut entries: Vec<SimilarityEntry> = self
            .scores
            .iter()
            .flat_map(|(a, row)| {
                row.iter()
                    .filter(move |(b, _)| a.as_str() < b.as_str())
                    .map(move |(b, score)| SimilarityEntry {
                        a: a.clone(),
                        b: b.clone(),
                        score: *score,
                    })
            })
            .collect();
        entries.sort_by(|x, y| (&x.a, &x.b).cmp(&(&y.a, &y.b)));
        entries
    }

    pub fn from_entries(entries: &[SimilarityEntry]) -> Result<Self> {
        let mut table = Self::new();
        for entry in entries {
            table.set(&entry.a, &entry.b, entry.score)?;
        }
        Ok(table)
    }

    /// Derive scores from product attributes: half for a shared category, half
    /// for price closeness (relative difference). Pairs scoring zero are not
    /// recorded.
    pub fn derive_from_attributes(products: &[Product]) -> Self {
        let mut table = Self::new();
        for (i, a) in products.iter().enumerate() {
            for b in &products[i + 1..] {
                let score = attribute_similarity(a, b);
                if score > 0.0 && a.name != b.name {
                    table.insert(&a.name, &b.name, score);
                }
            }
        }
        table
    }
}

fn attribute_similarity(a: &Product, b: &Product) -> f64 {
    let category = if !a.category.is_empty() && a.category.eq_ignore_ascii_case(&b.category) {
        1.0
    } else {
        0.0
    };
    let max = a.price.abs().max(b.price.abs());
    let price = if max == 0.0 {
        1.0
    } else {
        (1.0 - (a.price - b.price).abs() / max).max(0.0)
    };
    (0.5 * category + 0.5 * price).clamp(0.0, 1.0)
}
