//! Similarity scoring and maximal-marginal-relevance re-ranking.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Parameters for diversity-aware re-ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MmrParams {
    /// Trade-off between relevance (1.0) and diversity (0.0).
    pub lambda: f32,
    /// How many of the most similar segments are considered before re-ranking.
    pub fetch_k: usize,
}

impl Default for MmrParams {
    fn default() -> Self {
        Self { lambda: 0.5, fetch_k: 20 }
    }
}

impl MmrParams {
    /// Check that `lambda` lies in `[0, 1]` and `fetch_k` is positive.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] otherwise.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(RagError::Configuration(format!(
                "mmr_lambda ({}) must lie in [0, 1]",
                self.lambda
            )));
        }
        if self.fetch_k == 0 {
            return Err(RagError::Configuration("fetch_k must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A re-ranking candidate: its vector, its similarity to the query, and its
/// insertion sequence (lower was inserted earlier).
#[derive(Debug, Clone, Copy)]
pub struct MmrCandidate<'a> {
    /// The candidate's embedding.
    pub vector: &'a [f32],
    /// Cosine similarity to the query.
    pub similarity: f32,
    /// Insertion order, used as the final tie-break.
    pub sequence: u64,
}

/// Greedily pick up to `top_k` candidates by maximal marginal relevance.
///
/// Each round selects the unselected candidate maximising
/// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, s) for s in selected)`,
/// breaking ties by higher query similarity, then by earlier insertion.
/// Returns indices into `candidates` in selection order.
pub fn maximal_marginal_relevance(
    candidates: &[MmrCandidate<'_>],
    lambda: f32,
    top_k: usize,
) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::with_capacity(top_k.min(candidates.len()));
    // Highest similarity of each candidate to anything selected so far.
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];
    let mut taken = vec![false; candidates.len()];

    while selected.len() < top_k {
        let mut best: Option<(usize, f32)> = None;

        for (i, candidate) in candidates.iter().enumerate() {
            if taken[i] {
                continue;
            }
            let penalty = if selected.is_empty() { 0.0 } else { redundancy[i] };
            let score = lambda * candidate.similarity - (1.0 - lambda) * penalty;

            let better = match best {
                None => true,
                Some((j, best_score)) => {
                    let incumbent = &candidates[j];
                    match score.partial_cmp(&best_score).unwrap_or(Ordering::Equal) {
                        Ordering::Greater => true,
                        Ordering::Less => false,
                        Ordering::Equal => {
                            match candidate
                                .similarity
                                .partial_cmp(&incumbent.similarity)
                                .unwrap_or(Ordering::Equal)
                            {
                                Ordering::Greater => true,
                                Ordering::Less => false,
                                Ordering::Equal => candidate.sequence < incumbent.sequence,
                            }
                        }
                    }
                }
            };
            if better {
                best = Some((i, score));
            }
        }

        let Some((pick, _)) = best else { break };
        taken[pick] = true;
        selected.push(pick);

        for (i, candidate) in candidates.iter().enumerate() {
            if !taken[i] {
                let sim = cosine_similarity(candidate.vector, candidates[pick].vector);
                redundancy[i] = redundancy[i].max(sim);
            }
        }
    }

    selected
}
