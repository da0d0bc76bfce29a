// Dense cosine-similarity search over the chunk embedding matrix
//
// One batched scan per query: O(N·D), no index structure, no approximation.
use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::corpus::Corpus;
use crate::errors::{RagError, Result};

/// Norms below this are clamped before dividing, so zero vectors score 0
const NORM_EPS: f64 = 1e-12;

/// A corpus row and its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredIndex {
    pub score: f32,
    pub index: usize,
}

/// N×D matrix of chunk embeddings; row `i` is chunk `i` of the corpus
#[derive(Debug, Clone)]
pub struct VectorMatrix {
    data: Tensor,
    norms: Tensor,
    rows: usize,
    dimension: usize,
}

impl VectorMatrix {
    /// Stack row vectors in the given order
    pub fn from_rows<'a, I>(rows: I, dimension: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        if dimension == 0 {
            return Err(RagError::DataFormat("vector dimension must be positive".to_string()));
        }

        let mut flat = Vec::new();
        let mut count = 0;
        for row in rows {
            if row.len() != dimension {
                return Err(RagError::DataFormat(format!(
                    "row {} has dimension {}, expected {}",
                    count,
                    row.len(),
                    dimension
                )));
            }
            flat.extend_from_slice(row);
            count += 1;
        }
        if count == 0 {
            return Err(RagError::DataFormat("vector matrix needs at least one row".to_string()));
        }

        let data = Tensor::from_vec(flat, (count, dimension), &Device::Cpu)?;
        let norms = data.sqr()?.sum(1)?.sqrt()?.clamp(NORM_EPS, f64::MAX)?;

        Ok(Self {
            data,
            norms,
            rows: count,
            dimension,
        })
    }

    pub fn from_corpus(corpus: &Corpus) -> Result<Self> {
        Self::from_rows(
            corpus.chunks().iter().map(|c| c.embedding.as_slice()),
            corpus.dimension(),
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Cosine similarity of `query` against every row, in row order
    pub fn cosine_scores(&self, query: &[f32]) -> Result<Vec<f32>> {
        if query.len() != self.dimension {
            return Err(RagError::InvalidArgument(format!(
                "query has dimension {}, corpus has {}",
                query.len(),
                self.dimension
            )));
        }

        let q = Tensor::from_slice(query, (self.dimension, 1), self.data.device())?;
        let q_norm = q.sqr()?.sum_all()?.sqrt()?.clamp(NORM_EPS, f64::MAX)?;

        let dots = self.data.matmul(&q)?.squeeze(1)?;
        let denom = self.norms.broadcast_mul(&q_norm)?;
        let scores = (dots / denom)?;

        Ok(scores.to_vec1::<f32>()?)
    }
}

/// Linear-scan similarity search
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    matrix: VectorMatrix,
}

impl SimilarityIndex {
    pub fn new(matrix: VectorMatrix) -> Self {
        Self { matrix }
    }

    pub fn from_corpus(corpus: &Corpus) -> Result<Self> {
        Ok(Self::new(VectorMatrix::from_corpus(corpus)?))
    }

    pub fn matrix(&self) -> &VectorMatrix {
        &self.matrix
    }

    /// The `k` rows most similar to `query`, best first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredIndex>> {
        validate_k(k, self.matrix.rows())?;
        let scores = self.matrix.cosine_scores(query)?;
        rank_top_k(&scores, k)
    }
}

/// `k` must be in `1..=n`
pub fn validate_k(k: usize, n: usize) -> Result<()> {
    if k == 0 {
        return Err(RagError::InvalidArgument("k must be a positive integer".to_string()));
    }
    if k > n {
        return Err(RagError::InvalidArgument(format!(
            "k ({}) exceeds the number of chunks ({})",
            k, n
        )));
    }
    Ok(())
}

/// Indices of the `k` highest scores in descending order; ties keep row order
pub fn rank_top_k(scores: &[f32], k: usize) -> Result<Vec<ScoredIndex>> {
    validate_k(k, scores.len())?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    // stable: equal scores stay in ascending row order
    order.sort_by(|&a, &b| descending(scores[a], scores[b]));

    Ok(order
        .into_iter()
        .take(k)
        .map(|index| ScoredIndex {
            score: scores[index],
            index,
        })
        .collect())
}

fn descending(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

/// Scalar cosine similarity, `dot(a,b) / (‖a‖·‖b‖)`
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt().max(NORM_EPS);
    let norm_b = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt().max(NORM_EPS);
    (dot / (norm_a * norm_b)) as f32
}
