#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{RagError, Result};

/// A search hit: vector id and squared Euclidean distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: u64,
    pub distance: f32,
}

impl Neighbor {
    /// Similarity in (0, 1]; 1 for an exact match
    #[inline]
    pub fn relevance(&self) -> f32 {
        relevance_score(self.distance)
    }
}

/// Map a squared distance into (0, 1]. Distances too large for `f32` still
/// score above zero.
#[inline]
pub fn relevance_score(distance: f32) -> f32 {
    (1.0 / (1.0 + distance.max(0.0))).max(f32::MIN_POSITIVE)
}

fn by_distance_then_id(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.id.cmp(&b.id))
}

/// Exact nearest-neighbor index over dense ids `0..len`.
///
/// Vectors are stored row-major in a single buffer; the vector with id `i`
/// occupies `data[i * dimension..(i + 1) * dimension]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    #[inline]
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::InvalidInput(
                "index dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Vector stored under `id`
    #[inline]
    pub fn vector(&self, id: u64) -> Option<&[f32]> {
        let start = usize::try_from(id).ok()?.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Reject vectors this index cannot hold, before anything is mutated
    #[inline]
    pub fn check_vectors(&self, vectors: &[Vec<f32>]) -> Result<()> {
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != self.dimension {
                return Err(RagError::InvalidInput(format!(
                    "vector {} has dimension {}, index expects {}",
                    position,
                    vector.len(),
                    self.dimension
                )));
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(RagError::InvalidInput(format!(
                    "vector {} contains a non-finite component",
                    position
                )));
            }
            if !squared_norm(vector).is_finite() {
                return Err(RagError::InvalidInput(format!(
                    "vector {} is too large to compare by squared distance",
                    position
                )));
            }
        }
        Ok(())
    }

    /// Append vectors, returning the ids assigned to them
    #[inline]
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<std::ops::Range<u64>> {
        self.check_vectors(vectors)?;

        let start = self.len() as u64;
        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(start..self.len() as u64)
    }

    /// The `k` nearest vectors by squared L2 distance, closest first.
    ///
    /// Ties are broken by the smaller id. Returns `min(k, len)` neighbors.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(RagError::InvalidInput(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }
        if query.iter().any(|x| !x.is_finite()) || !squared_norm(query).is_finite() {
            return Err(RagError::InvalidInput(
                "query contains a non-finite component or overflows".to_string(),
            ));
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(id, vector)| Neighbor {
                id: id as u64,
                distance: squared_l2(query, vector),
            })
            .collect();

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, by_distance_then_id);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(by_distance_then_id);

        Ok(neighbors)
    }
}

#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn squared_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum()
}
