use serde::{Deserialize, Serialize};

/// A single face, reduced to a fixed-length vector.
///
/// Embeddings are request-scoped: computed, compared, dropped. Nothing in
/// facematch persists them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceEmbedding {
    vector: Vec<f32>,
}

impl FaceEmbedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.vector
    }
}

impl From<Vec<f32>> for FaceEmbedding {
    fn from(vector: Vec<f32>) -> Self {
        Self::new(vector)
    }
}

/// Euclidean distance between two embeddings.
///
/// Embeddings of different dimension never match: the distance is `f32::INFINITY`.
pub fn face_distance(a: &FaceEmbedding, b: &FaceEmbedding) -> f32 {
    if a.dim() != b.dim() {
        return f32::INFINITY;
    }
    a.vector
        .iter()
        .zip(&b.vector)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
