use crate::types::DocId;
use rand::Rng;
use std::sync::Arc;

/// A vector with an ID and floating-point data.
/// The data is stored in an Arc for cheap cloning.
#[derive(Clone, Debug)]
pub struct Vector {
    pub id: DocId,
    pub data: Arc<[f32]>,
}

impl Vector {
    /// Create a new vector with the given ID and data.
    pub fn new(id: DocId, data: Vec<f32>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Create a random vector with values uniformly distributed in [-1.0, 1.0].
    pub fn random(id: DocId, dim: usize) -> Self {
        let mut rng = rand::thread_rng();
        let data: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Self::new(id, data)
    }

    /// Return the dimensionality of this vector.
    pub fn dim(&self) -> usize {
        self.data.len()
    }
}
