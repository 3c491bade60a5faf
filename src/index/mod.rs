//! Vector index implementations.

pub mod hnsw;

pub use hnsw::HnswIndex;
