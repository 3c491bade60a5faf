//! Named constants for configuration values.
//!
//! This module centralizes magic numbers and default values used throughout
//! the codebase, making them easier to find, document, and tune.

/// Constants for HNSW index construction and growth.
pub mod hnsw {
    /// Default M parameter (max connections per layer).
    pub const DEFAULT_M: usize = 16;

    /// Default ef_construction (beam width during build).
    pub const DEFAULT_EF_CONSTRUCTION: usize = 512;

    /// Default beam width during search when a request omits ef_search.
    pub const DEFAULT_EF_SEARCH: usize = 512;

    /// Initial element capacity for a freshly created index.
    pub const DEFAULT_CAPACITY: usize = 100_000;

    /// Free slots that must remain after a batch insert. A batch that
    /// would leave fewer triggers a resize before any document lands.
    pub const RESIZE_HEADROOM: usize = 10_000;

    /// Capacity multiplier applied on resize:
    /// `new = cap + cap * GROWTH_FACTOR + batch`.
    pub const GROWTH_FACTOR: f64 = 2.0;
}

/// Constants for the search coordinator.
pub mod search {
    /// Fraction of live elements below which a filtered search switches
    /// from graph traversal to direct scoring of the candidate set.
    /// Highly selective predicates degrade HNSW toward exhaustive walks.
    pub const EXACT_KNN_SELECTIVITY_THRESHOLD: f64 = 0.1;

    /// Candidate-set size above which exact filtered scoring is chunked
    /// across the rayon pool.
    pub const PARALLEL_SCAN_THRESHOLD: usize = 1_000;
}

/// Constants for the per-index filter-result cache.
pub mod cache {
    /// Maximum number of filter strings cached per index.
    pub const MAX_FILTER_CACHE_SIZE: usize = 1_000;
}
