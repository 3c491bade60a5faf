//! quiver-db: filter-aware vector search in Rust.
//!
//! This crate is the core of a self-contained vector-search service: named
//! indices pairing an HNSW graph with a typed metadata store, searched
//! through a coordinator that fuses k-nearest-neighbor lookups with parsed
//! boolean filter predicates.
//!
//! # Features
//!
//! - **Metadata Filtering**: typed records with per-field ordered secondary
//!   indexes answering point, range, and boolean-composed queries
//! - **Filter Language**: `age >= 21 AND (city = "Wellington" OR NOT vip = 1)`
//! - **Adaptive Filtered kNN**: highly selective filters switch from graph
//!   traversal to direct scoring of the surviving candidates
//! - **Filter-Result Caching**: per-index LFU cache keyed by filter text
//! - **Persistence**: graph, settings, and metadata saved with checksum
//!   verification and atomic replacement
//! - **Thread Safety**: concurrent reads per index, exclusive writes,
//!   graph growth atomic with the writing batch
//!
//! # Quick Start
//!
//! ```
//! use quiver_db::{IndexRegistry, IndexSettings, AddDocumentsRequest, SearchRequest};
//! use quiver_db::metadata::{FieldValue, Record};
//!
//! let registry = IndexRegistry::new("indices");
//! registry.create_index(IndexSettings {
//!     name: "articles".into(),
//!     dimension: 4,
//!     index_type: "Approximate".into(),
//!     space_type: "L2".into(),
//!     ef_construction: 128,
//!     m: 16,
//! }).unwrap();
//!
//! let mut record = Record::new();
//! record.insert("topic".into(), FieldValue::Str("rust".into()));
//! record.insert("year".into(), FieldValue::Int(2024));
//!
//! registry.add_documents(AddDocumentsRequest {
//!     index_name: "articles".into(),
//!     ids: vec![1],
//!     vectors: vec![vec![0.1, 0.2, 0.3, 0.4]],
//!     metadatas: vec![record],
//! }).unwrap();
//!
//! let response = registry.search(
//!     &SearchRequest::new("articles", vec![0.1, 0.2, 0.3, 0.4], 5)
//!         .with_filter("topic = \"rust\" AND year >= 2020")
//!         .with_metadata(),
//! ).unwrap();
//!
//! assert_eq!(response.hits, vec![1]);
//! ```
//!
//! # Modules
//!
//! - [`metadata`]: record store, field index, facets, persistence
//! - [`filter`]: tokenizer, parser, and AST of the filter language
//! - [`search`]: the kNN + filter coordinator
//! - [`registry`]: index lifecycle and document operations
//! - [`index`]: the HNSW graph engine
//! - [`cache`]: generic bounded LFU cache
//! - [`distance`]: distance metrics

pub mod cache;
pub mod constants;
pub mod distance;
pub mod error;
pub mod filter;
pub mod index;
pub mod metadata;
pub mod persistence;
pub mod registry;
pub mod search;
pub mod types;
pub mod vector;

// Re-export commonly used types at crate root
pub use cache::LfuCache;
pub use distance::DistanceMetric;
pub use error::{QuiverDbError, Result};
pub use filter::{parse_filter, FilterNode};
pub use index::HnswIndex;
pub use metadata::{DataStore, FacetSummary, FieldValue, IdSet, Record};
pub use registry::{AddDocumentsRequest, Document, IndexRegistry, IndexSettings};
pub use search::{SearchRequest, SearchResponse};
pub use types::DocId;
pub use vector::Vector;
