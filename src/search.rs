//! The search coordinator: fuses kNN with filter predicates.
//!
//! For a filtered request the coordinator resolves the candidate id set
//! (filter cache first, then parse + evaluate), then picks a strategy:
//! below a fixed selectivity threshold it scores the candidates directly
//! (graph traversal with a near-empty admit set degrades toward an
//! exhaustive walk), otherwise it runs the graph search with a membership
//! predicate. Results come back best first; metadata is hydrated last,
//! in result order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::hnsw::DEFAULT_EF_SEARCH;
use crate::constants::search::EXACT_KNN_SELECTIVITY_THRESHOLD;
use crate::error::Result;
use crate::filter::parse_filter;
use crate::metadata::{DataStore, IdSet, Record};
use crate::registry::IndexEntry;
use crate::types::DocId;

/// A kNN search request.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub index_name: String,
    pub query_vector: Vec<f32>,
    pub k: usize,
    /// Beam width for the graph search; the effective beam is
    /// `ef_search.max(k)`.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
    /// Filter expression; `None` or blank means unfiltered.
    #[serde(default)]
    pub filter: Option<String>,
    /// Attach each hit's metadata record to the response.
    #[serde(default)]
    pub return_metadata: bool,
}

fn default_ef_search() -> usize {
    DEFAULT_EF_SEARCH
}

impl SearchRequest {
    /// A plain unfiltered request with default parameters.
    pub fn new(index_name: impl Into<String>, query_vector: Vec<f32>, k: usize) -> Self {
        Self {
            index_name: index_name.into(),
            query_vector,
            k,
            ef_search: DEFAULT_EF_SEARCH,
            filter: None,
            return_metadata: false,
        }
    }

    /// Attach a filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Request metadata hydration.
    pub fn with_metadata(mut self) -> Self {
        self.return_metadata = true;
        self
    }

    /// Override the search beam width.
    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }
}

/// Ordered search results, best first.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<DocId>,
    pub distances: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Record>>,
}

pub(crate) fn execute_search(entry: &IndexEntry, req: &SearchRequest) -> Result<SearchResponse> {
    let filter_text = req
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    // One store read lock spans filter evaluation, the graph search, and
    // metadata hydration (store before graph, same order as the write
    // path). A delete landing between the search and get_many would
    // otherwise remove a just-returned hit and fail the whole request.
    let store = entry.store.read();

    let results = match filter_text {
        Some(text) => {
            let filtered = resolve_filter(entry, &store, text)?;
            let ann = entry.ann.read();
            let live = ann.live_count();

            if (filtered.len() as f64) < live as f64 * EXACT_KNN_SELECTIVITY_THRESHOLD {
                debug!(
                    index = %req.index_name,
                    candidates = filtered.len(),
                    live,
                    "filtered search: exact scan"
                );
                ann.search_exact_filtered(&req.query_vector, req.k, &filtered)
            } else {
                debug!(
                    index = %req.index_name,
                    candidates = filtered.len(),
                    live,
                    "filtered search: graph traversal"
                );
                ann.search_filtered(&req.query_vector, req.k, req.ef_search, &filtered)
            }
        }
        None => entry
            .ann
            .read()
            .search(&req.query_vector, req.k, req.ef_search),
    };

    let (hits, distances): (Vec<DocId>, Vec<f32>) = results.into_iter().unzip();

    let metadatas = if req.return_metadata {
        Some(store.get_many(&hits)?)
    } else {
        None
    };

    Ok(SearchResponse {
        hits,
        distances,
        metadatas,
    })
}

/// Resolve a filter string to its id set, going through the index's
/// filter-result cache. The key is the exact filter text: textually
/// distinct but equivalent filters miss independently. The caller passes
/// its store guard so evaluation and hydration see one store state.
fn resolve_filter(entry: &IndexEntry, store: &DataStore, text: &str) -> Result<IdSet> {
    {
        let mut cache = entry.filter_cache.lock();
        if let Some(ids) = cache.get(&text.to_string()) {
            debug!(filter = text, "filter cache hit");
            return Ok(ids.clone());
        }
    }

    // Parse and evaluate outside the cache lock
    let ast = parse_filter(text)?;
    let ids = store.filter(&ast);

    entry.filter_cache.lock().put(text.to_string(), ids.clone());
    Ok(ids)
}
