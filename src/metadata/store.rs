//! The record store and its per-field secondary indexes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use crate::error::{QuiverDbError, Result};
use crate::filter::{CompareOp, FilterNode};
use crate::metadata::facets::FacetSummary;
use crate::metadata::value::FieldValue;
use crate::types::DocId;

/// A document's metadata: field name to typed value, ordered by key.
pub type Record = BTreeMap<String, FieldValue>;

/// An ordered set of document ids. Iteration order is deterministic, so
/// filter results are stable and cacheable by filter text.
pub type IdSet = BTreeSet<DocId>;

/// Typed record store with per-field ordered secondary indexes.
///
/// Holds three structures that are kept consistent by every mutation:
/// the record table (`id -> record`), the live id set, and the field index
/// (`field -> value -> ids`). The inner map of the field index is ordered
/// by the cross-variant total order on [`FieldValue`], which is what makes
/// range comparisons a bounded walk instead of a table scan.
///
/// The store itself is not synchronized; the registry wraps each store in
/// a `RwLock` so reads run concurrently and writes are exclusive.
#[derive(Debug, Default)]
pub struct DataStore {
    records: HashMap<DocId, Record>,
    ids: IdSet,
    field_index: HashMap<String, BTreeMap<FieldValue, IdSet>>,
}

impl DataStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The set of all live ids (the universal set for `NOT`).
    pub fn ids(&self) -> &IdSet {
        &self.ids
    }

    /// Insert or wholly replace the record for `id`.
    ///
    /// Replacement first unlinks the old record from every secondary-index
    /// bucket that references it; otherwise stale entries leak.
    pub fn set(&mut self, id: DocId, record: Record) {
        if self.records.contains_key(&id) {
            self.unlink(id);
        }

        for (field, value) in &record {
            self.field_index
                .entry(field.clone())
                .or_default()
                .entry(value.clone())
                .or_default()
                .insert(id);
        }

        self.records.insert(id, record);
        self.ids.insert(id);
    }

    /// Get a copy of the record for `id`.
    pub fn get(&self, id: DocId) -> Result<Record> {
        self.records
            .get(&id)
            .cloned()
            .ok_or(QuiverDbError::DocumentNotFound(id))
    }

    /// Get records for `ids` in input order; fails on the first missing id.
    pub fn get_many(&self, ids: &[DocId]) -> Result<Vec<Record>> {
        ids.iter().map(|&id| self.get(id)).collect()
    }

    /// True if a record exists for `id`.
    pub fn contains(&self, id: DocId) -> bool {
        self.records.contains_key(&id)
    }

    /// Delete the record for `id`. Absent ids are a no-op, not an error.
    pub fn remove(&mut self, id: DocId) {
        if !self.records.contains_key(&id) {
            return;
        }
        self.unlink(id);
        self.records.remove(&id);
        self.ids.remove(&id);
    }

    /// Remove `id` from every secondary-index bucket its record occupies,
    /// dropping buckets and field entries that become empty.
    fn unlink(&mut self, id: DocId) {
        let record = match self.records.get(&id) {
            Some(r) => r,
            None => return,
        };

        for (field, value) in record {
            if let Some(buckets) = self.field_index.get_mut(field) {
                if let Some(bucket) = buckets.get_mut(value) {
                    bucket.remove(&id);
                    if bucket.is_empty() {
                        buckets.remove(value);
                    }
                }
                if buckets.is_empty() {
                    self.field_index.remove(field);
                }
            }
        }
    }

    /// Evaluate a filter against a single record.
    ///
    /// A `None` filter matches everything. Comparisons against missing
    /// fields or fields of a different variant never match; `!=` only
    /// matches same-variant values that differ.
    pub fn matches(&self, id: DocId, filter: Option<&FilterNode>) -> bool {
        let node = match filter {
            Some(node) => node,
            None => return self.records.contains_key(&id),
        };
        let record = match self.records.get(&id) {
            Some(r) => r,
            None => return false,
        };
        Self::matches_record(record, node)
    }

    fn matches_record(record: &Record, node: &FilterNode) -> bool {
        match node {
            FilterNode::Comparison { field, op, value } => record
                .get(field)
                .map(|stored| compare_values(stored, *op, value))
                .unwrap_or(false),
            FilterNode::Boolean { op, left, right } => {
                let l = Self::matches_record(record, left);
                let r = Self::matches_record(record, right);
                match op {
                    crate::filter::BoolOp::And => l && r,
                    crate::filter::BoolOp::Or => l || r,
                }
            }
            FilterNode::Not(child) => !Self::matches_record(record, child),
        }
    }

    /// Evaluate a filter to the set of matching ids.
    ///
    /// Comparisons resolve through the field index: `=` reads the exact
    /// bucket, ranges walk the ordered map from the literal bound and stop
    /// at the variant boundary, `!=` walks the same-variant keys excluding
    /// the exact bucket. AND intersects, OR unions, NOT subtracts from the
    /// live id set.
    pub fn filter(&self, node: &FilterNode) -> IdSet {
        match node {
            FilterNode::Comparison { field, op, value } => {
                let buckets = match self.field_index.get(field) {
                    Some(b) => b,
                    None => return IdSet::new(),
                };
                Self::filter_comparison(buckets, *op, value)
            }
            FilterNode::Boolean { op, left, right } => {
                let left = self.filter(left);
                let right = self.filter(right);
                match op {
                    crate::filter::BoolOp::And => left.intersection(&right).copied().collect(),
                    crate::filter::BoolOp::Or => left.union(&right).copied().collect(),
                }
            }
            FilterNode::Not(child) => {
                let child = self.filter(child);
                self.ids.difference(&child).copied().collect()
            }
        }
    }

    fn filter_comparison(
        buckets: &BTreeMap<FieldValue, IdSet>,
        op: CompareOp,
        literal: &FieldValue,
    ) -> IdSet {
        let mut result = IdSet::new();

        match op {
            CompareOp::Eq => {
                if let Some(bucket) = buckets.get(literal) {
                    result.extend(bucket.iter().copied());
                }
            }
            CompareOp::Ne => {
                for (value, bucket) in buckets {
                    if value.same_variant(literal) && value != literal {
                        result.extend(bucket.iter().copied());
                    }
                }
            }
            CompareOp::Gt | CompareOp::Ge => {
                let lower = if op == CompareOp::Gt {
                    Bound::Excluded(literal)
                } else {
                    Bound::Included(literal)
                };
                for (value, bucket) in buckets.range((lower, Bound::Unbounded)) {
                    // Same-variant keys are contiguous above the literal
                    if !value.same_variant(literal) {
                        break;
                    }
                    result.extend(bucket.iter().copied());
                }
            }
            CompareOp::Lt | CompareOp::Le => {
                let upper = if op == CompareOp::Lt {
                    Bound::Excluded(literal)
                } else {
                    Bound::Included(literal)
                };
                for (value, bucket) in buckets.range((Bound::Unbounded, upper)).rev() {
                    if !value.same_variant(literal) {
                        break;
                    }
                    result.extend(bucket.iter().copied());
                }
            }
        }

        result
    }

    /// Aggregate facets over the supplied ids: per-field counts for string
    /// values, per-field (min, max) per numeric variant. Ids without a
    /// record are skipped.
    pub fn facets(&self, ids: &[DocId]) -> FacetSummary {
        let mut summary = FacetSummary::default();
        for id in ids {
            if let Some(record) = self.records.get(id) {
                for (field, value) in record {
                    summary.observe(field, value);
                }
            }
        }
        summary
    }

    /// Borrow the record for `id`, if present. Used by persistence.
    pub(crate) fn record(&self, id: DocId) -> Option<&Record> {
        self.records.get(&id)
    }
}

/// Compare a stored value against a filter literal.
///
/// Cross-variant comparisons are always false: an integer 30 and a float
/// 30.0 are unrelated values.
fn compare_values(stored: &FieldValue, op: CompareOp, literal: &FieldValue) -> bool {
    if !stored.same_variant(literal) {
        return false;
    }
    match op {
        CompareOp::Eq => stored == literal,
        CompareOp::Ne => stored != literal,
        CompareOp::Gt => stored > literal,
        CompareOp::Lt => stored < literal,
        CompareOp::Ge => stored >= literal,
        CompareOp::Le => stored <= literal,
    }
}
