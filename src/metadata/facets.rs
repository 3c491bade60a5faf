//! Facet aggregation over a list of document ids.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::metadata::value::FieldValue;

/// Aggregate summary of fields over an id list: value counts for string
/// fields, (min, max) per numeric variant. A field holding mixed variants
/// accumulates each variant independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetSummary {
    /// Per-field counts of string values.
    pub counts: BTreeMap<String, BTreeMap<String, u64>>,
    /// Per-field (min, max) over integer values.
    pub int_ranges: BTreeMap<String, (i64, i64)>,
    /// Per-field (min, max) over float values.
    pub float_ranges: BTreeMap<String, (f64, f64)>,
}

impl FacetSummary {
    /// Fold one field value into the summary.
    pub(crate) fn observe(&mut self, field: &str, value: &FieldValue) {
        match value {
            FieldValue::Str(s) => {
                *self
                    .counts
                    .entry(field.to_string())
                    .or_default()
                    .entry(s.clone())
                    .or_insert(0) += 1;
            }
            FieldValue::Int(i) => {
                self.int_ranges
                    .entry(field.to_string())
                    .and_modify(|(min, max)| {
                        *min = (*min).min(*i);
                        *max = (*max).max(*i);
                    })
                    .or_insert((*i, *i));
            }
            FieldValue::Float(f) => {
                self.float_ranges
                    .entry(field.to_string())
                    .and_modify(|(min, max)| {
                        *min = min.min(*f);
                        *max = max.max(*f);
                    })
                    .or_insert((*f, *f));
            }
        }
    }

    /// True if nothing was accumulated.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.int_ranges.is_empty() && self.float_ranges.is_empty()
    }
}
