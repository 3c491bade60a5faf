//! Typed metadata records with filterable secondary indexes.
//!
//! Each index owns a [`DataStore`] mapping document ids to [`Record`]s.
//! Every field of every record is mirrored into a per-field ordered index
//! (`field -> value -> ids`), which is what the filter evaluator walks to
//! answer point, range, and boolean-composed queries without scanning the
//! record table.
//!
//! # Example
//!
//! ```
//! use quiver_db::metadata::{DataStore, FieldValue, Record};
//! use quiver_db::filter::parse_filter;
//!
//! let mut store = DataStore::new();
//! let mut record = Record::new();
//! record.insert("category".into(), FieldValue::Str("electronics".into()));
//! record.insert("price".into(), FieldValue::Float(299.99));
//! store.set(1, record);
//!
//! let filter = parse_filter("category = \"electronics\" AND price < 500.0").unwrap();
//! let matching = store.filter(&filter);
//! assert!(matching.contains(&1));
//! ```

mod facets;
mod persist;
mod store;
mod value;

pub use facets::FacetSummary;
pub use store::{DataStore, IdSet, Record};
pub use value::FieldValue;
