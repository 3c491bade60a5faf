//! Core types shared across the crate.

/// External document identifier.
///
/// Ids are supplied by the client, unique within an index, and shared
/// between the ANN graph and the metadata store. Signed 32-bit to match
/// the wire format.
pub type DocId = i32;
