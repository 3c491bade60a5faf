//! Typed field values attached to documents.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A metadata field value: one of integer, float, or string.
///
/// Values are totally ordered, first by variant rank (`Int < Float < Str`),
/// then by the natural order within a variant. Floats use `f64::total_cmp`,
/// so every value has a defined position and the type is usable as an
/// ordered-map key. Equality across distinct variants is always false:
/// `Int(30)` and `Float(30.0)` are different values and land in different
/// secondary-index buckets.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// UTF-8 string value.
    Str(String),
}

impl FieldValue {
    /// Rank of the variant in the cross-type total order.
    #[inline]
    pub(crate) fn variant_rank(&self) -> u8 {
        match self {
            FieldValue::Int(_) => 0,
            FieldValue::Float(_) => 1,
            FieldValue::Str(_) => 2,
        }
    }

    /// True if `self` and `other` are the same variant.
    #[inline]
    pub fn same_variant(&self, other: &FieldValue) -> bool {
        self.variant_rank() == other.variant_rank()
    }

    /// Get the type name as a string (for error messages).
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
        }
    }

    /// Try to get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.total_cmp(b),
            (FieldValue::Str(a), FieldValue::Str(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash discriminant first to distinguish types
        self.variant_rank().hash(state);

        match self {
            FieldValue::Int(i) => i.hash(state),
            // Bit representation keeps Hash consistent with total_cmp equality
            FieldValue::Float(f) => f.to_bits().hash(state),
            FieldValue::Str(s) => s.hash(state),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(i) => write!(f, "{i}"),
            // Always keep a fractional part so "30.0" and "30" stay distinct
            FieldValue::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            FieldValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name() {
        assert_eq!(FieldValue::Int(42).type_name(), "integer");
        assert_eq!(FieldValue::Float(3.5).type_name(), "float");
        assert_eq!(FieldValue::Str("x".into()).type_name(), "string");
    }

    #[test]
    fn test_variant_order() {
        let i = FieldValue::Int(1_000_000);
        let f = FieldValue::Float(-1e18);
        let s = FieldValue::Str(String::new());

        // Tag order dominates value order
        assert!(i < f);
        assert!(f < s);
        assert!(i < s);
    }

    #[test]
    fn test_within_variant_order() {
        assert!(FieldValue::Int(5) < FieldValue::Int(10));
        assert!(FieldValue::Float(1.5) < FieldValue::Float(2.5));
        assert!(FieldValue::Str("a".into()) < FieldValue::Str("b".into()));
    }

    #[test]
    fn test_cross_variant_never_equal() {
        assert_ne!(FieldValue::Int(30), FieldValue::Float(30.0));
        assert_ne!(FieldValue::Int(0), FieldValue::Str("0".into()));
    }

    #[test]
    fn test_display_float_keeps_fraction() {
        assert_eq!(FieldValue::Float(30.0).to_string(), "30.0");
        assert_eq!(FieldValue::Float(30.5).to_string(), "30.5");
        assert_eq!(FieldValue::Int(30).to_string(), "30");
    }

    #[test]
    fn test_conversions() {
        let v: FieldValue = 42i64.into();
        assert_eq!(v.as_int(), Some(42));

        let v: FieldValue = 2.25f64.into();
        assert_eq!(v.as_float(), Some(2.25));

        let v: FieldValue = "hello".into();
        assert_eq!(v.as_str(), Some("hello"));
    }
}
