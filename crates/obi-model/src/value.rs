//! Parameter values and sweepable fields
//!
//! - [`ParamValue`]: type-erased scalar or tuple value of a single coordinate
//! - [`ScanValue`]: element types a field may sweep over
//! - [`Sweepable`]: a field holding either one resolved value or a list of candidates

use std::fmt::{self, Debug, Display, Formatter};
use std::path::PathBuf;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

/// One resolved parameter value
///
/// This is what a swept field contributes to a coordinate. Tuples keep their
/// arity; they are values, never sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text, including file paths
    Text(String),
    /// Fixed-arity tuple
    Tuple(Vec<ParamValue>),
}

impl ParamValue {
    /// JSON representation, as written back into a form document
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Tuple(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Quoted rendering used for tuple members
    fn fmt_repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "'{s}'"),
            other => Display::fmt(other, f),
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::Text(s) => f.write_str(s),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_repr(f)?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Shortest round-trip float rendering with a mandatory fraction and a
/// signed two-digit exponent (`1.0`, `0.25`, `1e-05`, `1.5e+16`)
fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let debug = format!("{x:?}");
    match debug.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => debug,
    }
}

/// Element type a [`Sweepable`] field may hold
///
/// Implemented for the scalar types configuration fields use and for
/// tuples of them.
pub trait ScanValue: Clone + Debug + PartialEq + Serialize + DeserializeOwned {
    /// Type-erased value for coordinate bookkeeping
    fn to_param(&self) -> ParamValue;
}

impl ScanValue for bool {
    fn to_param(&self) -> ParamValue {
        ParamValue::Bool(*self)
    }
}

macro_rules! scan_value_int {
    ($($ty:ty),*) => {
        $(
            impl ScanValue for $ty {
                fn to_param(&self) -> ParamValue {
                    ParamValue::Int(i64::from(*self))
                }
            }
        )*
    };
}

scan_value_int!(i8, i16, i32, i64, u8, u16, u32);

impl ScanValue for u64 {
    #[allow(clippy::cast_precision_loss)]
    fn to_param(&self) -> ParamValue {
        i64::try_from(*self).map_or(ParamValue::Float(*self as f64), ParamValue::Int)
    }
}

impl ScanValue for f32 {
    fn to_param(&self) -> ParamValue {
        ParamValue::Float(f64::from(*self))
    }
}

impl ScanValue for f64 {
    fn to_param(&self) -> ParamValue {
        ParamValue::Float(*self)
    }
}

impl ScanValue for String {
    fn to_param(&self) -> ParamValue {
        ParamValue::Text(self.clone())
    }
}

impl ScanValue for PathBuf {
    fn to_param(&self) -> ParamValue {
        ParamValue::Text(self.display().to_string())
    }
}

impl<A: ScanValue, B: ScanValue> ScanValue for (A, B) {
    fn to_param(&self) -> ParamValue {
        ParamValue::Tuple(vec![self.0.to_param(), self.1.to_param()])
    }
}

impl<A: ScanValue, B: ScanValue, C: ScanValue> ScanValue for (A, B, C) {
    fn to_param(&self) -> ParamValue {
        ParamValue::Tuple(vec![self.0.to_param(), self.1.to_param(), self.2.to_param()])
    }
}

/// A field that is either resolved to one value or sweeps over candidates
///
/// On the wire a resolved field is its bare value and a swept field is a list
/// of values. A document value that parses as `T` is always `Resolved`, so a
/// fixed-arity tuple is never mistaken for a sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum Sweepable<T> {
    /// Exactly one value
    Resolved(T),
    /// Candidate values in source order
    Swept(Vec<T>),
}

impl<T> Sweepable<T> {
    /// Resolved value, if any
    #[inline]
    #[must_use]
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Swept(_) => None,
        }
    }

    /// All values held, one for a resolved field
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Resolved(value) => std::slice::from_ref(value),
            Self::Swept(values) => values,
        }
    }

    /// Check if the field holds a list, whatever its length
    #[inline]
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::Swept(_))
    }
}

impl<T> From<T> for Sweepable<T> {
    fn from(value: T) -> Self {
        Self::Resolved(value)
    }
}

impl<T> From<Vec<T>> for Sweepable<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Swept(values)
    }
}

impl<T: Default> Default for Sweepable<T> {
    fn default() -> Self {
        Self::Resolved(T::default())
    }
}

impl<T: Serialize> Serialize for Sweepable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Resolved(value) => value.serialize(serializer),
            Self::Swept(values) => values.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Sweepable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        match T::deserialize(&value) {
            Ok(resolved) => Ok(Self::Resolved(resolved)),
            Err(single_err) => match value {
                JsonValue::Array(items) => items
                    .into_iter()
                    .map(T::deserialize)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Swept)
                    .map_err(D::Error::custom),
                _ => Err(D::Error::custom(single_err)),
            },
        }
    }
}

/// Type-erased view of a [`Sweepable`] field, as listed in a block's field table
pub trait SweepField {
    /// Number of values when the field holds a list, `None` when resolved
    fn list_len(&self) -> Option<usize>;

    /// Values of a list field in source order; empty when resolved
    fn candidates(&self) -> Vec<ParamValue>;
}

impl<T: ScanValue> SweepField for Sweepable<T> {
    fn list_len(&self) -> Option<usize> {
        match self {
            Self::Resolved(_) => None,
            Self::Swept(values) => Some(values.len()),
        }
    }

    fn candidates(&self) -> Vec<ParamValue> {
        match self {
            Self::Resolved(_) => Vec::new(),
            Self::Swept(values) => values.iter().map(ScanValue::to_param).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_scalars() {
        assert_eq!(ParamValue::Int(3).to_string(), "3");
        assert_eq!(ParamValue::Float(1.0).to_string(), "1.0");
        assert_eq!(ParamValue::Float(0.1).to_string(), "0.1");
        assert_eq!(ParamValue::Float(-2.5).to_string(), "-2.5");
        assert_eq!(ParamValue::Bool(true).to_string(), "True");
        assert_eq!(ParamValue::Text("L5_TPC".into()).to_string(), "L5_TPC");
    }

    #[test]
    fn display_float_exponents() {
        assert_eq!(ParamValue::Float(1e-5).to_string(), "1e-05");
        assert_eq!(ParamValue::Float(1e16).to_string(), "1e+16");
        assert_eq!(ParamValue::Float(0.0001).to_string(), "0.0001");
    }

    #[test]
    fn display_tuples() {
        let pair = (0.5_f64, 2_i64).to_param();
        assert_eq!(pair.to_string(), "(0.5, 2)");

        let named = ParamValue::Tuple(vec![ParamValue::Text("a".into()), ParamValue::Int(1)]);
        assert_eq!(named.to_string(), "('a', 1)");

        let single = ParamValue::Tuple(vec![ParamValue::Int(7)]);
        assert_eq!(single.to_string(), "(7,)");
    }

    #[test]
    fn param_value_json() {
        assert_eq!(ParamValue::Float(0.5).to_json(), json!(0.5));
        assert_eq!((1_i64, 2_i64).to_param().to_json(), json!([1, 2]));
    }

    #[test]
    fn param_value_untagged_roundtrip() {
        let v: ParamValue = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(v, ParamValue::Int(2));
        let v: ParamValue = serde_json::from_value(json!(0.9)).unwrap();
        assert_eq!(v, ParamValue::Float(0.9));
        let v: ParamValue = serde_json::from_value(json!([1, "x"])).unwrap();
        assert_eq!(v, ParamValue::Tuple(vec![ParamValue::Int(1), ParamValue::Text("x".into())]));
    }

    #[test]
    fn sweepable_scalar_and_list() {
        let resolved: Sweepable<f64> = serde_json::from_value(json!(1000)).unwrap();
        assert_eq!(resolved, Sweepable::Resolved(1000.0));

        let swept: Sweepable<f64> = serde_json::from_value(json!([1000, 2000])).unwrap();
        assert_eq!(swept, Sweepable::Swept(vec![1000.0, 2000.0]));
    }

    #[test]
    fn sweepable_tuple_is_not_a_sweep() {
        let pair: Sweepable<(f64, f64)> = serde_json::from_value(json!([0.0, 1.0])).unwrap();
        assert_eq!(pair, Sweepable::Resolved((0.0, 1.0)));

        let pairs: Sweepable<(f64, f64)> = serde_json::from_value(json!([[0.0, 1.0], [2.0, 3.0]])).unwrap();
        assert_eq!(pairs, Sweepable::Swept(vec![(0.0, 1.0), (2.0, 3.0)]));
    }

    #[test]
    fn sweepable_rejects_wrong_type() {
        let result: Result<Sweepable<f64>, _> = serde_json::from_value(json!("fast"));
        assert!(result.is_err());
        let result: Result<Sweepable<f64>, _> = serde_json::from_value(json!([1.0, "fast"]));
        assert!(result.is_err());
    }

    #[test]
    fn sweepable_serializes_bare() {
        assert_eq!(serde_json::to_value(Sweepable::Resolved(3_i64)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(Sweepable::Swept(vec![1_i64, 2])).unwrap(), json!([1, 2]));
    }

    #[test]
    fn sweep_field_view() {
        let resolved = Sweepable::Resolved(1_i64);
        assert_eq!(resolved.list_len(), None);
        assert!(resolved.candidates().is_empty());

        let swept = Sweepable::Swept(vec![1_i64, 2]);
        assert_eq!(swept.list_len(), Some(2));
        assert_eq!(swept.candidates(), vec![ParamValue::Int(1), ParamValue::Int(2)]);
    }
}
