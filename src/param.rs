//! Named-parameter individuals.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single named parameter value: a scalar or a dense row-major array.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamValue {
    /// A scalar parameter.
    Scalar(f64),
    /// An n-dimensional array stored in row-major order.
    Array {
        /// Extent of each axis. The product equals `values.len()`.
        shape: Vec<usize>,
        /// Flattened values.
        values: Vec<f64>,
    },
}

impl ParamValue {
    /// Creates a one-dimensional array parameter.
    #[must_use]
    pub fn vector(values: Vec<f64>) -> Self {
        ParamValue::Array {
            shape: vec![values.len()],
            values,
        }
    }

    /// Number of scalar elements this value occupies in a flat vector.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ParamValue::Scalar(_) => 1,
            ParamValue::Array { values, .. } => values.len(),
        }
    }

    /// Returns `true` for an empty array.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the scalar value, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ParamValue::Scalar(v) => Some(*v),
            ParamValue::Array { .. } => None,
        }
    }

    /// Borrows the flattened elements.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        match self {
            ParamValue::Scalar(v) => core::slice::from_ref(v),
            ParamValue::Array { values, .. } => values,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(values: Vec<f64>) -> Self {
        ParamValue::vector(values)
    }
}

/// One candidate of the ensemble: parameter name → value.
///
/// Fields iterate in sorted name order, which is the order the codec
/// uses when flattening.
///
/// # Examples
///
/// ```
/// use enkf_optimizer::{Individual, ParamValue};
///
/// let ind = Individual::new()
///     .with("weights", vec![0.5, -1.0])
///     .with("bias", 0.1);
/// assert_eq!(ind.get("bias"), Some(&ParamValue::Scalar(0.1)));
/// assert_eq!(ind.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Individual {
    fields: BTreeMap<String, ParamValue>,
}

impl Individual {
    /// Creates an individual with no fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a field, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds (or replaces) a field, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.fields.insert(name.into(), value.into())
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.fields.get(name)
    }

    /// Mutable access to a field, e.g. for bounding transforms.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParamValue> {
        self.fields.get_mut(name)
    }

    /// Number of named fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the individual has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Applies `f` to every scalar element of every field.
    ///
    /// Handy for clamp-style bounding transforms.
    #[must_use]
    pub fn map_values(mut self, mut f: impl FnMut(&str, f64) -> f64) -> Self {
        for (name, value) in &mut self.fields {
            match value {
                ParamValue::Scalar(v) => *v = f(name, *v),
                ParamValue::Array { values, .. } => {
                    for v in values.iter_mut() {
                        *v = f(name, *v);
                    }
                }
            }
        }
        self
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Individual {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
