//! Reversible mapping between [`Individual`]s and flat numeric vectors.
//!
//! A [`Schema`] is captured once from a factory-produced individual and
//! records, for every field in sorted name order, its shape and its offset
//! into the flat vector. Every later individual is validated against it.
//!
//! ```
//! use enkf_optimizer::codec::Schema;
//! use enkf_optimizer::Individual;
//!
//! let ind = Individual::new().with("bias", 0.5).with("w", vec![1.0, 2.0]);
//! let schema = Schema::capture(&ind);
//!
//! let flat = schema.encode(&ind).unwrap();
//! assert_eq!(flat, vec![0.5, 1.0, 2.0]);
//! assert_eq!(schema.decode(&flat).unwrap(), ind);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::{Individual, ParamValue};

/// Shape of one schema field.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// A single scalar.
    Scalar,
    /// A dense array with the given axis extents.
    Array(Vec<usize>),
}

impl Shape {
    fn of(value: &ParamValue) -> Self {
        match value {
            ParamValue::Scalar(_) => Shape::Scalar,
            ParamValue::Array { shape, .. } => Shape::Array(shape.clone()),
        }
    }

    /// Number of scalar elements in a value of this shape.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Array(dims) => dims.iter().product(),
        }
    }
}

/// Layout of a single named field within the flat vector.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Field shape.
    pub shape: Shape,
    /// Element offset of the field's first value.
    pub offset: usize,
}

/// The fixed layout of an individual.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Schema {
    fields: Vec<FieldSpec>,
    width: usize,
}

impl Schema {
    /// Records names, shapes and offsets of `individual`.
    #[must_use]
    pub fn capture(individual: &Individual) -> Self {
        let mut offset = 0;
        let fields = individual
            .iter()
            .map(|(name, value)| {
                let shape = Shape::of(value);
                let start = offset;
                offset += shape.size();
                FieldSpec {
                    name: name.to_owned(),
                    shape,
                    offset: start,
                }
            })
            .collect();
        Self {
            fields,
            width: offset,
        }
    }

    /// Length of the flat vector produced by [`encode`](Self::encode).
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Field layouts in flattening order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Checks that `individual` has exactly the schema's fields and shapes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] naming the first offending field.
    pub fn validate(&self, individual: &Individual) -> Result<()> {
        for spec in &self.fields {
            let value = individual
                .get(&spec.name)
                .ok_or_else(|| Error::schema(&spec.name, "field is missing"))?;
            let shape = Shape::of(value);
            if shape != spec.shape {
                return Err(Error::schema(
                    &spec.name,
                    format!("expected shape {:?}, got {shape:?}", spec.shape),
                ));
            }
            if value.len() != spec.shape.size() {
                return Err(Error::schema(
                    &spec.name,
                    format!(
                        "array holds {} values but its shape implies {}",
                        value.len(),
                        spec.shape.size()
                    ),
                ));
            }
        }
        if individual.len() != self.fields.len()
            && let Some((name, _)) = individual
                .iter()
                .find(|(name, _)| !self.fields.iter().any(|f| f.name == *name))
        {
            return Err(Error::schema(name, "field is not part of the schema"));
        }
        Ok(())
    }

    /// Flattens `individual` in schema order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the individual does not conform.
    pub fn encode(&self, individual: &Individual) -> Result<Vec<f64>> {
        self.validate(individual)?;
        let mut flat = Vec::with_capacity(self.width);
        for spec in &self.fields {
            if let Some(value) = individual.get(&spec.name) {
                flat.extend_from_slice(value.as_slice());
            }
        }
        Ok(flat)
    }

    /// Rebuilds an individual from a flat vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `flat` is not exactly
    /// [`width`](Self::width) long.
    pub fn decode(&self, flat: &[f64]) -> Result<Individual> {
        if flat.len() != self.width {
            return Err(Error::DimensionMismatch {
                context: "flat vector vs schema width",
                expected: self.width,
                got: flat.len(),
            });
        }
        Ok(self
            .fields
            .iter()
            .map(|spec| {
                let chunk = &flat[spec.offset..spec.offset + spec.shape.size()];
                let value = match &spec.shape {
                    Shape::Scalar => ParamValue::Scalar(chunk[0]),
                    Shape::Array(dims) => ParamValue::Array {
                        shape: dims.clone(),
                        values: chunk.to_vec(),
                    },
                };
                (spec.name.clone(), value)
            })
            .collect())
    }
}

/// Flattens `individual` under `schema`. See [`Schema::encode`].
///
/// # Errors
///
/// Returns [`Error::SchemaMismatch`] if the individual does not conform.
pub fn encode(individual: &Individual, schema: &Schema) -> Result<Vec<f64>> {
    schema.encode(individual)
}

/// Rebuilds an individual from `flat` under `schema`. See [`Schema::decode`].
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] on a length mismatch.
pub fn decode(flat: &[f64], schema: &Schema) -> Result<Individual> {
    schema.decode(flat)
}
