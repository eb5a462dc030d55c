//! Parameter bindings and their expansion into bound circuits.
//!
//! A [`BindingsArray`] stores values of shape `(*shape, num_parameters)`.
//! Expansion walks the leading `shape` in row-major order (first axis
//! slowest) and binds one circuit per coordinate:
//!
//! ```text
//!   shape (2, 3)  ──→  (0,0) (0,1) (0,2) (1,0) (1,1) (1,2)
//! ```

use ndarray::{Array1, Array2, ArrayD, IxDyn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use ddsim_ir::Circuit;

use crate::error::{PrimitiveError, PrimitiveResultT};

/// Parameter values for a PUB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingsArray {
    /// Values in row-major order, `num_parameters` per binding.
    data: Vec<f64>,
    /// Leading shape.
    shape: Vec<usize>,
    num_parameters: usize,
    /// Explicit parameter names, or `None` for the circuit's parameter order.
    names: Option<Vec<String>>,
}

impl BindingsArray {
    /// No parameters and a scalar shape.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            shape: Vec::new(),
            num_parameters: 0,
            names: None,
        }
    }

    /// Positional values whose last axis runs over the circuit's parameters.
    pub fn new(values: ArrayD<f64>) -> PrimitiveResultT<Self> {
        let Some((&num_parameters, shape)) = values.shape().split_last() else {
            return Err(PrimitiveError::InvalidShape(
                "parameter values need at least one axis".into(),
            ));
        };
        Ok(Self {
            shape: shape.to_vec(),
            num_parameters,
            data: values.iter().copied().collect(),
            names: None,
        })
    }

    /// Named values whose last axis runs over `names`.
    pub fn named(names: Vec<String>, values: ArrayD<f64>) -> PrimitiveResultT<Self> {
        let mut bindings = Self::new(values)?;
        if names.len() != bindings.num_parameters {
            return Err(PrimitiveError::InvalidShape(format!(
                "{} parameter names for {} values per binding",
                names.len(),
                bindings.num_parameters
            )));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(PrimitiveError::InvalidPub(format!(
                    "parameter '{name}' is bound twice"
                )));
            }
        }
        bindings.names = Some(names);
        Ok(bindings)
    }

    /// One named value per parameter, scalar shape.
    pub fn from_named_values<S: Into<String>>(
        values: impl IntoIterator<Item = (S, f64)>,
    ) -> PrimitiveResultT<Self> {
        let (names, values): (Vec<String>, Vec<f64>) =
            values.into_iter().map(|(n, v)| (n.into(), v)).unzip();
        Self::named(names, Array1::from(values).into_dyn())
    }

    /// Positional rows, shape `(rows.len(),)`. Every row must have the same
    /// length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> PrimitiveResultT<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().find(|r| r.len() != width) {
            return Err(PrimitiveError::InvalidShape(format!(
                "binding rows of length {width} and {}",
                row.len()
            )));
        }
        Ok(Self {
            shape: vec![rows.len()],
            num_parameters: width,
            data: rows.into_iter().flatten().collect(),
            names: None,
        })
    }

    /// Leading shape of the bindings.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of bindings.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Values per binding.
    pub fn num_parameters(&self) -> usize {
        self.num_parameters
    }

    /// Explicit parameter names, if any.
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// The values as an array of shape `(*shape, num_parameters)`.
    pub fn to_array(&self) -> PrimitiveResultT<ArrayD<f64>> {
        let mut full = self.shape.clone();
        full.push(self.num_parameters);
        ArrayD::from_shape_vec(IxDyn(&full), self.data.clone())
            .map_err(|e| PrimitiveError::InvalidShape(e.to_string()))
    }

    fn binding(&self, flat_index: usize) -> &[f64] {
        let start = flat_index * self.num_parameters;
        &self.data[start..start + self.num_parameters]
    }
}

impl Default for BindingsArray {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single binding, scalar shape.
impl From<Vec<f64>> for BindingsArray {
    fn from(values: Vec<f64>) -> Self {
        Self {
            shape: Vec::new(),
            num_parameters: values.len(),
            data: values,
            names: None,
        }
    }
}

impl From<Array1<f64>> for BindingsArray {
    fn from(values: Array1<f64>) -> Self {
        Self::from(values.to_vec())
    }
}

/// One binding per row, shape `(rows,)`.
impl From<Array2<f64>> for BindingsArray {
    fn from(values: Array2<f64>) -> Self {
        let (rows, cols) = values.dim();
        Self {
            shape: vec![rows],
            num_parameters: cols,
            data: values.iter().copied().collect(),
            names: None,
        }
    }
}

/// Lazily binds a circuit once per coordinate of a bindings shape.
///
/// Yields `Result`s so that a failing binding stops the consumer at that
/// coordinate.
#[derive(Debug)]
pub struct ParameterBindingExpander<'a> {
    circuit: &'a Circuit,
    bindings: &'a BindingsArray,
    parameters: Vec<String>,
    /// `columns[k]` is the binding column holding `parameters[k]`.
    columns: Vec<usize>,
    next: usize,
}

impl<'a> ParameterBindingExpander<'a> {
    /// Check `bindings` against the circuit's free parameters.
    pub fn new(circuit: &'a Circuit, bindings: &'a BindingsArray) -> PrimitiveResultT<Self> {
        let parameters = circuit.parameters();
        if bindings.num_parameters() != parameters.len() {
            return Err(PrimitiveError::ParameterCountMismatch {
                circuit: circuit.name().to_string(),
                expected: parameters.len(),
                got: bindings.num_parameters(),
            });
        }

        let columns = match bindings.names() {
            None => (0..parameters.len()).collect(),
            Some(names) => {
                if let Some(unknown) = names.iter().find(|n| !parameters.contains(n)) {
                    return Err(PrimitiveError::UnknownParameter(unknown.clone()));
                }
                parameters
                    .iter()
                    .map(|p| {
                        names
                            .iter()
                            .position(|n| n == p)
                            .ok_or_else(|| PrimitiveError::MissingParameter(p.clone()))
                    })
                    .collect::<PrimitiveResultT<Vec<_>>>()?
            }
        };

        Ok(Self {
            circuit,
            bindings,
            parameters,
            columns,
            next: 0,
        })
    }

    /// Shape of the expansion.
    pub fn shape(&self) -> &[usize] {
        self.bindings.shape()
    }

    /// Parameter name → value for the binding at `flat_index`.
    pub fn values_at(&self, flat_index: usize) -> FxHashMap<String, f64> {
        let row = self.bindings.binding(flat_index);
        self.parameters
            .iter()
            .zip(&self.columns)
            .map(|(name, &col)| (name.clone(), row[col]))
            .collect()
    }
}

impl Iterator for ParameterBindingExpander<'_> {
    type Item = PrimitiveResultT<Circuit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.bindings.size() {
            return None;
        }
        let index = self.next;
        self.next += 1;

        if self.parameters.is_empty() {
            return Some(Ok(self.circuit.clone()));
        }
        Some(
            self.circuit
                .bind(&self.values_at(index))
                .map_err(PrimitiveError::from),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bindings.size().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ParameterBindingExpander<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use ddsim_ir::{ParameterExpression, QubitId};
    use ndarray::array;

    fn two_parameter_circuit() -> Circuit {
        let mut circuit = Circuit::with_size("pc", 1, 0);
        circuit
            .rx(ParameterExpression::symbol("b"), QubitId(0))
            .unwrap()
            .ry(ParameterExpression::symbol("a"), QubitId(0))
            .unwrap();
        circuit
    }

    #[test]
    fn test_empty_bindings_yield_the_circuit() {
        let circuit = Circuit::bell().unwrap();
        let bindings = BindingsArray::empty();
        let bound: Vec<_> = ParameterBindingExpander::new(&circuit, &bindings)
            .unwrap()
            .collect::<PrimitiveResultT<_>>()
            .unwrap();
        assert_eq!(bound, vec![circuit]);
    }

    #[test]
    fn test_count_mismatch() {
        let circuit = two_parameter_circuit();
        let bindings = BindingsArray::from(vec![1.0]);
        let err = ParameterBindingExpander::new(&circuit, &bindings).unwrap_err();
        assert!(matches!(
            err,
            PrimitiveError::ParameterCountMismatch {
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_positional_values_follow_sorted_names() {
        let circuit = two_parameter_circuit();
        let bindings = BindingsArray::from(vec![0.1, 0.2]);
        let expander = ParameterBindingExpander::new(&circuit, &bindings).unwrap();
        let values = expander.values_at(0);
        assert_eq!(values["a"], 0.1);
        assert_eq!(values["b"], 0.2);
    }

    #[test]
    fn test_named_values_are_reordered() {
        let circuit = two_parameter_circuit();
        let bindings = BindingsArray::from_named_values([("b", 0.2), ("a", 0.1)]).unwrap();
        let expander = ParameterBindingExpander::new(&circuit, &bindings).unwrap();
        assert_eq!(expander.values_at(0)["a"], 0.1);

        let bindings = BindingsArray::from_named_values([("b", 0.2), ("c", 0.1)]).unwrap();
        let err = ParameterBindingExpander::new(&circuit, &bindings).unwrap_err();
        assert!(matches!(err, PrimitiveError::UnknownParameter(name) if name == "c"));

        assert!(BindingsArray::from_named_values([("a", 0.2), ("a", 0.1)]).is_err());
    }

    #[test]
    fn test_expansion_is_row_major_and_exact_size() {
        let circuit = two_parameter_circuit();
        let values = array![[[0.0, 0.0], [0.0, 1.0]], [[1.0, 0.0], [1.0, 1.0]]].into_dyn();
        let bindings = BindingsArray::new(values).unwrap();
        assert_eq!(bindings.shape(), &[2, 2]);

        let mut expander = ParameterBindingExpander::new(&circuit, &bindings).unwrap();
        assert_eq!(expander.len(), 4);
        let firsts: Vec<_> = (0..4).map(|i| expander.values_at(i)["a"]).collect();
        assert_eq!(firsts, vec![0.0, 0.0, 1.0, 1.0]);
        assert!(expander.all(|c| c.unwrap().num_parameters() == 0));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(BindingsArray::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
        let bindings = BindingsArray::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(bindings.to_array().unwrap(), array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
    }
}
