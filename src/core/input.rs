//! Input adapter for three-component configuration vectors.
//!
//! Box size and periodic flags arrive either as plain sequences or as shaped arrays (the
//! Python binding hands over NumPy arrays with their shape). Both are normalised here to a
//! `[T; 3]` before anything is stored.

use crate::core::particle::DIM;
use crate::error::{Error, Result};

/// A closed set of accepted input shapes for 3-vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayLike<T> {
    /// Flat sequence; must have exactly three elements.
    Sequence(Vec<T>),
    /// Row-major array with an explicit shape. Accepted when squeezing away all axes of
    /// length one leaves a single axis of length three.
    Array { shape: Vec<usize>, data: Vec<T> },
}

impl<T: Copy> ArrayLike<T> {
    /// Validate the shape and return the three components.
    ///
    /// `what` names the quantity in error messages (e.g. "box_size").
    pub fn into_vec3(self, what: &str) -> Result<[T; DIM]> {
        let data = match self {
            ArrayLike::Sequence(data) => data,
            ArrayLike::Array { shape, data } => {
                let expected: usize = shape.iter().product();
                if expected != data.len() {
                    return Err(Error::config(format!(
                        "{what}: array shape {shape:?} does not match {} elements",
                        data.len()
                    )));
                }
                let squeezed: Vec<usize> = shape.iter().copied().filter(|&n| n != 1).collect();
                if squeezed.len() != 1 {
                    return Err(Error::config(format!(
                        "invalid shape for {what}: {shape:?} does not squeeze to one dimension"
                    )));
                }
                data
            }
        };
        if data.len() != DIM {
            return Err(Error::config(format!(
                "invalid length for {what}: length can only be {DIM} but was {}",
                data.len()
            )));
        }
        Ok([data[0], data[1], data[2]])
    }

    /// Element-wise conversion, keeping the shape.
    pub fn map<U>(self, f: impl Fn(T) -> U) -> ArrayLike<U> {
        match self {
            ArrayLike::Sequence(data) => ArrayLike::Sequence(data.into_iter().map(f).collect()),
            ArrayLike::Array { shape, data } => ArrayLike::Array {
                shape,
                data: data.into_iter().map(f).collect(),
            },
        }
    }
}

impl ArrayLike<f64> {
    /// Boolean coercion for numeric input: non-zero is `true`.
    pub fn truthy(self) -> ArrayLike<bool> {
        self.map(|x| x != 0.0)
    }
}

impl<T> From<Vec<T>> for ArrayLike<T> {
    fn from(data: Vec<T>) -> Self {
        ArrayLike::Sequence(data)
    }
}

impl<T: Copy> From<&[T]> for ArrayLike<T> {
    fn from(data: &[T]) -> Self {
        ArrayLike::Sequence(data.to_vec())
    }
}

impl<T: Copy, const N: usize> From<[T; N]> for ArrayLike<T> {
    fn from(data: [T; N]) -> Self {
        ArrayLike::Sequence(data.to_vec())
    }
}

impl<T> From<(T, T, T)> for ArrayLike<T> {
    fn from((a, b, c): (T, T, T)) -> Self {
        ArrayLike::Sequence(vec![a, b, c])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_of_three_accepted() -> Result<()> {
        assert_eq!(ArrayLike::from(vec![1.0, 2.0, 3.0]).into_vec3("v")?, [1.0, 2.0, 3.0]);
        assert_eq!(ArrayLike::from((true, false, true)).into_vec3("v")?, [true, false, true]);
        assert_eq!(ArrayLike::from([4, 5, 6]).into_vec3("v")?, [4, 5, 6]);
        Ok(())
    }

    #[test]
    fn wrong_lengths_rejected() {
        for data in [vec![], vec![1.0], vec![1.0, 2.0], vec![1.0, 2.0, 3.0, 4.0]] {
            let err = ArrayLike::from(data).into_vec3("box_size").unwrap_err();
            assert!(matches!(err, Error::InvalidConfiguration(_)));
            assert!(err.to_string().contains("box_size"));
        }
    }

    #[test]
    fn squeezable_arrays_accepted() -> Result<()> {
        let shapes = [vec![3], vec![1, 3], vec![3, 1], vec![1, 1, 3, 1]];
        for shape in shapes {
            let arr = ArrayLike::Array {
                shape,
                data: vec![1.0, 3.6, 7.0],
            };
            assert_eq!(arr.into_vec3("box_size")?, [1.0, 3.6, 7.0]);
        }
        Ok(())
    }

    #[test]
    fn non_squeezable_arrays_rejected() {
        let cases = [
            (vec![3, 3], vec![0.0; 9]),
            (vec![1, 1], vec![0.0]),
            (vec![], vec![5.0]),
            (vec![4], vec![0.0; 4]),
            (vec![3], vec![0.0; 2]),
        ];
        for (shape, data) in cases {
            let err = ArrayLike::Array { shape, data }.into_vec3("periodic").unwrap_err();
            assert!(matches!(err, Error::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn numeric_input_coerces_to_bool() -> Result<()> {
        let arr = ArrayLike::Array {
            shape: vec![1, 3],
            data: vec![1.0, 0.0, -2.5],
        };
        assert_eq!(arr.truthy().into_vec3("periodic")?, [true, false, true]);
        Ok(())
    }
}
