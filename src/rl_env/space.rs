use std::fmt;

use crate::error::{Result, RlError};

/// Structural description of an observation or action domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    /// Continuous box, bounds are per element in row-major order.
    Box {
        low: Vec<f64>,
        high: Vec<f64>,
        shape: Vec<usize>,
    },
    /// Integers in `0..n`.
    Discrete { n: usize },
}

impl Space {
    /// One dimensional box with the same bounds on every element.
    pub fn uniform_box(low: f64, high: f64, dim: usize) -> Self {
        Space::Box {
            low: vec![low; dim],
            high: vec![high; dim],
            shape: vec![dim],
        }
    }

    /// One dimensional box with per element bounds.
    pub fn bounded_box(low: Vec<f64>, high: Vec<f64>) -> Result<Self> {
        if low.len() != high.len() {
            return Err(RlError::shape_mismatch("box bounds", &[low.len()], &[high.len()]));
        }
        let shape = vec![low.len()];
        Ok(Space::Box { low, high, shape })
    }

    /// Same as [`Space::bounded_box`] for bounds whose lengths are fixed at compile time.
    pub fn fixed_box<const N: usize>(low: [f64; N], high: [f64; N]) -> Self {
        Space::Box {
            low: low.to_vec(),
            high: high.to_vec(),
            shape: vec![N],
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Space::Box { shape, .. } => shape.clone(),
            Space::Discrete { .. } => vec![],
        }
    }

    /// Number of values a flat vector needs to hold one element of the space.
    pub fn flat_dim(&self) -> usize {
        match self {
            Space::Box { shape, .. } => shape.iter().product(),
            Space::Discrete { .. } => 1,
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, Space::Discrete { .. })
    }

    pub fn contains(&self, value: &[f64]) -> bool {
        match self {
            Space::Box { low, high, .. } => {
                value.len() == low.len()
                    && value
                        .iter()
                        .zip(low.iter().zip(high.iter()))
                        .all(|(v, (l, h))| *l <= *v && *v <= *h)
            }
            Space::Discrete { n } => {
                value.len() == 1 && value[0].fract() == 0.0 && value[0] >= 0.0 && (value[0] as usize) < *n
            }
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Box { shape, .. } => write!(f, "Box(shape={:?})", shape),
            Space::Discrete { n } => write!(f, "Discrete({})", n),
        }
    }
}
