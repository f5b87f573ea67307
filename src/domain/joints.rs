//! Hand joint coordinates as produced by the joint predictor

use crate::domain::types::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of hand joints returned by the predictor
pub const DEFAULT_JOINT_COUNT: usize = 14;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JointError {
    #[error("joint sets differ in length: reference has {reference}, comparison has {comparison}")]
    DimensionMismatch { reference: usize, comparison: usize },
    #[error("cannot reshape {len} values into {joints} joints of 3 coordinates")]
    Shape { len: usize, joints: usize },
    #[error("joint sets are empty")]
    Empty,
}

/// Ordered, index-aligned joint positions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointSet(Vec<Point3>);

impl JointSet {
    pub fn new(points: Vec<Point3>) -> Self {
        Self(points)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> &[Point3] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3> {
        self.0.iter()
    }

    /// Flatten back to `[x0, y0, z0, x1, ...]`
    pub fn to_flat(&self) -> Vec<f64> {
        self.0.iter().flat_map(|p| p.iter().copied()).collect()
    }

    /// Parse whitespace separated numbers (any line layout) into `joints` joints
    pub fn from_text(text: &str, joints: usize) -> Result<Self, JointTextError> {
        let flat = text
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| JointTextError::Number(token.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reshape_to_joints(&flat, joints)?)
    }

    /// One joint per line, `x y z`
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 48);
        for [x, y, z] in &self.0 {
            out.push_str(&format!("{:.6} {:.6} {:.6}\n", x, y, z));
        }
        out
    }
}

impl From<Vec<Point3>> for JointSet {
    fn from(points: Vec<Point3>) -> Self {
        Self(points)
    }
}

#[derive(Debug, Error)]
pub enum JointTextError {
    #[error("invalid number '{0}'")]
    Number(String),
    #[error(transparent)]
    Joint(#[from] JointError),
}

/// Group a flat `3 * joints` sequence into ordered 3-tuples (row-major)
pub fn reshape_to_joints(flat: &[f64], joints: usize) -> Result<JointSet, JointError> {
    if flat.len() % 3 != 0 || flat.len() != joints * 3 {
        return Err(JointError::Shape { len: flat.len(), joints });
    }

    let points = flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
    Ok(JointSet(points))
}
