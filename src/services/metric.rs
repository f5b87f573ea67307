//! Joint position error between a reference capture and a comparison capture
//!
//! MPJPE: mean over joints of the Euclidean distance between joint `i` of
//! the reference and joint `i` of the comparison. Correspondence is
//! positional; no matching or outlier rejection happens here.

use crate::domain::joints::{JointError, JointSet, JointTextError};
use crate::domain::types::Point3;
use crate::services::path_resolver::{ExercisePaths, PREDICTION_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use crate::domain::joints::reshape_to_joints;

#[inline]
pub fn euclidean_distance(a: &Point3, b: &Point3) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

pub fn mean_per_joint_position_error(
    reference: &JointSet,
    comparison: &JointSet,
) -> Result<f64, JointError> {
    if reference.len() != comparison.len() {
        return Err(JointError::DimensionMismatch {
            reference: reference.len(),
            comparison: comparison.len(),
        });
    }
    if reference.is_empty() {
        return Err(JointError::Empty);
    }

    let total: f64 =
        reference.iter().zip(comparison.iter()).map(|(r, c)| euclidean_distance(r, c)).sum();
    Ok(total / reference.len() as f64)
}

/// Integer form submitted to the metric sink
#[inline]
pub fn ceil_metric(mpjpe: f64) -> i64 {
    mpjpe.ceil() as i64
}

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("failed to read joints from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid joints file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: JointTextError,
    },
    #[error(transparent)]
    Joint(#[from] JointError),
}

/// Computes MPJPE from joint files on disk
#[derive(Debug, Clone)]
pub struct MetricCalculator {
    joint_count: usize,
}

impl MetricCalculator {
    pub fn new(joint_count: usize) -> Self {
        Self { joint_count }
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count
    }

    /// Load joints from a file, or from `prediction.txt` inside a capture directory
    pub fn load_joints(&self, path: &Path) -> Result<JointSet, MetricError> {
        let file = if path.is_dir() { path.join(PREDICTION_FILE) } else { path.to_path_buf() };
        let text = fs::read_to_string(&file)
            .map_err(|source| MetricError::Read { path: file.clone(), source })?;
        let joints = JointSet::from_text(&text, self.joint_count)
            .map_err(|source| MetricError::Parse { path: file.clone(), source })?;
        debug!(path = %file.display(), joints = %joints.len(), "joints_loaded");
        Ok(joints)
    }

    /// MPJPE between two stored predictions
    pub fn compare(&self, reference: &Path, comparison: &Path) -> Result<f64, MetricError> {
        let reference_joints = self.load_joints(reference)?;
        let comparison_joints = self.load_joints(comparison)?;
        let mpjpe = mean_per_joint_position_error(&reference_joints, &comparison_joints)?;

        info!(
            reference = %reference.display(),
            comparison = %comparison.display(),
            mpjpe = %mpjpe,
            "metric_calculated"
        );
        Ok(mpjpe)
    }

    /// MPJPE of a stored follow-up against its exercise's gold standard
    pub fn compare_exercise(
        &self,
        paths: &ExercisePaths,
        exercise: &str,
        stamp: &str,
    ) -> Result<f64, MetricError> {
        self.compare(&paths.reference_dir(exercise), &paths.follow_up_dir(exercise, stamp))
    }

    /// MPJPE of in-memory joints against a stored reference
    pub fn compare_to_reference(
        &self,
        reference: &Path,
        comparison: &JointSet,
    ) -> Result<f64, MetricError> {
        let reference_joints = self.load_joints(reference)?;
        Ok(mean_per_joint_position_error(&reference_joints, comparison)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE_POINTS: [Point3; 5] = [
        [0.0, 0.0, 0.0],
        [1.5, -2.25, 3.0],
        [-100.0, 42.0, 0.001],
        [1e6, -1e-6, 7.0],
        [0.1, 0.2, 0.3],
    ];

    #[test]
    fn test_distance_to_self_is_zero() {
        for p in &SAMPLE_POINTS {
            assert_eq!(euclidean_distance(p, p), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        for a in &SAMPLE_POINTS {
            for b in &SAMPLE_POINTS {
                assert_eq!(euclidean_distance(a, b), euclidean_distance(b, a));
            }
        }
    }

    #[test]
    fn test_distance_345() {
        assert_eq!(euclidean_distance(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]), 5.0);
    }

    #[test]
    fn test_mpjpe_single_joint() {
        let reference = JointSet::new(vec![[0.0, 0.0, 0.0]]);
        let comparison = JointSet::new(vec![[3.0, 4.0, 0.0]]);
        assert_eq!(mean_per_joint_position_error(&reference, &comparison).unwrap(), 5.0);
    }

    #[test]
    fn test_mpjpe_is_mean_of_distances() {
        let reference = JointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 2.0, 0.0]]);
        let comparison = JointSet::new(vec![[3.0, 4.0, 0.0], [6.0, 14.0, 0.0]]);
        assert_eq!(mean_per_joint_position_error(&reference, &comparison).unwrap(), 9.0);
    }

    #[test]
    fn test_mpjpe_dimension_mismatch() {
        let reference = JointSet::new(vec![[0.0, 0.0, 0.0]]);
        let comparison = JointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        assert_eq!(
            mean_per_joint_position_error(&reference, &comparison).unwrap_err(),
            JointError::DimensionMismatch { reference: 1, comparison: 2 }
        );
    }

    #[test]
    fn test_mpjpe_empty() {
        let empty = JointSet::default();
        assert_eq!(mean_per_joint_position_error(&empty, &empty).unwrap_err(), JointError::Empty);
    }

    #[test]
    fn test_ceil_metric() {
        assert_eq!(ceil_metric(9.0), 9);
        assert_eq!(ceil_metric(9.01), 10);
        assert_eq!(ceil_metric(0.0), 0);
    }

    #[test]
    fn test_calculator_from_files() {
        let dir = tempdir().unwrap();
        let reference_dir = dir.path().join("gold");
        fs::create_dir_all(&reference_dir).unwrap();
        fs::write(reference_dir.join(PREDICTION_FILE), "0 0 0\n1 2 0\n").unwrap();

        let comparison_file = dir.path().join("follow.txt");
        fs::write(&comparison_file, "3 4 0 6 14 0").unwrap();

        let calculator = MetricCalculator::new(2);
        assert_eq!(calculator.compare(&reference_dir, &comparison_file).unwrap(), 9.0);

        let joints = JointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 2.0, 0.0]]);
        assert_eq!(calculator.compare_to_reference(&reference_dir, &joints).unwrap(), 0.0);
    }

    #[test]
    fn test_calculator_exercise_layout() {
        let dir = tempdir().unwrap();
        let paths = ExercisePaths::new(dir.path());

        let reference = paths.reference_dir("extension");
        let follow_up = paths.follow_up_dir("extension", "2022-03-21T10.00.00");
        fs::create_dir_all(&reference).unwrap();
        fs::create_dir_all(&follow_up).unwrap();
        fs::write(reference.join(PREDICTION_FILE), "0 0 0\n").unwrap();
        fs::write(follow_up.join(PREDICTION_FILE), "3 4 0\n").unwrap();

        let calculator = MetricCalculator::new(1);
        let mpjpe = calculator.compare_exercise(&paths, "extension", "2022-03-21T10.00.00").unwrap();
        assert_eq!(mpjpe, 5.0);
    }

    #[test]
    fn test_calculator_errors() {
        let dir = tempdir().unwrap();
        let calculator = MetricCalculator::new(14);

        let missing = dir.path().join("missing.txt");
        assert!(matches!(calculator.load_joints(&missing), Err(MetricError::Read { .. })));

        let short = dir.path().join("short.txt");
        fs::write(&short, "1 2 3 4 5 6").unwrap();
        assert!(matches!(
            calculator.load_joints(&short),
            Err(MetricError::Parse { source: JointTextError::Joint(JointError::Shape { .. }), .. })
        ));
    }
}
