//! Experiment plan: the ordered matrix of capture conditions for one subject

use crate::domain::types::{CaptureType, HandSide, LightSetup};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("subject id is empty")]
    EmptySubject,
    #[error("plan has no setups")]
    NoSetups,
    #[error("setup {light_setup}/{distance_cm}cm has no iterations")]
    NoIterations { light_setup: LightSetup, distance_cm: u32 },
    #[error("setup {light_setup}/{distance_cm}cm has an iteration with zero repetitions")]
    ZeroRepetitions { light_setup: LightSetup, distance_cm: u32 },
}

/// One capture unit inside a setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Iteration {
    pub capture_type: CaptureType,
    pub repetitions: u32,
    pub hand_side: HandSide,
}

impl Iteration {
    pub fn new(capture_type: CaptureType, repetitions: u32, hand_side: HandSide) -> Self {
        Self { capture_type, repetitions, hand_side }
    }
}

/// A (light setup, distance) pair and the iterations run under it
#[derive(Debug, Clone, PartialEq)]
pub struct SetupEntry {
    pub light_setup: LightSetup,
    pub distance_cm: u32,
    pub iterations: Vec<Iteration>,
}

/// Immutable, validated plan. Traversal order is the order of `entries`,
/// then the order of each entry's iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPlan {
    subject_id: String,
    entries: Vec<SetupEntry>,
}

impl ExperimentPlan {
    pub fn new(subject_id: impl Into<String>, entries: Vec<SetupEntry>) -> Result<Self, PlanError> {
        let subject_id = subject_id.into();
        if subject_id.trim().is_empty() {
            return Err(PlanError::EmptySubject);
        }
        if entries.is_empty() {
            return Err(PlanError::NoSetups);
        }
        for entry in &entries {
            if entry.iterations.is_empty() {
                return Err(PlanError::NoIterations {
                    light_setup: entry.light_setup,
                    distance_cm: entry.distance_cm,
                });
            }
            if entry.iterations.iter().any(|it| it.repetitions == 0) {
                return Err(PlanError::ZeroRepetitions {
                    light_setup: entry.light_setup,
                    distance_cm: entry.distance_cm,
                });
            }
        }
        Ok(Self { subject_id, entries })
    }

    /// Light setups outermost, then distances; every pair shares `iterations`
    pub fn grid(
        subject_id: impl Into<String>,
        light_setups: &[LightSetup],
        distances_cm: &[u32],
        iterations: &[Iteration],
    ) -> Result<Self, PlanError> {
        let entries = light_setups
            .iter()
            .flat_map(|&light_setup| {
                distances_cm.iter().map(move |&distance_cm| SetupEntry {
                    light_setup,
                    distance_cm,
                    iterations: iterations.to_vec(),
                })
            })
            .collect();
        Self::new(subject_id, entries)
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn entries(&self) -> &[SetupEntry] {
        &self.entries
    }

    /// Every (setup, iteration) pair in traversal order
    pub fn subsessions(&self) -> impl Iterator<Item = (&SetupEntry, &Iteration)> {
        self.entries.iter().flat_map(|entry| entry.iterations.iter().map(move |it| (entry, it)))
    }

    pub fn subsession_count(&self) -> usize {
        self.entries.iter().map(|e| e.iterations.len()).sum()
    }
}
