//! Testing utilities for the OBI scan workspace
//!
//! Shared fixtures: a small form with one direct block and one block
//! collection, the scenario forms built from it, and temporary output roots.

#![allow(missing_docs)]

use indexmap::IndexMap;
use obi_model::{impl_block, Block, BlockError, BlockSlot, Form, Sweepable};
use obi_scan::{CoordinateHooks, ScanError, SingleCoordinate};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// Marker file written by [`ProbeForm`]'s generate hook
pub const GENERATED_FILE: &str = "generated.txt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct ProbeInitialize {
    pub param_a: Sweepable<i64>,
    pub label: Sweepable<String>,
}

impl_block!(ProbeInitialize { param_a, label });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct ProbeStimulus {
    pub probability: Sweepable<f64>,
    pub delay: Sweepable<f64>,
}

fn check_probability(block: &ProbeStimulus) -> Result<(), BlockError> {
    match block.probability.resolved() {
        Some(p) if !(0.0..=1.0).contains(p) => Err(BlockError::constraint(block, "probability", "must lie in [0, 1]")),
        _ => Ok(()),
    }
}

impl_block!(ProbeStimulus { probability, delay } validate: check_probability);

/// Form with an `initialize` block and a `stimuli` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct ProbeForm {
    pub initialize: ProbeInitialize,
    pub stimuli: IndexMap<String, ProbeStimulus>,
}

impl Form for ProbeForm {
    const TYPE_NAME: &'static str = "ProbeForm";
    const SINGLE_TYPE_NAME: &'static str = "Probe";

    fn block_slots(&self) -> Vec<BlockSlot<'_>> {
        vec![
            BlockSlot::Block {
                name: "initialize",
                block: &self.initialize,
            },
            BlockSlot::Collection {
                name: "stimuli",
                blocks: self
                    .stimuli
                    .iter()
                    .map(|(key, block)| (key.as_str(), block as &dyn Block))
                    .collect(),
            },
        ]
    }
}

impl CoordinateHooks for ProbeForm {
    fn generate(coordinate: &SingleCoordinate<Self>) -> Result<(), ScanError> {
        let path = coordinate.coordinate_output_root().join(GENERATED_FILE);
        std::fs::write(&path, coordinate.params().nested_coordinate_subpath_str.as_bytes())
            .map_err(|source| ScanError::io(&path, source))
    }
}

/// Form with the given `param_a` and `s1.probability` values
///
/// A single value is stored resolved, several as a sweep.
#[must_use]
pub fn probe_form(param_a: &[i64], probability: &[f64]) -> ProbeForm {
    let mut stimuli = IndexMap::new();
    stimuli.insert(
        "s1".to_string(),
        ProbeStimulus {
            probability: sweepable(probability),
            delay: Sweepable::Resolved(0.0),
        },
    );
    ProbeForm {
        initialize: ProbeInitialize {
            param_a: sweepable(param_a),
            label: Sweepable::Resolved("probe".to_string()),
        },
        stimuli,
    }
}

/// Two swept dimensions: `param_a = [1, 2]`, `probability = [0.1, 0.5, 0.9]`
#[must_use]
pub fn scenario_a_form() -> ProbeForm {
    probe_form(&[1, 2], &[0.1, 0.5, 0.9])
}

/// Nothing swept
#[must_use]
pub fn scenario_c_form() -> ProbeForm {
    probe_form(&[1], &[0.5])
}

fn sweepable<T: Clone>(values: &[T]) -> Sweepable<T> {
    match values {
        [single] => Sweepable::Resolved(single.clone()),
        many => Sweepable::Swept(many.to_vec()),
    }
}

/// Temporary directory for scan output
///
/// # Panics
/// Panics if the directory cannot be created
#[must_use]
pub fn output_root() -> TempDir {
    tempfile::tempdir().expect("create temporary output root")
}
