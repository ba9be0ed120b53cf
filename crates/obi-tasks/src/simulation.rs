//! Simulation campaigns
//!
//! [`SimulationsForm`] sweeps simulation conditions and stimuli; each of
//! its coordinates is a `Simulation` whose generate hook writes a
//! `simulation_config.json` into the coordinate directory.

use indexmap::IndexMap;
use obi_model::{impl_block, Block, BlockError, BlockSlot, Form, Sweepable};
use obi_scan::output::write_json;
use obi_scan::{CoordinateHooks, ScanError, SingleCoordinate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use crate::stimulus::Stimulus;

/// File written by the generate hook
pub const SIMULATION_CONFIG_FILE: &str = "simulation_config.json";

/// Integration time step in ms
const TIME_STEP: f64 = 0.025;

/// Campaign description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Info {
    pub campaign_name: Sweepable<String>,
    pub campaign_description: Sweepable<String>,
}

impl_block!(Info { campaign_name, campaign_description });

/// Simulation conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct SimulationsInitialize {
    /// Circuit to simulate
    pub circuit: Sweepable<String>,
    /// Simulated time in ms
    pub simulation_length: Sweepable<f64>,
    /// Extracellular calcium concentration in mM
    pub extracellular_calcium: Sweepable<f64>,
    /// Initial membrane potential in mV
    pub v_init: Sweepable<f64>,
    /// Seed of the simulator's random streams
    pub random_seed: Sweepable<i64>,
}

fn check_initialize(block: &SimulationsInitialize) -> Result<(), BlockError> {
    match block.simulation_length.resolved() {
        Some(length) if *length <= 0.0 => Err(BlockError::constraint(
            block,
            "simulation_length",
            format!("{length} must be positive"),
        )),
        _ => Ok(()),
    }
}

impl_block!(SimulationsInitialize {
    circuit,
    simulation_length,
    extracellular_calcium,
    v_init,
    random_seed,
} validate: check_initialize);

/// Simulation campaign form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct SimulationsForm {
    pub initialize: SimulationsInitialize,
    #[serde(default)]
    pub stimuli: IndexMap<String, Stimulus>,
    pub info: Info,
}

impl Form for SimulationsForm {
    const TYPE_NAME: &'static str = "SimulationsForm";
    const SINGLE_TYPE_NAME: &'static str = "Simulation";

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
                    .map(|(key, stimulus)| (key.as_str(), stimulus as &dyn Block))
                    .collect(),
            },
            BlockSlot::Block {
                name: "info",
                block: &self.info,
            },
        ]
    }
}

impl SimulationsForm {
    /// Simulator configuration of a resolved form
    #[must_use]
    pub fn simulation_config(&self) -> JsonValue {
        let inputs: Map<String, JsonValue> = self
            .stimuli
            .iter()
            .map(|(name, stimulus)| (name.clone(), stimulus.to_input()))
            .collect();

        json!({
            "version": 1,
            "network": self.initialize.circuit,
            "run": {
                "dt": TIME_STEP,
                "tstop": self.initialize.simulation_length,
                "random_seed": self.initialize.random_seed,
            },
            "conditions": {
                "extracellular_calcium": self.initialize.extracellular_calcium,
                "v_init": self.initialize.v_init,
            },
            "inputs": inputs,
            "output": {
                "output_dir": "output",
                "spikes_file": "spikes.h5",
            },
        })
    }
}

impl CoordinateHooks for SimulationsForm {
    fn generate(coordinate: &SingleCoordinate<Self>) -> Result<(), ScanError> {
        let path = coordinate.coordinate_output_root().join(SIMULATION_CONFIG_FILE);
        debug!(idx = coordinate.idx(), path = %path.display(), "writing simulation config");
        write_json(&path, &coordinate.config().simulation_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::SynchronousSingleSpikeStimulus;
    use obi_scan::{CoupledScan, ExecutionMode, GridScan};
    use pretty_assertions::assert_eq;

    fn form() -> SimulationsForm {
        let mut stimuli = IndexMap::new();
        stimuli.insert(
            "s1".to_string(),
            Stimulus::from(SynchronousSingleSpikeStimulus {
                timestamp: Sweepable::Resolved(0.0),
                spike_probability: Sweepable::Swept(vec![0.1, 0.5, 0.9]),
                source_neuron_set: Sweepable::Resolved("L4_SSC".into()),
            }),
        );
        SimulationsForm {
            initialize: SimulationsInitialize {
                circuit: Sweepable::Resolved("circuit_config.json".into()),
                simulation_length: Sweepable::Swept(vec![1000.0, 2000.0]),
                extracellular_calcium: Sweepable::Resolved(1.1),
                v_init: Sweepable::Resolved(-80.0),
                random_seed: Sweepable::Resolved(1),
            },
            stimuli,
            info: Info {
                campaign_name: Sweepable::Resolved("calcium".into()),
                campaign_description: Sweepable::Resolved(String::new()),
            },
        }
    }

    #[test]
    fn discovery_follows_declaration_order() {
        let names: Vec<_> = form()
            .multiple_value_parameters()
            .iter()
            .map(|p| p.location.to_string())
            .collect();
        assert_eq!(names, vec!["initialize.simulation_length", "stimuli.s1.spike_probability"]);
    }

    #[test]
    fn generate_writes_simulation_configs() {
        let dir = tempfile::tempdir().unwrap();
        let scan = GridScan::new(form(), dir.path());
        let summary = scan.execute(ExecutionMode::Generate).unwrap();
        assert_eq!(summary.coordinate_count, 6);

        let path = dir
            .path()
            .join("initialize.simulation_length=2000.0/stimuli.s1.spike_probability=0.9")
            .join(SIMULATION_CONFIG_FILE);
        let config: JsonValue = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(config["run"]["tstop"], 2000.0);
        assert_eq!(config["inputs"]["s1"]["spike_probability"], 0.9);
        assert_eq!(config["conditions"]["v_init"], -80.0);
    }

    #[test]
    fn run_is_not_implemented() {
        let dir = tempfile::tempdir().unwrap();
        let scan = GridScan::new(form(), dir.path());
        let err = scan.execute(ExecutionMode::Run).unwrap_err();
        assert!(matches!(err, ScanError::NotImplemented { type_name: "Simulation", .. }));
    }

    #[test]
    fn non_positive_length_fails_cast() {
        let mut form = form();
        form.initialize.simulation_length = Sweepable::Swept(vec![100.0, 0.0, 200.0]);
        let scan = CoupledScan::new(form, "/scan");
        assert_eq!(scan.coordinate_parameters().unwrap().len(), 3);

        let err = scan.coordinate_instances().unwrap_err();
        assert!(matches!(err, ScanError::CoordinateValidation { idx: 1, .. }));
        assert!(err.to_string().contains("SimulationsInitialize.simulation_length"));
    }

    #[test]
    fn coordinate_keeps_stimulus_variant() {
        let scan = GridScan::new(form(), "/scan");
        let coordinate = &scan.coordinate_instances().unwrap()[1];
        assert!(matches!(
            coordinate.config().stimuli["s1"],
            Stimulus::SynchronousSingleSpikeStimulus(ref s) if s.spike_probability == Sweepable::Resolved(0.5)
        ));
    }
}
