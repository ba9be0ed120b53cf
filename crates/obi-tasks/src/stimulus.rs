//! Stimulus blocks
//!
//! [`Stimulus`] is the polymorphic union stored in a simulation form's
//! `stimuli` collection. Its JSON form carries the variant name under
//! `type`, so a document always deserializes back to the same variant.

use obi_model::{impl_block, Block, BlockError, Polymorphic, SweepField, Sweepable};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Every source neuron spikes once, each with the given probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynchronousSingleSpikeStimulus {
    /// Spike time in ms
    pub timestamp: Sweepable<f64>,
    /// Probability that a neuron spikes
    pub spike_probability: Sweepable<f64>,
    /// Neuron set emitting the spikes
    pub source_neuron_set: Sweepable<String>,
}

impl_block!(SynchronousSingleSpikeStimulus { timestamp, spike_probability, source_neuron_set } validate: check_single_spike);

fn check_single_spike(block: &SynchronousSingleSpikeStimulus) -> Result<(), BlockError> {
    check_probability(block, "spike_probability", &block.spike_probability)?;
    check_non_negative(block, "timestamp", &block.timestamp)
}

/// Poisson spike trains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoissonSpikeStimulus {
    /// Start of the trains in ms
    pub start_time: Sweepable<f64>,
    /// Train duration in ms
    pub duration: Sweepable<f64>,
    /// Mean rate in Hz
    pub frequency: Sweepable<f64>,
    /// Neuron set emitting the spikes
    pub source_neuron_set: Sweepable<String>,
}

impl_block!(PoissonSpikeStimulus { start_time, duration, frequency, source_neuron_set } validate: check_poisson);

fn check_poisson(block: &PoissonSpikeStimulus) -> Result<(), BlockError> {
    check_non_negative(block, "start_time", &block.start_time)?;
    check_positive(block, "duration", &block.duration)?;
    check_positive(block, "frequency", &block.frequency)
}

/// Constant somatic current clamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantCurrentClampSomaticStimulus {
    /// Onset in ms
    pub start_time: Sweepable<f64>,
    /// Clamp duration in ms
    pub duration: Sweepable<f64>,
    /// Injected current in nA
    pub amplitude: Sweepable<f64>,
    /// Neuron set receiving the current
    pub neuron_set: Sweepable<String>,
}

impl_block!(ConstantCurrentClampSomaticStimulus { start_time, duration, amplitude, neuron_set } validate: check_current_clamp);

fn check_current_clamp(block: &ConstantCurrentClampSomaticStimulus) -> Result<(), BlockError> {
    check_non_negative(block, "start_time", &block.start_time)?;
    check_positive(block, "duration", &block.duration)
}

/// Any stimulus a simulation form accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stimulus {
    SynchronousSingleSpikeStimulus(SynchronousSingleSpikeStimulus),
    PoissonSpikeStimulus(PoissonSpikeStimulus),
    ConstantCurrentClampSomaticStimulus(ConstantCurrentClampSomaticStimulus),
}

impl Stimulus {
    fn block(&self) -> &dyn Block {
        match self {
            Self::SynchronousSingleSpikeStimulus(s) => s,
            Self::PoissonSpikeStimulus(s) => s,
            Self::ConstantCurrentClampSomaticStimulus(s) => s,
        }
    }

    /// Input section of a simulation config
    ///
    /// Only meaningful once every field is resolved; swept fields are
    /// written as their candidate lists.
    #[must_use]
    pub fn to_input(&self) -> JsonValue {
        match self {
            Self::SynchronousSingleSpikeStimulus(s) => json!({
                "input_type": "spikes",
                "module": "synapse_replay",
                "delay": s.timestamp,
                "spike_probability": s.spike_probability,
                "source": s.source_neuron_set,
            }),
            Self::PoissonSpikeStimulus(s) => json!({
                "input_type": "spikes",
                "module": "synapse_replay",
                "delay": s.start_time,
                "duration": s.duration,
                "frequency": s.frequency,
                "source": s.source_neuron_set,
            }),
            Self::ConstantCurrentClampSomaticStimulus(s) => json!({
                "input_type": "current_clamp",
                "module": "linear",
                "delay": s.start_time,
                "duration": s.duration,
                "amp_start": s.amplitude,
                "node_set": s.neuron_set,
            }),
        }
    }
}

impl From<SynchronousSingleSpikeStimulus> for Stimulus {
    fn from(s: SynchronousSingleSpikeStimulus) -> Self {
        Self::SynchronousSingleSpikeStimulus(s)
    }
}

impl From<PoissonSpikeStimulus> for Stimulus {
    fn from(s: PoissonSpikeStimulus) -> Self {
        Self::PoissonSpikeStimulus(s)
    }
}

impl From<ConstantCurrentClampSomaticStimulus> for Stimulus {
    fn from(s: ConstantCurrentClampSomaticStimulus) -> Self {
        Self::ConstantCurrentClampSomaticStimulus(s)
    }
}

impl Polymorphic for Stimulus {
    fn type_name(&self) -> &'static str {
        self.block().type_name()
    }
}

impl Block for Stimulus {
    fn sweep_fields(&self) -> Vec<(&'static str, &dyn SweepField)> {
        self.block().sweep_fields()
    }

    fn validate(&self) -> Result<(), BlockError> {
        self.block().validate()
    }
}

fn check_probability(block: &dyn Polymorphic, field: &str, value: &Sweepable<f64>) -> Result<(), BlockError> {
    match value.resolved() {
        Some(p) if !(0.0..=1.0).contains(p) => Err(BlockError::constraint(block, field, format!("{p} is not in [0, 1]"))),
        _ => Ok(()),
    }
}

fn check_positive(block: &dyn Polymorphic, field: &str, value: &Sweepable<f64>) -> Result<(), BlockError> {
    match value.resolved() {
        Some(x) if *x <= 0.0 => Err(BlockError::constraint(block, field, format!("{x} must be positive"))),
        _ => Ok(()),
    }
}

fn check_non_negative(block: &dyn Polymorphic, field: &str, value: &Sweepable<f64>) -> Result<(), BlockError> {
    match value.resolved() {
        Some(x) if *x < 0.0 => Err(BlockError::constraint(block, field, format!("{x} must not be negative"))),
        _ => Ok(()),
    }
}
