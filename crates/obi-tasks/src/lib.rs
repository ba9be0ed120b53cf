//! OBI Tasks
//!
//! Concrete scan forms:
//!
//! - [`SimulationsForm`] (single coordinate `Simulation`): simulation
//!   conditions and a collection of [`Stimulus`] blocks; `generate` writes a
//!   simulator configuration per coordinate
//! - [`MorphologyMetricsScanConfig`] (single coordinate `MorphologyMetrics`):
//!   `run` computes morphology metrics through a [`MorphologyAnalysis`]
//!   backend
//!
//! [`registry`] returns a [`TypeRegistry`] knowing both forms.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod morphology;
mod simulation;
mod stats;
mod stimulus;

pub use morphology::{
    run_metrics, AnalysisError, MetricReport, MetricValue, MorphologyAnalysis, MorphologyMetricsInitialize,
    MorphologyMetricsReport, MorphologyMetricsScanConfig, SwcAnalysis, MORPHOLOGY_METRICS_FILE, REQUESTED_METRICS,
};
pub use simulation::{Info, SimulationsForm, SimulationsInitialize, SIMULATION_CONFIG_FILE};
pub use stats::SummaryStatistics;
pub use stimulus::{ConstantCurrentClampSomaticStimulus, PoissonSpikeStimulus, Stimulus, SynchronousSingleSpikeStimulus};

use obi_scan::{RegistryError, TypeRegistry};

/// Register every form of this crate
///
/// # Errors
/// Returns [`RegistryError::Duplicate`] if a form is already registered
pub fn register(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
    registry
        .register_form::<SimulationsForm>()?
        .register_form::<MorphologyMetricsScanConfig>()?;
    Ok(())
}

/// Registry knowing every form of this crate
///
/// # Errors
/// Returns [`RegistryError::Duplicate`] if two forms share a type tag
pub fn registry() -> Result<TypeRegistry, RegistryError> {
    let mut registry = TypeRegistry::new();
    register(&mut registry)?;
    Ok(registry)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
