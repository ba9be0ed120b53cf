//! OBI Scan
//!
//! Grid and coupled parameter scans over [`obi_model::Form`]s.
//!
//! # Core Concepts
//!
//! - [`ScanStrategy`]: turns swept parameters into coordinates
//! - [`Grid`] / [`Coupled`]: Cartesian product and position-wise zip
//! - [`Scan`]: a form, an output root and a strategy; memoizes discovery,
//!   coordinates and materialized single coordinates
//! - [`SingleCoordinate`]: one fully resolved form with its output directory
//! - [`CoordinateHooks`]: `generate`/`run` lifecycle of a single coordinate
//! - [`TypeRegistry`]: recovers scans and coordinates from their type tags
//! - [`CampaignConfig`]: bookkeeping document for workflow tooling
//!
//! # Example
//!
//! ```rust,ignore
//! use obi_scan::{ExecutionMode, GridScan, TypeRegistry};
//!
//! let scan = GridScan::new(form, "/tmp/scan");
//! scan.display_coordinate_parameters()?;
//! scan.execute(ExecutionMode::Generate)?;
//!
//! // Later, from the written file
//! let mut registry = TypeRegistry::new();
//! registry.register_form::<SimulationsForm>()?;
//! let task = registry.load("/tmp/scan/obi_one_scan.json".as_ref())?;
//! ```

#![warn(unreachable_pub)]

// Core modules
mod campaign;
mod coordinate;
mod coupled;
mod error;
mod grid;
mod registry;
mod scan;
mod settings;
mod strategy;

/// Reading and writing scan documents
pub mod output;

// Re-exports
pub use campaign::{CampaignAttrs, CampaignConfig, CampaignEntry};
pub use coordinate::{
    CoordinateDirectoryOption, CoordinateHooks, ExecutionMode, SingleCoordinate, SingleCoordinateScanParams,
};
pub use coupled::Coupled;
pub use error::{RegistryError, ScanError};
pub use grid::Grid;
pub use registry::{ScanTask, TypeRegistry};
pub use scan::{CoupledScan, ExecutionSummary, GridScan, Scan};
pub use settings::{
    ScanSettings, CAMPAIGN_FILE_NAME, COORDINATE_FILE_NAME, DEFAULT_COORDINATE_LABEL, SCAN_FILE_NAME,
};
pub use strategy::ScanStrategy;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
