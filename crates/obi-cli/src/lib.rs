//! OBI Launch
//!
//! Library half of the `obi-launch` executable.
//!
//! # Core Concepts
//!
//! - [`EntityStore`]: entity service holding configuration assets;
//!   [`LocalEntityStore`] keeps it on disk
//! - [`launch`]: fetch a configuration asset, recover its scan or single
//!   coordinate and execute it, tracking an optional activity
//! - [`JobLauncher`]: transport for submitting a launch as a remote job
//!
//! # Example
//!
//! ```rust,ignore
//! use obi_cli::{launch, LaunchArgs, LocalEntityStore};
//!
//! let store = LocalEntityStore::new("/data/entities");
//! let registry = obi_tasks::registry()?;
//! let report = launch(&args, &store, &registry)?;
//! ```

#![warn(unreachable_pub)]

pub mod cli;
mod error;
mod job;
mod launch;
mod store;

pub use error::ClientError;
pub use job::{submit_job, JobCallback, JobCode, JobLauncher, JobResources, JobResponse, JobSubmission, DEFAULT_TIME_LIMIT};
pub use launch::{launch, set_activity_status, ActivityStatus, LaunchArgs, LaunchReport, STATUS_ATTR};
pub use store::{Asset, Entity, EntityStore, LocalEntityStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
