//! OBI Model
//!
//! Schema layer of the scan engine: configuration blocks and forms whose
//! fields may sweep over several values.
//!
//! # Core Concepts
//!
//! - [`Sweepable<T>`]: a field that is either resolved or swept
//! - [`Block`]: leaf configuration fragment with a declared field table
//! - [`Form`]: top-level configuration aggregating blocks and block collections
//! - [`MultiValueParameter`]: one swept field and its candidate values
//! - [`LocationPath`]: where a field lives, from the form root
//! - [`FieldEdit`] / [`apply_edits`]: functional update of a serialized form
//! - [`ContentHash`]: Blake3 fingerprint over canonical JSON
//!
//! # Example
//!
//! ```rust,ignore
//! use obi_model::{impl_block, Block, Sweepable};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(tag = "type")]
//! struct Initialize {
//!     simulation_length: Sweepable<f64>,
//! }
//!
//! impl_block!(Initialize { simulation_length });
//!
//! let init = Initialize { simulation_length: vec![1000.0, 2000.0].into() };
//! assert_eq!(init.multiple_value_parameters("initialize", "").len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod block;
mod edit;
mod form;
mod hash;
mod path;
mod value;

/// JSON key ordering and canonical rendering
pub mod json;

// Re-exports
pub use block::{Block, BlockError, MultiValueParameter, Polymorphic};
pub use edit::{apply_edits, EditError, FieldEdit};
pub use form::{BlockSlot, Form, FormError};
pub use hash::{ContentHash, HashError};
pub use path::{LocationPath, PathError};
pub use value::{ParamValue, ScanValue, SweepField, Sweepable};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
