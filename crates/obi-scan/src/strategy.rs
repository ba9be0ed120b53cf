//! Scan strategy trait
//!
//! A strategy turns the swept parameters of a form into the ordered list of
//! coordinates. [`Grid`](crate::Grid) takes the Cartesian product,
//! [`Coupled`](crate::Coupled) zips candidates position-wise.

use std::fmt::Debug;

use obi_model::MultiValueParameter;

use crate::coordinate::SingleCoordinateScanParams;
use crate::error::ScanError;

/// Enumeration of coordinates from swept parameters
///
/// Implementations must be deterministic: the same parameters always yield
/// the same coordinates in the same order, since coordinate indices and
/// output directories derive from that order.
pub trait ScanStrategy: Debug + Clone + Default + Send + Sync + 'static {
    /// Type tag of scans using this strategy
    const TYPE_NAME: &'static str;

    /// Coordinates for the given swept parameters
    ///
    /// With no swept parameters, exactly one coordinate labelled
    /// `default_label` is produced.
    ///
    /// # Errors
    /// Returns a configuration error if the parameters cannot be combined
    fn coordinate_parameters(
        &self,
        params: &[MultiValueParameter],
        default_label: &str,
    ) -> Result<Vec<SingleCoordinateScanParams>, ScanError>;
}
