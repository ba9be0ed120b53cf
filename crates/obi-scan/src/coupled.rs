//! Coupled strategy: position-wise zip
//!
//! Every swept parameter must have the same number of candidates `n`;
//! coordinate `i` takes the `i`-th candidate of each.

use obi_model::{FieldEdit, MultiValueParameter};

use crate::coordinate::SingleCoordinateScanParams;
use crate::error::ScanError;
use crate::strategy::ScanStrategy;

/// Zipped enumeration over swept parameters of equal length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coupled;

impl ScanStrategy for Coupled {
    const TYPE_NAME: &'static str = "CoupledScan";

    fn coordinate_parameters(
        &self,
        params: &[MultiValueParameter],
        default_label: &str,
    ) -> Result<Vec<SingleCoordinateScanParams>, ScanError> {
        let Some(reference) = params.first() else {
            return Ok(vec![SingleCoordinateScanParams::unswept(default_label)]);
        };

        let expected = reference.len();
        if let Some(mismatch) = params.iter().find(|param| param.len() != expected) {
            return Err(ScanError::CoupledLengthMismatch {
                reference: reference.location.clone(),
                expected,
                location: mismatch.location.clone(),
                found: mismatch.len(),
            });
        }

        Ok((0..expected)
            .map(|i| {
                params
                    .iter()
                    .map(|param| FieldEdit::new(param.location.clone(), param.values[i].clone()))
                    .collect()
            })
            .map(SingleCoordinateScanParams::new)
            .collect())
    }
}
