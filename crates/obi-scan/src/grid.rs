//! Grid strategy: full Cartesian product
//!
//! Earlier dimensions vary slower: with `a = [1, 2]` and `b = [x, y]` the
//! coordinates are `(1, x), (1, y), (2, x), (2, y)`.

use itertools::Itertools;
use obi_model::{FieldEdit, MultiValueParameter};

use crate::coordinate::SingleCoordinateScanParams;
use crate::error::ScanError;
use crate::strategy::ScanStrategy;

/// Cartesian product over all swept parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grid;

impl ScanStrategy for Grid {
    const TYPE_NAME: &'static str = "GridScan";

    fn coordinate_parameters(
        &self,
        params: &[MultiValueParameter],
        default_label: &str,
    ) -> Result<Vec<SingleCoordinateScanParams>, ScanError> {
        if params.is_empty() {
            return Ok(vec![SingleCoordinateScanParams::unswept(default_label)]);
        }

        Ok(params
            .iter()
            .map(|param| {
                param
                    .values
                    .iter()
                    .map(|value| FieldEdit::new(param.location.clone(), value.clone()))
                    .collect::<Vec<_>>()
            })
            .multi_cartesian_product()
            .map(SingleCoordinateScanParams::new)
            .collect())
    }
}
