//! Forms: top-level scan configurations
//!
//! A form aggregates blocks directly and through named collections. Its
//! block slots, listed in declaration order, fix the order in which swept
//! parameters are discovered and therefore the enumeration order of a scan.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::block::{Block, BlockError, MultiValueParameter};
use crate::path::LocationPath;

/// One attribute of a form that holds blocks
pub enum BlockSlot<'a> {
    /// A block stored directly under the attribute
    Block {
        /// Attribute name
        name: &'static str,
        /// The block
        block: &'a dyn Block,
    },
    /// A mapping from names to blocks, in mapping order
    Collection {
        /// Attribute name
        name: &'static str,
        /// Keyed blocks
        blocks: Vec<(&'a str, &'a dyn Block)>,
    },
}

impl<'a> BlockSlot<'a> {
    /// Each block of the slot with its location from the form root
    fn located(&self) -> Vec<(LocationPath, &'a dyn Block)> {
        match self {
            Self::Block { name, block } => vec![(LocationPath::single(*name), *block)],
            Self::Collection { name, blocks } => blocks
                .iter()
                .map(|(key, block)| (LocationPath::single(*name).child(*key), *block))
                .collect(),
        }
    }
}

/// Top-level configuration whose fields may hold several candidate values
///
/// Each form names its single coordinate type. The pairing is fixed at
/// compile time; `SINGLE_TYPE_NAME` is the tag that single coordinates of
/// this form carry when serialized.
pub trait Form: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type tag of the form
    const TYPE_NAME: &'static str;

    /// Type tag of the form's single coordinate
    const SINGLE_TYPE_NAME: &'static str;

    /// Block-holding attributes in declaration order
    fn block_slots(&self) -> Vec<BlockSlot<'_>>;

    /// All swept parameters of the form
    ///
    /// Ordered by attribute declaration, then mapping key order within
    /// collections, then field declaration order within each block.
    fn multiple_value_parameters(&self) -> Vec<MultiValueParameter> {
        let mut params = Vec::new();
        for slot in self.block_slots() {
            match slot {
                BlockSlot::Block { name, block } => {
                    params.extend(block.multiple_value_parameters(name, ""));
                }
                BlockSlot::Collection { name, blocks } => {
                    for (key, block) in blocks {
                        params.extend(block.multiple_value_parameters(name, key));
                    }
                }
            }
        }
        params
    }

    /// Fail if any block still holds a list
    ///
    /// # Errors
    /// Returns the first offending block's error with its location
    fn enforce_no_lists(&self) -> Result<(), FormError> {
        self.for_each_block(|block| block.enforce_no_lists())
    }

    /// Run every block's field constraints
    ///
    /// # Errors
    /// Returns the first violation with its location
    fn validate_blocks(&self) -> Result<(), FormError> {
        self.for_each_block(|block| block.validate())
    }

    /// Apply a check to every block in slot order
    ///
    /// # Errors
    /// Returns the first failing check with the block's location
    fn for_each_block<F>(&self, mut check: F) -> Result<(), FormError>
    where
        F: FnMut(&dyn Block) -> Result<(), BlockError>,
    {
        for slot in self.block_slots() {
            for (location, block) in slot.located() {
                check(block).map_err(|source| FormError { location, source })?;
            }
        }
        Ok(())
    }
}

/// A block error located within a form
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{location}: {source}")]
pub struct FormError {
    /// Location of the offending block
    pub location: LocationPath,
    /// Underlying block error
    #[source]
    pub source: BlockError,
}
