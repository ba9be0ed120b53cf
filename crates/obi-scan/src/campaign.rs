//! Campaign bookkeeping
//!
//! A [`CampaignConfig`] summarizes a generated scan for workflow tooling:
//! the swept dimensions, their candidate values and one entry per
//! coordinate. It is written next to the scan file.

use indexmap::IndexMap;
use obi_model::{ContentHash, ParamValue};
use serde::{Deserialize, Serialize};

/// Campaign document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Dotted location of each swept parameter, in dimension order
    pub dims: Vec<String>,

    /// Candidate values per dimension
    pub coords: IndexMap<String, Vec<ParamValue>>,

    /// One entry per coordinate, in index order
    pub data: Vec<CampaignEntry>,

    /// Scan-wide attributes
    pub attrs: CampaignAttrs,
}

/// One coordinate of a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignEntry {
    /// Coordinate index
    pub idx: usize,

    /// Coordinate directory
    pub coordinate_output_root: String,

    /// Resolved value per dimension
    pub values: IndexMap<String, ParamValue>,
}

/// Scan-wide campaign attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignAttrs {
    /// Version tag
    pub obi_version: String,

    /// Scan type tag
    pub scan_type: String,

    /// Form type tag
    pub form_type: String,

    /// Fingerprint of the scanned form
    pub form_hash: ContentHash,

    /// Scan output root
    pub output_root: String,
}

impl CampaignConfig {
    /// Number of coordinates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the campaign has no coordinates
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
