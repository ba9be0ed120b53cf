//! Scan settings
//!
//! File names, the zero-sweep directory label and the version tag written
//! into every serialized scan and coordinate.

use serde::{Deserialize, Serialize};

/// Directory label of the only coordinate of a scan without swept parameters
pub const DEFAULT_COORDINATE_LABEL: &str = "single_coordinate";

/// File name of a serialized scan
pub const SCAN_FILE_NAME: &str = "obi_one_scan.json";

/// File name of a serialized single coordinate
pub const COORDINATE_FILE_NAME: &str = "obi_one_coordinate.json";

/// File name of the campaign bookkeeping document
pub const CAMPAIGN_FILE_NAME: &str = "bbp_workflow_campaign_config.json";

/// Settings shared by every scan run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Directory label used when nothing is swept
    pub default_coordinate_label: String,

    /// Scan file name under the output root
    pub scan_file_name: String,

    /// Coordinate file name under each coordinate directory
    pub coordinate_file_name: String,

    /// Campaign file name under the output root
    pub campaign_file_name: String,

    /// Version tag written as `obi_version`
    pub obi_version: String,

    /// Write the campaign document when generating
    pub write_campaign_config: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            default_coordinate_label: DEFAULT_COORDINATE_LABEL.to_string(),
            scan_file_name: SCAN_FILE_NAME.to_string(),
            coordinate_file_name: COORDINATE_FILE_NAME.to_string(),
            campaign_file_name: CAMPAIGN_FILE_NAME.to_string(),
            obi_version: crate::VERSION.to_string(),
            write_campaign_config: true,
        }
    }
}

impl ScanSettings {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set zero-sweep directory label
    #[inline]
    #[must_use]
    pub fn with_default_coordinate_label(mut self, label: impl Into<String>) -> Self {
        self.default_coordinate_label = label.into();
        self
    }

    /// Set scan file name
    #[inline]
    #[must_use]
    pub fn with_scan_file_name(mut self, name: impl Into<String>) -> Self {
        self.scan_file_name = name.into();
        self
    }

    /// Set coordinate file name
    #[inline]
    #[must_use]
    pub fn with_coordinate_file_name(mut self, name: impl Into<String>) -> Self {
        self.coordinate_file_name = name.into();
        self
    }

    /// Set version tag
    #[inline]
    #[must_use]
    pub fn with_obi_version(mut self, version: impl Into<String>) -> Self {
        self.obi_version = version.into();
        self
    }

    /// Enable or disable the campaign document
    #[inline]
    #[must_use]
    pub fn with_campaign_config(mut self, enabled: bool) -> Self {
        self.write_campaign_config = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = ScanSettings::default();
        assert_eq!(settings.default_coordinate_label, "single_coordinate");
        assert_eq!(settings.scan_file_name, "obi_one_scan.json");
        assert_eq!(settings.coordinate_file_name, "obi_one_coordinate.json");
        assert!(settings.write_campaign_config);
        assert_eq!(settings.obi_version, crate::VERSION);
    }

    #[test]
    fn builders() {
        let settings = ScanSettings::new()
            .with_default_coordinate_label("only")
            .with_obi_version("2.0.0")
            .with_campaign_config(false);
        assert_eq!(settings.default_coordinate_label, "only");
        assert_eq!(settings.obi_version, "2.0.0");
        assert!(!settings.write_campaign_config);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let settings: ScanSettings = serde_json::from_str(r#"{"obi_version": "9"}"#).unwrap();
        assert_eq!(settings.obi_version, "9");
        assert_eq!(settings.scan_file_name, SCAN_FILE_NAME);
    }
}
