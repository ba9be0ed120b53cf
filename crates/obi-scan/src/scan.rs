//! Scans over a form
//!
//! A [`Scan`] owns a form and an output root. It discovers the form's swept
//! parameters, asks its [`ScanStrategy`] for the coordinates, and
//! materializes one [`SingleCoordinate`] per coordinate by editing a copy of
//! the serialized form. All three stages are computed once per scan.
//!
//! # Example
//!
//! ```rust,ignore
//! use obi_scan::{ExecutionMode, GridScan};
//!
//! let scan = GridScan::new(form, "/tmp/scan");
//! let summary = scan.execute(ExecutionMode::Generate)?;
//! assert_eq!(summary.coordinate_count, 6);
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use obi_model::json::{ordered_object, to_tagged_value, type_tag, TYPE_KEY};
use obi_model::{apply_edits, ContentHash, Form, MultiValueParameter};
use once_cell::sync::OnceCell;
use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use crate::campaign::{CampaignAttrs, CampaignConfig, CampaignEntry};
use crate::coordinate::{
    CoordinateDirectoryOption, CoordinateHooks, ExecutionMode, SingleCoordinate, SingleCoordinateScanParams,
};
use crate::coupled::Coupled;
use crate::error::{RegistryError, ScanError};
use crate::grid::Grid;
use crate::output::write_json;
use crate::settings::ScanSettings;
use crate::strategy::ScanStrategy;

/// Key order of a serialized scan
const SCAN_FRONT_KEYS: [&str; 3] = ["obi_version", TYPE_KEY, "output_root"];

/// Grid scan over a form
pub type GridScan<F> = Scan<F, Grid>;

/// Coupled scan over a form
pub type CoupledScan<F> = Scan<F, Coupled>;

/// A form, an output root and a strategy
#[derive(Debug, Clone)]
pub struct Scan<F: Form, S: ScanStrategy> {
    form: F,
    output_root: PathBuf,
    coordinate_directory_option: CoordinateDirectoryOption,
    strategy: S,
    settings: Arc<ScanSettings>,
    multiple_value_parameters: OnceCell<Vec<MultiValueParameter>>,
    coordinate_parameters: OnceCell<Vec<SingleCoordinateScanParams>>,
    coordinate_instances: OnceCell<Vec<SingleCoordinate<F>>>,
}

/// Result of [`Scan::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Scan type tag
    pub scan_type: &'static str,
    /// Hook that was called
    pub mode: ExecutionMode,
    /// Number of coordinates executed
    pub coordinate_count: usize,
    /// Written scan file
    pub scan_file: PathBuf,
    /// Written campaign file, if any
    pub campaign_file: Option<PathBuf>,
    /// Written coordinate files in index order
    pub coordinate_files: Vec<PathBuf>,
}

impl<F: Form, S: ScanStrategy> Scan<F, S> {
    /// Create scan with default settings
    #[must_use]
    pub fn new(form: F, output_root: impl Into<PathBuf>) -> Self {
        Self {
            form,
            output_root: output_root.into(),
            coordinate_directory_option: CoordinateDirectoryOption::default(),
            strategy: S::default(),
            settings: Arc::new(ScanSettings::default()),
            multiple_value_parameters: OnceCell::new(),
            coordinate_parameters: OnceCell::new(),
            coordinate_instances: OnceCell::new(),
        }
    }

    /// Set settings
    #[must_use]
    pub fn with_settings(mut self, settings: ScanSettings) -> Self {
        self.settings = Arc::new(settings);
        self.coordinate_parameters = OnceCell::new();
        self.coordinate_instances = OnceCell::new();
        self
    }

    /// Set coordinate directory naming
    #[must_use]
    pub fn with_coordinate_directory_option(mut self, option: CoordinateDirectoryOption) -> Self {
        self.coordinate_directory_option = option;
        self.coordinate_instances = OnceCell::new();
        self
    }

    /// Type tag of this scan
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        S::TYPE_NAME
    }

    /// Scanned form
    #[inline]
    #[must_use]
    pub fn form(&self) -> &F {
        &self.form
    }

    /// Output root
    #[inline]
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Directory naming option
    #[inline]
    #[must_use]
    pub fn coordinate_directory_option(&self) -> CoordinateDirectoryOption {
        self.coordinate_directory_option
    }

    /// Move the scan to another output root
    pub fn set_output_root(&mut self, root: impl Into<PathBuf>) {
        self.output_root = root.into();
        self.coordinate_instances = OnceCell::new();
    }

    /// Swept parameters of the form, discovered once
    pub fn multiple_value_parameters(&self) -> &[MultiValueParameter] {
        self.multiple_value_parameters
            .get_or_init(|| self.form.multiple_value_parameters())
    }

    /// Coordinates produced by the strategy, computed once
    ///
    /// # Errors
    /// Returns the strategy's configuration error
    pub fn coordinate_parameters(&self) -> Result<&[SingleCoordinateScanParams], ScanError> {
        self.coordinate_parameters
            .get_or_try_init(|| {
                self.strategy.coordinate_parameters(
                    self.multiple_value_parameters(),
                    &self.settings.default_coordinate_label,
                )
            })
            .map(Vec::as_slice)
    }

    /// Single coordinates in index order, materialized once
    ///
    /// Each coordinate is the serialized form with its edits applied, cast
    /// back into the form type. The scan's own form is never modified.
    ///
    /// # Errors
    /// Returns the first coordinate that cannot be edited, cast or validated
    pub fn coordinate_instances(&self) -> Result<&[SingleCoordinate<F>], ScanError> {
        self.coordinate_instances
            .get_or_try_init(|| {
                let document = serde_json::to_value(&self.form)?;
                self.coordinate_parameters()?
                    .iter()
                    .enumerate()
                    .map(|(idx, params)| {
                        let resolved = apply_edits(&document, &params.scan_params)
                            .map_err(|source| ScanError::CoordinateEdit { idx, source })?;
                        SingleCoordinate::cast(
                            idx,
                            resolved,
                            params.clone(),
                            self.output_root.clone(),
                            self.coordinate_directory_option,
                            Arc::clone(&self.settings),
                        )
                    })
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// Human-readable listing of every coordinate, also logged at info level
    ///
    /// # Errors
    /// Returns the strategy's configuration error
    pub fn display_coordinate_parameters(&self) -> Result<String, ScanError> {
        let coordinates = self.coordinate_parameters()?;
        let mut listing = format!(
            "{} over {}: {} coordinate(s)\n",
            S::TYPE_NAME,
            F::TYPE_NAME,
            coordinates.len()
        );

        for (idx, params) in coordinates.iter().enumerate() {
            let line = if params.is_unswept() {
                params.nested_coordinate_subpath_str.trim_end_matches('/').to_string()
            } else {
                params
                    .scan_params
                    .iter()
                    .map(|edit| format!("{}={}", edit.location, edit.value))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let _ = writeln!(listing, "  {idx}: {line}");
        }

        info!("{}", listing.trim_end());
        Ok(listing)
    }

    /// Serialize with `obi_version`, `type` and `output_root` first
    ///
    /// # Errors
    /// Returns error if the form does not serialize to an object
    pub fn to_value(&self) -> Result<JsonValue, ScanError> {
        let mut map = Map::new();
        map.insert("obi_version".into(), self.settings.obi_version.clone().into());
        map.insert(TYPE_KEY.into(), S::TYPE_NAME.into());
        map.insert(
            "output_root".into(),
            self.output_root.display().to_string().into(),
        );
        map.insert(
            "coordinate_directory_option".into(),
            serde_json::to_value(self.coordinate_directory_option)?,
        );
        map.insert("form".into(), to_tagged_value(F::TYPE_NAME, &self.form)?);
        Ok(ordered_object(JsonValue::Object(map), &SCAN_FRONT_KEYS))
    }

    /// Inverse of [`to_value`](Self::to_value)
    ///
    /// # Errors
    /// Returns error if either tag names another type or the form is invalid
    pub fn from_value(value: &JsonValue, settings: Arc<ScanSettings>) -> Result<Self, ScanError> {
        expect_tag(type_tag(value), S::TYPE_NAME)?;

        let form_value = value.get("form").ok_or_else(|| ScanError::Deserialization {
            what: S::TYPE_NAME.to_string(),
            source: serde_json::Error::missing_field("form"),
        })?;
        if let Some(found) = type_tag(form_value) {
            expect_tag(Some(found), F::TYPE_NAME)?;
        }

        let mut form_fields = form_value.as_object().cloned().unwrap_or_default();
        form_fields.shift_remove(TYPE_KEY);
        let form = F::deserialize(JsonValue::Object(form_fields)).map_err(|source| ScanError::Deserialization {
            what: F::TYPE_NAME.to_string(),
            source,
        })?;

        let output_root = value
            .get("output_root")
            .and_then(JsonValue::as_str)
            .map(PathBuf::from)
            .unwrap_or_default();
        let option = match value.get("coordinate_directory_option") {
            Some(option) => CoordinateDirectoryOption::deserialize(option).map_err(|source| {
                ScanError::Deserialization {
                    what: "coordinate directory option".to_string(),
                    source,
                }
            })?,
            None => CoordinateDirectoryOption::default(),
        };

        let mut scan = Self::new(form, output_root).with_coordinate_directory_option(option);
        scan.settings = settings;
        Ok(scan)
    }

    /// Path of the serialized scan file
    #[must_use]
    pub fn scan_file(&self) -> PathBuf {
        self.output_root.join(&self.settings.scan_file_name)
    }

    /// Write the scan file under the output root
    ///
    /// # Errors
    /// Returns error if serialization or the write fails
    pub fn serialize_to_file(&self) -> Result<PathBuf, ScanError> {
        let path = self.scan_file();
        write_json(&path, &self.to_value()?)?;
        Ok(path)
    }

    /// Campaign document for the materialized coordinates
    ///
    /// # Errors
    /// Returns error if the coordinates cannot be materialized
    pub fn campaign_config(&self) -> Result<CampaignConfig, ScanError> {
        let params = self.multiple_value_parameters();
        let dims: Vec<String> = params.iter().map(|p| p.location.to_string()).collect();
        let coords: IndexMap<_, _> = params
            .iter()
            .map(|p| (p.location.to_string(), p.values.clone()))
            .collect();

        let data = self
            .coordinate_instances()?
            .iter()
            .map(|coordinate| CampaignEntry {
                idx: coordinate.idx(),
                coordinate_output_root: coordinate.coordinate_output_root().display().to_string(),
                values: coordinate
                    .params()
                    .scan_params
                    .iter()
                    .map(|edit| (edit.location.to_string(), edit.value.clone()))
                    .collect(),
            })
            .collect();

        Ok(CampaignConfig {
            dims,
            coords,
            data,
            attrs: CampaignAttrs {
                obi_version: self.settings.obi_version.clone(),
                scan_type: S::TYPE_NAME.to_string(),
                form_type: F::TYPE_NAME.to_string(),
                form_hash: ContentHash::compute_canonical(&self.form)?,
                output_root: self.output_root.display().to_string(),
            },
        })
    }
}

impl<F: CoordinateHooks, S: ScanStrategy> Scan<F, S> {
    /// Execute every coordinate in index order
    ///
    /// Creates the output root and writes the scan file, then for each
    /// coordinate creates its directory, calls the hook and writes the
    /// coordinate file. In generate mode the campaign file is written last.
    /// The first failure aborts the scan; coordinates already executed keep
    /// their files.
    ///
    /// # Errors
    /// Returns the first configuration, hook or I/O error
    pub fn execute(&self, mode: ExecutionMode) -> Result<ExecutionSummary, ScanError> {
        std::fs::create_dir_all(&self.output_root).map_err(|source| ScanError::io(&self.output_root, source))?;

        let scan_file = self.serialize_to_file()?;
        let coordinates = self.coordinate_instances()?;
        info!(
            scan = S::TYPE_NAME,
            form = F::TYPE_NAME,
            coordinates = coordinates.len(),
            %mode,
            output_root = %self.output_root.display(),
            "executing scan"
        );

        let mut coordinate_files = Vec::with_capacity(coordinates.len());
        for coordinate in coordinates {
            let file = coordinate.execute(mode)?;
            debug!(idx = coordinate.idx(), file = %file.display(), "coordinate written");
            coordinate_files.push(file);
        }

        let campaign_file = if mode == ExecutionMode::Generate && self.settings.write_campaign_config {
            let path = self.output_root.join(&self.settings.campaign_file_name);
            write_json(&path, &serde_json::to_value(self.campaign_config()?)?)?;
            Some(path)
        } else {
            None
        };

        info!(scan = S::TYPE_NAME, coordinates = coordinate_files.len(), "scan complete");
        Ok(ExecutionSummary {
            scan_type: S::TYPE_NAME,
            mode,
            coordinate_count: coordinate_files.len(),
            scan_file,
            campaign_file,
            coordinate_files,
        })
    }
}

fn expect_tag(found: Option<&str>, expected: &str) -> Result<(), RegistryError> {
    match found {
        None => Err(RegistryError::MissingTag),
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(RegistryError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obi_model::{impl_block, Block, BlockSlot, ParamValue, Sweepable};
    use pretty_assertions::assert_eq;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type")]
    struct Initialize {
        param_a: Sweepable<i64>,
    }

    impl_block!(Initialize { param_a });

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type")]
    struct Spike {
        probability: Sweepable<f64>,
    }

    impl_block!(Spike { probability });

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type")]
    struct ProbeForm {
        initialize: Initialize,
        stimuli: IndexMap<String, Spike>,
    }

    impl Form for ProbeForm {
        const TYPE_NAME: &'static str = "ProbeForm";
        const SINGLE_TYPE_NAME: &'static str = "Probe";

        fn block_slots(&self) -> Vec<BlockSlot<'_>> {
            vec![
                BlockSlot::Block {
                    name: "initialize",
                    block: &self.initialize,
                },
                BlockSlot::Collection {
                    name: "stimuli",
                    blocks: self
                        .stimuli
                        .iter()
                        .map(|(key, block)| (key.as_str(), block as &dyn Block))
                        .collect(),
                },
            ]
        }
    }

    impl CoordinateHooks for ProbeForm {
        fn generate(_coordinate: &SingleCoordinate<Self>) -> Result<(), ScanError> {
            Ok(())
        }
    }

    fn form(param_a: Vec<i64>, probability: Vec<f64>) -> ProbeForm {
        let mut stimuli = IndexMap::new();
        stimuli.insert(
            "s1".to_string(),
            Spike {
                probability: probability.into(),
            },
        );
        ProbeForm {
            initialize: Initialize {
                param_a: param_a.into(),
            },
            stimuli,
        }
    }

    #[test]
    fn grid_materializes_resolved_coordinates() {
        let scan = GridScan::new(form(vec![1, 2], vec![0.1, 0.5, 0.9]), "/out");
        let coordinates = scan.coordinate_instances().unwrap();
        assert_eq!(coordinates.len(), 6);

        let first = &coordinates[0];
        assert_eq!(first.config().initialize.param_a, Sweepable::Resolved(1));
        assert_eq!(first.config().stimuli["s1"].probability, Sweepable::Resolved(0.1));
        assert_eq!(
            first.coordinate_output_root(),
            Path::new("/out/initialize.param_a=1/stimuli.s1.probability=0.1")
        );

        let last = &coordinates[5];
        assert_eq!(last.idx(), 5);
        assert_eq!(last.config().initialize.param_a, Sweepable::Resolved(2));
        assert_eq!(last.config().stimuli["s1"].probability, Sweepable::Resolved(0.9));
    }

    #[test]
    fn materialization_leaves_form_untouched() {
        let original = form(vec![1, 2], vec![0.1, 0.5]);
        let scan = GridScan::new(original.clone(), "/out");
        let _ = scan.coordinate_instances().unwrap();
        assert_eq!(scan.form(), &original);
    }

    #[test]
    fn coupled_mismatch_produces_nothing() {
        let scan = CoupledScan::new(form(vec![1, 2], vec![0.1, 0.5, 0.9]), "/out");
        assert!(matches!(
            scan.coordinate_instances(),
            Err(ScanError::CoupledLengthMismatch { .. })
        ));
    }

    #[test]
    fn zero_sweeps_use_default_label() {
        let scan = GridScan::new(form(vec![1], vec![0.5]), "/out");
        let err = scan.coordinate_instances().unwrap_err();
        assert!(matches!(err, ScanError::CoordinateValidation { idx: 0, .. }));

        let mut resolved = form(vec![], vec![]);
        resolved.initialize.param_a = Sweepable::Resolved(1);
        resolved.stimuli["s1"].probability = Sweepable::Resolved(0.5);
        let scan = CoupledScan::new(resolved, "/out");
        let coordinates = scan.coordinate_instances().unwrap();
        assert_eq!(coordinates.len(), 1);
        assert_eq!(
            coordinates[0].coordinate_output_root(),
            Path::new("/out/single_coordinate")
        );
    }

    #[test]
    fn memoized_parameters_are_stable() {
        let scan = GridScan::new(form(vec![1, 2], vec![0.1, 0.5]), "/out");
        let first = scan.coordinate_parameters().unwrap().as_ptr();
        let second = scan.coordinate_parameters().unwrap().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn set_output_root_rebuilds_coordinates() {
        let mut scan = GridScan::new(form(vec![1, 2], vec![0.1, 0.5]), "/out");
        let _ = scan.coordinate_instances().unwrap();
        scan.set_output_root("/moved");
        assert!(scan.coordinate_instances().unwrap()[0]
            .coordinate_output_root()
            .starts_with("/moved"));
    }

    #[test]
    fn serialized_scan_key_order() {
        let scan = GridScan::new(form(vec![1, 2], vec![0.1, 0.5]), "/out")
            .with_settings(ScanSettings::default().with_obi_version("1.0.0"));
        let value = scan.to_value().unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["obi_version", "type", "output_root", "coordinate_directory_option", "form"]
        );
        assert_eq!(value["type"], json!("GridScan"));
        let form_keys: Vec<_> = value["form"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(form_keys, vec!["type", "initialize", "stimuli"]);
        assert_eq!(value["form"]["type"], json!("ProbeForm"));
    }

    #[test]
    fn scan_roundtrip() {
        let scan = CoupledScan::new(form(vec![1, 2], vec![0.1, 0.5]), "/out")
            .with_coordinate_directory_option(CoordinateDirectoryOption::ZeroIndex);
        let value = scan.to_value().unwrap();
        let restored = CoupledScan::<ProbeForm>::from_value(&value, Arc::new(ScanSettings::default())).unwrap();
        assert_eq!(restored.form(), scan.form());
        assert_eq!(restored.output_root(), scan.output_root());
        assert_eq!(
            restored.coordinate_directory_option(),
            CoordinateDirectoryOption::ZeroIndex
        );
    }

    #[test]
    fn from_value_rejects_wrong_strategy() {
        let value = GridScan::new(form(vec![1, 2], vec![0.1, 0.5]), "/out")
            .to_value()
            .unwrap();
        let err = CoupledScan::<ProbeForm>::from_value(&value, Arc::new(ScanSettings::default())).unwrap_err();
        assert!(matches!(err, ScanError::Registry(RegistryError::TypeMismatch { .. })));
    }

    #[test]
    fn display_lists_every_coordinate() {
        let scan = GridScan::new(form(vec![1, 2], vec![0.1, 0.5]), "/out");
        let listing = scan.display_coordinate_parameters().unwrap();
        assert!(listing.starts_with("GridScan over ProbeForm: 4 coordinate(s)"));
        assert!(listing.contains("  0: initialize.param_a=1, stimuli.s1.probability=0.1"));
        assert!(listing.contains("  3: initialize.param_a=2, stimuli.s1.probability=0.5"));
    }

    #[test]
    fn campaign_config_lists_dims_and_data() {
        let scan = GridScan::new(form(vec![1, 2], vec![0.1, 0.5]), "/out");
        let campaign = scan.campaign_config().unwrap();
        assert_eq!(campaign.dims, vec!["initialize.param_a", "stimuli.s1.probability"]);
        assert_eq!(campaign.coords["initialize.param_a"], vec![ParamValue::Int(1), ParamValue::Int(2)]);
        assert_eq!(campaign.len(), 4);
        assert_eq!(campaign.data[1].values["stimuli.s1.probability"], ParamValue::Float(0.5));
        assert_eq!(campaign.attrs.scan_type, "GridScan");
        assert_eq!(campaign.attrs.form_hash, ContentHash::compute_canonical(scan.form()).unwrap());
    }

    #[test]
    fn execute_writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let scan = GridScan::new(form(vec![1, 2], vec![0.1, 0.5]), dir.path());
        let summary = scan.execute(ExecutionMode::Generate).unwrap();

        assert_eq!(summary.coordinate_count, 4);
        assert!(summary.scan_file.exists());
        assert!(summary.campaign_file.as_deref().is_some_and(Path::exists));
        for file in &summary.coordinate_files {
            assert!(file.exists());
        }
        assert!(dir
            .path()
            .join("initialize.param_a=2/stimuli.s1.probability=0.5/obi_one_coordinate.json")
            .exists());
    }

    #[test]
    fn execute_missing_hook_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let scan = GridScan::new(form(vec![1, 2], vec![0.1, 0.5]), dir.path());
        let err = scan.execute(ExecutionMode::Run).unwrap_err();
        assert!(matches!(err, ScanError::NotImplemented { .. }));
        assert!(!dir.path().join("bbp_workflow_campaign_config.json").exists());
    }
}
