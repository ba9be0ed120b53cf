//! Single coordinates
//!
//! A [`SingleCoordinate`] is a form with every swept field resolved, plus its
//! index in the scan and the output directory derived from the resolved
//! values. Coordinates are produced by [`Scan`](crate::Scan) and carry their
//! own `generate`/`run` hooks through [`CoordinateHooks`].

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use obi_model::json::{ordered_object, type_tag, TYPE_KEY};
use obi_model::{FieldEdit, Form};
use once_cell::sync::OnceCell;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::{RegistryError, ScanError};
use crate::output::write_json;
use crate::settings::ScanSettings;

/// Key order of a serialized single coordinate
const COORDINATE_FRONT_KEYS: [&str; 6] = [
    "obi_version",
    "obi_class",
    "idx",
    "coordinate_output_root",
    "scan_output_root",
    TYPE_KEY,
];

/// Bookkeeping keys that are not fields of the form
const COORDINATE_EXTRA_KEYS: [&str; 8] = [
    "obi_version",
    "obi_class",
    "idx",
    "coordinate_output_root",
    "scan_output_root",
    "single_coordinate_scan_params",
    "coordinate_directory_option",
    TYPE_KEY,
];

/// Resolved values of one coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleCoordinateScanParams {
    /// One edit per swept parameter, in dimension order
    pub scan_params: Vec<FieldEdit>,

    /// `"{location}={value}/"` per swept parameter, concatenated
    pub nested_coordinate_subpath_str: String,
}

impl SingleCoordinateScanParams {
    /// Create from resolved edits
    #[must_use]
    pub fn new(scan_params: Vec<FieldEdit>) -> Self {
        let nested_coordinate_subpath_str = scan_params
            .iter()
            .map(|edit| format!("{}={}/", edit.location, edit.value))
            .collect();
        Self {
            scan_params,
            nested_coordinate_subpath_str,
        }
    }

    /// The only coordinate of a scan without swept parameters
    #[must_use]
    pub fn unswept(label: &str) -> Self {
        Self {
            scan_params: Vec::new(),
            nested_coordinate_subpath_str: format!("{label}/"),
        }
    }

    /// Check if no parameter is swept
    #[inline]
    #[must_use]
    pub fn is_unswept(&self) -> bool {
        self.scan_params.is_empty()
    }

    /// Directory names below the scan output root
    #[must_use]
    pub fn directory_segments(&self, option: CoordinateDirectoryOption, idx: usize) -> Vec<String> {
        if self.is_unswept() {
            return self
                .nested_coordinate_subpath_str
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect();
        }

        match option {
            CoordinateDirectoryOption::NameEqualsValue => self
                .scan_params
                .iter()
                .map(|edit| format!("{}={}", edit.location, edit.value))
                .collect(),
            CoordinateDirectoryOption::Value => self
                .scan_params
                .iter()
                .map(|edit| edit.value.to_string())
                .collect(),
            CoordinateDirectoryOption::ZeroIndex => vec![idx.to_string()],
        }
    }
}

/// How coordinate directories are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinateDirectoryOption {
    /// One `location=value` directory per swept parameter
    #[default]
    NameEqualsValue,
    /// One `value` directory per swept parameter
    Value,
    /// A single directory named by the coordinate index
    ZeroIndex,
}

/// Lifecycle hook requested from a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Write the coordinate's inputs
    #[default]
    Generate,
    /// Execute the coordinate's task
    Run,
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => f.write_str("generate"),
            Self::Run => f.write_str("run"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(Self::Generate),
            "run" => Ok(Self::Run),
            other => Err(format!("unknown execution mode '{other}'")),
        }
    }
}

/// Lifecycle hooks of a form's single coordinate
///
/// Both hooks default to [`ScanError::NotImplemented`]; a missing hook is
/// fatal, never skipped.
pub trait CoordinateHooks: Form {
    /// Write the coordinate's inputs into its output directory
    ///
    /// # Errors
    /// Returns error if generation fails
    fn generate(coordinate: &SingleCoordinate<Self>) -> Result<(), ScanError> {
        Err(ScanError::NotImplemented {
            type_name: coordinate.type_name(),
            hook: ExecutionMode::Generate,
        })
    }

    /// Execute the coordinate's task
    ///
    /// # Errors
    /// Returns error if the task fails
    fn run(coordinate: &SingleCoordinate<Self>) -> Result<(), ScanError> {
        Err(ScanError::NotImplemented {
            type_name: coordinate.type_name(),
            hook: ExecutionMode::Run,
        })
    }
}

/// One fully resolved point of a scan
#[derive(Debug, Clone)]
pub struct SingleCoordinate<F: Form> {
    idx: usize,
    scan_output_root: PathBuf,
    directory_option: CoordinateDirectoryOption,
    params: SingleCoordinateScanParams,
    config: F,
    settings: Arc<ScanSettings>,
    coordinate_output_root: OnceCell<PathBuf>,
}

impl<F: Form> SingleCoordinate<F> {
    /// Cast a resolved form document to a single coordinate
    ///
    /// The document must deserialize as `F`, hold no lists and satisfy
    /// every block constraint.
    ///
    /// # Errors
    /// Returns [`ScanError::CoordinateCast`] or
    /// [`ScanError::CoordinateValidation`] with the coordinate index
    pub fn cast(
        idx: usize,
        document: JsonValue,
        params: SingleCoordinateScanParams,
        scan_output_root: PathBuf,
        directory_option: CoordinateDirectoryOption,
        settings: Arc<ScanSettings>,
    ) -> Result<Self, ScanError> {
        let config = F::deserialize(strip_type(document)).map_err(|source| ScanError::CoordinateCast {
            idx,
            type_name: F::SINGLE_TYPE_NAME,
            source,
        })?;
        Self::from_config(idx, config, params, scan_output_root, directory_option, settings)
    }

    /// Build a single coordinate from an already resolved form
    ///
    /// # Errors
    /// Returns [`ScanError::CoordinateValidation`] if a field still holds a
    /// list or violates a constraint
    pub fn from_config(
        idx: usize,
        config: F,
        params: SingleCoordinateScanParams,
        scan_output_root: PathBuf,
        directory_option: CoordinateDirectoryOption,
        settings: Arc<ScanSettings>,
    ) -> Result<Self, ScanError> {
        config
            .enforce_no_lists()
            .and_then(|()| config.validate_blocks())
            .map_err(|source| ScanError::CoordinateValidation { idx, source })?;

        Ok(Self {
            idx,
            scan_output_root,
            directory_option,
            params,
            config,
            settings,
            coordinate_output_root: OnceCell::new(),
        })
    }

    /// Type tag of this coordinate
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        F::SINGLE_TYPE_NAME
    }

    /// Index in generation order, starting at 0
    #[inline]
    #[must_use]
    pub fn idx(&self) -> usize {
        self.idx
    }

    /// Resolved configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &F {
        &self.config
    }

    /// Resolved values of this coordinate
    #[inline]
    #[must_use]
    pub fn params(&self) -> &SingleCoordinateScanParams {
        &self.params
    }

    /// Settings the coordinate was produced with
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Output root of the scan this coordinate belongs to
    #[inline]
    #[must_use]
    pub fn scan_output_root(&self) -> &Path {
        &self.scan_output_root
    }

    /// Directory naming option
    #[inline]
    #[must_use]
    pub fn directory_option(&self) -> CoordinateDirectoryOption {
        self.directory_option
    }

    /// Directory of this coordinate, computed once
    #[must_use]
    pub fn coordinate_output_root(&self) -> &Path {
        self.coordinate_output_root.get_or_init(|| {
            let mut path = self.scan_output_root.clone();
            for segment in self.params.directory_segments(self.directory_option, self.idx) {
                path.push(segment);
            }
            path
        })
    }

    /// Move the coordinate under another scan output root
    pub fn set_scan_output_root(&mut self, root: impl Into<PathBuf>) {
        self.scan_output_root = root.into();
        self.coordinate_output_root = OnceCell::new();
    }

    /// Serialize with bookkeeping keys first
    ///
    /// # Errors
    /// Returns error if the form does not serialize to an object
    pub fn to_value(&self) -> Result<JsonValue, ScanError> {
        let JsonValue::Object(fields) = serde_json::to_value(&self.config)? else {
            return Err(ScanError::Task {
                type_name: F::SINGLE_TYPE_NAME,
                message: format!("{} must serialize to a JSON object", F::TYPE_NAME),
            });
        };

        let mut map = Map::with_capacity(fields.len() + COORDINATE_EXTRA_KEYS.len());
        map.insert("obi_version".into(), self.settings.obi_version.clone().into());
        map.insert("obi_class".into(), F::SINGLE_TYPE_NAME.into());
        map.insert("idx".into(), self.idx.into());
        map.insert(
            "coordinate_output_root".into(),
            path_value(self.coordinate_output_root()),
        );
        map.insert("scan_output_root".into(), path_value(&self.scan_output_root));
        map.insert(TYPE_KEY.into(), F::SINGLE_TYPE_NAME.into());
        for (key, value) in fields {
            if key != TYPE_KEY {
                map.insert(key, value);
            }
        }
        map.insert(
            "single_coordinate_scan_params".into(),
            serde_json::to_value(&self.params)?,
        );
        map.insert(
            "coordinate_directory_option".into(),
            serde_json::to_value(self.directory_option)?,
        );

        Ok(ordered_object(JsonValue::Object(map), &COORDINATE_FRONT_KEYS))
    }

    /// Inverse of [`to_value`](Self::to_value)
    ///
    /// # Errors
    /// Returns error if the tag names another type or the fields do not
    /// form a valid single coordinate
    pub fn from_value(value: &JsonValue, settings: Arc<ScanSettings>) -> Result<Self, ScanError> {
        let tag = value
            .get("obi_class")
            .and_then(JsonValue::as_str)
            .or_else(|| type_tag(value))
            .ok_or(RegistryError::MissingTag)?;
        if tag != F::SINGLE_TYPE_NAME {
            return Err(RegistryError::TypeMismatch {
                expected: F::SINGLE_TYPE_NAME.to_string(),
                found: tag.to_string(),
            }
            .into());
        }

        let idx: usize = required_field::<F, _>(value, "idx")?;
        let scan_output_root: PathBuf = required_field::<F, _>(value, "scan_output_root")?;
        let params = match value.get("single_coordinate_scan_params") {
            Some(params) => SingleCoordinateScanParams::deserialize(params).map_err(|source| {
                ScanError::Deserialization {
                    what: format!("{} scan params", F::SINGLE_TYPE_NAME),
                    source,
                }
            })?,
            None => SingleCoordinateScanParams::unswept(&settings.default_coordinate_label),
        };
        let directory_option = match value.get("coordinate_directory_option") {
            Some(option) => CoordinateDirectoryOption::deserialize(option).map_err(|source| {
                ScanError::Deserialization {
                    what: "coordinate directory option".to_string(),
                    source,
                }
            })?,
            None => CoordinateDirectoryOption::default(),
        };

        let mut fields = value.as_object().cloned().unwrap_or_default();
        for key in COORDINATE_EXTRA_KEYS {
            fields.shift_remove(key);
        }
        let config = F::deserialize(JsonValue::Object(fields)).map_err(|source| ScanError::Deserialization {
            what: F::SINGLE_TYPE_NAME.to_string(),
            source,
        })?;

        Self::from_config(idx, config, params, scan_output_root, directory_option, settings)
    }

    /// Path of the serialized coordinate file
    #[must_use]
    pub fn coordinate_file(&self) -> PathBuf {
        self.coordinate_output_root()
            .join(&self.settings.coordinate_file_name)
    }

    /// Write the coordinate file into the coordinate directory
    ///
    /// # Errors
    /// Returns error if serialization or the write fails
    pub fn serialize_to_file(&self) -> Result<PathBuf, ScanError> {
        let path = self.coordinate_file();
        write_json(&path, &self.to_value()?)?;
        Ok(path)
    }
}

impl<F: CoordinateHooks> SingleCoordinate<F> {
    /// Create the coordinate directory, call the hook, then serialize
    ///
    /// Nothing is serialized when the hook fails.
    ///
    /// # Errors
    /// Returns the hook's error, [`ScanError::NotImplemented`] included
    pub fn execute(&self, mode: ExecutionMode) -> Result<PathBuf, ScanError> {
        let root = self.coordinate_output_root();
        std::fs::create_dir_all(root).map_err(|source| ScanError::io(root, source))?;

        debug!(idx = self.idx, path = %root.display(), %mode, "executing coordinate");
        match mode {
            ExecutionMode::Generate => F::generate(self)?,
            ExecutionMode::Run => F::run(self)?,
        }

        self.serialize_to_file()
    }
}

impl<F: Form + PartialEq> PartialEq for SingleCoordinate<F> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
            && self.scan_output_root == other.scan_output_root
            && self.directory_option == other.directory_option
            && self.params == other.params
            && self.config == other.config
    }
}

/// Drop a form document's own type tag before casting
fn strip_type(document: JsonValue) -> JsonValue {
    match document {
        JsonValue::Object(mut map) => {
            map.shift_remove(TYPE_KEY);
            JsonValue::Object(map)
        }
        other => other,
    }
}

fn path_value(path: &Path) -> JsonValue {
    JsonValue::String(path.display().to_string())
}

/// Read a field every coordinate document must carry
fn required_field<F: Form, T: DeserializeOwned>(value: &JsonValue, key: &'static str) -> Result<T, ScanError> {
    let what = format!("{} {key}", F::SINGLE_TYPE_NAME);
    let field = value.get(key).ok_or_else(|| ScanError::Deserialization {
        what: what.clone(),
        source: serde_json::Error::missing_field(key),
    })?;
    T::deserialize(field).map_err(|source| ScanError::Deserialization { what, source })
}
