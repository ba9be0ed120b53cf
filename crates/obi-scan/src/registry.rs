//! Type registry
//!
//! Maps type tags to loaders for scans and single coordinates. The registry
//! is built explicitly at startup by registering each form; a tag can only
//! be registered once, so lookup is a plain map access.
//!
//! Scans are keyed by their strategy tag and the tag of the nested form,
//! single coordinates by the single coordinate tag.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use obi_model::json::{type_tag, TYPE_KEY};
use obi_model::Form;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::coordinate::{CoordinateHooks, ExecutionMode, SingleCoordinate};
use crate::coupled::Coupled;
use crate::error::{RegistryError, ScanError};
use crate::grid::Grid;
use crate::output::read_document;
use crate::scan::Scan;
use crate::settings::ScanSettings;
use crate::strategy::ScanStrategy;

/// A deserialized scan or single coordinate
pub trait ScanTask: Debug + Send + Sync {
    /// Type tag
    fn type_name(&self) -> &'static str;

    /// Tag of the underlying form
    fn form_type_name(&self) -> &'static str;

    /// Number of coordinates this task executes
    ///
    /// # Errors
    /// Returns the scan's configuration error
    fn coordinate_count(&self) -> Result<usize, ScanError>;

    /// Execute the requested hook; returns every written file
    ///
    /// # Errors
    /// Returns the first configuration, hook or I/O error
    fn execute(&self, mode: ExecutionMode) -> Result<Vec<PathBuf>, ScanError>;

    /// Serialize with the task's key order
    ///
    /// # Errors
    /// Returns error if serialization fails
    fn to_value(&self) -> Result<JsonValue, ScanError>;

    /// Replace the output root
    fn set_output_root(&mut self, root: &Path);
}

impl<F: CoordinateHooks, S: ScanStrategy> ScanTask for Scan<F, S> {
    fn type_name(&self) -> &'static str {
        S::TYPE_NAME
    }

    fn form_type_name(&self) -> &'static str {
        F::TYPE_NAME
    }

    fn coordinate_count(&self) -> Result<usize, ScanError> {
        self.coordinate_parameters().map(<[_]>::len)
    }

    fn execute(&self, mode: ExecutionMode) -> Result<Vec<PathBuf>, ScanError> {
        let summary = Scan::execute(self, mode)?;
        let mut written = Vec::with_capacity(summary.coordinate_files.len() + 2);
        written.push(summary.scan_file);
        written.extend(summary.coordinate_files);
        written.extend(summary.campaign_file);
        Ok(written)
    }

    fn to_value(&self) -> Result<JsonValue, ScanError> {
        Scan::to_value(self)
    }

    fn set_output_root(&mut self, root: &Path) {
        Scan::set_output_root(self, root);
    }
}

impl<F: CoordinateHooks> ScanTask for SingleCoordinate<F> {
    fn type_name(&self) -> &'static str {
        F::SINGLE_TYPE_NAME
    }

    fn form_type_name(&self) -> &'static str {
        F::TYPE_NAME
    }

    fn coordinate_count(&self) -> Result<usize, ScanError> {
        Ok(1)
    }

    fn execute(&self, mode: ExecutionMode) -> Result<Vec<PathBuf>, ScanError> {
        SingleCoordinate::execute(self, mode).map(|file| vec![file])
    }

    fn to_value(&self) -> Result<JsonValue, ScanError> {
        SingleCoordinate::to_value(self)
    }

    fn set_output_root(&mut self, root: &Path) {
        self.set_scan_output_root(root);
    }
}

type Loader = fn(&JsonValue, Arc<ScanSettings>) -> Result<Box<dyn ScanTask>, ScanError>;

fn load_scan<F: CoordinateHooks, S: ScanStrategy>(
    value: &JsonValue,
    settings: Arc<ScanSettings>,
) -> Result<Box<dyn ScanTask>, ScanError> {
    Ok(Box::new(Scan::<F, S>::from_value(value, settings)?))
}

fn load_coordinate<F: CoordinateHooks>(
    value: &JsonValue,
    settings: Arc<ScanSettings>,
) -> Result<Box<dyn ScanTask>, ScanError> {
    Ok(Box::new(SingleCoordinate::<F>::from_value(value, settings)?))
}

/// Registry of known scans and single coordinates
#[derive(Clone)]
pub struct TypeRegistry {
    names: IndexSet<String>,
    strategies: IndexSet<&'static str>,
    forms: IndexSet<&'static str>,
    scans: IndexMap<(&'static str, &'static str), Loader>,
    coordinates: IndexMap<&'static str, Loader>,
    settings: Arc<ScanSettings>,
}

impl Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("names", &self.names)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create registry knowing the grid and coupled strategies
    #[must_use]
    pub fn new() -> Self {
        let mut names = IndexSet::new();
        let mut strategies = IndexSet::new();
        for strategy in [Grid::TYPE_NAME, Coupled::TYPE_NAME] {
            names.insert(strategy.to_string());
            strategies.insert(strategy);
        }

        Self {
            names,
            strategies,
            forms: IndexSet::new(),
            scans: IndexMap::new(),
            coordinates: IndexMap::new(),
            settings: Arc::new(ScanSettings::default()),
        }
    }

    /// Settings handed to every loaded task
    #[must_use]
    pub fn with_settings(mut self, settings: ScanSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Register a form with its single coordinate and both scan strategies
    ///
    /// # Errors
    /// Returns [`RegistryError::Duplicate`] if either tag is already known
    pub fn register_form<F: CoordinateHooks>(&mut self) -> Result<&mut Self, RegistryError> {
        for name in [F::TYPE_NAME, F::SINGLE_TYPE_NAME] {
            if self.names.contains(name) {
                return Err(RegistryError::Duplicate(name.to_string()));
            }
        }
        if F::TYPE_NAME == F::SINGLE_TYPE_NAME {
            return Err(RegistryError::Duplicate(F::TYPE_NAME.to_string()));
        }

        self.names.insert(F::TYPE_NAME.to_string());
        self.names.insert(F::SINGLE_TYPE_NAME.to_string());
        self.forms.insert(F::TYPE_NAME);
        self.coordinates
            .insert(F::SINGLE_TYPE_NAME, load_coordinate::<F> as Loader);
        self.scans
            .insert((Grid::TYPE_NAME, F::TYPE_NAME), load_scan::<F, Grid> as Loader);
        self.scans
            .insert((Coupled::TYPE_NAME, F::TYPE_NAME), load_scan::<F, Coupled> as Loader);

        debug!(form = F::TYPE_NAME, single = F::SINGLE_TYPE_NAME, "registered form");
        Ok(self)
    }

    /// Check if a tag is known
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// All known tags in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Number of known tags
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no tag is known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Recover the exact scan or single coordinate a document describes
    ///
    /// # Errors
    /// Returns a registry error for missing or unknown tags, or the task's
    /// own deserialization error
    pub fn deserialize(&self, value: &JsonValue) -> Result<Box<dyn ScanTask>, ScanError> {
        let tag = type_tag(value)
            .or_else(|| value.get("obi_class").and_then(JsonValue::as_str))
            .ok_or(RegistryError::MissingTag)?;

        if let Some(load) = self.coordinates.get(tag) {
            return load(value, Arc::clone(&self.settings));
        }
        if self.forms.contains(tag) {
            return Err(RegistryError::UnwrappedForm(tag.to_string()).into());
        }

        let Some(strategy) = self.strategies.get(tag).copied() else {
            return Err(RegistryError::UnknownType(tag.to_string()).into());
        };
        let form_tag = value
            .get("form")
            .and_then(type_tag)
            .ok_or(RegistryError::MissingTag)?;
        let load = self
            .scans
            .iter()
            .find_map(|((s, f), load)| (*s == strategy && *f == form_tag).then_some(*load))
            .ok_or_else(|| RegistryError::UnknownType(form_tag.to_string()))?;
        load(value, Arc::clone(&self.settings))
    }

    /// Recover a bare form document of a registered form
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownType`] if `F` is not registered,
    /// [`RegistryError::TypeMismatch`] if the document is tagged with another
    /// type, or the form's deserialization error
    pub fn deserialize_form<F: Form>(&self, value: &JsonValue) -> Result<F, ScanError> {
        if !self.forms.contains(F::TYPE_NAME) {
            return Err(RegistryError::UnknownType(F::TYPE_NAME.to_string()).into());
        }
        match type_tag(value) {
            Some(tag) if tag == F::TYPE_NAME => {}
            Some(tag) => {
                return Err(RegistryError::TypeMismatch {
                    expected: F::TYPE_NAME.to_string(),
                    found: tag.to_string(),
                }
                .into())
            }
            None => return Err(RegistryError::MissingTag.into()),
        }

        let mut fields = value.as_object().cloned().unwrap_or_default();
        fields.shift_remove(TYPE_KEY);
        serde_json::from_value::<F>(JsonValue::Object(fields)).map_err(|source| ScanError::Deserialization {
            what: F::TYPE_NAME.to_string(),
            source,
        })
    }

    /// Read a JSON or YAML document and deserialize it
    ///
    /// # Errors
    /// Returns error if the file cannot be read or describes no known task
    pub fn load(&self, path: &Path) -> Result<Box<dyn ScanTask>, ScanError> {
        self.deserialize(&read_document(path)?)
    }
}
