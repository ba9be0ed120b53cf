//! Launch flow of `obi-launch`
//!
//! Fetch the configuration asset of an entity into the local cache, recover
//! the scan or single coordinate from its type tag, point it at the output
//! root and execute it. When an activity is given its `status` attribute
//! tracks the launch.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use obi_scan::{ExecutionMode, TypeRegistry};
use serde_json::{Map, Value as JsonValue};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::store::EntityStore;

/// Attribute of an activity entity holding its [`ActivityStatus`]
pub const STATUS_ATTR: &str = "status";

/// Arguments of one launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs {
    pub entity_type: String,
    pub entity_id: String,
    pub config_asset_id: String,
    /// Directory the configuration asset is downloaded into
    pub entity_cache: PathBuf,
    pub scan_output_root: PathBuf,
    pub virtual_lab_id: Uuid,
    pub project_id: Uuid,
    pub activity_type: Option<String>,
    pub activity_id: Option<String>,
    pub mode: ExecutionMode,
}

impl LaunchArgs {
    /// Command line reproducing these arguments
    #[must_use]
    pub fn to_command_line(&self) -> Vec<String> {
        let mut args = vec![
            "--entity_type".to_string(),
            self.entity_type.clone(),
            "--entity_id".to_string(),
            self.entity_id.clone(),
            "--config_asset_id".to_string(),
            self.config_asset_id.clone(),
            "--entity_cache".to_string(),
            self.entity_cache.display().to_string(),
            "--scan_output_root".to_string(),
            self.scan_output_root.display().to_string(),
            "--virtual_lab_id".to_string(),
            self.virtual_lab_id.to_string(),
            "--project_id".to_string(),
            self.project_id.to_string(),
        ];
        if let Some(activity_type) = &self.activity_type {
            args.extend(["--activity_type".to_string(), activity_type.clone()]);
        }
        if let Some(activity_id) = &self.activity_id {
            args.extend(["--activity_id".to_string(), activity_id.clone()]);
        }
        args.extend(["--mode".to_string(), self.mode.to_string()]);
        args
    }

    fn activity(&self) -> Option<(&str, &str)> {
        Some((self.activity_type.as_deref()?, self.activity_id.as_deref()?))
    }
}

/// Lifecycle of a tracked activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Running,
    Done,
    Error,
}

impl Display for ActivityStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        })
    }
}

/// Outcome of a successful launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    /// Type tag of the executed task
    pub task_type: String,
    /// Local copy of the configuration asset
    pub config_file: PathBuf,
    /// Files written by the task
    pub written: Vec<PathBuf>,
}

/// Set the status attribute of an activity
///
/// # Errors
/// Returns [`ClientError::NotFound`] if the activity does not exist
pub fn set_activity_status(
    store: &dyn EntityStore,
    activity_type: &str,
    activity_id: &str,
    status: ActivityStatus,
) -> Result<(), ClientError> {
    let mut attrs = Map::new();
    attrs.insert(STATUS_ATTR.to_string(), JsonValue::String(status.to_string()));
    store.update_entity(activity_id, activity_type, attrs)?;
    info!(activity_type, activity_id, %status, "activity status updated");
    Ok(())
}

/// Execute the configuration asset named by `args`
///
/// # Errors
/// Returns error if the asset cannot be fetched or recovered, or the task
/// fails; the activity, if any, is marked `error` first
pub fn launch(
    args: &LaunchArgs,
    store: &dyn EntityStore,
    registry: &TypeRegistry,
) -> Result<LaunchReport, ClientError> {
    let activity = args.activity();
    if let Some((activity_type, activity_id)) = activity {
        set_activity_status(store, activity_type, activity_id, ActivityStatus::Running)?;
    }

    let result = execute(args, store, registry);

    if let Some((activity_type, activity_id)) = activity {
        if result.is_ok() {
            set_activity_status(store, activity_type, activity_id, ActivityStatus::Done)?;
        } else if let Err(err) = set_activity_status(store, activity_type, activity_id, ActivityStatus::Error) {
            warn!(activity_type, activity_id, error = %err, "failed to mark activity as errored");
        }
    }

    if let Err(err) = &result {
        error!(entity_id = %args.entity_id, error = %err, "launch failed");
    }
    result
}

fn execute(args: &LaunchArgs, store: &dyn EntityStore, registry: &TypeRegistry) -> Result<LaunchReport, ClientError> {
    let entity = store.get_entity(&args.entity_id, &args.entity_type)?;
    let asset = entity
        .asset(&args.config_asset_id)
        .ok_or_else(|| ClientError::AssetNotFound {
            entity_type: args.entity_type.clone(),
            entity_id: args.entity_id.clone(),
            asset_id: args.config_asset_id.clone(),
        })?;

    let cache_dir = args.entity_cache.join(&args.entity_type).join(&args.entity_id);
    std::fs::create_dir_all(&cache_dir).map_err(|source| ClientError::io(&cache_dir, source))?;
    let file_name = if asset.path.is_empty() {
        format!("{}.json", asset.id)
    } else {
        asset.path.clone()
    };
    let config_file = store.download_file(
        &args.entity_id,
        &args.entity_type,
        &args.config_asset_id,
        &cache_dir.join(file_name),
    )?;

    let mut task = registry.load(&config_file)?;
    task.set_output_root(&args.scan_output_root);
    info!(
        task = task.type_name(),
        form = task.form_type_name(),
        coordinates = task.coordinate_count()?,
        mode = %args.mode,
        project_id = %args.project_id,
        virtual_lab_id = %args.virtual_lab_id,
        "launching"
    );

    let written = task.execute(args.mode)?;
    Ok(LaunchReport {
        task_type: task.type_name().to_string(),
        config_file,
        written,
    })
}
