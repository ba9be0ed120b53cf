//! Entity store
//!
//! [`EntityStore`] is the interface of the entity service the launcher
//! talks to. [`LocalEntityStore`] keeps entities as JSON files:
//!
//! ```text
//! <root>/<entity_type>/<id>.json
//! <root>/<entity_type>/<id>/assets/<asset_id>
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

/// A stored entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Server-assigned id; empty until registered
    #[serde(default)]
    pub id: String,
    /// Entity type
    pub entity_type: String,
    /// Free-form attributes
    #[serde(default)]
    pub attrs: Map<String, JsonValue>,
    /// Attached files
    #[serde(default)]
    pub assets: Vec<Asset>,
    /// Registration time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update time
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Create unregistered entity
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            entity_type: entity_type.into(),
            attrs: Map::new(),
            assets: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set attribute
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Find an attached asset
    #[must_use]
    pub fn asset(&self, asset_id: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.id == asset_id)
    }
}

/// A file attached to an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Asset id
    pub id: String,
    /// Original file name
    pub path: String,
    /// MIME type
    pub content_type: String,
    /// Role of the file on the entity
    pub label: String,
}

/// Entity service
pub trait EntityStore {
    /// Fetch one entity
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if it does not exist
    fn get_entity(&self, entity_id: &str, entity_type: &str) -> Result<Entity, ClientError>;

    /// Store a new entity and assign its id
    ///
    /// # Errors
    /// Returns error if the entity cannot be stored
    fn register_entity(&self, entity: Entity) -> Result<Entity, ClientError>;

    /// Merge attributes into an entity
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if it does not exist
    fn update_entity(
        &self,
        entity_id: &str,
        entity_type: &str,
        attrs: Map<String, JsonValue>,
    ) -> Result<Entity, ClientError>;

    /// Entities of a type whose attributes contain every query pair
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn search_entity(&self, entity_type: &str, query: &Map<String, JsonValue>) -> Result<Vec<Entity>, ClientError>;

    /// Content of an asset
    ///
    /// # Errors
    /// Returns [`ClientError::AssetNotFound`] if the asset does not exist
    fn download_content(&self, entity_id: &str, entity_type: &str, asset_id: &str) -> Result<Vec<u8>, ClientError>;

    /// Copy an asset to `output_path`
    ///
    /// # Errors
    /// Returns error if the asset cannot be read or written
    fn download_file(
        &self,
        entity_id: &str,
        entity_type: &str,
        asset_id: &str,
        output_path: &Path,
    ) -> Result<PathBuf, ClientError> {
        let content = self.download_content(entity_id, entity_type, asset_id)?;
        std::fs::write(output_path, content).map_err(|source| ClientError::io(output_path, source))?;
        Ok(output_path.to_path_buf())
    }

    /// Attach a file to an entity
    ///
    /// # Errors
    /// Returns error if the file cannot be read or the entity does not exist
    fn upload_file(
        &self,
        entity_id: &str,
        entity_type: &str,
        file_path: &Path,
        content_type: &str,
        asset_label: &str,
    ) -> Result<Asset, ClientError>;
}

/// File-backed entity store
#[derive(Debug, Clone)]
pub struct LocalEntityStore {
    root: PathBuf,
}

impl LocalEntityStore {
    /// Create store rooted at a directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn type_dir(&self, entity_type: &str) -> PathBuf {
        self.root.join(entity_type)
    }

    fn entity_file(&self, entity_id: &str, entity_type: &str) -> PathBuf {
        self.type_dir(entity_type).join(format!("{entity_id}.json"))
    }

    fn asset_file(&self, entity_id: &str, entity_type: &str, asset_id: &str) -> PathBuf {
        self.type_dir(entity_type)
            .join(entity_id)
            .join("assets")
            .join(asset_id)
    }

    fn write_entity(&self, entity: &Entity) -> Result<(), ClientError> {
        let dir = self.type_dir(&entity.entity_type);
        std::fs::create_dir_all(&dir).map_err(|source| ClientError::io(&dir, source))?;
        let path = self.entity_file(&entity.id, &entity.entity_type);
        let text = serde_json::to_string_pretty(entity)?;
        std::fs::write(&path, text).map_err(|source| ClientError::io(&path, source))
    }
}

impl EntityStore for LocalEntityStore {
    fn get_entity(&self, entity_id: &str, entity_type: &str) -> Result<Entity, ClientError> {
        let path = self.entity_file(entity_id, entity_type);
        let text = std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ClientError::NotFound {
                entity_type: entity_type.to_string(),
                entity_id: entity_id.to_string(),
            },
            _ => ClientError::io(&path, source),
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    fn register_entity(&self, mut entity: Entity) -> Result<Entity, ClientError> {
        entity.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        entity.created_at = now;
        entity.updated_at = now;
        self.write_entity(&entity)?;
        debug!(entity_type = %entity.entity_type, id = %entity.id, "registered entity");
        Ok(entity)
    }

    fn update_entity(
        &self,
        entity_id: &str,
        entity_type: &str,
        attrs: Map<String, JsonValue>,
    ) -> Result<Entity, ClientError> {
        let mut entity = self.get_entity(entity_id, entity_type)?;
        entity.attrs.extend(attrs);
        entity.updated_at = Utc::now();
        self.write_entity(&entity)?;
        Ok(entity)
    }

    fn search_entity(&self, entity_type: &str, query: &Map<String, JsonValue>) -> Result<Vec<Entity>, ClientError> {
        let dir = self.type_dir(entity_type);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(ClientError::io(&dir, source)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| ClientError::io(&dir, source))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| ClientError::io(&path, source))?;
            let entity: Entity = serde_json::from_str(&text)?;
            if query.iter().all(|(key, value)| entity.attrs.get(key) == Some(value)) {
                found.push(entity);
            }
        }
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    fn download_content(&self, entity_id: &str, entity_type: &str, asset_id: &str) -> Result<Vec<u8>, ClientError> {
        let entity = self.get_entity(entity_id, entity_type)?;
        if entity.asset(asset_id).is_none() {
            return Err(ClientError::AssetNotFound {
                entity_type: entity_type.to_string(),
                entity_id: entity_id.to_string(),
                asset_id: asset_id.to_string(),
            });
        }
        let path = self.asset_file(entity_id, entity_type, asset_id);
        std::fs::read(&path).map_err(|source| ClientError::io(&path, source))
    }

    fn upload_file(
        &self,
        entity_id: &str,
        entity_type: &str,
        file_path: &Path,
        content_type: &str,
        asset_label: &str,
    ) -> Result<Asset, ClientError> {
        let mut entity = self.get_entity(entity_id, entity_type)?;
        let asset = Asset {
            id: Uuid::new_v4().to_string(),
            path: file_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            content_type: content_type.to_string(),
            label: asset_label.to_string(),
        };

        let target = self.asset_file(entity_id, entity_type, &asset.id);
        if let Some(dir) = target.parent() {
            std::fs::create_dir_all(dir).map_err(|source| ClientError::io(dir, source))?;
        }
        std::fs::copy(file_path, &target).map_err(|source| ClientError::io(file_path, source))?;

        entity.assets.push(asset.clone());
        entity.updated_at = Utc::now();
        self.write_entity(&entity)?;
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, LocalEntityStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalEntityStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn register_then_get() {
        let (_dir, store) = store();
        let entity = store
            .register_entity(Entity::new("simulation_campaign").with_attr("name", "calcium"))
            .unwrap();
        assert!(!entity.id.is_empty());
        assert_eq!(store.get_entity(&entity.id, "simulation_campaign").unwrap(), entity);
    }

    #[test]
    fn missing_entity_is_not_found() {
        let (_dir, store) = store();
        let err = store.get_entity("nope", "simulation").unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[test]
    fn update_merges_attrs() {
        let (_dir, store) = store();
        let entity = store
            .register_entity(Entity::new("activity").with_attr("status", "created").with_attr("kind", "scan"))
            .unwrap();
        let mut attrs = Map::new();
        attrs.insert("status".into(), json!("running"));
        let updated = store.update_entity(&entity.id, "activity", attrs).unwrap();
        assert_eq!(updated.attrs["status"], "running");
        assert_eq!(updated.attrs["kind"], "scan");
    }

    #[test]
    fn search_by_attrs() {
        let (_dir, store) = store();
        store.register_entity(Entity::new("cell").with_attr("mtype", "L5_TPC")).unwrap();
        store.register_entity(Entity::new("cell").with_attr("mtype", "L4_SSC")).unwrap();

        let mut query = Map::new();
        query.insert("mtype".into(), json!("L5_TPC"));
        let found = store.search_entity("cell", &query).unwrap();
        assert_eq!(found.len(), 1);
        assert!(store.search_entity("unknown", &query).unwrap().is_empty());
    }

    #[test]
    fn upload_and_download() {
        let (dir, store) = store();
        let entity = store.register_entity(Entity::new("campaign")).unwrap();
        let source = dir.path().join("scan.json");
        std::fs::write(&source, b"{}").unwrap();

        let asset = store
            .upload_file(&entity.id, "campaign", &source, "application/json", "campaign_generation_config")
            .unwrap();
        assert_eq!(asset.path, "scan.json");
        assert_eq!(store.download_content(&entity.id, "campaign", &asset.id).unwrap(), b"{}");

        let copy = dir.path().join("copy.json");
        store.download_file(&entity.id, "campaign", &asset.id, &copy).unwrap();
        assert_eq!(std::fs::read(copy).unwrap(), b"{}");

        let err = store.download_content(&entity.id, "campaign", "missing").unwrap_err();
        assert!(matches!(err, ClientError::AssetNotFound { .. }));
    }
}
