//! Layered defaults for resource entries.
//!
//! Defaults live in two directory trees that the pipeline has already
//! checked out:
//!
//! ```text
//! <products_dir>/<project>/<type>/<env>/default.json       product defaults
//! <overrides_dir>/<type>/eit-enforced-default.json         enforced defaults
//! <overrides_dir>/<type>/<cloud_project>/default.json      cloud project defaults
//! <overrides_dir>/<type>/<cloud_project>/<name>.json       resource overrides
//! ```
//!
//! Layers are merged over the entry in that order, each one taking
//! precedence over everything before it. Only entries with an `env`
//! attribute are layered.

pub mod merge;

use crate::error::{Error, Result};
use crate::types::{ResourceConfig, ResourceEntry};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Project used when none is configured.
pub const DEFAULT_PROJECT_NAME: &str = "Enterprise_IT___IOPS___Orchestration";

/// Attributes that may name the cloud project, in lookup order.
const CLOUD_PROJECT_KEYS: [&str; 4] = [
    "cloud_project",
    "aws_account",
    "cloud_account",
    "account_name",
];

/// Keys a defaults layer may never change.
const PROTECTED_KEYS: [&str; 2] = ["type", "resource_name"];

/// Where defaults are read from and how failures are treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultsSettings {
    pub products_dir: Option<PathBuf>,
    pub overrides_dir: Option<PathBuf>,
    pub project_name: String,
    pub cloud_project: Option<String>,
    /// Leave an entry unchanged when one of its layers cannot be loaded
    pub skip_missing_defaults: bool,
}

impl Default for DefaultsSettings {
    fn default() -> Self {
        Self {
            products_dir: None,
            overrides_dir: None,
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            cloud_project: None,
            skip_missing_defaults: true,
        }
    }
}

impl DefaultsSettings {
    /// Whether any defaults source is configured.
    pub fn is_enabled(&self) -> bool {
        self.products_dir.is_some() || self.overrides_dir.is_some()
    }
}

/// Applies configured defaults layers to resource entries.
pub struct DefaultsLayering<'a> {
    settings: &'a DefaultsSettings,
}

impl<'a> DefaultsLayering<'a> {
    pub fn new(settings: &'a DefaultsSettings) -> Self {
        Self { settings }
    }

    /// Apply defaults to every entry of a config.
    pub fn apply(&self, config: ResourceConfig) -> Result<ResourceConfig> {
        if !self.settings.is_enabled() {
            return Ok(config);
        }

        let cloud_project = self.cloud_project(&config);
        match &cloud_project {
            Some(project) => log::info!("Applying defaults (cloud project: {project})"),
            None => log::info!("Applying defaults (no cloud project, overrides skipped)"),
        }

        let mut position = 0;
        config.map_entries(|entry| {
            position += 1;
            self.apply_entry(entry, cloud_project.as_deref(), position)
        })
    }

    fn apply_entry(
        &self,
        entry: ResourceEntry,
        cloud_project: Option<&str>,
        position: usize,
    ) -> Result<ResourceEntry> {
        let Some(env) = entry.attribute_str("env").map(str::to_string) else {
            log::debug!("Entry {position}: no 'env' attribute, skipping defaults");
            return Ok(entry);
        };

        let layers = match self.load_layers(&entry, &env, cloud_project) {
            Ok(layers) => layers,
            Err(e) if self.settings.skip_missing_defaults => {
                log::warn!("Entry {position}: {e}; continuing without defaults");
                return Ok(entry);
            }
            Err(e) => return Err(e),
        };

        if layers.is_empty() {
            log::warn!(
                "Entry {position}: no defaults found for {}/{}",
                entry.resource_type,
                entry.resource_name
            );
            return Ok(entry);
        }

        let mut attributes = entry.attributes.clone();
        for layer in &layers {
            attributes = merge::merge_maps(&attributes, layer);
        }

        let changes = merge::detect_changes(&entry.attributes, &attributes);
        if !changes.is_empty() {
            log::info!(
                "Entry {position}: {} layer(s) applied: {}",
                layers.len(),
                changes.join(", ")
            );
        }

        Ok(ResourceEntry {
            attributes,
            ..entry
        })
    }

    /// Load every layer that exists for an entry, lowest priority first.
    fn load_layers(
        &self,
        entry: &ResourceEntry,
        env: &str,
        cloud_project: Option<&str>,
    ) -> Result<Vec<Map<String, Value>>> {
        let mut layers = Vec::new();
        for path in self.layer_paths(entry, env, cloud_project) {
            if let Some(layer) = load_layer(&path)? {
                log::debug!("Loaded defaults layer {}", path.display());
                layers.push(layer);
            }
        }
        Ok(layers)
    }

    /// Candidate layer files for an entry, lowest priority first.
    pub fn layer_paths(
        &self,
        entry: &ResourceEntry,
        env: &str,
        cloud_project: Option<&str>,
    ) -> Vec<PathBuf> {
        let resource_type = entry.resource_type.as_str();
        let mut paths = Vec::new();

        if let Some(products) = &self.settings.products_dir {
            paths.push(
                products
                    .join(&self.settings.project_name)
                    .join(resource_type)
                    .join(env)
                    .join("default.json"),
            );
        }

        if let Some(overrides) = &self.settings.overrides_dir {
            let type_dir = overrides.join(resource_type);
            paths.push(type_dir.join("eit-enforced-default.json"));
            if let Some(project) = cloud_project {
                paths.push(type_dir.join(project).join("default.json"));
                paths.push(
                    type_dir
                        .join(project)
                        .join(format!("{}.json", entry.resource_name)),
                );
            }
        }

        paths
    }

    /// Configured cloud project, or one named by the first entry.
    fn cloud_project(&self, config: &ResourceConfig) -> Option<String> {
        if let Some(project) = &self.settings.cloud_project {
            return Some(project.clone());
        }
        let first = config.entries().first()?;
        CLOUD_PROJECT_KEYS
            .iter()
            .find_map(|key| first.attribute_str(key))
            .map(str::to_string)
    }
}

/// Load one layer. A missing file is `None`; an empty file is an empty layer.
fn load_layer(path: &Path) -> Result<Option<Map<String, Value>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| Error::DefaultsLayer {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if content.trim().is_empty() {
        log::warn!("Empty defaults file: {}", path.display());
        return Ok(Some(Map::new()));
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(mut layer)) => {
            for key in PROTECTED_KEYS {
                layer.remove(key);
            }
            Ok(Some(layer))
        }
        Ok(_) => Err(Error::DefaultsLayer {
            path: path.to_path_buf(),
            message: "expected a JSON object".to_string(),
        }),
        Err(e) => Err(Error::DefaultsLayer {
            path: path.to_path_buf(),
            message: format!("invalid JSON: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn settings(products: &TempDir, overrides: &TempDir) -> DefaultsSettings {
        DefaultsSettings {
            products_dir: Some(products.path().to_path_buf()),
            overrides_dir: Some(overrides.path().to_path_buf()),
            project_name: "proj".to_string(),
            ..Default::default()
        }
    }

    fn config(entries: Vec<ResourceEntry>) -> ResourceConfig {
        ResourceConfig::new(entries).unwrap()
    }

    #[test]
    fn test_disabled_returns_config_unchanged() {
        let settings = DefaultsSettings::default();
        assert!(!settings.is_enabled());

        let original = config(vec![ResourceEntry::new("s3", "b").with_attribute("env", "dev")]);
        let result = DefaultsLayering::new(&settings).apply(original.clone()).unwrap();
        assert_eq!(result, original);
    }

    #[test]
    fn test_layers_apply_in_priority_order() {
        let products = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        write(
            products.path(),
            "proj/s3/dev/default.json",
            r#"{"versioning": false, "region": "us-east-1", "lifecycle_days": 30}"#,
        );
        write(overrides.path(), "s3/eit-enforced-default.json", r#"{"versioning": true}"#);
        write(overrides.path(), "s3/acct-1/default.json", r#"{"region": "eu-west-1"}"#);
        write(overrides.path(), "s3/acct-1/bucket.json", r#"{"lifecycle_days": 7}"#);

        let settings = settings(&products, &overrides);
        let entry = ResourceEntry::new("s3", "bucket")
            .with_attribute("env", "dev")
            .with_attribute("cloud_project", "acct-1")
            .with_attribute("owner_team", "infra");

        let result = DefaultsLayering::new(&settings).apply(config(vec![entry])).unwrap();
        let attrs = &result.entries()[0].attributes;

        assert_eq!(attrs.get("versioning"), Some(&json!(true)));
        assert_eq!(attrs.get("region"), Some(&json!("eu-west-1")));
        assert_eq!(attrs.get("lifecycle_days"), Some(&json!(7)));
        assert_eq!(attrs.get("owner_team"), Some(&json!("infra")));
    }

    #[test]
    fn test_layers_cannot_rename_resource() {
        let products = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        write(
            products.path(),
            "proj/s3/dev/default.json",
            r#"{"type": "rds", "resource_name": "other", "region": "us-east-1"}"#,
        );

        let settings = settings(&products, &overrides);
        let entry = ResourceEntry::new("s3", "bucket").with_attribute("env", "dev");
        let result = DefaultsLayering::new(&settings).apply(config(vec![entry])).unwrap();

        let entry = &result.entries()[0];
        assert_eq!(entry.resource_type, "s3");
        assert_eq!(entry.resource_name, "bucket");
        assert_eq!(entry.attribute_str("region"), Some("us-east-1"));
    }

    #[test]
    fn test_entry_without_env_is_untouched() {
        let products = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        write(overrides.path(), "s3/eit-enforced-default.json", r#"{"versioning": true}"#);

        let settings = settings(&products, &overrides);
        let entry = ResourceEntry::new("s3", "bucket");
        let result = DefaultsLayering::new(&settings).apply(config(vec![entry.clone()])).unwrap();
        assert_eq!(result.entries()[0], entry);
    }

    #[test]
    fn test_configured_cloud_project_wins() {
        let products = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        let settings = DefaultsSettings {
            cloud_project: Some("configured".to_string()),
            ..settings(&products, &overrides)
        };
        let layering = DefaultsLayering::new(&settings);

        let entry = ResourceEntry::new("s3", "bucket").with_attribute("aws_account", "from-entry");
        assert_eq!(
            layering.cloud_project(&config(vec![entry.clone()])),
            Some("configured".to_string())
        );

        let settings = DefaultsSettings {
            cloud_project: None,
            ..settings
        };
        let layering = DefaultsLayering::new(&settings);
        assert_eq!(
            layering.cloud_project(&config(vec![entry])),
            Some("from-entry".to_string())
        );
    }

    #[test]
    fn test_layer_paths_without_cloud_project() {
        let products = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        let settings = settings(&products, &overrides);
        let layering = DefaultsLayering::new(&settings);

        let paths = layering.layer_paths(&ResourceEntry::new("s3", "bucket"), "prod", None);
        assert_eq!(
            paths,
            vec![
                products.path().join("proj/s3/prod/default.json"),
                overrides.path().join("s3/eit-enforced-default.json"),
            ]
        );
    }

    #[test]
    fn test_invalid_layer_skipped_when_allowed() {
        let products = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        write(products.path(), "proj/s3/dev/default.json", "{not json");

        let settings = settings(&products, &overrides);
        let entry = ResourceEntry::new("s3", "bucket").with_attribute("env", "dev");
        let result = DefaultsLayering::new(&settings).apply(config(vec![entry.clone()])).unwrap();
        assert_eq!(result.entries()[0], entry);
    }

    #[test]
    fn test_invalid_layer_fails_when_strict() {
        let products = TempDir::new().unwrap();
        let overrides = TempDir::new().unwrap();
        write(products.path(), "proj/s3/dev/default.json", "[1, 2]");

        let settings = DefaultsSettings {
            skip_missing_defaults: false,
            ..settings(&products, &overrides)
        };
        let entry = ResourceEntry::new("s3", "bucket").with_attribute("env", "dev");
        let err = DefaultsLayering::new(&settings).apply(config(vec![entry])).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_empty_layer_file_is_empty_layer() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "empty.json", "  \n");
        assert_eq!(load_layer(&dir.path().join("empty.json")).unwrap(), Some(Map::new()));
        assert_eq!(load_layer(&dir.path().join("missing.json")).unwrap(), None);
    }
}
