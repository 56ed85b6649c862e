//! Resource registries.
//!
//! An [`Api`] groups resources under one API name (`v1`, `internal`, ...) the same
//! way a Tastypie `Api` instance does. Registries can be assembled in code from any
//! [`Resource`] implementation or loaded from YAML/JSON registry files describing
//! each resource with a [`ResourceDescriptor`].

use crate::error::{Error, Result};
use crate::resource::{FieldSchema, Resource, ResourceMeta, ResourceSchema};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// A named registry of resources.
#[derive(Clone)]
pub struct Api {
    api_name: String,
    registry: BTreeMap<String, Arc<dyn Resource>>,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("api_name", &self.api_name)
            .field("resources", &self.registry.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Api {
    pub fn new(api_name: &str) -> Result<Self> {
        if api_name.trim().is_empty() {
            return Err(Error::configuration("api_name must not be empty"));
        }
        Ok(Self {
            api_name: api_name.to_string(),
            registry: BTreeMap::new(),
        })
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// Register a resource under its `resource_name`
    pub fn register(&mut self, resource: Arc<dyn Resource>) -> Result<()> {
        let name = resource.meta().resource_name.clone();
        if name.trim().is_empty() {
            return Err(Error::configuration(format!(
                "a resource registered on api {} has no resource_name",
                self.api_name
            )));
        }
        if self.registry.contains_key(&name) {
            return Err(Error::configuration(format!(
                "resource {} is registered twice on api {}",
                name, self.api_name
            )));
        }
        debug!("Registering resource {} on api {}", name, self.api_name);
        self.registry.insert(name, resource);
        Ok(())
    }

    pub fn resource(&self, name: &str) -> Option<&Arc<dyn Resource>> {
        self.registry.get(name)
    }

    /// Registered resources in sorted name order
    pub fn resources(&self) -> impl Iterator<Item = &Arc<dyn Resource>> {
        self.registry.values()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

/// A resource described entirely by data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub meta: ResourceMeta,
    #[serde(default)]
    pub schema: ResourceSchema,
}

impl Resource for ResourceDescriptor {
    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn build_schema(&self) -> ResourceSchema {
        self.schema.clone()
    }

    fn pk_field(&self) -> Option<FieldSchema> {
        self.schema.fields.get("id").cloned()
    }
}

/// One Api entry of a registry file
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDescriptor {
    pub api_name: String,
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
}

/// Top-level layout of a registry file
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryFile {
    pub apis: Vec<ApiDescriptor>,
}

impl RegistryFile {
    /// Parse a registry document; the format is chosen from the file extension
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let parsed = match extension {
            "yaml" | "yml" => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(content).map_err(|e| e.to_string()),
            _ => {
                return Err(Error::configuration(format!(
                    "{} is not a registry file (expected .yaml, .yml or .json)",
                    path.display()
                )))
            }
        };
        parsed.map_err(|message| {
            Error::configuration(format!(
                "{} is not a valid resource registry: {}",
                path.display(),
                message
            ))
        })
    }

    pub fn into_apis(self) -> Result<Vec<Api>> {
        let mut apis = Vec::with_capacity(self.apis.len());
        for descriptor in self.apis {
            let mut api = Api::new(&descriptor.api_name)?;
            for resource in descriptor.resources {
                api.register(Arc::new(resource))?;
            }
            apis.push(api);
        }
        Ok(apis)
    }
}

fn is_registry_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}

/// Expand a registry entry: files are taken as-is, directories are walked for
/// registry files in file-name order, skipping hidden entries.
pub fn collect_registry_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(Error::configuration(format!(
            "{} is not a valid registry path",
            path.display()
        )));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
    {
        match entry {
            Ok(entry) => {
                let entry_path = entry.path();
                if entry_path.is_file() && is_registry_file(entry_path) {
                    files.push(entry_path.to_path_buf());
                }
            }
            Err(e) => warn!("Failed to access path: {}", e),
        }
    }
    Ok(files)
}

/// Load a single registry file
pub fn load_registry(path: &Path) -> Result<Vec<Api>> {
    debug!("Loading resource registry: {}", path.display());
    let content = fs::read_to_string(path)?;
    RegistryFile::parse(&content, path)?.into_apis()
}

/// Load every configured registry, in configuration order
pub fn load_registries(paths: &[PathBuf]) -> Result<Vec<Api>> {
    if paths.is_empty() {
        return Err(Error::configuration(
            "Must define api_module_list in settings as a list of resource registries",
        ));
    }

    let mut apis = Vec::new();
    for path in paths {
        for file in collect_registry_files(path)? {
            apis.extend(load_registry(&file)?);
        }
    }

    info!(
        "Loaded {} api(s) with {} resource(s)",
        apis.len(),
        apis.iter().map(Api::len).sum::<usize>()
    );
    Ok(apis)
}
