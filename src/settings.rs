//! Settings file.
//!
//! Settings are read from a YAML file. Relative paths inside it are resolved
//! against the directory holding the file, so a project can keep its settings,
//! registries and static assets side by side.

use crate::error::{Error, Result};
use crate::mapping::MappingOptions;
use crate::openapi_builder::Info;
use crate::registry::{load_registries, Api};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable naming the settings file
pub const SETTINGS_ENV: &str = "TASTYPIE_OPENAPI_SETTINGS";

/// Settings file used when neither the CLI nor the environment names one
pub const DEFAULT_SETTINGS_FILE: &str = "tastypie_openapi.yaml";

pub const DEFAULT_INDEX_TITLE: &str = "Swagger UI";

/// Validated settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Registry files or directories of registry files
    pub api_module_list: Vec<PathBuf>,
    pub open_api_info: Info,
    pub server_url: Option<String>,
    pub index_title: String,
    pub docs_dir: Option<PathBuf>,
    pub static_dir: PathBuf,
    pub ignore_pattern_list: Vec<String>,
    pub trailing_slash: bool,
    pub url_prefix: String,
    pub include_models: bool,
    pub bind: SocketAddr,
}

/// Raw layout of the settings file
#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    api_module_list: Vec<PathBuf>,
    #[serde(default)]
    open_api_info: Option<Info>,
    #[serde(default)]
    server_url: Option<String>,
    #[serde(default)]
    index_title: Option<String>,
    #[serde(default)]
    docs_dir: Option<PathBuf>,
    #[serde(default)]
    static_dir: Option<PathBuf>,
    #[serde(default)]
    ignore_pattern_list: Vec<String>,
    #[serde(default)]
    trailing_slash: Option<bool>,
    #[serde(default)]
    url_prefix: Option<String>,
    #[serde(default)]
    include_models: bool,
    #[serde(default)]
    bind: Option<SocketAddr>,
}

impl Settings {
    /// Resolve which settings file to use: explicit path, then the environment,
    /// then the default file name.
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    /// Load and validate a settings file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_yaml_str(&content, base_dir)
    }

    /// Parse settings from YAML, resolving relative paths against `base_dir`
    pub fn from_yaml_str(content: &str, base_dir: &Path) -> Result<Self> {
        let raw: SettingsFile = serde_yaml::from_str(content)
            .map_err(|e| Error::configuration(format!("invalid settings: {}", e)))?;

        if raw.api_module_list.is_empty() {
            return Err(Error::configuration(
                "Must define api_module_list in settings as a list of resource registries",
            ));
        }
        let open_api_info = raw.open_api_info.ok_or_else(|| {
            Error::configuration("Must define open_api_info in settings (title and version)")
        })?;

        let resolve = |p: PathBuf| -> PathBuf {
            if p.is_absolute() {
                p
            } else {
                base_dir.join(p)
            }
        };

        Ok(Self {
            api_module_list: raw.api_module_list.into_iter().map(resolve).collect(),
            open_api_info,
            server_url: raw.server_url,
            index_title: raw
                .index_title
                .unwrap_or_else(|| DEFAULT_INDEX_TITLE.to_string()),
            docs_dir: raw.docs_dir.map(resolve),
            static_dir: resolve(raw.static_dir.unwrap_or_else(|| PathBuf::from("static"))),
            ignore_pattern_list: raw.ignore_pattern_list,
            trailing_slash: raw.trailing_slash.unwrap_or(true),
            url_prefix: raw.url_prefix.unwrap_or_else(|| "/api".to_string()),
            include_models: raw.include_models,
            bind: raw
                .bind
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8000))),
        })
    }

    pub fn mapping_options(&self) -> MappingOptions {
        MappingOptions {
            trailing_slash: self.trailing_slash,
            url_prefix: self.url_prefix.clone(),
        }
    }

    /// Load every registry named in `api_module_list`
    pub fn load_apis(&self) -> Result<Vec<Api>> {
        load_registries(&self.api_module_list)
    }

    /// Output directory of `build-docs`
    pub fn docs_dir(&self) -> Result<&Path> {
        self.docs_dir
            .as_deref()
            .ok_or_else(|| Error::configuration("Must define docs_dir in settings to build docs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
api_module_list: [registry.yaml]
open_api_info:
  title: Library
  version: "1.0"
"#;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_yaml_str(MINIMAL, Path::new("/srv/docs")).unwrap();

        assert_eq!(settings.index_title, "Swagger UI");
        assert_eq!(
            settings.api_module_list,
            vec![PathBuf::from("/srv/docs/registry.yaml")]
        );
        assert_eq!(settings.static_dir, PathBuf::from("/srv/docs/static"));
        assert!(settings.trailing_slash);
        assert_eq!(settings.url_prefix, "/api");
        assert!(!settings.include_models);
        assert!(settings.server_url.is_none());
        assert_eq!(settings.bind.port(), 8000);
        assert!(settings.docs_dir().is_err());
    }

    #[test]
    fn test_absolute_paths_kept() {
        let content = format!("{}docs_dir: /tmp/out\n", MINIMAL);
        let settings = Settings::from_yaml_str(&content, Path::new("/srv/docs")).unwrap();
        assert_eq!(settings.docs_dir().unwrap(), Path::new("/tmp/out"));
    }

    #[test]
    fn test_missing_module_list_is_configuration_error() {
        let err = Settings::from_yaml_str(
            "open_api_info: {title: Library, version: '1'}",
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("api_module_list"));
    }

    #[test]
    fn test_missing_info_is_configuration_error() {
        let err = Settings::from_yaml_str("api_module_list: [a.yaml]", Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("open_api_info"));
    }

    #[test]
    fn test_load_resolves_against_settings_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::write(&path, MINIMAL).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(
            settings.api_module_list,
            vec![temp_dir.path().join("registry.yaml")]
        );
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let located = Settings::locate(Some(Path::new("custom.yaml")));
        assert_eq!(located, PathBuf::from("custom.yaml"));
    }

    #[test]
    fn test_mapping_options() {
        let content = format!("{}trailing_slash: false\nurl_prefix: /rest\n", MINIMAL);
        let settings = Settings::from_yaml_str(&content, Path::new(".")).unwrap();
        let options = settings.mapping_options();
        assert!(!options.trailing_slash);
        assert_eq!(options.url_prefix, "/rest");
    }
}
