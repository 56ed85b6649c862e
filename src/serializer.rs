//! Output encodings of the OpenAPI document.
//!
//! Every map in the document is ordered, so encoding the same document twice
//! yields identical bytes.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// YAML, for `generate -f yaml`
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Encoding {} path(s) as YAML", doc.paths.len());
    serde_yaml::to_string(doc).context("Failed to encode OpenAPI document as YAML")
}

/// Indented JSON, the default output of `generate`
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Encoding {} path(s) as JSON", doc.paths.len());
    serde_json::to_string_pretty(doc).context("Failed to encode OpenAPI document as JSON")
}

/// Single-line JSON, the form embedded in the documentation page
pub fn serialize_json_compact(doc: &OpenApiDocument) -> Result<String> {
    serde_json::to_string(doc).context("Failed to encode OpenAPI document as JSON")
}

/// Write `content` to `path`, creating missing parent directories.
///
/// An existing file is replaced.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi_builder::{Info, OpenApiBuilder};
    use crate::registry::{Api, ResourceDescriptor};
    use crate::resource::{ResourceMeta, ResourceSchema};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn library_document() -> OpenApiDocument {
        let mut info = Info::new("Library API", "1.0.0");
        info.description = Some("Books and authors".to_string());

        let mut api = Api::new("v1").unwrap();
        api.register(Arc::new(ResourceDescriptor {
            meta: ResourceMeta::new("book"),
            schema: ResourceSchema::default(),
        }))
        .unwrap();

        let mut builder = OpenApiBuilder::new(info).with_server("http://localhost/");
        builder.add_api(&api);
        builder.build()
    }

    #[test]
    fn test_serialize_yaml() {
        let doc = library_document();
        let yaml = serialize_yaml(&doc).unwrap();

        assert!(yaml.contains("openapi: 3.0.1") || yaml.contains("openapi: '3.0.1'"));
        assert!(yaml.contains("title: Library API"));
        assert!(yaml.contains("paths:"));
        assert!(yaml.contains("/api/v1/book/"));
        assert!(yaml.contains("get:"));
    }

    #[test]
    fn test_serialize_json() {
        let doc = library_document();
        let json = serialize_json(&doc).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.1");
        assert_eq!(parsed["info"]["title"], "Library API");
        assert_eq!(parsed["servers"][0]["url"], "http://localhost/");
        assert!(parsed["paths"]["/api/v1/book/{id}/"]["get"].is_object());
    }

    #[test]
    fn test_json_is_indented() {
        let doc = library_document();
        let json = serialize_json(&doc).unwrap();

        assert!(json.contains('\n'));
        assert!(json.lines().count() > 5, "indented JSON spans several lines");
    }

    #[test]
    fn test_compact_json_is_single_line_and_stable() {
        let first = serialize_json_compact(&library_document()).unwrap();
        let second = serialize_json_compact(&library_document()).unwrap();

        assert!(!first.contains('\n'));
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("openapi.json");

        write_to_file("{}", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "{}");
    }

    #[test]
    fn test_write_to_file_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.yaml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }
}
