use crate::error::{Error, Result};
use crate::mapping::{MappingOptions, ResourceMapping};
use crate::registry::Api;
use crate::resource::{HttpMethod, Resource};
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::settings::Settings;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// OpenAPI version emitted in every document
pub const OPENAPI_VERSION: &str = "3.0.1";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    servers: Vec<Server>,
    /// Paths collection (URL path -> PathItem)
    paths: BTreeMap<String, PathEntry>,
    options: MappingOptions,
    /// Present only when models are documented
    schema_gen: Option<SchemaGenerator>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any other info keys (contact, license, termsOfService, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Info {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            title: title.to_string(),
            version: version.to_string(),
            description: None,
            extra: BTreeMap::new(),
        }
    }
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// POST operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// PUT operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// DELETE operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// PATCH operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// OPTIONS operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    pub fn set_operation(&mut self, method: HttpMethod, operation: Operation) {
        let slot = match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        };
        *slot = Some(operation);
    }

    /// Methods that carry an operation, in declaration order
    pub fn methods(&self) -> Vec<HttpMethod> {
        [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Patch,
            HttpMethod::Options,
            HttpMethod::Head,
        ]
        .into_iter()
        .filter(|m| self.operation(*m).is_some())
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.methods().is_empty()
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Parameters (path, query)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Responses
    pub responses: BTreeMap<String, Response>,
}

/// Parameter location (path, query, header)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Parameter name
    pub name: String,
    /// Whether the parameter is required
    pub required: bool,
    pub description: String,
    /// Parameter schema
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    pub schemas: BTreeMap<String, Schema>,
}

/// A path entry: generated from resource metadata, or taken verbatim from a
/// resource documentation string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PathEntry {
    Generated(PathItem),
    Documented(Value),
}

impl PathEntry {
    pub fn as_generated(&self) -> Option<&PathItem> {
        match self {
            PathEntry::Generated(item) => Some(item),
            PathEntry::Documented(_) => None,
        }
    }
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    pub servers: Vec<Server>,
    /// API paths
    pub paths: BTreeMap<String, PathEntry>,
    /// Components (schemas), only when models are documented
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder
    pub fn new(info: Info) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info,
            servers: Vec::new(),
            paths: BTreeMap::new(),
            options: MappingOptions::default(),
            schema_gen: None,
        }
    }

    pub fn with_server(mut self, url: &str) -> Self {
        self.servers.push(Server {
            url: url.to_string(),
        });
        self
    }

    pub fn with_options(mut self, options: MappingOptions) -> Self {
        self.options = options;
        self
    }

    /// Also document the resource models under `components.schemas`
    pub fn with_models(mut self, include_models: bool) -> Self {
        self.schema_gen = include_models.then(SchemaGenerator::new);
        self
    }

    /// Add every resource of an Api, in sorted resource name order
    pub fn add_api(&mut self, api: &Api) {
        debug!("Adding api: {}", api.api_name());
        for resource in api.resources() {
            self.add_resource(api, resource.as_ref());
        }
    }

    /// Add the paths of one resource.
    ///
    /// A documentation string holding a JSON object replaces the generated
    /// paths; anything else falls back to the generated mapping.
    pub fn add_resource(&mut self, api: &Api, resource: &dyn Resource) {
        let mapping = ResourceMapping::new(resource, api, &self.options);
        debug!("Adding resource: {}", mapping.resource_name());

        match documented_paths(resource) {
            Some(documented) => {
                for (path, item) in documented {
                    self.paths.insert(path, PathEntry::Documented(item));
                }
            }
            None => {
                for (path, item) in mapping.build_paths() {
                    self.paths.insert(path, PathEntry::Generated(item));
                }
            }
        }

        if let Some(schema_gen) = self.schema_gen.as_mut() {
            schema_gen.add_resource(resource.meta(), mapping.schema());
        }
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let components = self.schema_gen.map(|schema_gen| Components {
            schemas: schema_gen.into_schemas(),
        });

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            servers: self.servers,
            paths: self.paths,
            components,
        }
    }
}

/// Paths declared in the resource documentation string, if it is a JSON object
fn documented_paths(resource: &dyn Resource) -> Option<serde_json::Map<String, Value>> {
    let doc = resource.meta().doc.as_deref()?;
    if doc.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(doc) {
        Ok(Value::Object(paths)) => Some(paths),
        Ok(_) => {
            debug!(
                "Documentation of {} is not a JSON object, using generated paths",
                resource.meta().resource_name
            );
            None
        }
        Err(e) => {
            debug!(
                "Documentation of {} is not JSON ({}), using generated paths",
                resource.meta().resource_name,
                e
            );
            None
        }
    }
}

/// Build the `paths` section for every resource of every Api
pub fn build_openapi_paths(apis: &[Api], options: &MappingOptions) -> BTreeMap<String, PathEntry> {
    let mut builder = OpenApiBuilder::new(Info::new("", "")).with_options(options.clone());
    for api in apis {
        builder.add_api(api);
    }
    builder.paths
}

/// Build the complete document.
///
/// `server_url` overrides the configured server URL; one of the two is required.
pub fn build_openapi_spec(
    settings: &Settings,
    apis: &[Api],
    server_url: Option<&str>,
) -> Result<OpenApiDocument> {
    let server_url = server_url
        .or(settings.server_url.as_deref())
        .ok_or_else(|| {
            Error::configuration("Must define server_url in settings to build the spec offline")
        })?;

    let mut builder = OpenApiBuilder::new(settings.open_api_info.clone())
        .with_server(server_url)
        .with_options(settings.mapping_options())
        .with_models(settings.include_models);

    for api in apis {
        builder.add_api(api);
    }

    let document = builder.build();
    info!(
        "Built OpenAPI document with {} path(s) for {}",
        document.paths.len(),
        server_url
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceDescriptor;
    use crate::resource::{FieldSchema, FieldType, ResourceMeta, ResourceSchema};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn resource(name: &str, doc: Option<&str>) -> ResourceDescriptor {
        let mut meta = ResourceMeta::new(name);
        meta.module = Some("library.api".to_string());
        meta.doc = doc.map(|d| d.to_string());
        let mut schema = ResourceSchema::default();
        schema
            .fields
            .insert("id".to_string(), FieldSchema::new(FieldType::Integer));
        ResourceDescriptor { meta, schema }
    }

    fn api_with(resources: Vec<ResourceDescriptor>) -> Api {
        let mut api = Api::new("v1").unwrap();
        for r in resources {
            api.register(Arc::new(r)).unwrap();
        }
        api
    }

    #[test]
    fn test_new_builder() {
        let builder = OpenApiBuilder::new(Info::new("Library", "1.0"));

        assert_eq!(builder.info.title, "Library");
        assert!(builder.paths.is_empty());
        assert!(builder.servers.is_empty());
        assert!(builder.schema_gen.is_none());
    }

    #[test]
    fn test_document_shape() {
        let api = api_with(vec![resource("book", None)]);
        let mut builder = OpenApiBuilder::new(Info::new("Library", "1.0"))
            .with_server("http://localhost:8000/");
        builder.add_api(&api);
        let document = builder.build();

        let value = serde_json::to_value(&document).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["openapi", "info", "servers", "paths"]);
        assert_eq!(value["openapi"], json!("3.0.1"));
        assert_eq!(value["servers"], json!([{"url": "http://localhost:8000/"}]));
        assert!(value["paths"]["/api/v1/book/"].is_object());
        assert!(value["paths"]["/api/v1/book/{id}/"].is_object());
    }

    #[test]
    fn test_documented_paths_replace_generated() {
        let doc = r#"{"/custom/books/": {"get": {"summary": "Hand written"}}}"#;
        let api = api_with(vec![resource("book", Some(doc))]);
        let paths = build_openapi_paths(&[api], &MappingOptions::default());

        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths["/custom/books/"],
            PathEntry::Documented(json!({"get": {"summary": "Hand written"}}))
        );
    }

    #[test]
    fn test_malformed_doc_falls_back() {
        let api = api_with(vec![
            resource("book", Some("Books in the catalogue.")),
            resource("shelf", Some("[1, 2, 3]")),
        ]);
        let paths = build_openapi_paths(&[api], &MappingOptions::default());

        assert!(paths["/api/v1/book/"].as_generated().is_some());
        assert!(paths["/api/v1/shelf/{id}/"].as_generated().is_some());
    }

    #[test]
    fn test_models_included_on_request() {
        let api = api_with(vec![resource("book", None)]);
        let mut builder = OpenApiBuilder::new(Info::new("Library", "1.0")).with_models(true);
        builder.add_api(&api);
        let document = builder.build();

        let schemas = document.components.unwrap().schemas;
        assert!(schemas.contains_key("book"));
        assert!(schemas.contains_key("book_list"));
    }

    #[test]
    fn test_info_extra_keys_flattened() {
        let info: Info = serde_yaml::from_str(
            "title: Library\nversion: '2'\ncontact:\n  email: dev@example.com\n",
        )
        .unwrap();
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["contact"]["email"], json!("dev@example.com"));
        assert_eq!(value["version"], json!("2"));
    }

    #[test]
    fn test_path_item_methods() {
        let mut item = PathItem::default();
        assert!(item.is_empty());
        item.set_operation(HttpMethod::Delete, Operation::default());
        item.set_operation(HttpMethod::Get, Operation::default());
        assert_eq!(item.methods(), vec![HttpMethod::Get, HttpMethod::Delete]);
    }
}
