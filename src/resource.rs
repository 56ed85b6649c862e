//! Resource metadata consumed by the mapping engine.
//!
//! A [`Resource`] is one REST endpoint family of the host API framework: a list URI,
//! a detail URI and a schema describing its fields, filters, ordering and allowed
//! HTTP methods. The types here mirror what a Tastypie resource reports through
//! `build_schema()` and its `Meta` options, so a registry written by hand (or exported
//! from a running service) can be documented without the service itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Query terms offered by the ORM when a filter is declared as [`FilterSpec::All`]
/// and the resource does not list its own.
pub const QUERY_TERMS: &[&str] = &[
    "exact",
    "iexact",
    "contains",
    "icontains",
    "in",
    "gt",
    "gte",
    "lt",
    "lte",
    "startswith",
    "istartswith",
    "endswith",
    "iendswith",
    "range",
    "year",
    "month",
    "day",
    "week_day",
    "isnull",
    "search",
    "regex",
    "iregex",
];

/// Terms offered on a relation declared as [`FilterSpec::AllWithRelations`].
/// Related primary keys are assumed to be integers.
pub const RELATION_QUERY_TERMS: &[&str] = &["gt", "in", "gte", "lt", "lte", "exact"];

/// Something that can be documented: metadata plus a build-schema call.
pub trait Resource: Send + Sync {
    /// Static resource options (name, URIs, extra actions, ...)
    fn meta(&self) -> &ResourceMeta;

    /// Report the resource schema, the equivalent of Tastypie's `build_schema()`
    fn build_schema(&self) -> ResourceSchema;

    /// The primary key field, if the resource has one
    fn pk_field(&self) -> Option<FieldSchema> {
        self.build_schema().fields.get("id").cloned()
    }
}

/// HTTP methods a resource may allow on its list or detail endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Lower-case method name, as used for OpenAPI operation keys
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// The dehydrated type Tastypie reports for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Related,
    List,
    Dict,
    File,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Time => "time",
            FieldType::Related => "related",
            FieldType::List => "list",
            FieldType::Dict => "dict",
            FieldType::File => "file",
            FieldType::Other(name) => name,
        }
    }

    /// OpenAPI `(type, format)` pair for this field type
    pub fn openapi_type(&self) -> (&'static str, Option<&'static str>) {
        match self {
            FieldType::String => ("string", None),
            FieldType::Integer => ("integer", None),
            FieldType::Float => ("number", Some("float")),
            FieldType::Decimal => ("string", Some("decimal")),
            FieldType::Boolean => ("boolean", None),
            FieldType::Date => ("string", Some("date")),
            FieldType::DateTime => ("string", Some("date-time")),
            FieldType::Time => ("string", Some("time")),
            FieldType::Related => ("string", None),
            FieldType::List => ("array", None),
            FieldType::Dict => ("object", None),
            FieldType::File => ("string", Some("binary")),
            FieldType::Other(_) => ("string", None),
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "string" => FieldType::String,
            "integer" => FieldType::Integer,
            "float" => FieldType::Float,
            "decimal" => FieldType::Decimal,
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "time" => FieldType::Time,
            "related" => FieldType::Related,
            "list" => FieldType::List,
            "dict" => FieldType::Dict,
            "file" => FieldType::File,
            _ => FieldType::Other(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

/// Cardinality of a related field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedType {
    ToOne,
    ToMany,
}

/// One entry of the `fields` section of a resource schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub help_text: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub blank: bool,
    #[serde(default)]
    pub unique: bool,
    /// Absent means "not provided"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_type: Option<RelatedType>,
    /// Name of the related resource inside the same Api
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_resource: Option<String>,
}

impl FieldSchema {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            help_text: String::new(),
            nullable: false,
            readonly: false,
            blank: false,
            unique: false,
            default: None,
            related_type: None,
            related_resource: None,
        }
    }

    pub fn with_help_text(mut self, help_text: &str) -> Self {
        self.help_text = help_text.to_string();
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the field as a relation to `resource`
    pub fn related(mut self, related_type: RelatedType, resource: &str) -> Self {
        self.related_type = Some(related_type);
        self.related_resource = Some(resource.to_string());
        self
    }

    pub fn is_related(&self) -> bool {
        self.related_type.is_some() || self.field_type == FieldType::Related
    }
}

/// How a field may be filtered.
///
/// On the wire `1` means every ORM query term, `2` means every term including
/// filtering across the relation, and a list names the allowed terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter", into = "RawFilter")]
pub enum FilterSpec {
    All,
    AllWithRelations,
    Terms(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawFilter {
    Level(u64),
    Named(String),
    Terms(Vec<String>),
}

impl TryFrom<RawFilter> for FilterSpec {
    type Error = String;

    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        match raw {
            RawFilter::Level(1) => Ok(FilterSpec::All),
            RawFilter::Level(2) => Ok(FilterSpec::AllWithRelations),
            RawFilter::Level(other) => Err(format!("unknown filter level {}", other)),
            RawFilter::Named(name) => match name.as_str() {
                "ALL" => Ok(FilterSpec::All),
                "ALL_WITH_RELATIONS" => Ok(FilterSpec::AllWithRelations),
                _ => Ok(FilterSpec::Terms(vec![name])),
            },
            RawFilter::Terms(terms) => Ok(FilterSpec::Terms(terms)),
        }
    }
}

impl From<FilterSpec> for RawFilter {
    fn from(spec: FilterSpec) -> Self {
        match spec {
            FilterSpec::All => RawFilter::Level(1),
            FilterSpec::AllWithRelations => RawFilter::Level(2),
            FilterSpec::Terms(terms) => RawFilter::Terms(terms),
        }
    }
}

fn default_list_methods() -> Vec<HttpMethod> {
    vec![
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ]
}

fn default_format() -> String {
    "application/json".to_string()
}

fn default_limit() -> u32 {
    20
}

/// Result of the build-schema call.
///
/// Empty `filtering` / `ordering` mean the resource declares none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSchema>,
    #[serde(default)]
    pub filtering: BTreeMap<String, FilterSpec>,
    #[serde(default)]
    pub ordering: Vec<String>,
    #[serde(default = "default_list_methods")]
    pub allowed_list_http_methods: Vec<HttpMethod>,
    #[serde(default = "default_list_methods")]
    pub allowed_detail_http_methods: Vec<HttpMethod>,
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl Default for ResourceSchema {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            filtering: BTreeMap::new(),
            ordering: Vec::new(),
            allowed_list_http_methods: default_list_methods(),
            allowed_detail_http_methods: default_list_methods(),
            default_format: default_format(),
            default_limit: default_limit(),
        }
    }
}

impl ResourceSchema {
    pub fn allows_list(&self, method: HttpMethod) -> bool {
        self.allowed_list_http_methods.contains(&method)
    }

    pub fn allows_detail(&self, method: HttpMethod) -> bool {
        self.allowed_detail_http_methods.contains(&method)
    }
}

/// Whether an extra action hangs off the list or a single object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    List,
    #[default]
    View,
}

fn default_true() -> bool {
    true
}

fn default_action_method() -> HttpMethod {
    HttpMethod::Get
}

/// A query field accepted by an extra action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionField {
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// A model an extra action wants documented next to the resource model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionModel {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, crate::schema_generator::Property>,
}

/// A custom endpoint declared on the resource beside list and detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraAction {
    pub name: String,
    #[serde(default = "default_action_method")]
    pub http_method: HttpMethod,
    #[serde(default)]
    pub resource_type: ActionKind,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub fields: BTreeMap<String, ActionField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ActionModel>,
}

/// A user-declared query filter documented on extra actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFilter {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

fn default_detail_uri_name() -> String {
    "pk".to_string()
}

/// Resource options, the equivalent of a Tastypie `Meta` class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub resource_name: String,
    /// Dotted path of the module defining the resource; its first segment becomes a tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default = "default_detail_uri_name")]
    pub detail_uri_name: String,
    /// Set only for model-backed resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name_plural: Option<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub extra_actions: Vec<ExtraAction>,
    #[serde(default)]
    pub custom_filtering: BTreeMap<String, CustomFilter>,
    /// Query terms of the backing query set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_terms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_uri: Option<String>,
    /// Documentation string; a JSON object here replaces the generated paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl ResourceMeta {
    pub fn new(resource_name: &str) -> Self {
        Self {
            resource_name: resource_name.to_string(),
            module: None,
            detail_uri_name: default_detail_uri_name(),
            verbose_name: None,
            verbose_name_plural: None,
            excludes: Vec::new(),
            extra_actions: Vec::new(),
            custom_filtering: BTreeMap::new(),
            query_terms: None,
            list_uri: None,
            doc: None,
        }
    }

    /// Name of the identifier in detail URIs; `pk` is spelled `id`
    pub fn detail_identifier(&self) -> &str {
        if self.detail_uri_name == "pk" {
            "id"
        } else {
            &self.detail_uri_name
        }
    }

    /// Query terms used to expand [`FilterSpec::All`]
    pub fn query_terms(&self) -> Vec<String> {
        match &self.query_terms {
            Some(terms) => terms.clone(),
            None => QUERY_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_roundtrip_known_and_unknown() {
        let known: FieldType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(known, FieldType::DateTime);
        assert_eq!(known.openapi_type(), ("string", Some("date-time")));

        let unknown: FieldType = serde_json::from_str("\"geometry\"").unwrap();
        assert_eq!(unknown, FieldType::Other("geometry".to_string()));
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"geometry\"");
    }

    #[test]
    fn test_filter_spec_wire_forms() {
        let filters: BTreeMap<String, FilterSpec> =
            serde_yaml::from_str("title: 1\nauthor: 2\nyear: [exact, gt]\nisbn: ALL\n").unwrap();

        assert_eq!(filters["title"], FilterSpec::All);
        assert_eq!(filters["author"], FilterSpec::AllWithRelations);
        assert_eq!(
            filters["year"],
            FilterSpec::Terms(vec!["exact".to_string(), "gt".to_string()])
        );
        assert_eq!(filters["isbn"], FilterSpec::All);
    }

    #[test]
    fn test_filter_spec_rejects_unknown_level() {
        let result: Result<FilterSpec, _> = serde_json::from_str("3");
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_defaults() {
        let schema: ResourceSchema = serde_yaml::from_str("fields: {}").unwrap();
        assert!(schema.allows_list(HttpMethod::Get));
        assert!(schema.allows_detail(HttpMethod::Delete));
        assert!(!schema.allows_list(HttpMethod::Head));
        assert_eq!(schema.default_limit, 20);
        assert!(schema.filtering.is_empty());
    }

    #[test]
    fn test_unknown_http_method_rejected() {
        let result: Result<ResourceSchema, _> =
            serde_yaml::from_str("allowed_list_http_methods: [get, fetch]");
        assert!(result.is_err());
    }

    #[test]
    fn test_detail_identifier() {
        let mut meta = ResourceMeta::new("book");
        assert_eq!(meta.detail_identifier(), "id");
        meta.detail_uri_name = "slug".to_string();
        assert_eq!(meta.detail_identifier(), "slug");
    }

    #[test]
    fn test_query_terms_default_to_orm_terms() {
        let mut meta = ResourceMeta::new("book");
        assert_eq!(meta.query_terms().len(), QUERY_TERMS.len());
        meta.query_terms = Some(vec!["exact".to_string()]);
        assert_eq!(meta.query_terms(), vec!["exact".to_string()]);
    }

    #[test]
    fn test_extra_action_defaults() {
        let action: ExtraAction = serde_yaml::from_str(
            "name: publish\nfields:\n  when:\n    description: Publication date\n",
        )
        .unwrap();
        assert_eq!(action.http_method, HttpMethod::Get);
        assert_eq!(action.resource_type, ActionKind::View);
        assert!(action.fields["when"].required);
    }
}
