use crate::resource::{FieldSchema, FieldType, HttpMethod, RelatedType, ResourceMeta, ResourceSchema};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fields never documented on POST/PUT payloads
pub const WRITE_ACTION_IGNORED_FIELDS: &[&str] = &["id", "resource_uri"];

/// Name of the pagination wrapper model shared by every list endpoint
pub const LIST_META_MODEL: &str = "Meta";

/// Schema generator - collects the models of every documented resource
pub struct SchemaGenerator {
    /// Generated models keyed by name
    schemas: BTreeMap<String, Schema>,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "date-time", "float")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Property>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Enum values for enum types
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Property definition for object schemas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// The type of the property
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    /// Format for primitive types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reference to another schema
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Items schema for array properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "readOnly", default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Schema {
    /// `{}`: accepts anything
    pub fn any() -> Self {
        Self::default()
    }

    /// Schema of a primitive OpenAPI type
    pub fn primitive(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(|f| f.to_string()),
            ..Self::default()
        }
    }

    pub fn for_field_type(field_type: &FieldType) -> Self {
        let (schema_type, format) = field_type.openapi_type();
        let mut schema = Self::primitive(schema_type, format);
        if *field_type == FieldType::List {
            schema.items = Some(Box::new(Self::any()));
        }
        schema
    }

    pub fn string_enum(values: Vec<String>) -> Self {
        Self {
            enum_values: Some(values),
            ..Self::primitive("string", None)
        }
    }

    pub fn object(properties: BTreeMap<String, Property>, required: Vec<String>) -> Self {
        Self {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            required: if required.is_empty() {
                None
            } else {
                Some(required)
            },
            ..Self::default()
        }
    }

    pub fn reference(model: &str) -> Self {
        Self {
            reference: Some(schema_ref(model)),
            ..Self::default()
        }
    }
}

impl Property {
    fn primitive(schema_type: &str, description: &str) -> Self {
        Self {
            property_type: Some(schema_type.to_string()),
            description: Some(description.to_string()),
            ..Self::default()
        }
    }

    fn reference(model: &str) -> Self {
        Self {
            reference: Some(schema_ref(model)),
            ..Self::default()
        }
    }
}

/// Location of a generated model inside the document
pub fn schema_ref(model: &str) -> String {
    format!("#/components/schemas/{}", model)
}

/// Convert a resource field to a model property
pub fn field_to_property(field: &FieldSchema) -> Property {
    let mut property = match field.related_type {
        Some(RelatedType::ToMany) => Property {
            property_type: Some("array".to_string()),
            items: Some(Box::new(Schema::primitive("string", None))),
            ..Property::default()
        },
        _ => {
            let schema = Schema::for_field_type(&field.field_type);
            Property {
                property_type: schema.schema_type,
                format: schema.format,
                items: schema.items,
                ..Property::default()
            }
        }
    };

    property.description = Some(field.help_text.clone());
    if field.nullable {
        property.nullable = Some(true);
    }
    if field.readonly {
        property.read_only = Some(true);
    }
    property.default = field.default.clone();
    property
}

/// Build the properties of a resource model.
///
/// `write` selects the POST/PUT payload variant, which drops identifiers and
/// readonly fields.
pub fn properties_from_fields(
    meta: &ResourceMeta,
    schema: &ResourceSchema,
    write: Option<HttpMethod>,
) -> BTreeMap<String, Property> {
    schema
        .fields
        .iter()
        .filter(|(name, _)| !meta.excludes.contains(name))
        .filter(|(name, field)| match write {
            Some(HttpMethod::Post) | Some(HttpMethod::Put) => {
                !WRITE_ACTION_IGNORED_FIELDS.contains(&name.as_str()) && !field.readonly
            }
            _ => true,
        })
        .map(|(name, field)| (name.clone(), field_to_property(field)))
        .collect()
}

/// Object schema of a POST/PUT payload
pub fn write_model(meta: &ResourceMeta, schema: &ResourceSchema, method: HttpMethod) -> Schema {
    let properties = properties_from_fields(meta, schema, Some(method));
    let required = properties
        .keys()
        .filter(|name| {
            schema.fields.get(*name).is_some_and(|field| {
                !field.nullable && !field.blank && field.default.is_none()
            })
        })
        .cloned()
        .collect();
    Schema::object(properties, required)
}

impl SchemaGenerator {
    pub fn new() -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            schemas: BTreeMap::new(),
        }
    }

    /// Generate every model of a resource
    pub fn add_resource(&mut self, meta: &ResourceMeta, schema: &ResourceSchema) {
        let name = &meta.resource_name;
        debug!("Generating models for resource: {}", name);

        if schema.allows_list(HttpMethod::Get) {
            self.schemas
                .insert(LIST_META_MODEL.to_string(), list_meta_schema());
            self.schemas
                .insert(format!("{}_list", name), list_view_schema(name));
        }

        if schema.allows_list(HttpMethod::Post) {
            self.schemas.insert(
                format!("{}_post", name),
                write_model(meta, schema, HttpMethod::Post),
            );
        }

        if schema.allows_detail(HttpMethod::Put) {
            self.schemas.insert(
                format!("{}_put", name),
                write_model(meta, schema, HttpMethod::Put),
            );
        }

        self.schemas.insert(
            name.clone(),
            Schema::object(properties_from_fields(meta, schema, None), Vec::new()),
        );

        for action in &meta.extra_actions {
            if let Some(model) = &action.model {
                debug!("Adding extra action model: {}", model.id);
                self.schemas.insert(
                    model.id.clone(),
                    Schema::object(model.properties.clone(), Vec::new()),
                );
            }
        }
    }

    /// Get all generated schemas
    pub fn get_schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> BTreeMap<String, Schema> {
        self.schemas
    }
}

impl Default for SchemaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// The `meta` section Tastypie adds to every list response
fn list_meta_schema() -> Schema {
    let properties = [
        ("limit", "integer", "Specify the number of element to display per page."),
        ("next", "string", "Uri of the next page relative to the current page settings."),
        ("offset", "integer", "Specify the offset to start displaying element on a page."),
        ("previous", "string", "Uri of the previous page relative to the current page settings."),
        ("total_count", "integer", "Total items count for the all collection"),
    ]
    .into_iter()
    .map(|(name, schema_type, description)| {
        (name.to_string(), Property::primitive(schema_type, description))
    })
    .collect();
    Schema::object(properties, Vec::new())
}

/// `{meta, objects}` wrapper returned by a list GET
fn list_view_schema(resource_name: &str) -> Schema {
    let mut properties = BTreeMap::new();
    properties.insert("meta".to_string(), Property::reference(LIST_META_MODEL));
    properties.insert(
        "objects".to_string(),
        Property {
            property_type: Some("array".to_string()),
            items: Some(Box::new(Schema::reference(resource_name))),
            ..Property::default()
        },
    );
    Schema::object(properties, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ActionModel, ExtraAction};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn book_schema() -> ResourceSchema {
        let mut schema = ResourceSchema::default();
        schema.fields.insert(
            "id".to_string(),
            FieldSchema::new(FieldType::Integer).readonly(),
        );
        schema.fields.insert(
            "resource_uri".to_string(),
            FieldSchema::new(FieldType::String).readonly(),
        );
        schema.fields.insert(
            "title".to_string(),
            FieldSchema::new(FieldType::String).with_help_text("Book title"),
        );
        schema.fields.insert(
            "subtitle".to_string(),
            FieldSchema::new(FieldType::String).nullable(),
        );
        schema.fields.insert(
            "published".to_string(),
            FieldSchema::new(FieldType::DateTime),
        );
        schema.fields.insert(
            "authors".to_string(),
            FieldSchema::new(FieldType::Related).related(RelatedType::ToMany, "author"),
        );
        schema
    }

    #[test]
    fn test_field_type_schema() {
        let schema = Schema::for_field_type(&FieldType::DateTime);
        assert_eq!(schema.schema_type, Some("string".to_string()));
        assert_eq!(schema.format, Some("date-time".to_string()));

        let list = Schema::for_field_type(&FieldType::List);
        assert_eq!(list.schema_type, Some("array".to_string()));
        assert!(list.items.is_some());
    }

    #[test]
    fn test_any_schema_serializes_empty() {
        assert_eq!(serde_json::to_string(&Schema::any()).unwrap(), "{}");
    }

    #[test]
    fn test_to_many_relation_is_array_of_uris() {
        let field = FieldSchema::new(FieldType::Related).related(RelatedType::ToMany, "author");
        let property = field_to_property(&field);
        assert_eq!(property.property_type, Some("array".to_string()));
        assert_eq!(
            property.items.unwrap().schema_type,
            Some("string".to_string())
        );
    }

    #[test]
    fn test_write_properties_drop_identifiers_and_readonly() {
        let meta = ResourceMeta::new("book");
        let schema = book_schema();

        let read = properties_from_fields(&meta, &schema, None);
        assert!(read.contains_key("id"));
        assert!(read.contains_key("resource_uri"));

        let write = properties_from_fields(&meta, &schema, Some(HttpMethod::Post));
        assert!(!write.contains_key("id"));
        assert!(!write.contains_key("resource_uri"));
        assert!(write.contains_key("title"));
    }

    #[test]
    fn test_excluded_fields_are_skipped() {
        let mut meta = ResourceMeta::new("book");
        meta.excludes = vec!["subtitle".to_string()];
        let properties = properties_from_fields(&meta, &book_schema(), None);
        assert!(!properties.contains_key("subtitle"));
    }

    #[test]
    fn test_write_model_required_fields() {
        let meta = ResourceMeta::new("book");
        let model = write_model(&meta, &book_schema(), HttpMethod::Post);
        assert_eq!(
            model.required,
            Some(vec![
                "authors".to_string(),
                "published".to_string(),
                "title".to_string()
            ])
        );
    }

    #[test]
    fn test_add_resource_models() {
        let meta = ResourceMeta::new("book");
        let mut generator = SchemaGenerator::new();
        generator.add_resource(&meta, &book_schema());

        let names: Vec<&str> = generator.get_schemas().keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["Meta", "book", "book_list", "book_post", "book_put"]);

        let list = serde_json::to_value(&generator.get_schemas()["book_list"]).unwrap();
        assert_eq!(
            list["properties"]["objects"]["items"]["$ref"],
            json!("#/components/schemas/book")
        );
        assert_eq!(
            list["properties"]["meta"]["$ref"],
            json!("#/components/schemas/Meta")
        );
    }

    #[test]
    fn test_read_only_methods_skip_write_models() {
        let meta = ResourceMeta::new("book");
        let mut schema = book_schema();
        schema.allowed_list_http_methods = vec![HttpMethod::Get];
        schema.allowed_detail_http_methods = vec![HttpMethod::Get];

        let mut generator = SchemaGenerator::new();
        generator.add_resource(&meta, &schema);
        let schemas = generator.into_schemas();
        assert!(!schemas.contains_key("book_post"));
        assert!(!schemas.contains_key("book_put"));
        assert!(schemas.contains_key("book_list"));
    }

    #[test]
    fn test_extra_action_model() {
        let mut meta = ResourceMeta::new("book");
        let mut properties = BTreeMap::new();
        properties.insert(
            "count".to_string(),
            Property::primitive("integer", "Number of copies"),
        );
        meta.extra_actions.push(ExtraAction {
            name: "stock".to_string(),
            http_method: HttpMethod::Get,
            resource_type: Default::default(),
            summary: String::new(),
            fields: BTreeMap::new(),
            model: Some(ActionModel {
                id: "Stock".to_string(),
                properties,
            }),
        });

        let mut generator = SchemaGenerator::new();
        generator.add_resource(&meta, &book_schema());
        let stock = &generator.get_schemas()["Stock"];
        assert!(stock.properties.as_ref().unwrap().contains_key("count"));
    }

    #[test]
    fn test_provided_default_is_carried() {
        let mut pages = FieldSchema::new(FieldType::Integer);
        pages.default = Some(json!(0));
        let title = FieldSchema::new(FieldType::String);

        let pages = serde_json::to_value(field_to_property(&pages)).unwrap();
        let title = serde_json::to_value(field_to_property(&title)).unwrap();

        assert_eq!(pages["default"], json!(0));
        assert!(title.get("default").is_none());
    }

    #[test]
    fn test_defaulted_field_not_required() {
        let mut schema = book_schema();
        let mut pages = FieldSchema::new(FieldType::Integer);
        pages.default = Some(json!(0));
        schema.fields.insert("pages".to_string(), pages);

        let model = write_model(&ResourceMeta::new("book"), &schema, HttpMethod::Post);

        let required = model.required.unwrap();
        assert!(!required.contains(&"pages".to_string()));
        assert!(required.contains(&"title".to_string()));
        assert_eq!(
            model.properties.unwrap()["pages"].default,
            Some(json!(0))
        );
    }
}
