//! Mapping of one resource to OpenAPI paths.
//!
//! [`ResourceMapping`] walks the schema reported by a [`Resource`] and produces the
//! list endpoint, the detail endpoint and one endpoint per extra action. Every
//! output is a pure function of the resource metadata, so mapping the same
//! resource twice yields identical paths.

use crate::openapi_builder::{Operation, Parameter, ParameterLocation, PathItem, Response};
use crate::registry::Api;
use crate::resource::{
    ActionField, ActionKind, ExtraAction, FieldSchema, FieldType, FilterSpec, HttpMethod,
    RelatedType, Resource, ResourceSchema, RELATION_QUERY_TERMS,
};
use crate::schema_generator::{write_model, Schema};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Appended to parameters whose location had to be guessed
pub const POSITION_NOTE: &str =
    "[Note: The position of the parameter is automatically generated and may not be accurate.]";

/// Description of the default response of every generated operation
pub const UNKNOWN_RESPONSE: &str = "Unable to get relevant information";

const ORDER_BY_DESCRIPTION: &str = "Orders the result set based on the selection. Ascending order by default, prepending the '-' sign change the sorting order to descending";

const NAVIGATION_FILTERS: &[(&str, &str)] = &[
    ("limit", "Specify the number of element to display per page."),
    ("offset", "Specify the offset to start displaying element on a page."),
];

/// Options shared by every mapping of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingOptions {
    /// Append `/` to detail endpoints
    pub trailing_slash: bool,
    /// Prefix of derived list URIs
    pub url_prefix: String,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            trailing_slash: true,
            url_prefix: "/api".to_string(),
        }
    }
}

/// Mapping of a single resource
pub struct ResourceMapping<'a> {
    resource: &'a dyn Resource,
    api: &'a Api,
    options: &'a MappingOptions,
    schema: ResourceSchema,
    pk_type: FieldType,
}

/// Join `tail` onto `base`, forcing exactly one `/` between them
fn join_forced(base: &str, tail: &str) -> String {
    let mut joined = base.trim_end_matches('/').to_string();
    joined.push('/');
    joined.push_str(tail.trim_start_matches('/'));
    joined
}

fn undefined_type() -> FieldType {
    FieldType::Other("undefined".to_string())
}

impl<'a> ResourceMapping<'a> {
    pub fn new(resource: &'a dyn Resource, api: &'a Api, options: &'a MappingOptions) -> Self {
        let schema = resource.build_schema();
        let mut mapping = Self {
            resource,
            api,
            options,
            schema,
            pk_type: undefined_type(),
        };
        mapping.pk_type = mapping.native_field_type(mapping.resource.pk_field().as_ref());
        mapping
    }

    pub fn resource_name(&self) -> &str {
        &self.resource.meta().resource_name
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// Type of the primary key
    pub fn pk_type(&self) -> &FieldType {
        &self.pk_type
    }

    fn native_field_type(&self, field: Option<&FieldSchema>) -> FieldType {
        let Some(field) = field else {
            warn!("No id field found for resource: {}", self.resource_name());
            return undefined_type();
        };
        match field.related_type {
            Some(RelatedType::ToMany) => FieldType::List,
            Some(RelatedType::ToOne) => field
                .related_resource
                .as_deref()
                .and_then(|name| self.api.resource(name))
                .and_then(|related| related.pk_field())
                .map(|pk| pk.field_type)
                .unwrap_or_else(undefined_type),
            None => field.field_type.clone(),
        }
    }

    fn pk_schema(&self) -> Schema {
        if self.pk_type == undefined_type() {
            Schema::any()
        } else {
            Schema::for_field_type(&self.pk_type)
        }
    }

    /// Verbose name of the backing model, else the resource name.
    ///
    /// Without an explicit plural the model's plural is its verbose name plus `s`.
    pub fn verbose_name(&self, plural: bool) -> String {
        let meta = self.resource.meta();
        let Some(singular) = meta.verbose_name.as_ref() else {
            return meta.resource_name.clone();
        };
        if !plural {
            return singular.to_lowercase();
        }
        match meta.verbose_name_plural.as_ref() {
            Some(name) => name.to_lowercase(),
            None => format!("{}s", singular.to_lowercase()),
        }
    }

    /// Default summary of an operation
    pub fn operation_summary(&self, detail: bool, method: HttpMethod) -> String {
        let template = match (method, detail) {
            (HttpMethod::Get, true) => "Retrieve a single {} by ID",
            (HttpMethod::Get, false) => "Retrieve a list of {}",
            (HttpMethod::Post, false) => "Create a new {}",
            (HttpMethod::Put, true) => "Update an existing {}",
            (HttpMethod::Delete, true) => "Delete an existing {}",
            _ => return String::new(),
        };
        let plural = !detail && method == HttpMethod::Get;
        template.replace("{}", &self.verbose_name(plural))
    }

    /// URI of the list endpoint
    pub fn base_uri(&self) -> String {
        let meta = self.resource.meta();
        match &meta.list_uri {
            Some(uri) => uri.clone(),
            None => format!(
                "{}/{}/{}/",
                self.options.url_prefix.trim_end_matches('/'),
                self.api.api_name(),
                meta.resource_name
            ),
        }
    }

    fn trailing_slash(&self) -> &'static str {
        if self.options.trailing_slash {
            "/"
        } else {
            ""
        }
    }

    fn tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(root) = self
            .resource
            .meta()
            .module
            .as_deref()
            .and_then(|module| module.split('.').next())
            .filter(|root| !root.is_empty())
        {
            tags.push(root.to_string());
        }
        tags.push(self.api.api_name().to_string());
        tags
    }

    fn default_responses() -> BTreeMap<String, Response> {
        let mut responses = BTreeMap::new();
        responses.insert(
            "default".to_string(),
            Response {
                description: UNKNOWN_RESPONSE.to_string(),
            },
        );
        responses
    }

    /// Build a parameter; without a location it goes to the query string with a note
    pub fn build_parameter(
        &self,
        location: Option<ParameterLocation>,
        name: &str,
        required: bool,
        description: &str,
        schema: Schema,
    ) -> Parameter {
        let (location, description) = match location {
            Some(location) => (location, description.to_string()),
            None => (ParameterLocation::Query, format!("{}{}", description, POSITION_NOTE)),
        };
        Parameter {
            location,
            name: name.to_string(),
            required,
            description,
            schema,
        }
    }

    fn identifier_parameter(&self) -> Parameter {
        self.build_parameter(
            Some(ParameterLocation::Path),
            self.resource.meta().detail_identifier(),
            true,
            "ID of resource",
            self.pk_schema(),
        )
    }

    /// One parameter per writable field; `required` follows `nullable`
    pub fn build_parameters_from_fields(&self) -> Vec<Parameter> {
        self.schema
            .fields
            .iter()
            .filter(|(name, field)| !field.readonly && name.as_str() != "id")
            .map(|(name, field)| {
                self.build_parameter(
                    None,
                    name,
                    field.nullable,
                    &field.help_text,
                    Schema::for_field_type(&field.field_type),
                )
            })
            .collect()
    }

    pub fn build_parameters_for_list(&self, method: HttpMethod) -> Vec<Parameter> {
        let mut parameters = self.build_parameters_from_filters("", method);

        if !self.schema.ordering.is_empty() && method == HttpMethod::Get {
            parameters.push(self.build_parameters_from_ordering());
        }
        parameters
    }

    pub fn build_parameters_from_ordering(&self) -> Parameter {
        let values = self
            .schema
            .ordering
            .iter()
            .flat_map(|field| [field.clone(), format!("-{}", field)])
            .collect();
        self.build_parameter(
            Some(ParameterLocation::Query),
            "order_by",
            false,
            ORDER_BY_DESCRIPTION,
            Schema::string_enum(values),
        )
    }

    /// Query parameters for the declared filters, prefixed when reached through a relation
    pub fn build_parameters_from_filters(&self, prefix: &str, method: HttpMethod) -> Vec<Parameter> {
        let mut visited = BTreeSet::new();
        visited.insert(self.resource_name().to_string());
        self.filters_with_prefix(prefix, method, &mut visited)
    }

    fn filters_with_prefix(
        &self,
        prefix: &str,
        method: HttpMethod,
        visited: &mut BTreeSet<String>,
    ) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        if method != HttpMethod::Get {
            return parameters;
        }

        if prefix.is_empty() {
            for (name, description) in NAVIGATION_FILTERS {
                parameters.push(self.build_parameter(
                    Some(ParameterLocation::Query),
                    name,
                    false,
                    description,
                    Schema::primitive("integer", None),
                ));
            }
        }

        for (name, filter) in &self.schema.filtering {
            let terms: Vec<String> = match filter {
                FilterSpec::All => self.resource.meta().query_terms(),
                FilterSpec::AllWithRelations => {
                    parameters.extend(self.related_filters(prefix, name, visited));
                    RELATION_QUERY_TERMS.iter().map(|t| t.to_string()).collect()
                }
                FilterSpec::Terms(terms) => terms.clone(),
            };

            let Some(field) = self.schema.fields.get(name) else {
                debug!(
                    "Skipping filter {} of {}: not a field",
                    name,
                    self.resource_name()
                );
                continue;
            };

            for term in &terms {
                parameters.push(self.filter_parameter(prefix, name, field, term));
            }
        }

        parameters
    }

    /// Filters of the related resource, reached as `{prefix}{name}__...`
    fn related_filters(
        &self,
        prefix: &str,
        name: &str,
        visited: &mut BTreeSet<String>,
    ) -> Vec<Parameter> {
        let Some(related_name) = self
            .schema
            .fields
            .get(name)
            .and_then(|field| field.related_resource.as_deref())
        else {
            return Vec::new();
        };
        let Some(related) = self.api.resource(related_name) else {
            debug!("Related resource {} is not registered", related_name);
            return Vec::new();
        };
        if !visited.insert(related_name.to_string()) {
            debug!("Relation cycle through {} stopped", related_name);
            return Vec::new();
        }

        let mapping = ResourceMapping::new(related.as_ref(), self.api, self.options);
        let nested_prefix = format!("{}{}__", prefix, name);
        let parameters = mapping.filters_with_prefix(&nested_prefix, HttpMethod::Get, visited);
        visited.remove(related_name);
        parameters
    }

    fn filter_parameter(&self, prefix: &str, name: &str, field: &FieldSchema, term: &str) -> Parameter {
        if term == "exact" {
            let (description, schema) = if field.field_type == FieldType::Related {
                ("ID of related resource".to_string(), Schema::primitive("integer", None))
            } else {
                (field.help_text.clone(), Schema::for_field_type(&field.field_type))
            };
            return self.build_parameter(
                Some(ParameterLocation::Query),
                &format!("{}{}", prefix, name),
                false,
                &description,
                schema,
            );
        }

        let schema = match term {
            "isnull" => Schema::primitive("boolean", None),
            "in" | "range" => Schema::primitive("string", None),
            "year" | "month" | "day" | "week_day" => Schema::primitive("integer", None),
            _ if field.field_type == FieldType::Related => Schema::primitive("integer", None),
            _ => Schema::for_field_type(&field.field_type),
        };
        self.build_parameter(
            Some(ParameterLocation::Query),
            &format!("{}{}__{}", prefix, name, term),
            false,
            &field.help_text,
            schema,
        )
    }

    /// The payload of a POST/PUT, named after the resource
    pub fn build_parameter_for_object(&self, method: HttpMethod) -> Parameter {
        self.build_parameter(
            None,
            self.resource_name(),
            true,
            "",
            write_model(self.resource.meta(), &self.schema, method),
        )
    }

    pub fn build_parameters_from_extra_action(
        &self,
        method: HttpMethod,
        fields: &BTreeMap<String, ActionField>,
        resource_type: ActionKind,
    ) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        if method == HttpMethod::Get || resource_type == ActionKind::View {
            parameters.push(self.identifier_parameter());
        }

        for (name, field) in fields {
            parameters.push(self.build_parameter(
                Some(ParameterLocation::Query),
                name,
                field.required,
                &field.description,
                Schema::any(),
            ));
        }

        for (name, filter) in &self.resource.meta().custom_filtering {
            parameters.push(self.build_parameter(
                Some(ParameterLocation::Query),
                name,
                filter.required,
                &filter.description,
                Schema::any(),
            ));
        }

        parameters
    }

    pub fn build_detail_operation(&self, method: HttpMethod) -> Operation {
        Operation {
            summary: Some(self.operation_summary(true, method)),
            description: None,
            tags: self.tags(),
            parameters: vec![self.identifier_parameter()],
            responses: Self::default_responses(),
        }
    }

    pub fn build_list_operation(&self, method: HttpMethod) -> Operation {
        Operation {
            summary: Some(self.operation_summary(false, method)),
            description: None,
            tags: self.tags(),
            parameters: self.build_parameters_for_list(method),
            responses: Self::default_responses(),
        }
    }

    pub fn build_extra_operation(&self, action: &ExtraAction) -> Operation {
        Operation {
            summary: Some(action.summary.clone()),
            description: None,
            tags: self.tags(),
            parameters: self.build_parameters_from_extra_action(
                action.http_method,
                &action.fields,
                action.resource_type,
            ),
            responses: Self::default_responses(),
        }
    }

    /// Stands in for a detail endpoint that allows no documented method
    fn placeholder_operation(&self) -> Operation {
        Operation {
            summary: None,
            description: Some(UNKNOWN_RESPONSE.to_string()),
            tags: self.tags(),
            parameters: Vec::new(),
            responses: Self::default_responses(),
        }
    }

    pub fn detail_endpoint(&self) -> String {
        join_forced(
            &self.base_uri(),
            &format!(
                "{{{}}}{}",
                self.resource.meta().detail_identifier(),
                self.trailing_slash()
            ),
        )
    }

    pub fn build_detail_path(&self) -> (String, PathItem) {
        let mut item = PathItem::default();

        if self.schema.allows_detail(HttpMethod::Get) {
            item.get = Some(self.build_detail_operation(HttpMethod::Get));
        }
        if self.schema.allows_detail(HttpMethod::Put) {
            let mut operation = self.build_detail_operation(HttpMethod::Put);
            operation
                .parameters
                .push(self.build_parameter_for_object(HttpMethod::Put));
            item.put = Some(operation);
        }
        if self.schema.allows_detail(HttpMethod::Delete) {
            item.delete = Some(self.build_detail_operation(HttpMethod::Delete));
        }
        if item.is_empty() {
            item.get = Some(self.placeholder_operation());
        }

        (self.detail_endpoint(), item)
    }

    pub fn build_list_path(&self) -> (String, PathItem) {
        let mut endpoint = self.base_uri();
        let mut item = PathItem::default();

        if self.schema.allows_list(HttpMethod::Get) {
            item.get = Some(self.build_list_operation(HttpMethod::Get));
        }
        if self.schema.allows_list(HttpMethod::Post) {
            let mut operation = self.build_list_operation(HttpMethod::Post);
            operation
                .parameters
                .push(self.build_parameter_for_object(HttpMethod::Post));
            item.post = Some(operation);
            if endpoint.is_empty() {
                endpoint = "/".to_string();
            }
        }

        (endpoint, item)
    }

    pub fn build_extra_paths(&self) -> BTreeMap<String, PathItem> {
        let mut paths = BTreeMap::new();
        let base_uri = self.base_uri();
        let identifier = self.resource.meta().detail_identifier();

        for action in &self.resource.meta().extra_actions {
            let endpoint = match action.resource_type {
                ActionKind::List => join_forced(&base_uri, &format!("{}/", action.name)),
                ActionKind::View => join_forced(
                    &base_uri,
                    &format!("{{{}}}/{}/", identifier, action.name),
                ),
            };
            let item: &mut PathItem = paths.entry(endpoint).or_default();
            item.set_operation(action.http_method, self.build_extra_operation(action));
        }
        paths
    }

    /// Detail, list and extra paths of the resource; later entries win
    pub fn build_paths(&self) -> BTreeMap<String, PathItem> {
        let mut paths = BTreeMap::new();

        let (detail_endpoint, detail) = self.build_detail_path();
        paths.insert(detail_endpoint, detail);

        let (list_endpoint, list) = self.build_list_path();
        paths.insert(list_endpoint, list);

        paths.extend(self.build_extra_paths());
        paths
    }
}
