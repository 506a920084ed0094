//! Document assembly.
//!
//! A [`DocumentBuilder`] is owned by the application and fed during route
//! registration. Each route gets one [`OperationBuilder`] which collects
//! parameters, the request body, the success response and the security
//! requirements, then appends the fixed error catalogue on
//! [`finish`](OperationBuilder::finish).
//!
//! Schema components are memoized by name: the first registration of a name
//! wins and later ones reuse it.

use std::collections::BTreeMap;

use bindery_types::{FieldBinding, Location, Method, NamingConvention, TypeDescriptor, mime};
use tracing::debug;

use crate::schema::{Reference, Schema};
use crate::spec::{
    Header, Info, MediaType, OpenApi, Operation, Parameter, ParameterLocation, RequestBody,
    Response, SecurityRequirement, SecurityScheme, Server,
};
use crate::synth;

/// Component name of the shared error schema.
pub const GENERIC_ERROR_SCHEMA: &str = "httpGenericError";

/// Error responses every operation documents.
pub const ERROR_RESPONSES: [(u16, &str); 5] = [
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (404, "Not Found"),
    (409, "Conflict"),
    (500, "Internal Server Error"),
];

/// Response key some document libraries add by default; never part of ours.
const DEFAULT_RESPONSE_KEY: &str = "default";

/// Content types error responses are documented under unless configured.
#[must_use]
pub fn default_error_content_types() -> Vec<String> {
    vec![
        mime::APPLICATION_JSON.to_string(),
        mime::APPLICATION_XML.to_string(),
        mime::MULTIPART_FORM.to_string(),
    ]
}

/// Schema of the generic error wire shape `{id, message, status}`.
#[must_use]
pub fn generic_error_schema() -> Schema {
    let mut properties = BTreeMap::new();
    properties.insert("id".to_string(), Schema::string());
    properties.insert("message".to_string(), Schema::string());
    properties.insert("status".to_string(), Schema::integer(None));
    Schema::object(properties, Vec::new())
}

/// Convert a route template (`/items/:id/`) to a document path (`/items/{id}`).
#[must_use]
pub fn openapi_path(template: &str) -> String {
    let converted = template
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");
    match converted.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Builds one OpenAPI document from route registrations.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    document: OpenApi,
    error_content_types: Vec<String>,
}

impl DocumentBuilder {
    /// Start an empty document.
    #[must_use]
    pub fn new(info: Info) -> Self {
        Self {
            document: OpenApi::new(info),
            error_content_types: default_error_content_types(),
        }
    }

    /// Content types error responses are documented under.
    #[must_use]
    pub fn error_content_types(mut self, content_types: Vec<String>) -> Self {
        self.error_content_types = content_types;
        self
    }

    /// Append a server.
    pub fn add_server(&mut self, url: impl Into<String>, description: impl Into<String>) {
        let description = description.into();
        self.document.servers.push(Server {
            url: url.into(),
            description: (!description.is_empty()).then_some(description),
        });
    }

    /// True if an operation is already registered for this route.
    #[must_use]
    pub fn contains(&self, method: Method, template: &str) -> bool {
        self.document
            .operation(&openapi_path(template), method)
            .is_some()
    }

    /// Mutable access to a registered operation.
    pub fn operation_mut(&mut self, method: Method, template: &str) -> Option<&mut Operation> {
        self.document
            .paths
            .get_mut(&openapi_path(template))
            .and_then(|item| item.get_mut(method))
    }

    /// Begin a new operation. The default operation id is the method
    /// followed by the raw template, e.g. `POST/items/:id`.
    pub fn operation(&mut self, method: Method, template: &str) -> OperationBuilder<'_> {
        OperationBuilder {
            path: openapi_path(template),
            method,
            operation: Operation {
                operation_id: Some(format!("{method}{template}")),
                ..Operation::default()
            },
            builder: self,
        }
    }

    /// The document as built so far.
    #[must_use]
    pub fn document(&self) -> &OpenApi {
        &self.document
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> OpenApi {
        self.document
    }

    /// Store a schema under `name` unless one is already there.
    fn ensure_schema(&mut self, name: &str, make: impl FnOnce() -> Schema) {
        if self.document.components.schemas.contains_key(name) {
            debug!(schema = name, "reusing schema component");
            return;
        }
        debug!(schema = name, "adding schema component");
        self.document
            .components
            .schemas
            .insert(name.to_string(), make());
    }
}

/// Collects one operation. Nothing reaches the document until
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct OperationBuilder<'a> {
    builder: &'a mut DocumentBuilder,
    path: String,
    method: Method,
    operation: Operation,
}

impl OperationBuilder<'_> {
    /// Document a path, query, header or cookie binding.
    ///
    /// The field's schema is stored under the binding key. Headers marked
    /// `isauth` become a security requirement instead of a parameter. Body
    /// bindings are ignored here; see [`request_body`](Self::request_body).
    pub fn parameter(&mut self, binding: &FieldBinding, schema: impl FnOnce() -> Schema) -> &mut Self {
        if let Some(auth) = binding.auth() {
            self.builder
                .document
                .components
                .security_schemes
                .entry(auth.name.clone())
                .or_insert_with(|| SecurityScheme::http(auth.scheme));
            let mut requirement = SecurityRequirement::new();
            requirement.insert(auth.name, Vec::new());
            self.operation.security.push(requirement);
            return self;
        }

        let Some(location) = ParameterLocation::from_location(binding.location) else {
            return self;
        };

        let key = binding.key.as_str();
        self.builder.ensure_schema(key, schema);
        let parameter = Parameter {
            name: key.to_string(),
            location,
            required: binding.required,
            schema: Some(Schema::reference(key)),
            description: None,
        };
        let components = &mut self.builder.document.components;
        if binding.location == Location::Header {
            components.headers.insert(
                key.to_string(),
                Header {
                    required: binding.required,
                    schema: Some(Schema::reference(key)),
                    description: None,
                },
            );
        }
        components.parameters.insert(key.to_string(), parameter);
        self.operation.parameters.push(Reference::parameter(key));
        self
    }

    /// Document the request body. The body schema's required list always
    /// uses JSON names.
    pub fn request_body(
        &mut self,
        descriptor: &TypeDescriptor,
        schema: impl FnOnce() -> Schema,
        content_type: &str,
    ) -> &mut Self {
        let name = descriptor.name();
        self.builder.ensure_schema(name, || {
            synth::with_required(descriptor, schema(), NamingConvention::Json)
        });
        let mut content = BTreeMap::new();
        content.insert(content_type.to_string(), MediaType::referencing(name));
        self.operation.request_body = Some(RequestBody {
            description: None,
            content,
            required: false,
        });
        self
    }

    /// Document the success response.
    ///
    /// The response type's named element is stored once under its resolved
    /// name, with a required list named after `content_type`. A unit response
    /// has no content.
    pub fn response(
        &mut self,
        status: u16,
        descriptor: &TypeDescriptor,
        schema: impl FnOnce() -> Schema,
        content_type: &str,
    ) -> &mut Self {
        let mut response = Response {
            description: "OK".to_string(),
            content: BTreeMap::new(),
        };

        if *descriptor != TypeDescriptor::Unit {
            let name = synth::schema_name(descriptor);
            let convention = NamingConvention::for_content_type(content_type);
            let usage = if self.builder.document.components.schemas.contains_key(name) {
                debug!(schema = name, "reusing schema component");
                synth::split(descriptor, schema()).usage()
            } else {
                let named = synth::split(descriptor, schema());
                let usage = named.usage();
                self.builder.ensure_schema(name, || {
                    synth::with_required(descriptor, named.element, convention)
                });
                usage
            };
            response.content.insert(
                content_type.to_string(),
                MediaType {
                    schema: Some(usage),
                },
            );
        }

        self.operation.responses.insert(status.to_string(), response);
        self
    }

    /// Override the operation id.
    pub fn operation_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.operation.operation_id = Some(id.into());
        self
    }

    /// Set the summary.
    pub fn summary(&mut self, summary: impl Into<String>) -> &mut Self {
        self.operation.summary = Some(summary.into());
        self
    }

    /// Set the description.
    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.operation.description = Some(description.into());
        self
    }

    /// Add tags.
    pub fn tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operation.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Append the error catalogue and store the operation.
    pub fn finish(mut self) {
        self.builder
            .ensure_schema(GENERIC_ERROR_SCHEMA, generic_error_schema);
        for (status, description) in ERROR_RESPONSES {
            let content = self
                .builder
                .error_content_types
                .iter()
                .map(|ct| (ct.clone(), MediaType::referencing(GENERIC_ERROR_SCHEMA)))
                .collect();
            self.operation.responses.insert(
                status.to_string(),
                Response {
                    description: description.to_string(),
                    content,
                },
            );
        }
        self.operation.responses.remove(DEFAULT_RESPONSE_KEY);

        debug!(method = %self.method, path = %self.path, "operation added");
        self.builder
            .document
            .paths
            .entry(self.path)
            .or_default()
            .set(self.method, self.operation);
    }
}

#[cfg(test)]
mod tests {
    use bindery_types::{Describe, FieldDescriptor, StructDescriptor};

    use super::*;
    use crate::schema::JsonSchema;

    fn info() -> Info {
        Info {
            title: "OpenAPI".to_string(),
            description: Some("OpenAPI".to_string()),
            version: "0.0.1".to_string(),
        }
    }

    fn binding(tag: &str, required: bool) -> FieldBinding {
        FieldBinding::parse("field", tag, required).unwrap()
    }

    fn body() -> TypeDescriptor {
        TypeDescriptor::Struct(StructDescriptor {
            name: "Body",
            fields: vec![
                FieldDescriptor::new("name", String::describe),
                FieldDescriptor::new("nick", Option::<String>::describe),
            ],
        })
    }

    fn body_schema() -> Schema {
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), String::schema());
        properties.insert("nick".to_string(), String::schema());
        Schema::object(properties, Vec::new())
    }

    #[test]
    fn test_openapi_path() {
        assert_eq!(openapi_path("/test/:id/:is_admin"), "/test/{id}/{is_admin}");
        assert_eq!(openapi_path("/foo/"), "/foo");
        assert_eq!(openapi_path("/"), "/");
        assert_eq!(openapi_path("/example"), "/example");
    }

    #[test]
    fn test_default_operation_id_and_error_catalogue() {
        let mut builder = DocumentBuilder::new(info());
        builder.operation(Method::Post, "/test/:id").finish();
        let doc = builder.build();

        let op = doc.operation("/test/{id}", Method::Post).unwrap();
        assert_eq!(op.operation_id.as_deref(), Some("POST/test/:id"));
        for (status, description) in ERROR_RESPONSES {
            let response = &op.responses[&status.to_string()];
            assert_eq!(response.description, description);
            assert_eq!(response.content.len(), 3);
            assert!(response.content.contains_key("application/xml"));
        }
        assert!(!op.responses.contains_key("default"));
        assert!(doc.components.schemas.contains_key(GENERIC_ERROR_SCHEMA));
    }

    #[test]
    fn test_parameters_are_referenced_by_key() {
        let mut builder = DocumentBuilder::new(info());
        let mut op = builder.operation(Method::Get, "/items/:id");
        op.parameter(&binding("path=id", true), u64::schema)
            .parameter(&binding("query=filter", false), String::schema);
        op.finish();
        let doc = builder.build();

        let op = doc.operation("/items/{id}", Method::Get).unwrap();
        assert_eq!(
            op.parameters,
            vec![Reference::parameter("id"), Reference::parameter("filter")]
        );
        let id = &doc.components.parameters["id"];
        assert!(id.required);
        assert_eq!(id.location, ParameterLocation::Path);
        assert_eq!(id.schema, Some(Schema::reference("id")));
        assert_eq!(doc.components.schemas["id"], u64::schema());
        assert!(!doc.components.parameters["filter"].required);
    }

    #[test]
    fn test_header_registers_header_component() {
        let mut builder = DocumentBuilder::new(info());
        let mut op = builder.operation(Method::Get, "/items");
        op.parameter(&binding("header=X-Trace", true), String::schema);
        op.finish();
        let doc = builder.build();

        assert!(doc.components.headers.contains_key("X-Trace"));
        assert_eq!(
            doc.components.parameters["X-Trace"].location,
            ParameterLocation::Header
        );
    }

    #[test]
    fn test_auth_header_becomes_security_requirement() {
        let mut builder = DocumentBuilder::new(info());
        let mut op = builder.operation(Method::Get, "/me");
        op.parameter(&binding("header=Authorization;isauth", true), String::schema);
        op.finish();
        let mut op = builder.operation(Method::Get, "/you");
        op.parameter(&binding("header=Authorization;isauth", true), String::schema);
        op.finish();
        let doc = builder.build();

        assert_eq!(doc.components.security_schemes.len(), 1);
        assert_eq!(
            doc.components.security_schemes["Authorization"],
            SecurityScheme::http("bearer")
        );
        let op = doc.operation("/me", Method::Get).unwrap();
        assert!(op.parameters.is_empty());
        assert_eq!(op.security.len(), 1);
        assert_eq!(op.security[0]["Authorization"], Vec::<String>::new());
    }

    #[test]
    fn test_request_body_required_uses_json_names() {
        let mut builder = DocumentBuilder::new(info());
        let mut op = builder.operation(Method::Post, "/people");
        op.request_body(&body(), body_schema, mime::MULTIPART_FORM);
        op.finish();
        let doc = builder.build();

        let op = doc.operation("/people", Method::Post).unwrap();
        let content = &op.request_body.as_ref().unwrap().content;
        assert_eq!(
            content[mime::MULTIPART_FORM],
            MediaType::referencing("Body")
        );
        let Schema::Object(schema) = &doc.components.schemas["Body"] else {
            panic!("expected object");
        };
        assert_eq!(schema.required, vec!["name"]);
    }

    #[test]
    fn test_response_schema_is_memoized_by_name() {
        let list = TypeDescriptor::wrap(bindery_types::Wrapper::Slice, body());
        let mut builder = DocumentBuilder::new(info());
        let mut op = builder.operation(Method::Get, "/people");
        op.response(200, &list, || Schema::array(body_schema()), mime::APPLICATION_JSON);
        op.finish();
        let mut op = builder.operation(Method::Get, "/people/:id");
        op.response(200, &body(), body_schema, mime::APPLICATION_JSON);
        op.finish();
        let doc = builder.build();

        let names: Vec<_> = doc
            .components
            .schemas
            .keys()
            .filter(|k| k.as_str() != GENERIC_ERROR_SCHEMA)
            .collect();
        assert_eq!(names, vec!["Body"]);

        let list_op = doc.operation("/people", Method::Get).unwrap();
        assert_eq!(
            list_op.responses["200"].content["application/json"].schema,
            Some(Schema::array(Schema::reference("Body")))
        );
        let one_op = doc.operation("/people/{id}", Method::Get).unwrap();
        assert_eq!(
            one_op.responses["200"].content["application/json"].schema,
            Some(Schema::reference("Body"))
        );
    }

    #[test]
    fn test_unit_response_has_no_content() {
        let mut builder = DocumentBuilder::new(info());
        let mut op = builder.operation(Method::Delete, "/people/:id");
        op.response(204, &TypeDescriptor::Unit, <()>::schema, mime::APPLICATION_JSON);
        op.finish();
        let doc = builder.build();

        let op = doc.operation("/people/{id}", Method::Delete).unwrap();
        assert_eq!(op.responses["204"].description, "OK");
        assert!(op.responses["204"].content.is_empty());
    }

    #[test]
    fn test_operation_mut_and_servers() {
        let mut builder = DocumentBuilder::new(info());
        builder.operation(Method::Get, "/a/:id").finish();
        assert!(builder.contains(Method::Get, "/a/:id"));
        assert!(!builder.contains(Method::Post, "/a/:id"));
        builder.operation_mut(Method::Get, "/a/:id").unwrap().operation_id =
            Some("getA".to_string());
        builder.add_server("http://localhost:6000", "example server");
        let doc = builder.build();
        assert_eq!(
            doc.operation("/a/{id}", Method::Get).unwrap().operation_id.as_deref(),
            Some("getA")
        );
        assert_eq!(doc.servers[0].description.as_deref(), Some("example server"));
    }

    proptest::proptest! {
        #[test]
        fn test_openapi_path_ignores_trailing_slash(
            segments in proptest::collection::vec("(:)?[a-z_]{1,8}", 1..5),
        ) {
            let template = format!("/{}", segments.join("/"));
            let path = openapi_path(&template);
            proptest::prop_assert_eq!(&path, &openapi_path(&format!("{template}/")));
            proptest::prop_assert!(!path.contains(':'));
            proptest::prop_assert!(!path.ends_with('/'));
        }
    }
}
