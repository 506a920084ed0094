//! Application and route registration.
//!
//! Registration is a single-threaded setup phase. Each `get`/`post`/...
//! call returns a [`RouteBuilder`]; when the builder goes out of scope the
//! route's bind plan is compiled and its operation is written into the
//! document. Failures are collected, not raised, and [`App::build`] refuses
//! to produce a [`Service`] while any exist.
//!
//! ```ignore
//! let mut app = App::new();
//! app.post("/example/:id", create)
//!     .operation_id("createExample")
//!     .description("Create example")
//!     .tags(["example"]);
//! let service = app.build()?;
//! ```

use std::sync::Arc;

use bindery_core::{BindPlan, RegistrationError, RequestShape};
use bindery_openapi::{DocumentBuilder, DocumentError, JsonSchema, OpenApi, Schema};
use bindery_types::{Describe, Method, TypeDescriptor, mime};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{RouteError, StartupError};
use crate::handler::{Handler, RouteFn, RouteRuntime, erase};
use crate::path::PathTemplate;
use crate::service::{Route, Service};

/// An application under construction.
#[derive(Debug)]
pub struct App {
    config: AppConfig,
    document: DocumentBuilder,
    routes: Vec<Route>,
    errors: Vec<RouteError>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// An application with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// An application with `config`.
    #[must_use]
    pub fn with_config(config: AppConfig) -> Self {
        let mut document = DocumentBuilder::new(config.info())
            .error_content_types(config.error_content_types.clone());
        for server in &config.servers {
            document.add_server(&server.url, &server.description);
        }
        Self {
            config,
            document,
            routes: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Append a server to the document.
    pub fn add_server(&mut self, url: impl Into<String>, description: impl Into<String>) -> &mut Self {
        self.document.add_server(url, description);
        self
    }

    /// Register a route for any method.
    pub fn route<S, R, H>(&mut self, method: Method, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        let response = R::describe();
        let pending = PendingRoute {
            method,
            template: path.to_string(),
            plan: BindPlan::for_shape::<S>(),
            call: erase(handler, response.clone()),
            response,
            response_schema: R::schema,
            status: method.default_status(),
            request_content_type: None,
            response_content_type: mime::APPLICATION_JSON.to_string(),
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
        };
        RouteBuilder {
            app: self,
            pending: Some(pending),
        }
    }

    /// Register a GET route.
    pub fn get<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Get, path, handler)
    }

    /// Register a POST route.
    pub fn post<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Post, path, handler)
    }

    /// Register a PUT route.
    pub fn put<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Put, path, handler)
    }

    /// Register a PATCH route.
    pub fn patch<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Patch, path, handler)
    }

    /// Register a DELETE route.
    pub fn delete<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Delete, path, handler)
    }

    /// Register a HEAD route.
    pub fn head<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Head, path, handler)
    }

    /// Register an OPTIONS route.
    pub fn options<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Options, path, handler)
    }

    /// Register a TRACE route.
    pub fn trace<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Trace, path, handler)
    }

    /// Register a CONNECT route.
    pub fn connect<S, R, H>(&mut self, path: &str, handler: H) -> RouteBuilder<'_>
    where
        S: RequestShape + Send + 'static,
        R: Serialize + Describe + JsonSchema + Send + 'static,
        H: Handler<S, R>,
    {
        self.route(Method::Connect, path, handler)
    }

    /// The document as registered so far.
    #[must_use]
    pub fn document(&self) -> &OpenApi {
        self.document.document()
    }

    /// The document so far, as YAML.
    pub fn openapi_yaml(&self) -> Result<String, DocumentError> {
        self.document.document().to_yaml()
    }

    /// Registration failures so far.
    #[must_use]
    pub fn errors(&self) -> &[RouteError] {
        &self.errors
    }

    /// Finish registration.
    pub fn build(self) -> Result<Service, StartupError> {
        if !self.errors.is_empty() {
            warn!(errors = self.errors.len(), "route registration failed");
            return Err(StartupError {
                errors: self.errors,
            });
        }
        info!(routes = self.routes.len(), "document built");
        Ok(Service::new(self.routes, self.document.build()))
    }

    fn register(&mut self, route: PendingRoute) {
        let PendingRoute {
            method,
            template,
            plan,
            call,
            response,
            response_schema,
            status,
            request_content_type,
            response_content_type,
            operation_id,
            summary,
            description,
            tags,
        } = route;

        let plan = if self.document.contains(method, &template) {
            Err(RegistrationError::DuplicateRoute {
                method,
                path: template.clone(),
            })
        } else {
            plan
        };
        let plan = match plan {
            Ok(plan) => plan,
            Err(error) => {
                warn!(%method, path = %template, %error, "route rejected");
                self.errors.push(RouteError {
                    method,
                    path: template,
                    error,
                });
                return;
            }
        };

        let mut operation = self.document.operation(method, &template);
        for field in plan.parameters() {
            operation.parameter(&field.binding, field.schema);
        }
        if let Some(body) = plan.body() {
            let descriptor = (body.describe)();
            let content_type = request_content_type.unwrap_or_else(|| {
                if descriptor.has_file_field() {
                    mime::MULTIPART_FORM.to_string()
                } else {
                    mime::APPLICATION_JSON.to_string()
                }
            });
            operation.request_body(&descriptor, body.schema, &content_type);
        }
        operation.response(status, &response, response_schema, &response_content_type);
        if let Some(id) = operation_id {
            operation.operation_id(id);
        }
        if let Some(summary) = summary {
            operation.summary(summary);
        }
        if let Some(description) = description {
            operation.description(description);
        }
        operation.tags(tags);
        operation.finish();

        info!(%method, path = %template, fields = plan.len(), "route registered");
        self.routes.push(Route {
            method,
            template: PathTemplate::parse(&template),
            call,
            runtime: RouteRuntime {
                status,
                content_type: response_content_type,
                multipart: self.config.multipart,
                plan: Arc::new(plan),
            },
        });
    }
}

/// A route waiting for its builder to be dropped.
struct PendingRoute {
    method: Method,
    template: String,
    plan: Result<BindPlan, RegistrationError>,
    call: RouteFn,
    response: TypeDescriptor,
    response_schema: fn() -> Schema,
    status: u16,
    request_content_type: Option<String>,
    response_content_type: String,
    operation_id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
}

/// Route options. The route is registered when the builder is dropped.
pub struct RouteBuilder<'a> {
    app: &'a mut App,
    pending: Option<PendingRoute>,
}

impl RouteBuilder<'_> {
    fn with(&mut self, update: impl FnOnce(&mut PendingRoute)) -> &mut Self {
        if let Some(route) = self.pending.as_mut() {
            update(route);
        }
        self
    }

    /// Override the operation id (default `METHOD/template`).
    pub fn operation_id(&mut self, id: impl Into<String>) -> &mut Self {
        let id = id.into();
        self.with(|route| route.operation_id = Some(id))
    }

    /// Set the operation summary.
    pub fn summary(&mut self, summary: impl Into<String>) -> &mut Self {
        let summary = summary.into();
        self.with(|route| route.summary = Some(summary))
    }

    /// Set the operation description.
    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        let description = description.into();
        self.with(|route| route.description = Some(description))
    }

    /// Add operation tags.
    pub fn tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(|route| route.tags.extend(tags.into_iter().map(Into::into)))
    }

    /// Content type the request body is documented under.
    pub fn request_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        let content_type = content_type.into();
        self.with(|route| route.request_content_type = Some(content_type))
    }

    /// Content type responses are encoded and documented under.
    pub fn response_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        let content_type = content_type.into();
        self.with(|route| route.response_content_type = content_type)
    }

    /// Success status (default: 201 for POST, 204 for DELETE, else 200).
    pub fn status(&mut self, status: u16) -> &mut Self {
        self.with(|route| route.status = status)
    }
}

impl Drop for RouteBuilder<'_> {
    fn drop(&mut self) {
        if let Some(route) = self.pending.take() {
            self.app.register(route);
        }
    }
}

impl std::fmt::Debug for RouteBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("RouteBuilder");
        if let Some(route) = &self.pending {
            s.field("method", &route.method)
                .field("path", &route.template);
        }
        s.finish_non_exhaustive()
    }
}
