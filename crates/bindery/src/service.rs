//! The serving side of an application.
//!
//! A [`Service`] is immutable: routes, bind plans and the document were all
//! fixed by [`App::build`](crate::App::build). It is cheap to clone and safe
//! to share between tasks; nothing is locked while serving.

use std::fmt;
use std::sync::Arc;

use bindery_core::Request;
use bindery_openapi::{DocumentError, OpenApi};
use bindery_types::{Method, mime};
use tracing::debug;

use crate::handler::{RouteFn, RouteRuntime};
use crate::path::PathTemplate;
use crate::response::Response;

/// A registered route.
pub(crate) struct Route {
    pub(crate) method: Method,
    pub(crate) template: PathTemplate,
    pub(crate) call: RouteFn,
    pub(crate) runtime: RouteRuntime,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.template.raw())
            .field("status", &self.runtime.status)
            .field("content_type", &self.runtime.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Inner {
    routes: Vec<Route>,
    document: OpenApi,
}

/// Dispatches requests to registered routes.
#[derive(Debug, Clone)]
pub struct Service {
    inner: Arc<Inner>,
}

impl Service {
    pub(crate) fn new(routes: Vec<Route>, document: OpenApi) -> Self {
        Self {
            inner: Arc::new(Inner { routes, document }),
        }
    }

    /// Handle one request.
    ///
    /// The first route whose method and template match wins; its path
    /// parameters are filled in before the handler runs. Unknown routes are
    /// answered with a 404 error body.
    pub async fn call(&self, mut request: Request) -> Response {
        let method = request.method();
        let matched = self.inner.routes.iter().find_map(|route| {
            if route.method != method {
                return None;
            }
            route
                .template
                .matches(request.path())
                .map(|params| (route, params))
        });

        let Some((route, params)) = matched else {
            debug!(%method, path = request.path(), "no route");
            let message = format!("no route for {method} {}", request.path());
            return Response::error(404, message, mime::APPLICATION_JSON);
        };

        debug!(%method, path = request.path(), route = route.template.raw(), "dispatching");
        request.set_path_params(params);
        (route.call)(request, route.runtime.clone()).await
    }

    /// The finished document.
    #[must_use]
    pub fn document(&self) -> &OpenApi {
        &self.inner.document
    }

    /// The finished document as YAML.
    pub fn openapi_yaml(&self) -> Result<String, DocumentError> {
        self.inner.document.to_yaml()
    }

    /// The finished document as pretty-printed JSON.
    pub fn openapi_json(&self) -> Result<String, DocumentError> {
        self.inner.document.to_json()
    }

    /// Number of routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.routes.len()
    }
}
