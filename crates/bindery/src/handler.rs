//! Handlers and their type-erased form.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bindery_core::{BindPlan, MultipartConfig, Request};
use bindery_types::TypeDescriptor;
use parking_lot::Mutex;
use serde::Serialize;

use crate::context::{RequestContext, ResponseOverrides};
use crate::error::Error;
use crate::response::Response;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An async function from a request context to a result.
///
/// Implemented for every `Fn(RequestContext<S>) -> impl Future<Output =
/// Result<R, Error>>`, so plain `async fn`s are handlers.
pub trait Handler<S, R>: Send + Sync + 'static {
    /// Run the handler.
    fn call(&self, ctx: RequestContext<S>) -> BoxFuture<'static, Result<R, Error>>;
}

impl<F, Fut, S, R> Handler<S, R> for F
where
    F: Fn(RequestContext<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    fn call(&self, ctx: RequestContext<S>) -> BoxFuture<'static, Result<R, Error>> {
        Box::pin(self(ctx))
    }
}

/// Route settings the erased handler needs at request time.
#[derive(Debug, Clone)]
pub(crate) struct RouteRuntime {
    pub(crate) status: u16,
    pub(crate) content_type: String,
    pub(crate) multipart: MultipartConfig,
    pub(crate) plan: Arc<BindPlan>,
}

/// A handler with its shape and response types erased.
pub(crate) type RouteFn =
    Arc<dyn Fn(Request, RouteRuntime) -> BoxFuture<'static, Response> + Send + Sync>;

/// Erase a handler: run it, apply its overrides and encode the outcome.
pub(crate) fn erase<S, R, H>(handler: H, response: TypeDescriptor) -> RouteFn
where
    S: Send + 'static,
    R: Serialize + Send + 'static,
    H: Handler<S, R>,
{
    let handler = Arc::new(handler);
    let response = Arc::new(response);
    Arc::new(move |request: Request, runtime: RouteRuntime| -> BoxFuture<'static, Response> {
        let handler = Arc::clone(&handler);
        let response = Arc::clone(&response);
        Box::pin(async move {
            let overrides = Arc::new(Mutex::new(ResponseOverrides::default()));
            let ctx = RequestContext::new(
                Arc::new(request),
                runtime.plan,
                runtime.multipart,
                Arc::clone(&overrides),
            );
            let result = handler.call(ctx).await;

            let ResponseOverrides {
                status,
                content_type,
            } = std::mem::take(&mut *overrides.lock());
            let status = status.unwrap_or(runtime.status);
            let content_type = content_type.unwrap_or(runtime.content_type);
            match result {
                Ok(value) => Response::encode(status, &value, &response, &content_type),
                Err(err) => Response::from_error(&err, &content_type),
            }
        })
    })
}
