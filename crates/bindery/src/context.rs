//! Per-request handler context.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bindery_core::{BindError, BindPlan, Binder, MultipartConfig, Request, RequestShape};
use parking_lot::Mutex;

/// Response settings a handler changed for its own response.
#[derive(Debug, Default)]
pub(crate) struct ResponseOverrides {
    pub(crate) status: Option<u16>,
    pub(crate) content_type: Option<String>,
}

/// What a handler receives: the request and its route's compiled bind plan.
///
/// `S` is the route's request shape; [`requests`](Self::requests) binds it.
///
/// ```ignore
/// async fn get_item(ctx: RequestContext<GetItem>) -> Result<Item, Error> {
///     let req = ctx.requests()?;
///     if req.id == 0 {
///         return Err(HttpError::bad_request("id must not be zero").into());
///     }
///     Ok(load(req.id))
/// }
/// ```
pub struct RequestContext<S> {
    request: Arc<Request>,
    plan: Arc<BindPlan>,
    multipart: MultipartConfig,
    overrides: Arc<Mutex<ResponseOverrides>>,
    shape: PhantomData<fn() -> S>,
}

impl<S> RequestContext<S> {
    pub(crate) fn new(
        request: Arc<Request>,
        plan: Arc<BindPlan>,
        multipart: MultipartConfig,
        overrides: Arc<Mutex<ResponseOverrides>>,
    ) -> Self {
        Self {
            request,
            plan,
            multipart,
            overrides,
            shape: PhantomData,
        }
    }

    /// The raw request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Answer with this content type instead of the route's declared one.
    /// The document is unaffected.
    pub fn set_content_type(&self, content_type: impl Into<String>) {
        self.overrides.lock().content_type = Some(content_type.into());
    }

    /// Answer with this status instead of the route's default one.
    pub fn status(&self, status: u16) {
        self.overrides.lock().status = Some(status);
    }
}

impl<S: RequestShape> RequestContext<S> {
    /// Bind the request shape. Stops at the first field that fails.
    pub fn requests(&self) -> Result<S, BindError> {
        Binder::new(&self.plan, &self.request, &self.multipart).bind::<S>()
    }
}

impl<S> Clone for RequestContext<S> {
    fn clone(&self) -> Self {
        Self {
            request: Arc::clone(&self.request),
            plan: Arc::clone(&self.plan),
            multipart: self.multipart,
            overrides: Arc::clone(&self.overrides),
            shape: PhantomData,
        }
    }
}

impl<S> fmt::Debug for RequestContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.request.method())
            .field("path", &self.request.path())
            .field("fields", &self.plan.len())
            .finish_non_exhaustive()
    }
}
