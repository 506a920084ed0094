//! Declarative request binding with OpenAPI documents derived from the same
//! types.
//!
//! A handler names a request shape: a struct whose fields say where in the
//! request their value comes from. The same declaration drives both sides:
//!
//! - at registration the shape is compiled into a bind plan and documented
//!   as parameters, a request body, security requirements and schemas
//! - while serving, the plan binds each request into the shape, and the
//!   handler's result is encoded under the route's content type
//!
//! # Example
//!
//! ```ignore
//! use bindery::prelude::*;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Body {
//!     first_name: String,
//!     last_name: String,
//! }
//!
//! #[derive(RequestShape)]
//! struct CreateReq {
//!     #[bind("path=id")]
//!     id: u64,
//!     #[bind("header=Authorization;isauth;scheme=bearer")]
//!     token: String,
//!     #[bind("req=body")]
//!     body: Body,
//! }
//!
//! #[derive(Serialize, JsonSchema)]
//! struct Created {
//!     id: u64,
//! }
//!
//! async fn create(ctx: RequestContext<CreateReq>) -> Result<Created, Error> {
//!     let req = ctx.requests()?;
//!     Ok(Created { id: req.id })
//! }
//!
//! let mut app = App::new();
//! app.post("/items/:id", create).description("Create an item");
//! let service = app.build()?;
//! println!("{}", service.openapi_yaml()?);
//! ```
//!
//! # Crate Structure
//!
//! - [`bindery_types`]: type descriptors, the tag mini-language, methods
//! - [`bindery_core`]: bind plans, binding, coercion, codecs, multipart
//! - [`bindery_openapi`]: schemas and document assembly
//! - [`bindery_macros`]: `#[derive(JsonSchema)]`, `#[derive(RequestShape)]`

#![forbid(unsafe_code)]

mod app;
mod config;
mod context;
mod error;
mod handler;
mod path;
mod response;
mod service;

pub use bindery_core as core;
pub use bindery_macros as macros;
pub use bindery_openapi as openapi;
pub use bindery_types as types;

pub use app::{App, RouteBuilder};
pub use config::{AppConfig, ServerConfig};
pub use context::RequestContext;
pub use error::{Error, RouteError, StartupError};
pub use handler::{BoxFuture, Handler};
pub use response::Response;
pub use service::Service;

pub use bindery_core::{
    BindError, CodecError, CoercionError, GenericError, HttpError, MultipartConfig,
    RegistrationError, Request, RequestShape, UploadFile,
};
pub use bindery_macros::{JsonSchema, RequestShape};
pub use bindery_openapi::{JsonSchema, OpenApi};
pub use bindery_types::{Describe, Method};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        App, AppConfig, Error, HttpError, JsonSchema, Method, Request, RequestContext,
        RequestShape, Response, Service, UploadFile,
    };
    pub use serde::{Deserialize, Serialize};
}
