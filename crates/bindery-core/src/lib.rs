//! Request binding for bindery.
//!
//! This crate turns an HTTP request into a typed value:
//!
//! - [`RequestShape`] declares which request part each field comes from
//! - [`BindPlan`] is the registration-time compilation of a shape: tags
//!   parsed, nested shapes flattened, unsupported kinds rejected
//! - [`Binder`] walks a plan against one [`Request`], coercing text values
//!   and decoding the body with the negotiated [`Codec`]
//! - [`multipart`] parses `multipart/form-data` bodies into parts and
//!   [`UploadFile`]s
//!
//! # Example
//!
//! ```ignore
//! use bindery_core::{BindPlan, Binder, MultipartConfig, Request, RequestShape};
//!
//! #[derive(RequestShape)]
//! struct GetItem {
//!     #[bind("path=id")]
//!     id: u64,
//!     #[bind("query=verbose")]
//!     verbose: Option<bool>,
//! }
//!
//! let plan = BindPlan::for_shape::<GetItem>()?;
//! let request = Request::new(Method::Get, "/items/7?verbose=true").with_path_param("id", "7");
//! let item: GetItem = Binder::new(&plan, &request, &MultipartConfig::default()).bind()?;
//! ```

#![forbid(unsafe_code)]

mod binder;
pub mod codec;
mod coerce;
pub mod error;
pub mod multipart;
mod plan;
mod request;
mod shape;
mod upload;

pub use binder::Binder;
pub use codec::{Codec, decode, encode};
pub use coerce::coerce;
pub use error::{
    BindError, CodecError, CoercionError, GenericError, HttpError, RegistrationError,
};
pub use multipart::{MultipartConfig, MultipartError, MultipartParser, Part, parse_boundary};
pub use plan::{BindPlan, PlannedField, Target};
pub use request::{Body, Headers, Request};
pub use shape::{RequestShape, ShapeField};
pub use upload::UploadFile;
