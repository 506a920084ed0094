//! Handler and startup errors.

use bindery_core::{BindError, HttpError, RegistrationError};
use bindery_types::Method;

/// What a handler may fail with.
///
/// Domain errors keep their status; every other failure, including a request
/// that does not bind, is answered with 500.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request did not bind.
    #[error(transparent)]
    Bind(#[from] BindError),
    /// A business-logic failure with an explicit status.
    #[error(transparent)]
    Domain(#[from] HttpError),
    /// Anything else.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary error.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }

    /// The HTTP status this error is answered with.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Domain(err) => err.status(),
            Self::Bind(_) | Self::Other(_) => 500,
        }
    }
}

/// One route that failed to register.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{method} {path}: {error}")]
pub struct RouteError {
    /// Route method.
    pub method: Method,
    /// Route template as declared.
    pub path: String,
    /// What went wrong.
    #[source]
    pub error: RegistrationError,
}

/// Every registration failure of an application. An application with any of
/// these never produces a [`Service`](crate::Service).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} route(s) failed to register: {}", .errors.len(), list(.errors))]
pub struct StartupError {
    /// The failures, in registration order.
    pub errors: Vec<RouteError>,
}

fn list(errors: &[RouteError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
