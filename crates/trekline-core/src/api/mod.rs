//! REST API access for the trek marketplace.
//!
//! - `transport`: the HTTP boundary (`reqwest`) behind the `Transport` trait
//! - `pipeline`: request/response interceptor stages around every call
//! - `client`: typed endpoints on top of the pipeline
//!
//! The API uses bearer token authentication; see `crate::auth` for the
//! session lifecycle the interceptors drive.

pub mod client;
pub mod error;
pub mod pipeline;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use client::{ApiClient, LoginResponse};
pub use error::{ApiError, ResponseClass};
pub use pipeline::{AuthFailureGuard, BearerAuth, Pipeline, RequestStage, ResponseStage};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};
