//! Client for the remote classification endpoint.
//!
//! The endpoint receives `POST {"input": "<payload>"}` and only its transport
//! status is consumed: 200 passes, anything else fails. The response body is not
//! interpreted.

pub mod client;
pub mod payload;

pub use client::{HttpInferenceClient, InferenceClient, InferenceError};
pub use payload::{encode_payload, ContentKind, InferenceRequest};
