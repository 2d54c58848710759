//! Blocking JSON API client over a pluggable HTTP transport.
//!
//! # Overview
//! `ApiClient` turns a method, a path suffix and an optional body into an
//! `HttpRequest`, hands it to a `Transport`, rejects error statuses and
//! decodes the JSON body into a caller-supplied target.
//!
//! # Design
//! - `ApiClient` is immutable after construction: a base URL, a shared
//!   transport and default headers.
//! - The transport is injected (`Arc<dyn Transport>`), so production code
//!   can use `UreqTransport` while tests use in-memory doubles.
//! - Every request carries the caller's `Context`; cancellation and
//!   deadlines are honored cooperatively by the transport.
//! - Each failure stage has its own `ApiError` variant.

pub mod client;
pub mod context;
pub mod error;
pub mod http;
pub mod transport;

pub use client::ApiClient;
pub use context::{Context, ContextError};
pub use error::{ApiError, RequestBuildError, TransportError};
pub use http::{Body, HttpMethod, HttpRequest, HttpResponse};
pub use transport::Transport;

#[cfg(feature = "ureq-transport")]
pub use transport::UreqTransport;
