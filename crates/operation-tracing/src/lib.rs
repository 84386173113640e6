#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Transaction naming and segment trees for GraphQL operations.
//!
//! A host creates one [`RequestTracer`] per inbound request and feeds it the lifecycle of every
//! GraphQL operation it executes as [`LifecycleEvent`]s. Once all operations of the request are
//! done, the tracer hands a single transaction name and a segment tree to its [`TraceSink`]:
//!
//! - `query GetBook library.books.title` for a successful operation, named after the deepest
//!   field path selected by the document,
//! - `query GetBook` when the operation failed validation,
//! - `*` when the document could not be parsed,
//! - `batch/<first>/<second>` for batched requests.

mod analyzer;
/// Tracing configuration properties
pub mod config;
mod coordinator;
/// Potential errors from this crate
pub mod error;
mod event;
mod naming;
mod path;
mod segment;
mod sink;

pub use analyzer::{analyze, analyze_request, select_operation, OperationDescriptor, OperationKind, OperationName};
pub use config::TracingConfig;
pub use coordinator::{OperationTrace, RequestTracer, SegmentRef};
pub use event::LifecycleEvent;
pub use naming::{finalize, OperationOutcome};
pub use path::{FieldPath, PathSegment};
pub use segment::{Phase, Segment, SegmentId};
pub use sink::{CollectingSink, SpanSink, TraceSink, GRAPHQL_SPAN_NAME, TRANSACTION_NAME_ATTRIBUTE};

/// Tracing target for logging
pub const TRACING_TARGET: &str = "operation_tracing";
