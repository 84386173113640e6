#![allow(dead_code)]

use std::sync::Arc;

use cynic_parser::ExecutableDocument;
use graphql_operation_tracing::{FieldPath, LifecycleEvent, RequestTracer, TraceSink, TracingConfig};

pub fn config() -> Arc<TracingConfig> {
    Arc::new(TracingConfig::default())
}

pub fn parse(query: &str) -> ExecutableDocument {
    cynic_parser::parse_executable_document(query).unwrap()
}

/// Parses and validates `document`, the caller drives execution.
pub fn prepare<S: TraceSink>(tracer: &mut RequestTracer<S>, document: &ExecutableDocument) {
    tracer.handle(LifecycleEvent::ParseStart);
    tracer.handle(LifecycleEvent::ParseEnd {
        document: Some(document),
        operation_name: None,
        error_count: 0,
    });
    tracer.handle(LifecycleEvent::ValidateStart);
    tracer.handle(LifecycleEvent::ValidateEnd { error_count: 0 });
    tracer.handle(LifecycleEvent::ExecuteStart);
}

pub fn resolve<S: TraceSink>(tracer: &mut RequestTracer<S>, path: &str) {
    let path = FieldPath::from(path);
    tracer.handle(LifecycleEvent::ResolveStart { path: &path });
    tracer.handle(LifecycleEvent::ResolveEnd { path: &path });
}

/// Runs a whole operation resolving `paths` one after the other.
pub fn execute<S: TraceSink>(tracer: &mut RequestTracer<S>, document: &ExecutableDocument, paths: &[&str]) {
    prepare(tracer, document);

    for path in paths {
        resolve(tracer, path);
    }

    tracer.handle(LifecycleEvent::ExecuteEnd);
}
