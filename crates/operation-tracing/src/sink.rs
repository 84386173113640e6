use tracing::{info_span, Span};

use crate::{Segment, TRACING_TARGET};

/// The name of the span created by [`SpanSink::create`]
pub const GRAPHQL_SPAN_NAME: &str = "graphql";

/// Attribute key under which the transaction name is recorded
pub const TRANSACTION_NAME_ATTRIBUTE: &str = "graphql.transaction.name";

/// Receives what a [`RequestTracer`](crate::RequestTracer) derived from a request.
///
/// Both methods are called exactly once per request, the name first.
pub trait TraceSink {
    fn set_transaction_name(&mut self, name: &str);

    /// For a single operation `root` is the operation segment, for a batch it is a batch
    /// segment holding one operation segment per operation.
    fn attach_segment_tree(&mut self, root: Segment);
}

impl<T: TraceSink + ?Sized> TraceSink for &mut T {
    fn set_transaction_name(&mut self, name: &str) {
        (**self).set_transaction_name(name);
    }

    fn attach_segment_tree(&mut self, root: Segment) {
        (**self).attach_segment_tree(root);
    }
}

/// Keeps the results in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub transaction_name: Option<String>,
    pub root: Option<Segment>,
    /// How many times the tracer emitted, one for any well behaved request
    pub emit_count: usize,
}

impl TraceSink for CollectingSink {
    fn set_transaction_name(&mut self, name: &str) {
        self.transaction_name = Some(name.to_string());
        self.emit_count += 1;
    }

    fn attach_segment_tree(&mut self, root: Segment) {
        self.root = Some(root);
    }
}

/// Records the results onto the span of the request.
pub struct SpanSink {
    span: Span,
}

impl SpanSink {
    /// A sink around a new GraphQL span, child of the current one.
    pub fn create() -> Self {
        use tracing::field::Empty;

        let span = info_span!(
            target: TRACING_TARGET,
            GRAPHQL_SPAN_NAME,
            "otel.name" = Empty,
            "graphql.transaction.name" = Empty,
            "graphql.segments.count" = Empty,
        );

        SpanSink { span }
    }

    /// The span results are recorded on, for the host to enter while executing the request.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl TraceSink for SpanSink {
    fn set_transaction_name(&mut self, name: &str) {
        self.span.record("otel.name", name);
        self.span.record(TRANSACTION_NAME_ATTRIBUTE, name);
    }

    fn attach_segment_tree(&mut self, root: Segment) {
        self.span.record("graphql.segments.count", root.count());

        tracing::debug!(
            target: TRACING_TARGET,
            parent: &self.span,
            duration_ms = root.duration().as_millis() as u64,
            "segment tree:\n{root}"
        );
    }
}
