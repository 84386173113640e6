use std::sync::Arc;

use web_time::Instant;

use crate::{
    analyzer,
    error::EventError,
    naming::{self, OperationOutcome},
    segment::OperationSegments,
    FieldPath, LifecycleEvent, OperationDescriptor, Phase, Segment, SegmentId, TraceSink, TracingConfig, TRACING_TARGET,
};

/// Addresses a segment of one operation of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentRef {
    pub operation: usize,
    pub segment: SegmentId,
}

/// One operation of the request, in the state the tracer last saw it.
pub struct OperationTrace {
    segments: OperationSegments,
    descriptor: Option<OperationDescriptor>,
    finalized: Option<FinalizedOperation>,
}

struct FinalizedOperation {
    outcome: OperationOutcome,
    name: String,
    segment: Option<Segment>,
}

impl OperationTrace {
    /// Known once the document was parsed.
    pub fn descriptor(&self) -> Option<&OperationDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.segments.phase()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    pub fn outcome(&self) -> Option<&OperationOutcome> {
        self.finalized.as_ref().map(|finalized| &finalized.outcome)
    }

    /// The full name of this operation, as it appears in the transaction name.
    pub fn name(&self) -> Option<&str> {
        self.finalized.as_ref().map(|finalized| finalized.name.as_str())
    }

    pub fn segment(&self) -> Option<&Segment> {
        self.finalized.as_ref().and_then(|finalized| finalized.segment.as_ref())
    }
}

/// Derives the transaction name and the segment tree of one request.
///
/// Create one per request and feed it every [`LifecycleEvent`] of the request in the order the
/// engine emits them. Results go to the [`TraceSink`] once: when the single operation of the
/// request completes, on [`LifecycleEvent::BatchEnd`] for batches, or when the tracer is finished
/// or dropped early, in which case whatever was collected so far is emitted.
pub struct RequestTracer<S: TraceSink> {
    config: Arc<TracingConfig>,
    sink: S,
    batch: Option<usize>,
    operations: Vec<OperationTrace>,
    transaction_name: Option<String>,
}

impl<S: TraceSink> RequestTracer<S> {
    pub fn new(config: Arc<TracingConfig>, sink: S) -> Self {
        Self {
            config,
            sink,
            batch: None,
            operations: Vec::new(),
            transaction_name: None,
        }
    }

    /// Operations seen so far, in request order.
    pub fn operations(&self) -> &[OperationTrace] {
        &self.operations
    }

    /// Set once the results were emitted.
    pub fn transaction_name(&self) -> Option<&str> {
        self.transaction_name.as_deref()
    }

    pub fn is_batch(&self) -> bool {
        self.batch.is_some()
    }

    pub fn handle(&mut self, event: LifecycleEvent<'_>) {
        self.handle_at(event, Instant::now());
    }

    /// Same as [`RequestTracer::handle`], for hosts timestamping events themselves.
    pub fn handle_at(&mut self, event: LifecycleEvent<'_>, now: Instant) {
        if self.transaction_name.is_some() {
            tracing::debug!(target: TRACING_TARGET, event = event.name(), "dropping event received after completion");
            return;
        }

        tracing::trace!(target: TRACING_TARGET, event = event.name(), "graphql lifecycle event");

        if let Err(error) = self.apply(event, now) {
            tracing::debug!(target: TRACING_TARGET, event = event.name(), "dropping event: {error}");
        }
    }

    /// Innermost open segment of the operation in progress, for the host to attach
    /// asynchronous work scheduled from there.
    pub fn current_segment(&self) -> Option<SegmentRef> {
        let (operation, trace) = self.in_progress()?;

        trace
            .segments
            .current_segment()
            .map(|segment| SegmentRef { operation, segment })
    }

    /// Opens a segment for work the host attributed to `parent`.
    pub fn start_segment(&mut self, parent: SegmentRef, name: impl Into<String>) -> Option<SegmentRef> {
        self.start_segment_at(parent, name, Instant::now())
    }

    pub fn start_segment_at(
        &mut self,
        parent: SegmentRef,
        name: impl Into<String>,
        now: Instant,
    ) -> Option<SegmentRef> {
        let result = match self.operations.get_mut(parent.operation) {
            Some(trace) if trace.finalized.is_none() => trace.segments.start_child(parent.segment, name.into(), now),
            Some(_) => Err(EventError::SegmentClosed(parent.segment)),
            None => Err(EventError::UnknownSegment(parent.segment)),
        };

        match result {
            Ok(segment) => Some(SegmentRef {
                operation: parent.operation,
                segment,
            }),
            Err(error) => {
                tracing::debug!(target: TRACING_TARGET, "cannot start segment: {error}");
                None
            }
        }
    }

    pub fn end_segment(&mut self, segment: SegmentRef) {
        self.end_segment_at(segment, Instant::now());
    }

    pub fn end_segment_at(&mut self, segment: SegmentRef, now: Instant) {
        let result = match self.operations.get_mut(segment.operation) {
            Some(trace) if trace.finalized.is_none() => trace.segments.finish_child(segment.segment, now),
            Some(_) => Err(EventError::SegmentClosed(segment.segment)),
            None => Err(EventError::UnknownSegment(segment.segment)),
        };

        if let Err(error) = result {
            tracing::debug!(target: TRACING_TARGET, "cannot end segment: {error}");
        }
    }

    /// Completes the request: open segments are force-closed and results emitted, unless that
    /// already happened.
    pub fn finish(mut self) {
        self.complete(Instant::now());
    }

    fn apply(&mut self, event: LifecycleEvent<'_>, now: Instant) -> Result<(), EventError> {
        match event {
            LifecycleEvent::BatchStart { count } => {
                if self.batch.is_some() || !self.operations.is_empty() {
                    return Err(EventError::LateBatchStart);
                }
                // Announced by the host, only compared with what was traced.
                self.batch = Some(count);
            }
            LifecycleEvent::BatchEnd => {
                if self.batch.is_none() {
                    return Err(EventError::UnmatchedBatchEnd);
                }
                self.complete(now);
            }
            LifecycleEvent::ParseStart => {
                if let Some(index) = self.in_progress().map(|(index, _)| index) {
                    tracing::debug!(target: TRACING_TARGET, "operation {index} interrupted by a new operation");
                    self.finalize_operation(index, now);
                }

                self.operations.push(OperationTrace {
                    segments: OperationSegments::new(self.config.clone(), now),
                    descriptor: None,
                    finalized: None,
                });
            }
            LifecycleEvent::ParseEnd {
                document,
                operation_name,
                error_count,
            } => {
                let config = self.config.clone();
                let (index, trace) = self.in_progress_mut(event.name())?;
                trace.segments.parse_finished()?;

                let descriptor = match document {
                    Some(document) if error_count == 0 => analyzer::analyze_request(document, operation_name, &config),
                    _ => None,
                };

                match descriptor {
                    Some(descriptor) => {
                        let outcome = OperationOutcome::Unresolved(descriptor.clone());
                        trace
                            .segments
                            .name_operation(naming::operation_segment_name(&outcome, &config));
                        trace.descriptor = Some(descriptor);
                    }
                    None => self.operation_done(index, now),
                }
            }
            LifecycleEvent::ValidateStart => {
                self.in_progress_mut(event.name())?.1.segments.validate_started()?;
            }
            LifecycleEvent::ValidateEnd { error_count } => {
                let (index, trace) = self.in_progress_mut(event.name())?;
                trace.segments.validate_finished()?;

                if error_count > 0 {
                    self.operation_done(index, now);
                }
            }
            LifecycleEvent::ExecuteStart => {
                self.in_progress_mut(event.name())?.1.segments.execute_started()?;
            }
            LifecycleEvent::ResolveStart { path } => {
                if !self.is_ignored(path) {
                    self.in_progress_mut(event.name())?.1.segments.resolve_started(path, now)?;
                }
            }
            LifecycleEvent::ResolveEnd { path } => {
                if !self.is_ignored(path) {
                    self.in_progress_mut(event.name())?.1.segments.resolve_finished(path, now)?;
                }
            }
            LifecycleEvent::ExecuteEnd => {
                let (index, trace) = self.in_progress_mut(event.name())?;
                let forced = trace.segments.execute_finished(now)?;
                if forced > 0 {
                    tracing::debug!(target: TRACING_TARGET, "force-closed {forced} segments of operation {index}");
                }
                self.operation_done(index, now);
            }
        }

        Ok(())
    }

    fn is_ignored(&self, path: &FieldPath) -> bool {
        self.config.ignore_introspection_fields && path.is_introspection()
    }

    /// The last operation, if not finalized yet.
    fn in_progress(&self) -> Option<(usize, &OperationTrace)> {
        let index = self.operations.len().checked_sub(1)?;
        let trace = &self.operations[index];
        trace.finalized.is_none().then_some((index, trace))
    }

    fn in_progress_mut(&mut self, event: &'static str) -> Result<(usize, &mut OperationTrace), EventError> {
        let index = self
            .operations
            .len()
            .checked_sub(1)
            .ok_or(EventError::NoOperation { event })?;

        let trace = &mut self.operations[index];
        if trace.finalized.is_some() {
            return Err(EventError::NoOperation { event });
        }

        Ok((index, trace))
    }

    /// The operation got as far as it will: a single operation completes the request.
    fn operation_done(&mut self, index: usize, now: Instant) {
        self.finalize_operation(index, now);

        if self.batch.is_none() {
            self.complete(now);
        }
    }

    fn finalize_operation(&mut self, index: usize, now: Instant) {
        let config = self.config.clone();
        let trace = &mut self.operations[index];

        if trace.finalized.is_some() {
            return;
        }

        let outcome = match trace.descriptor.clone() {
            None => OperationOutcome::Unknown,
            Some(descriptor) if trace.segments.has_resolved_fields() => OperationOutcome::Resolved(descriptor),
            Some(descriptor) => OperationOutcome::Unresolved(descriptor),
        };

        trace
            .segments
            .name_operation(naming::operation_segment_name(&outcome, &config));

        let forced = trace.segments.force_close(now);
        if forced > 0 {
            tracing::debug!(target: TRACING_TARGET, "force-closed {forced} segments of operation {index}");
        }

        let name = naming::operation_name(&outcome, &config);
        tracing::trace!(target: TRACING_TARGET, "operation {index} named `{name}`");

        trace.finalized = Some(FinalizedOperation {
            segment: trace.segments.to_segment(),
            outcome,
            name,
        });
    }

    /// Finalizes whatever is left and emits, once.
    fn complete(&mut self, now: Instant) {
        if self.transaction_name.is_some() {
            return;
        }

        if let Some(index) = self.in_progress().map(|(index, _)| index) {
            self.finalize_operation(index, now);
        }

        if let Some(expected) = self.batch {
            if expected != self.operations.len() {
                tracing::debug!(
                    target: TRACING_TARGET,
                    "batch announced {expected} operations, {} were traced",
                    self.operations.len()
                );
            }
        }

        let outcomes: Vec<OperationOutcome> = self
            .operations
            .iter()
            .filter_map(|trace| trace.outcome().cloned())
            .collect();

        let name = naming::finalize(&outcomes, self.is_batch(), &self.config);
        let root = self.segment_tree(now);

        tracing::debug!(target: TRACING_TARGET, "transaction named `{name}`");

        self.sink.set_transaction_name(&name);
        self.sink.attach_segment_tree(root);
        self.transaction_name = Some(name);
    }

    fn segment_tree(&self, now: Instant) -> Segment {
        let mut segments: Vec<Segment> = self
            .operations
            .iter()
            .filter_map(|trace| trace.segment().cloned())
            .collect();

        if self.batch.is_none() {
            if let Some(segment) = segments.pop() {
                return segment;
            }

            return Segment {
                name: naming::operation_segment_name(&OperationOutcome::Unknown, &self.config),
                start: now,
                end: now,
                children: Vec::new(),
            };
        }

        let start = segments.iter().map(|segment| segment.start).min().unwrap_or(now);
        let end = segments.iter().map(|segment| segment.end).max().unwrap_or(now).max(start);

        Segment {
            name: self.config.batch_prefix.clone(),
            start,
            end,
            children: segments,
        }
    }
}

impl<S: TraceSink> Drop for RequestTracer<S> {
    fn drop(&mut self) {
        if self.transaction_name.is_none() {
            tracing::debug!(target: TRACING_TARGET, "request tracer dropped before completion");
            self.complete(Instant::now());
        }
    }
}
