use crate::{FieldPath, Phase, SegmentId};

/// A lifecycle signal that does not fit the state of its operation.
///
/// These never reach the host: the tracer logs and drops the offending signal, a broken trace
/// must not break the request it observes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The signal is not expected in the current phase
    #[error("unexpected `{event}` while the operation is {phase}")]
    OutOfOrder { event: &'static str, phase: Phase },
    /// A resolver ended without a matching start
    #[error("no resolution of `{path}` is in flight")]
    UnmatchedResolveEnd { path: FieldPath },
    /// The segment does not belong to the operation
    #[error("unknown segment {0:?}")]
    UnknownSegment(SegmentId),
    /// The segment was already closed
    #[error("segment {0:?} is already closed")]
    SegmentClosed(SegmentId),
    /// Operation and resolver segments are closed by lifecycle signals only
    #[error("segment {0:?} is closed by lifecycle signals")]
    NotAChildSegment(SegmentId),
    /// A batch was announced after operations started, or twice
    #[error("`batch_start` received after the request started")]
    LateBatchStart,
    /// The request is not a batch
    #[error("`batch_end` received without `batch_start`")]
    UnmatchedBatchEnd,
    /// No operation is being traced
    #[error("`{event}` received outside of an operation")]
    NoOperation { event: &'static str },
}
