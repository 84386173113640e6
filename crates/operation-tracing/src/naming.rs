use itertools::Itertools;

use crate::{OperationDescriptor, TracingConfig};

/// How far one operation of a request got, as far as naming is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// No document could be produced, or it does not hold the requested operation.
    Unknown,
    /// The document is known but no field was resolved, typically a validation failure.
    Unresolved(OperationDescriptor),
    /// At least one field was resolved.
    Resolved(OperationDescriptor),
}

/// Full name of one operation: `<kind> <name>`, followed by the deepest path once fields were
/// resolved.
pub(crate) fn operation_name(outcome: &OperationOutcome, config: &TracingConfig) -> String {
    match outcome {
        OperationOutcome::Unknown => config.unknown_transaction_name.clone(),
        OperationOutcome::Unresolved(descriptor) => kind_and_name(descriptor, config),
        OperationOutcome::Resolved(descriptor) if descriptor.deepest_path.is_empty() => {
            kind_and_name(descriptor, config)
        }
        OperationOutcome::Resolved(descriptor) => {
            format!("{} {}", kind_and_name(descriptor, config), descriptor.deepest_path)
        }
    }
}

/// Name of the segment of one operation.
pub(crate) fn operation_segment_name(outcome: &OperationOutcome, config: &TracingConfig) -> String {
    match outcome {
        OperationOutcome::Unknown => format!("{}: {}", config.operation_segment_prefix, config.unknown_placeholder),
        outcome => format!("{}: {}", config.operation_segment_prefix, operation_name(outcome, config)),
    }
}

fn kind_and_name(descriptor: &OperationDescriptor, config: &TracingConfig) -> String {
    format!("{} {}", descriptor.kind, descriptor.name.as_str(config))
}

/// The transaction name of a request, from the outcomes of its operations in request order.
///
/// Batched requests join the name of every operation behind the batch prefix, in order, without
/// sorting or deduplicating them.
pub fn finalize(outcomes: &[OperationOutcome], batched: bool, config: &TracingConfig) -> String {
    if batched {
        return std::iter::once(config.batch_prefix.clone())
            .chain(outcomes.iter().map(|outcome| operation_name(outcome, config)))
            .join("/");
    }

    // A request that is not batched only ever completes one operation, the last one seen.
    match outcomes.last() {
        Some(outcome) => operation_name(outcome, config),
        None => config.unknown_transaction_name.clone(),
    }
}
