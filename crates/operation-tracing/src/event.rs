use cynic_parser::ExecutableDocument;

use crate::FieldPath;

/// The signals a GraphQL engine emits while handling a request.
///
/// Each engine integration translates its own hooks into these. For every operation they arrive
/// in causal order: parse, then validate, then execute, a field never ends before it started.
/// Batched requests bracket their operations, delivered in array order, with
/// [`LifecycleEvent::BatchStart`] and [`LifecycleEvent::BatchEnd`].
#[derive(Clone, Copy, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleEvent<'a> {
    BatchStart {
        count: usize,
    },
    BatchEnd,
    ParseStart,
    /// `document` is `None` when parsing failed.
    ParseEnd {
        document: Option<&'a ExecutableDocument>,
        /// The `operationName` of the request.
        operation_name: Option<&'a str>,
        error_count: usize,
    },
    ValidateStart,
    ValidateEnd {
        error_count: usize,
    },
    ExecuteStart,
    ResolveStart {
        path: &'a FieldPath,
    },
    ResolveEnd {
        path: &'a FieldPath,
    },
    ExecuteEnd,
}

impl LifecycleEvent<'_> {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}
