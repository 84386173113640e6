//! Drives a [`RequestTracer`] through the lifecycle an engine would go through for a request.
//!
//! There is no schema: every selected field resolves once, in document order, nested in its
//! parent's resolution. Validation only checks what the tracer cares about, that the operation
//! to execute exists and every fragment it spreads is defined.

use cynic_parser::{
    executable::{Iter, OperationDefinition, Selection},
    ExecutableDocument,
};
use graphql_operation_tracing::{select_operation, FieldPath, LifecycleEvent, RequestTracer, TraceSink};

use crate::request::{BatchRequest, Request};

pub(crate) fn run<S: TraceSink>(tracer: &mut RequestTracer<S>, request: &BatchRequest) {
    match request {
        BatchRequest::Single(request) => execute(tracer, request),
        BatchRequest::Batch(requests) => {
            tracer.handle(LifecycleEvent::BatchStart { count: requests.len() });

            for request in requests {
                execute(tracer, request);
            }

            tracer.handle(LifecycleEvent::BatchEnd);
        }
    }
}

fn execute<S: TraceSink>(tracer: &mut RequestTracer<S>, request: &Request) {
    let operation_name = request.operation_name.as_deref();

    tracer.handle(LifecycleEvent::ParseStart);

    let document = match cynic_parser::parse_executable_document(&request.query) {
        Ok(document) => document,
        Err(error) => {
            tracing::warn!("failed to parse the document: {error}");

            tracer.handle(LifecycleEvent::ParseEnd {
                document: None,
                operation_name,
                error_count: 1,
            });
            return;
        }
    };

    tracer.handle(LifecycleEvent::ParseEnd {
        document: Some(&document),
        operation_name,
        error_count: 0,
    });

    tracer.handle(LifecycleEvent::ValidateStart);

    let operation = match validate(&document, operation_name) {
        Ok(operation) => {
            tracer.handle(LifecycleEvent::ValidateEnd { error_count: 0 });
            operation
        }
        Err(errors) => {
            for error in &errors {
                tracing::warn!("invalid operation: {error}");
            }

            tracer.handle(LifecycleEvent::ValidateEnd {
                error_count: errors.len(),
            });
            return;
        }
    };

    tracer.handle(LifecycleEvent::ExecuteStart);

    Resolver {
        tracer: &mut *tracer,
        fragments_stack: Vec::new(),
    }
    .resolve_selection_set(operation.selection_set(), &FieldPath::default());

    tracer.handle(LifecycleEvent::ExecuteEnd);
}

fn validate<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<OperationDefinition<'a>, Vec<String>> {
    let operation = select_operation(document, operation_name).and_then(|index| document.operations().nth(index));

    let Some(operation) = operation else {
        let error = match operation_name {
            Some(name) => format!("unknown operation named `{name}`"),
            None => "the document must hold exactly one operation, or an operation name must be given".to_string(),
        };
        return Err(vec![error]);
    };

    let mut errors = Vec::new();
    check_fragments(operation.selection_set(), &mut Vec::new(), &mut errors);

    if errors.is_empty() {
        Ok(operation)
    } else {
        Err(errors)
    }
}

fn check_fragments<'a>(selection_set: Iter<'a, Selection<'a>>, seen: &mut Vec<&'a str>, errors: &mut Vec<String>) {
    for selection in selection_set {
        match selection {
            Selection::Field(field) => check_fragments(field.selection_set(), seen, errors),
            Selection::InlineFragment(inline_fragment) => {
                check_fragments(inline_fragment.selection_set(), seen, errors);
            }
            Selection::FragmentSpread(fragment_spread) => {
                let name = fragment_spread.fragment_name();
                if seen.contains(&name) {
                    continue;
                }
                seen.push(name);

                match fragment_spread.fragment() {
                    Some(fragment) => check_fragments(fragment.selection_set(), seen, errors),
                    None => errors.push(format!("unknown fragment `{name}`")),
                }
            }
        }
    }
}

struct Resolver<'t, 'a, S: TraceSink> {
    tracer: &'t mut RequestTracer<S>,
    fragments_stack: Vec<&'a str>,
}

impl<'a, S: TraceSink> Resolver<'_, 'a, S> {
    fn resolve_selection_set(&mut self, selection_set: Iter<'a, Selection<'a>>, parent: &FieldPath) {
        for selection in selection_set {
            match selection {
                Selection::Field(field) => {
                    let mut path = parent.clone();
                    path.push(field.name());

                    self.tracer.handle(LifecycleEvent::ResolveStart { path: &path });
                    self.resolve_selection_set(field.selection_set(), &path);
                    self.tracer.handle(LifecycleEvent::ResolveEnd { path: &path });
                }
                Selection::InlineFragment(inline_fragment) => {
                    self.resolve_selection_set(inline_fragment.selection_set(), parent);
                }
                Selection::FragmentSpread(fragment_spread) => {
                    let name = fragment_spread.fragment_name();
                    if self.fragments_stack.contains(&name) {
                        continue;
                    }

                    if let Some(fragment) = fragment_spread.fragment() {
                        self.fragments_stack.push(name);
                        self.resolve_selection_set(fragment.selection_set(), parent);
                        self.fragments_stack.pop();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphql_operation_tracing::{CollectingSink, TracingConfig};
    use indoc::indoc;

    use super::*;

    fn request(query: &str) -> Request {
        Request {
            query: query.to_string(),
            operation_name: None,
        }
    }

    fn trace(request: &BatchRequest) -> CollectingSink {
        let mut sink = CollectingSink::default();

        let mut tracer = RequestTracer::new(Arc::new(TracingConfig::default()), &mut sink);
        run(&mut tracer, request);
        tracer.finish();

        sink
    }

    #[test]
    fn fragments_are_resolved_in_place() {
        let sink = trace(&BatchRequest::Single(request(indoc! {r#"
            query GetBook {
              library {
                ...LibraryFields
                ... on Library {
                  branch
                }
              }
            }

            fragment LibraryFields on Library {
              books {
                title
              }
            }
        "#})));

        assert_eq!(sink.emit_count, 1);
        assert_eq!(
            sink.transaction_name.as_deref(),
            Some("query GetBook library.books.title")
        );
        insta::assert_snapshot!(sink.root.unwrap(), @r###"
        operation: query GetBook library.books.title
          resolve: library
          resolve: library.books
          resolve: library.books.title
          resolve: library.branch
        "###);
    }

    #[test]
    fn unknown_fragment_fails_validation() {
        let sink = trace(&BatchRequest::Single(request("query GetBook { library { ...Missing } }")));

        assert_eq!(sink.transaction_name.as_deref(), Some("query GetBook"));
        assert!(sink.root.unwrap().children.is_empty());
    }

    #[test]
    fn ambiguous_operation() {
        let sink = trace(&BatchRequest::Single(request("query A { a } query B { b }")));

        assert_eq!(sink.transaction_name.as_deref(), Some("*"));
    }

    #[test]
    fn parse_error() {
        let sink = trace(&BatchRequest::Single(request("query {")));

        assert_eq!(sink.transaction_name.as_deref(), Some("*"));
        assert_eq!(sink.root.unwrap().name, "operation: <unknown>");
    }

    #[test]
    fn batch() {
        let sink = trace(&BatchRequest::Batch(vec![
            request("query GetBookForLibrary { library { books { author { name } } } }"),
            request("query {"),
            Request {
                query: "query A { a } mutation B { addThing }".to_string(),
                operation_name: Some("B".to_string()),
            },
        ]));

        assert_eq!(
            sink.transaction_name.as_deref(),
            Some("batch/query GetBookForLibrary library.books.author.name/*/mutation B addThing")
        );
        insta::assert_snapshot!(sink.root.unwrap(), @r###"
        batch
          operation: query GetBookForLibrary library.books.author.name
            resolve: library
            resolve: library.books
            resolve: library.books.author
            resolve: library.books.author.name
          operation: <unknown>
          operation: mutation B addThing
            resolve: addThing
        "###);
    }
}
