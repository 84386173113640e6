#![allow(unused_crate_dependencies)]

mod utils;

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex},
};

use graphql_operation_tracing::{RequestTracer, SpanSink, GRAPHQL_SPAN_NAME, TRANSACTION_NAME_ATTRIBUTE};
use indoc::indoc;
use tracing::{
    field::{Field, Visit},
    span, Event, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer,
};

use utils::{config, execute, parse};

#[derive(Default)]
struct Recorded {
    spans: Vec<&'static str>,
    span_fields: BTreeMap<String, String>,
    events: Vec<BTreeMap<String, String>>,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Recorded>>);

struct FieldRecorder<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldRecorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_new_span(&self, attrs: &span::Attributes<'_>, _: &span::Id, _: Context<'_, S>) {
        self.0.lock().unwrap().spans.push(attrs.metadata().name());
    }

    fn on_record(&self, _: &span::Id, values: &span::Record<'_>, _: Context<'_, S>) {
        let mut recorded = self.0.lock().unwrap();
        values.record(&mut FieldRecorder(&mut recorded.span_fields));
    }

    fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldRecorder(&mut fields));
        self.0.lock().unwrap().events.push(fields);
    }
}

const GET_BOOK: &str = indoc! {r#"
    query GetBook {
      library {
        books {
          title
        }
      }
    }
"#};

#[test]
fn records_onto_the_request_span() {
    let document = parse(GET_BOOK);
    let recorder = Recorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());

    tracing::subscriber::with_default(subscriber, || {
        let sink = SpanSink::create();
        let span = sink.span().clone();

        assert_eq!(span.metadata().map(|metadata| metadata.name()), Some(GRAPHQL_SPAN_NAME));

        let mut tracer = RequestTracer::new(config(), sink);
        span.in_scope(|| execute(&mut tracer, &document, &["library", "library.books"]));
    });

    let recorded = recorder.0.lock().unwrap();
    assert_eq!(recorded.spans, [GRAPHQL_SPAN_NAME]);

    let fields = &recorded.span_fields;
    assert_eq!(fields["otel.name"], "query GetBook library.books.title");
    assert_eq!(fields[TRANSACTION_NAME_ATTRIBUTE], "query GetBook library.books.title");
    assert_eq!(fields["graphql.segments.count"], "3");

    let tree = recorded
        .events
        .iter()
        .find(|event| event.get("message").is_some_and(|m| m.starts_with("segment tree:")))
        .unwrap();

    assert!(tree.contains_key("duration_ms"));
    insta::assert_snapshot!(tree["message"].as_str(), @r###"
    segment tree:
    operation: query GetBook library.books.title
      resolve: library
      resolve: library.books
    "###);
}

#[test]
fn nothing_recorded_before_completion() {
    let document = parse(GET_BOOK);
    let recorder = Recorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());

    tracing::subscriber::with_default(subscriber, || {
        let mut tracer = RequestTracer::new(config(), SpanSink::create());
        utils::prepare(&mut tracer, &document);
        utils::resolve(&mut tracer, "library");

        assert!(recorder.0.lock().unwrap().span_fields.is_empty());
        drop(tracer);
    });

    let recorded = recorder.0.lock().unwrap();
    assert_eq!(recorded.span_fields["otel.name"], "query GetBook library.books.title");
    assert_eq!(recorded.span_fields["graphql.segments.count"], "2");
}
