use anyhow::Context;
use graphql_operation_tracing::{CollectingSink, Segment};
use serde::Serialize;

use crate::args::OutputFormat;

/// What the tracer emitted for the request.
pub(crate) struct Report {
    transaction_name: String,
    root: Segment,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportView<'a> {
    transaction_name: &'a str,
    root: SegmentView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentView<'a> {
    name: &'a str,
    duration_ms: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<SegmentView<'a>>,
}

impl<'a> From<&'a Segment> for SegmentView<'a> {
    fn from(segment: &'a Segment) -> Self {
        SegmentView {
            name: &segment.name,
            duration_ms: segment.duration().as_micros() as f64 / 1000.0,
            children: segment.children.iter().map(SegmentView::from).collect(),
        }
    }
}

impl Report {
    pub fn new(sink: CollectingSink) -> anyhow::Result<Self> {
        let transaction_name = sink.transaction_name.context("the request was never named")?;
        let root = sink.root.context("the request has no segment tree")?;

        Ok(Report { transaction_name, root })
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Text => Ok(format!("{}\n\n{}", self.transaction_name, self.root)),
            OutputFormat::Json => {
                let view = ReportView {
                    transaction_name: &self.transaction_name,
                    root: SegmentView::from(&self.root),
                };

                let mut rendered = serde_json::to_string_pretty(&view)?;
                rendered.push('\n');

                Ok(rendered)
            }
        }
    }
}
