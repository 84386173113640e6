use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use graphql_operation_tracing::TracingConfig;
use tracing::Subscriber;
use tracing_subscriber::{registry::LookupSpan, Layer};

mod log;

pub(crate) use log::{LogLevel, LogStyle};

use crate::request::{self, BatchRequest, Source};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum OutputFormat {
    /// The transaction name, then the segment tree
    Text,
    /// One JSON object, with segment durations
    Json,
}

pub(crate) type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

#[derive(Debug, Parser)]
#[command(name = "gqlname", version)]
#[command(arg_required_else_help = true)]
/// Names GraphQL requests the way the tracer names their transactions
pub(crate) struct Args {
    /// GraphQL documents, or request bodies when the extension is `.json`. Several inputs are
    /// traced as one batch request.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// The operation to execute in GraphQL documents holding several
    #[arg(long, short)]
    pub operation_name: Option<String>,
    /// Trace the inputs as a batch request, even a single one
    #[arg(long)]
    pub batch: bool,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "GQLNAME_CONFIG_PATH")]
    pub config: Option<PathBuf>,
    /// How to print the results
    #[arg(long, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
    /// Set the logging level
    #[arg(long = "log", env = "GQLNAME_LOG")]
    pub log_level: Option<LogLevel>,
    /// Set the style of log output
    #[arg(long, env = "GQLNAME_LOG_STYLE", default_value_t = LogStyle::Text)]
    log_style: LogStyle,
}

pub(crate) fn parse() -> Args {
    Args::parse()
}

impl Args {
    /// The configuration file, or the defaults when none is given
    pub fn config(&self) -> anyhow::Result<TracingConfig> {
        let Some(path) = self.config.as_ref() else {
            return Ok(TracingConfig::default());
        };

        let contents =
            fs::read_to_string(path).with_context(|| format!("error reading the configuration at {}", path.display()))?;

        toml::from_str(&contents).with_context(|| format!("error parsing the configuration at {}", path.display()))
    }

    /// Reads every input into the request to trace
    pub fn request(&self) -> anyhow::Result<BatchRequest> {
        let sources = self
            .inputs
            .iter()
            .map(|path| {
                let contents = fs::read_to_string(path).with_context(|| format!("error reading {}", path.display()))?;

                Ok(match path.extension() {
                    Some(extension) if extension == "json" => Source::Json(contents),
                    _ => Source::Document(contents),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        request::collect(sources, self.operation_name.as_deref(), self.batch)
    }

    pub fn log_format<S>(&self) -> BoxedLayer<S>
    where
        S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
    {
        // stdout is reserved for the results
        let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        match self.log_style {
            LogStyle::Text if atty::is(atty::Stream::Stderr) => layer.with_ansi(true).boxed(),
            LogStyle::Text => layer.with_ansi(false).boxed(),
            LogStyle::Json => layer.json().boxed(),
        }
    }
}
