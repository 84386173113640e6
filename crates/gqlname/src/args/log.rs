use clap::ValueEnum;
use graphql_operation_tracing::TRACING_TARGET;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum LogLevel {
    /// Completely disables logging
    Off,
    /// Only errors from gqlname and the tracing library
    Error,
    /// Warnings and errors from gqlname and the tracing library
    #[default]
    Warn,
    /// Info, warning and error messages from gqlname and the tracing library
    Info,
    /// Debug, info, warning and error messages, dropped lifecycle events included
    Debug,
    /// Every message from all dependencies, one per lifecycle event
    Trace,
}

impl LogLevel {
    /// The `EnvFilter` directives for the level. Only `trace` lets dependencies through.
    pub(crate) fn filter(self) -> String {
        match self {
            LogLevel::Off | LogLevel::Trace => self.to_string(),
            level => format!("gqlname={level},{TRACING_TARGET}={level},off"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum LogStyle {
    /// Standard text
    Text,
    /// JSON objects
    Json,
}
