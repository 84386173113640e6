use serde::{Deserialize, Deserializer};

/// Naming configuration, shared read-only by every request tracer of the process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracingConfig {
    /// Rendered in place of the name of an unnamed operation
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    pub anonymous_placeholder: String,
    /// Names the operation segment when no operation could be determined
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    pub unknown_placeholder: String,
    /// Transaction name of a request whose operation could not be determined
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    pub unknown_transaction_name: String,
    /// First element of a batch transaction name, and name of the batch segment
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    pub batch_prefix: String,
    /// Prefix of operation segment names
    pub operation_segment_prefix: String,
    /// Prefix of resolver segment names
    pub resolve_segment_prefix: String,
    /// Leave `__typename`, `__schema` and friends out of paths and segments
    pub ignore_introspection_fields: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            anonymous_placeholder: "<anonymous>".to_string(),
            unknown_placeholder: "<unknown>".to_string(),
            unknown_transaction_name: "*".to_string(),
            batch_prefix: "batch".to_string(),
            operation_segment_prefix: "operation".to_string(),
            resolve_segment_prefix: "resolve".to_string(),
            ignore_introspection_fields: true,
        }
    }
}

fn deserialize_non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{Error as _, Unexpected};

    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        Err(D::Error::invalid_value(Unexpected::Str(&value), &"a non-empty string"))
    } else {
        Ok(value)
    }
}
