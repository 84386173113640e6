use anyhow::Context;
use serde::{Deserialize, Deserializer};

/// One GraphQL request, in the shape of an HTTP request body. The names are all in `camelCase`
/// (e.g. `operationName`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Request {
    /// The query source of the request.
    pub query: String,

    /// The operation name of the request.
    #[serde(default)]
    pub operation_name: Option<String>,
}

/// A request body holding either one request or a non-empty list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum BatchRequest {
    Single(Request),
    #[serde(deserialize_with = "deserialize_non_empty_vec")]
    Batch(Vec<Request>),
}

fn deserialize_non_empty_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    use serde::de::Error as _;

    let v = <Vec<T>>::deserialize(deserializer)?;
    if v.is_empty() {
        Err(D::Error::invalid_length(0, &"a non-empty sequence"))
    } else {
        Ok(v)
    }
}

/// The contents of one input file.
#[derive(Debug)]
pub(crate) enum Source {
    /// A request body
    Json(String),
    /// A bare executable document
    Document(String),
}

/// Merges the inputs into the request to trace, in order.
///
/// The result is a batch when asked for, when several requests were read, or when any request
/// body is itself a batch.
pub(crate) fn collect(
    sources: Vec<Source>,
    operation_name: Option<&str>,
    batch: bool,
) -> anyhow::Result<BatchRequest> {
    let mut batched = batch;
    let mut requests = Vec::with_capacity(sources.len());

    for (index, source) in sources.into_iter().enumerate() {
        match source {
            Source::Json(body) => {
                let body: BatchRequest =
                    serde_json::from_str(&body).with_context(|| format!("input {index} is not a valid request body"))?;

                match body {
                    BatchRequest::Single(request) => requests.push(request),
                    BatchRequest::Batch(batch) => {
                        batched = true;
                        requests.extend(batch);
                    }
                }
            }
            Source::Document(query) => requests.push(Request {
                query,
                operation_name: operation_name.map(str::to_string),
            }),
        }
    }

    if batched || requests.len() > 1 {
        return Ok(BatchRequest::Batch(requests));
    }

    requests
        .pop()
        .map(BatchRequest::Single)
        .context("no request to trace")
}
