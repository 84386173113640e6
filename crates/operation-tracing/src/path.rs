use std::fmt;

use itertools::Itertools;

/// One element of a response path, as reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Field(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for PathSegment<'a> {
    fn from(field: &'a str) -> Self {
        PathSegment::Field(field)
    }
}

impl From<usize> for PathSegment<'_> {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Field names from an operation root down to a field, without list indices.
///
/// Every item of a list shares the path of the list field itself, so `library.books.0.title`
/// and `library.books.1.title` both become `library.books.title`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn from_response_path<'a>(segments: impl IntoIterator<Item = PathSegment<'a>>) -> Self {
        segments.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    pub fn push(&mut self, field: impl Into<String>) {
        self.0.push(field.into());
    }

    /// True if any field of the path is an introspection field such as `__typename`.
    pub fn is_introspection(&self) -> bool {
        self.fields().any(|field| field.starts_with("__"))
    }
}

impl<'a> FromIterator<PathSegment<'a>> for FieldPath {
    fn from_iter<T: IntoIterator<Item = PathSegment<'a>>>(iter: T) -> Self {
        FieldPath(
            iter.into_iter()
                .filter_map(|segment| match segment {
                    PathSegment::Field(field) => Some(field.to_string()),
                    PathSegment::Index(_) => None,
                })
                .collect(),
        )
    }
}

/// Parses a dotted path. GraphQL names never start with a digit, so numeric elements are list
/// indices.
impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        dotted
            .split('.')
            .filter(|element| !element.is_empty())
            .map(|element| match element.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Field(element),
            })
            .collect()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format("."))
    }
}
