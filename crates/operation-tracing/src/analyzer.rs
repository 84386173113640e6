use std::collections::HashMap;

use cynic_parser::{
    executable::{FieldSelection, FragmentSpread, Iter, Selection},
    ExecutableDocument,
};

use crate::{FieldPath, PathSegment, TracingConfig};

/// The GraphQL operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl From<cynic_parser::common::OperationType> for OperationKind {
    fn from(ty: cynic_parser::common::OperationType) -> Self {
        match ty {
            cynic_parser::common::OperationType::Query => OperationKind::Query,
            cynic_parser::common::OperationType::Mutation => OperationKind::Mutation,
            cynic_parser::common::OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationName {
    Named(String),
    Anonymous,
}

impl OperationName {
    /// The operation name, or the configured placeholder for anonymous operations.
    pub fn as_str<'a>(&'a self, config: &'a TracingConfig) -> &'a str {
        match self {
            OperationName::Named(name) => name,
            OperationName::Anonymous => &config.anonymous_placeholder,
        }
    }
}

/// What the naming needs to know about one operation of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    pub name: OperationName,
    /// Longest root-to-leaf chain of selected fields, the first one in document order on ties.
    pub deepest_path: FieldPath,
}

/// Picks the operation a request executes: the one named `operation_name`, or the only
/// operation of the document.
pub fn select_operation(document: &ExecutableDocument, operation_name: Option<&str>) -> Option<usize> {
    match operation_name {
        Some(name) => document.operations().position(|operation| operation.name() == Some(name)),
        None => {
            let mut operations = document.operations();
            operations.next()?;
            operations.next().is_none().then_some(0)
        }
    }
}

/// Describes the operation at `operation_index` in document order.
pub fn analyze(
    document: &ExecutableDocument,
    operation_index: usize,
    config: &TracingConfig,
) -> Option<OperationDescriptor> {
    let operation = document.operations().nth(operation_index)?;

    let mut visitor = DeepestPathVisitor {
        ignore_introspection: config.ignore_introspection_fields,
        fragments_stack: Vec::new(),
        fragments: HashMap::new(),
        current: Vec::new(),
        deepest: Vec::new(),
    };
    visitor.visit_selection_set(operation.selection_set());

    Some(OperationDescriptor {
        kind: operation.operation_type().into(),
        name: match operation.name() {
            Some(name) => OperationName::Named(name.to_string()),
            None => OperationName::Anonymous,
        },
        deepest_path: visitor.deepest.into_iter().map(PathSegment::Field).collect(),
    })
}

/// Describes the operation a request with the given `operation_name` executes.
pub fn analyze_request(
    document: &ExecutableDocument,
    operation_name: Option<&str>,
    config: &TracingConfig,
) -> Option<OperationDescriptor> {
    let index = select_operation(document, operation_name)?;
    analyze(document, index, config)
}

struct DeepestPathVisitor<'a> {
    ignore_introspection: bool,
    fragments_stack: Vec<&'a str>,
    fragments: HashMap<&'a str, VisitedFragment<'a>>,
    current: Vec<&'a str>,
    deepest: Vec<&'a str>,
}

/// What a named fragment contributes wherever it is spread.
#[derive(Clone)]
struct VisitedFragment<'a> {
    selected_any: bool,
    /// Deepest path within the fragment, relative to the spread.
    deepest: Vec<&'a str>,
}

impl<'a> DeepestPathVisitor<'a> {
    /// Returns whether any field was selected, directly or through fragments.
    fn visit_selection_set(&mut self, selection_set: Iter<'a, Selection<'a>>) -> bool {
        let mut selected_any = false;

        for selection in selection_set {
            selected_any |= match selection {
                Selection::Field(field) => self.visit_field(field),
                Selection::InlineFragment(inline_fragment) => {
                    self.visit_selection_set(inline_fragment.selection_set())
                }
                Selection::FragmentSpread(fragment_spread) => self.visit_fragment_spread(fragment_spread),
            };
        }

        selected_any
    }

    fn visit_field(&mut self, field: FieldSelection<'a>) -> bool {
        let name = field.name();
        if self.ignore_introspection && name.starts_with("__") {
            return false;
        }

        self.current.push(name);

        // Strictly longer only: the first leaf found at a given depth keeps it.
        if !self.visit_selection_set(field.selection_set()) && self.current.len() > self.deepest.len() {
            self.deepest.clone_from(&self.current);
        }

        self.current.pop();

        true
    }

    fn visit_fragment_spread(&mut self, fragment_spread: FragmentSpread<'a>) -> bool {
        let fragment_name = fragment_spread.fragment_name();

        if self.fragments_stack.contains(&fragment_name) {
            return false;
        }

        let Some(fragment) = fragment_spread.fragment() else {
            return false;
        };

        // A fragment is walked once, later spreads reuse its relative result.
        let visited = match self.fragments.get(fragment_name).cloned() {
            Some(visited) => visited,
            None => {
                let current = std::mem::take(&mut self.current);
                let deepest = std::mem::take(&mut self.deepest);

                self.fragments_stack.push(fragment_name);
                let selected_any = self.visit_selection_set(fragment.selection_set());
                self.fragments_stack.pop();

                let visited = VisitedFragment {
                    selected_any,
                    deepest: std::mem::replace(&mut self.deepest, deepest),
                };
                self.current = current;

                self.fragments.insert(fragment_name, visited.clone());
                visited
            }
        };

        if self.current.len() + visited.deepest.len() > self.deepest.len() {
            self.deepest.clone_from(&self.current);
            self.deepest.extend(visited.deepest);
        }

        visited.selected_any
    }
}
