use std::{fmt, num::NonZeroU32, sync::Arc, time::Duration};

use indexmap::IndexMap;
use web_time::Instant;

use crate::{error::EventError, FieldPath, TracingConfig};

/// Identifies a segment within the tree of one operation.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct SegmentId(NonZeroU32);

impl From<usize> for SegmentId {
    fn from(index: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index as u32))
    }
}

impl From<SegmentId> for usize {
    fn from(id: SegmentId) -> Self {
        (id.0.get() - 1) as usize
    }
}

/// Where an operation is in its parse → validate → execute lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Parsing,
    Parsed,
    Validating,
    Validated,
    Executing,
    Completed,
}

/// A finalized segment: a named unit of work with its time bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub start: Instant,
    pub end: Instant,
    /// In the order in which they started.
    pub children: Vec<Segment>,
}

impl Segment {
    pub fn duration(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }

    pub fn child(&self, name: &str) -> Option<&Segment> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|child| child.name.as_str()).collect()
    }

    /// Number of segments in this tree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Segment::count).sum::<usize>()
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.name, indent = depth * 2)?;

        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }

        Ok(())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Operation,
    Resolver,
    /// Work the host attributed to another segment
    Child,
}

struct SegmentNode {
    kind: SegmentKind,
    name: String,
    start: Instant,
    end: Option<Instant>,
    children: Vec<SegmentId>,
    /// Starts not yet matched by an end, several resolutions of one path share a segment.
    in_flight: usize,
}

/// Builds the segment tree of a single operation from its lifecycle signals.
///
/// The operation segment only exists once [`OperationSegments::name_operation`] was called, its
/// start is backdated to the first signal of the operation. Resolver segments are its direct
/// children, one per distinct [`FieldPath`]. Work attributed to a segment through
/// [`OperationSegments::start_child`] nests below it.
pub(crate) struct OperationSegments {
    config: Arc<TracingConfig>,
    phase: Phase,
    started_at: Instant,
    root: Option<SegmentId>,
    nodes: Vec<SegmentNode>,
    resolvers: IndexMap<FieldPath, SegmentId>,
    /// Segments below the root in start order. The last one is always open, closed segments
    /// further down are skipped once they surface.
    open: Vec<SegmentId>,
}

type Result<T> = std::result::Result<T, EventError>;

impl OperationSegments {
    pub(crate) fn new(config: Arc<TracingConfig>, now: Instant) -> Self {
        Self {
            config,
            phase: Phase::Parsing,
            started_at: now,
            root: None,
            nodes: Vec::new(),
            resolvers: IndexMap::new(),
            open: Vec::new(),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether any field resolution was observed.
    pub(crate) fn has_resolved_fields(&self) -> bool {
        !self.resolvers.is_empty()
    }

    /// Creates the operation segment, or renames it once a better name is known.
    pub(crate) fn name_operation(&mut self, name: String) -> SegmentId {
        match self.root {
            Some(root) => {
                self.node_mut(root).name = name;
                root
            }
            None => {
                let root = self.push_node(SegmentKind::Operation, name, self.started_at);
                self.root = Some(root);
                root
            }
        }
    }

    pub(crate) fn parse_finished(&mut self) -> Result<()> {
        self.transition("parse_end", &[Phase::Parsing], Phase::Parsed)
    }

    pub(crate) fn validate_started(&mut self) -> Result<()> {
        self.transition("validate_start", &[Phase::Parsed], Phase::Validating)
    }

    pub(crate) fn validate_finished(&mut self) -> Result<()> {
        self.transition("validate_end", &[Phase::Validating], Phase::Validated)
    }

    pub(crate) fn execute_started(&mut self) -> Result<()> {
        // Engines that do not report validation go straight from parsing to execution.
        self.transition("execute_start", &[Phase::Parsed, Phase::Validated], Phase::Executing)
    }

    pub(crate) fn resolve_started(&mut self, path: &FieldPath, now: Instant) -> Result<SegmentId> {
        self.expect_phase("resolve_start", Phase::Executing)?;

        if let Some(&id) = self.resolvers.get(path) {
            let node = self.node_mut(id);
            node.in_flight += 1;
            if node.end.take().is_some() {
                self.open.push(id);
            }
            return Ok(id);
        }

        let root = self.ensure_root();
        let name = format!("{}: {path}", self.config.resolve_segment_prefix);
        let id = self.push_node(SegmentKind::Resolver, name, now);
        self.node_mut(id).in_flight = 1;
        self.node_mut(root).children.push(id);
        self.resolvers.insert(path.clone(), id);
        self.open.push(id);

        Ok(id)
    }

    pub(crate) fn resolve_finished(&mut self, path: &FieldPath, now: Instant) -> Result<()> {
        self.expect_phase("resolve_end", Phase::Executing)?;

        let id = match self.resolvers.get(path) {
            Some(&id) if self.node(id).in_flight > 0 => id,
            _ => return Err(EventError::UnmatchedResolveEnd { path: path.clone() }),
        };

        let node = self.node_mut(id);
        node.in_flight -= 1;
        if node.in_flight == 0 {
            self.close(id, now);
        }

        Ok(())
    }

    /// Completes the operation. Returns how many segments were still open.
    pub(crate) fn execute_finished(&mut self, now: Instant) -> Result<usize> {
        self.expect_phase("execute_end", Phase::Executing)?;
        Ok(self.force_close(now))
    }

    /// Innermost segment still open: the latest started open segment below the operation
    /// segment, or the operation segment itself.
    pub(crate) fn current_segment(&self) -> Option<SegmentId> {
        if self.phase == Phase::Completed {
            return None;
        }

        self.open.last().copied().or(self.root)
    }

    /// Records work the host attributed to `parent`, such as a timer scheduled by a resolver.
    pub(crate) fn start_child(&mut self, parent: SegmentId, name: String, now: Instant) -> Result<SegmentId> {
        if self.phase == Phase::Completed {
            return Err(EventError::OutOfOrder {
                event: "segment_start",
                phase: self.phase,
            });
        }

        self.check_open(parent)?;

        let id = self.push_node(SegmentKind::Child, name, now);
        self.node_mut(parent).children.push(id);
        self.open.push(id);

        Ok(id)
    }

    pub(crate) fn finish_child(&mut self, id: SegmentId, now: Instant) -> Result<()> {
        if self
            .nodes
            .get(usize::from(id))
            .is_some_and(|node| node.kind != SegmentKind::Child)
        {
            return Err(EventError::NotAChildSegment(id));
        }

        self.check_open(id)?;
        self.close(id, now);

        Ok(())
    }

    /// Closes every segment still open, the operation segment included. Returns how many
    /// segments below the operation segment had to be closed.
    pub(crate) fn force_close(&mut self, now: Instant) -> usize {
        let mut count = 0;

        for id in std::mem::take(&mut self.open) {
            if self.node(id).end.is_none() {
                self.close(id, now);
                count += 1;
            }
        }

        if let Some(root) = self.root {
            if self.node(root).end.is_none() {
                self.close(root, now);
            }
        }

        self.phase = Phase::Completed;
        count
    }

    /// The finalized tree, starting at the operation segment.
    pub(crate) fn to_segment(&self) -> Option<Segment> {
        self.root.map(|root| self.build(root))
    }

    fn build(&self, id: SegmentId) -> Segment {
        let node = self.node(id);
        let children: Vec<Segment> = node.children.iter().map(|child| self.build(*child)).collect();

        // A segment left open ends with the last of its children.
        let end = node.end.unwrap_or_else(|| {
            children
                .iter()
                .map(|child| child.end)
                .fold(node.start, std::cmp::max)
        });

        Segment {
            name: node.name.clone(),
            start: node.start,
            end,
            children,
        }
    }

    fn ensure_root(&mut self) -> SegmentId {
        match self.root {
            Some(root) => root,
            None => {
                let name = format!(
                    "{}: {}",
                    self.config.operation_segment_prefix, self.config.unknown_placeholder
                );
                self.name_operation(name)
            }
        }
    }

    fn close(&mut self, id: SegmentId, now: Instant) {
        let node = self.node_mut(id);
        node.end = Some(now.max(node.start));
        node.in_flight = 0;

        while let Some(&last) = self.open.last() {
            if self.node(last).end.is_none() {
                break;
            }
            self.open.pop();
        }
    }

    fn check_open(&self, id: SegmentId) -> Result<()> {
        match self.nodes.get(usize::from(id)) {
            None => Err(EventError::UnknownSegment(id)),
            Some(node) if node.end.is_some() => Err(EventError::SegmentClosed(id)),
            Some(_) => Ok(()),
        }
    }

    fn transition(&mut self, event: &'static str, from: &[Phase], to: Phase) -> Result<()> {
        if !from.contains(&self.phase) {
            return Err(EventError::OutOfOrder {
                event,
                phase: self.phase,
            });
        }

        self.phase = to;
        Ok(())
    }

    fn expect_phase(&self, event: &'static str, phase: Phase) -> Result<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(EventError::OutOfOrder {
                event,
                phase: self.phase,
            })
        }
    }

    fn push_node(&mut self, kind: SegmentKind, name: String, start: Instant) -> SegmentId {
        let id = SegmentId::from(self.nodes.len());
        self.nodes.push(SegmentNode {
            kind,
            name,
            start,
            end: None,
            children: Vec::new(),
            in_flight: 0,
        });
        id
    }

    fn node(&self, id: SegmentId) -> &SegmentNode {
        &self.nodes[usize::from(id)]
    }

    fn node_mut(&mut self, id: SegmentId) -> &mut SegmentNode {
        &mut self.nodes[usize::from(id)]
    }
}
