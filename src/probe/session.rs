// src/probe/session.rs
//! Per-`describe` probing state.
//!
//! A serde visitor can only be driven once per call, so the probe decodes the
//! root type over and over. Everything learned by one pass lives here and is
//! keyed by the position (path from the root) it was learned at:
//!
//! - `attempts`: which placeholder to offer a scalar next
//! - `absent`: positions that cannot be populated; later passes skip them and
//!   reuse the shape recorded on failure
//! - `rejected`: keys a container refused; never offered again
//! - `enums`: variants explored so far and their payload shapes
//! - `audit`: whether a struct-style container consumed an unlisted key
//!
//! Only the innermost failure of a pass is recorded, so each pass learns at
//! most one position and the driver stops once a pass learns nothing.

use std::collections::{HashMap, HashSet};

use serde::Deserializer;
use serde::de::{Error as _, Visitor};
use tracing::trace;

use super::ProbeError;
use super::cycle::CycleGuard;
use super::request::Request;
use super::variant::{EnumLog, Payload};
use crate::capability::Capabilities;
use crate::shape::{ShapeNode, TypeKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Segment {
    Field(String),
    Entry,
    Key,
    Index(usize),
    Inner,
    Variant(&'static str),
    Unlisted,
}

pub(crate) type Path = Vec<Segment>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Discover,
    Audit,
    Assemble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAudit {
    /// Unlisted key read as `IgnoredAny`.
    Declared,
    /// Unlisted key read as a typed value.
    Accepted,
    /// Unlisted key refused outright.
    Rejected,
}

pub(crate) struct Session<'c> {
    pub(crate) capabilities: &'c Capabilities,
    pub(crate) mode: Mode,
    pub(crate) cycle: CycleGuard,

    attempts: HashMap<Path, usize>,
    absent: HashMap<Path, ShapeNode>,
    rejected: HashSet<Path>,
    enums: HashMap<Path, EnumLog>,
    audit: HashMap<Path, KeyAudit>,

    path: Path,
    emitted: Option<ShapeNode>,
    failed: bool,
    progress: bool,
    passes: usize,
}

impl<'c> Session<'c> {
    pub(crate) fn new(capabilities: &'c Capabilities) -> Self {
        Self {
            capabilities,
            mode: Mode::Discover,
            cycle: CycleGuard::default(),
            attempts: HashMap::new(),
            absent: HashMap::new(),
            rejected: HashSet::new(),
            enums: HashMap::new(),
            audit: HashMap::new(),
            path: Vec::new(),
            emitted: None,
            failed: false,
            progress: false,
            passes: 0,
        }
    }

    pub(crate) fn begin_pass(&mut self, mode: Mode) {
        self.mode = mode;
        self.cycle.clear();
        self.path.clear();
        self.emitted = None;
        self.failed = false;
        self.progress = false;
        self.passes += 1;
    }

    pub(crate) fn made_progress(&self) -> bool {
        self.progress
    }

    pub(crate) fn passes(&self) -> usize {
        self.passes
    }

    pub(crate) fn mark_progress(&mut self) {
        self.progress = true;
    }

    /// Takes responsibility for the current error without recording a position.
    pub(crate) fn mark_failed(&mut self) {
        self.failed = true;
    }

    // ---------------------------- Emission ------------------------------- //

    pub(crate) fn emit(&mut self, node: ShapeNode) {
        self.emitted = Some(self.capabilities.apply_cases(node));
    }

    pub(crate) fn take_emitted(&mut self) -> ShapeNode {
        self.emitted.take().unwrap_or_else(ShapeNode::any)
    }

    pub(crate) fn within<T>(&mut self, segment: Segment, run: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(segment);
        let out = run(self);
        self.path.pop();
        out
    }

    /// Runs `run` one level down and collects the node it emitted.
    pub(crate) fn descend<T>(
        &mut self,
        segment: Segment,
        run: impl FnOnce(&mut Self) -> Result<T, ProbeError>,
    ) -> (Result<T, ProbeError>, ShapeNode) {
        self.within(segment, |session| {
            session.emitted = None;
            let result = run(session);
            (result, session.take_emitted())
        })
    }

    /// Like `descend`, but a failure nobody deeper claimed marks the position
    /// absent for later passes.
    pub(crate) fn probe_at<T>(
        &mut self,
        segment: Segment,
        run: impl FnOnce(&mut Self) -> Result<T, ProbeError>,
    ) -> (Result<T, ProbeError>, ShapeNode) {
        self.within(segment, |session| {
            session.emitted = None;
            let result = run(session);
            let node = session.take_emitted();
            if let Err(err) = &result {
                if !session.failed {
                    session.failed = true;
                    trace!(path = ?session.path, error = %err, "position absent");
                    if session.absent.insert(session.path.clone(), node.clone()).is_none() {
                        session.progress = true;
                    }
                }
            }
            (result, node)
        })
    }

    /// Named types go through the cycle guard; re-entry emits a marker.
    pub(crate) fn guarded<T>(
        &mut self,
        name: &'static str,
        run: impl FnOnce(&mut Self) -> (Result<T, ProbeError>, ShapeNode),
    ) -> Result<T, ProbeError> {
        if !self.cycle.enter(name) {
            trace!(type_name = name, depth = self.cycle.depth(), "recursive type");
            self.emit(ShapeNode::recursive(TypeKey::Named(name)));
            return Err(ProbeError::Recursive(name));
        }
        self.emitted = None;
        let (result, node) = run(self);
        self.cycle.leave(name);
        self.emit(node);
        result
    }

    // ---------------------------- Positions ------------------------------ //

    fn path_with(&self, segment: Segment) -> Path {
        let mut path = self.path.clone();
        path.push(segment);
        path
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn absent_at(&self, segment: &Segment) -> Option<ShapeNode> {
        self.absent.get(&self.path_with(segment.clone())).cloned()
    }

    pub(crate) fn is_rejected(&self, segment: &Segment) -> bool {
        self.rejected.contains(&self.path_with(segment.clone()))
    }

    pub(crate) fn reject_key(&mut self, segment: Segment) {
        if self.failed {
            return;
        }
        self.failed = true;
        let path = self.path_with(segment);
        trace!(path = ?path, "key rejected");
        if self.rejected.insert(path) {
            self.progress = true;
        }
    }

    // ----------------------------- Scalars ------------------------------- //

    /// Feeds the registered placeholder for `key`, or the next generic one.
    pub(crate) fn feed_scalar<'de, V: Visitor<'de>>(
        &mut self,
        request: Request,
        key: &TypeKey,
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        if let Some(placeholder) = self.capabilities.placeholder(key) {
            return placeholder.deserialize_any(visitor).map_err(ProbeError::custom);
        }

        let attempt = self.attempts.get(&self.path).copied().unwrap_or(0);
        let result = request.feed(attempt, visitor);
        if result.is_err() && attempt + 1 < request.candidates() && !self.failed {
            trace!(path = ?self.path, attempt, "placeholder rejected");
            self.attempts.insert(self.path.clone(), attempt + 1);
            self.failed = true;
            self.progress = true;
        }
        result
    }

    // ------------------------------ Audit -------------------------------- //

    pub(crate) fn audit_of(&self, path: &Path) -> Option<KeyAudit> {
        self.audit.get(path).copied()
    }

    pub(crate) fn record_audit(&mut self, path: &Path, verdict: KeyAudit) {
        if self.audit.insert(path.clone(), verdict).is_none() {
            trace!(path = ?path, ?verdict, "container audited");
            self.progress = true;
        }
    }

    // ------------------------------ Enums -------------------------------- //

    pub(crate) fn enum_log(&mut self, variants: &'static [&'static str]) -> &mut EnumLog {
        self.enums.entry(self.path.clone()).or_insert_with(|| EnumLog::new(variants))
    }

    pub(crate) fn record_payload(&mut self, index: usize, payload: Payload) {
        if let Some(log) = self.enums.get_mut(&self.path) {
            log.record(index, payload);
        }
    }

    /// Variant of the enum here whose payload still holds an enum with
    /// variants not yet visited in the current mode.
    pub(crate) fn pending_variant(&self, variants: &'static [&'static str]) -> Option<usize> {
        let log = self.enums.get(&self.path)?;
        let depth = self.path.len();
        variants.iter().enumerate().find_map(|(index, &label)| {
            if log.is_failed(index) {
                return None;
            }
            let below = Segment::Variant(label);
            let pending = self.enums.iter().any(|(path, nested)| {
                path.len() > depth
                    && path.starts_with(&self.path)
                    && path[depth] == below
                    && nested.has_unvisited(self.mode)
            });
            pending.then_some(index)
        })
    }

    /// A variant failing on its own account is avoided once all are explored.
    pub(crate) fn fail_variant(&mut self, index: usize) {
        if self.failed {
            return;
        }
        if let Some(log) = self.enums.get_mut(&self.path) {
            if log.mark_failed(index) {
                self.failed = true;
                self.progress = true;
            }
        }
    }
}
