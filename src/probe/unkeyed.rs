// src/probe/unkeyed.rs
//! Sequences and tuples.

use serde::de::{DeserializeSeed, SeqAccess, Visitor};

use super::ProbeError;
use super::de::ProbeDeserializer;
use super::session::{Segment, Session};
use crate::shape::ShapeNode;

/// `len = None` is an open sequence: exactly one representative element.
pub(crate) fn visit<'de, 'c, V: Visitor<'de>>(
    session: &mut Session<'c>,
    len: Option<usize>,
    visitor: V,
) -> (Result<V::Value, ProbeError>, ShapeNode) {
    let mut access = SeqProbe { session, len: len.unwrap_or(1), index: 0, ended: false, elements: Vec::new() };
    let result = visitor.visit_seq(&mut access);
    (result, ShapeNode::unkeyed(unify(access.elements)))
}

/// Equal element shapes collapse to that shape; anything else is unconstrained.
fn unify(elements: Vec<ShapeNode>) -> ShapeNode {
    let mut iter = elements.into_iter();
    let Some(first) = iter.next() else {
        return ShapeNode::any();
    };
    if iter.all(|e| e == first) { first } else { ShapeNode::any() }
}

struct SeqProbe<'s, 'c> {
    session: &'s mut Session<'c>,
    len: usize,
    index: usize,
    ended: bool,
    elements: Vec<ShapeNode>,
}

impl<'de> SeqAccess<'de> for SeqProbe<'_, '_> {
    type Error = ProbeError;

    fn next_element_seed<S: DeserializeSeed<'de>>(&mut self, seed: S) -> Result<Option<S::Value>, ProbeError> {
        if self.ended || self.index >= self.len {
            return Ok(None);
        }
        let segment = Segment::Index(self.index);
        // an element that cannot be built ends the sequence here
        if let Some(node) = self.session.absent_at(&segment) {
            self.elements.push(node);
            self.ended = true;
            return Ok(None);
        }
        let (result, node) = self.session.probe_at(segment, |s| seed.deserialize(ProbeDeserializer::new(s)));
        self.elements.push(node);
        self.index += 1;
        result.map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len.saturating_sub(self.index))
    }
}
