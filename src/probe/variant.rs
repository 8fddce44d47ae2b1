// src/probe/variant.rs
//! Enums. One variant is explored per pass; the log keeps every payload
//! shape seen so far so each pass can emit the whole enum.

use serde::de::value::StrDeserializer;
use serde::de::{
    DeserializeSeed, Deserializer, EnumAccess, Error as _, IntoDeserializer, VariantAccess, Visitor,
};

use super::ProbeError;
use super::de::ProbeDeserializer;
use super::keyed::{self, Container};
use super::session::{Mode, Segment, Session};
use crate::cases;
use crate::shape::{Primitive, ShapeNode, TypeKey};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Unit,
    Data(ShapeNode),
}

#[derive(Debug)]
pub(crate) struct EnumLog {
    variants: &'static [&'static str],
    payloads: Vec<Option<Payload>>,
    failed: Vec<bool>,
    /// Per mode, so audit and assembly passes revisit every variant.
    visited: [Vec<bool>; 3],
}

impl EnumLog {
    pub(crate) fn new(variants: &'static [&'static str]) -> Self {
        let n = variants.len();
        Self {
            variants,
            payloads: vec![None; n],
            failed: vec![false; n],
            visited: [vec![false; n], vec![false; n], vec![false; n]],
        }
    }

    /// First variant not yet visited in `mode`, now marked visited.
    fn next_unvisited(&mut self, mode: Mode) -> Option<usize> {
        let visited = &mut self.visited[mode as usize];
        let index = visited.iter().position(|seen| !seen)?;
        visited[index] = true;
        Some(index)
    }

    pub(crate) fn has_unvisited(&self, mode: Mode) -> bool {
        self.visited[mode as usize].iter().any(|seen| !seen)
    }

    pub(crate) fn is_failed(&self, index: usize) -> bool {
        self.failed[index]
    }

    /// First variant that never failed.
    fn fallback(&self) -> usize {
        self.failed.iter().position(|failed| !failed).unwrap_or(0)
    }

    pub(crate) fn record(&mut self, index: usize, payload: Payload) {
        self.payloads[index] = Some(payload);
    }

    /// `true` when newly marked.
    pub(crate) fn mark_failed(&mut self, index: usize) -> bool {
        !std::mem::replace(&mut self.failed[index], true)
    }

    /// Unit-only enums become a string case set; everything else a fixed
    /// object with one optional entry per explored variant.
    fn node(&self) -> ShapeNode {
        if let Some(cases) = cases::detect(self.variants, &self.payloads) {
            return ShapeNode::single(Primitive::String).with_cases(cases);
        }
        let fields = self
            .variants
            .iter()
            .zip(&self.payloads)
            .filter_map(|(label, payload)| {
                let node = match payload.as_ref()? {
                    Payload::Unit => ShapeNode::single(Primitive::Null),
                    Payload::Data(node) => node.clone(),
                };
                Some((label.to_string(), node.optional()))
            })
            .collect();
        ShapeNode::keyed_fixed(fields)
    }
}

pub(crate) fn visit<'de, 'c, V: Visitor<'de>>(
    session: &mut Session<'c>,
    name: &'static str,
    variants: &'static [&'static str],
    visitor: V,
) -> (Result<V::Value, ProbeError>, ShapeNode) {
    let key = TypeKey::Named(name);
    if variants.is_empty() {
        let err = ProbeError::custom(format_args!("enum `{name}` has no variants"));
        return (Err(err), ShapeNode::any().with_identity(key));
    }

    let mode = session.mode;
    // once every variant is visited, go back to whichever one still hides an
    // unexplored enum further down
    let fresh = session.enum_log(variants).next_unvisited(mode);
    let index = match fresh {
        Some(index) => {
            session.mark_progress();
            index
        }
        None => match session.pending_variant(variants) {
            Some(index) => index,
            None => session.enum_log(variants).fallback(),
        },
    };

    let result = visitor.visit_enum(VariantProbe { session: &mut *session, index, label: variants[index] });
    if result.is_err() {
        session.fail_variant(index);
    }
    let node = session.enum_log(variants).node().with_identity(key);
    (result, node)
}

struct VariantProbe<'s, 'c> {
    session: &'s mut Session<'c>,
    index: usize,
    label: &'static str,
}

impl VariantProbe<'_, '_> {
    fn record(self, payload: Payload) {
        self.session.record_payload(self.index, payload);
    }
}

impl<'de> EnumAccess<'de> for VariantProbe<'_, '_> {
    type Error = ProbeError;
    type Variant = Self;

    fn variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<(S::Value, Self), ProbeError> {
        let label: StrDeserializer<'_, ProbeError> = self.label.into_deserializer();
        let value = seed.deserialize(label)?;
        Ok((value, self))
    }
}

impl<'de> VariantAccess<'de> for VariantProbe<'_, '_> {
    type Error = ProbeError;

    fn unit_variant(self) -> Result<(), ProbeError> {
        self.record(Payload::Unit);
        Ok(())
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, ProbeError> {
        let (result, node) = self
            .session
            .descend(Segment::Variant(self.label), |s| seed.deserialize(ProbeDeserializer::new(s)));
        self.record(Payload::Data(node));
        result
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, ProbeError> {
        let (result, node) = self
            .session
            .descend(Segment::Variant(self.label), |s| ProbeDeserializer::new(s).deserialize_tuple(len, visitor));
        self.record(Payload::Data(node));
        result
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        let (result, node) = self.session.descend(Segment::Variant(self.label), |s| {
            let (result, node) = keyed::visit(s, Container::Struct(fields), visitor);
            s.emit(node);
            result
        });
        self.record(Payload::Data(node));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    const VARIANTS: &[&str] = &["Circle", "Empty", "Square"];

    #[test]
    fn selection_visits_each_variant_once_per_mode() {
        let mut log = EnumLog::new(VARIANTS);
        assert_eq!(log.next_unvisited(Mode::Discover), Some(0));
        assert_eq!(log.next_unvisited(Mode::Discover), Some(1));
        assert!(log.has_unvisited(Mode::Discover));
        assert_eq!(log.next_unvisited(Mode::Discover), Some(2));
        assert_eq!(log.next_unvisited(Mode::Discover), None);
        assert!(!log.has_unvisited(Mode::Discover));

        assert!(log.mark_failed(0));
        assert!(!log.mark_failed(0));
        assert!(log.is_failed(0));
        assert_eq!(log.fallback(), 1);
        assert_eq!(log.next_unvisited(Mode::Audit), Some(0));
    }

    #[test]
    fn mixed_enum_is_keyed_by_explored_variants() {
        let mut log = EnumLog::new(VARIANTS);
        log.record(0, Payload::Data(ShapeNode::single(Primitive::Double)));
        log.record(1, Payload::Unit);

        let node = log.node();
        let fields = node.fields().unwrap();
        assert!(node.is_fixed());
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["Circle", "Empty"]);
        assert!(fields.values().all(|f| f.optional));
        assert_eq!(fields["Empty"].shape, Shape::Single(Primitive::Null));
    }

    #[test]
    fn unit_only_enum_becomes_cases() {
        let mut log = EnumLog::new(VARIANTS);
        for i in 0..VARIANTS.len() {
            log.record(i, Payload::Unit);
        }
        let node = log.node();
        assert_eq!(node.shape, Shape::Single(Primitive::String));
        assert_eq!(node.cases.unwrap().labels, vec!["Circle", "Empty", "Square"]);
    }
}
