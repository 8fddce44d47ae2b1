// src/probe/keyed.rs
//! Keyed containers: declared struct fields and open maps.
//!
//! Struct-style requests are offered their declared keys in order. Maps are
//! offered a single representative entry. During audit passes a struct-style
//! container is also offered one key it never declared; how it reads that
//! key's value decides fixed vs open.

use indexmap::IndexMap;
use serde::de::value::StrDeserializer;
use serde::de::{DeserializeSeed, Deserializer, Error as _, IntoDeserializer, MapAccess, Visitor};

use super::ProbeError;
use super::de::ProbeDeserializer;
use super::request::Request;
use super::session::{KeyAudit, Mode, Path, Segment, Session};
use crate::shape::{ShapeNode, TypeKey};

/// Field name standing in for every key of an open mapping.
pub const REPRESENTATIVE_KEY: &str = "";
const UNLISTED_KEY: &str = "__unlisted_probe_key__";

#[derive(Debug, Clone, Copy)]
pub(crate) enum Container {
    Struct(&'static [&'static str]),
    Map,
}

enum Pending {
    Field(String),
    Entry,
    Unlisted,
}

pub(crate) fn visit<'de, 'c, V: Visitor<'de>>(
    session: &mut Session<'c>,
    container: Container,
    visitor: V,
) -> (Result<V::Value, ProbeError>, ShapeNode) {
    let mut access = KeyedProbe::new(session, container);
    let result = visitor.visit_map(&mut access);
    let node = access.finish(result.is_err());
    (result, node)
}

struct KeyedProbe<'s, 'c> {
    session: &'s mut Session<'c>,
    container: Container,
    path: Path,
    cursor: usize,
    entry_offered: bool,
    unlisted_offered: bool,
    pending: Option<Pending>,
    verdict: Option<KeyAudit>,
    fields: IndexMap<String, ShapeNode>,
}

impl<'s, 'c> KeyedProbe<'s, 'c> {
    fn new(session: &'s mut Session<'c>, container: Container) -> Self {
        let path = session.path().clone();
        Self {
            session,
            container,
            path,
            cursor: 0,
            entry_offered: false,
            unlisted_offered: false,
            pending: None,
            verdict: None,
            fields: IndexMap::new(),
        }
    }

    fn next_field<'de, K: DeserializeSeed<'de>>(
        &mut self,
        names: &'static [&'static str],
        seed: K,
    ) -> Result<Option<K::Value>, ProbeError> {
        while let Some(&name) = names.get(self.cursor) {
            self.cursor += 1;
            let segment = Segment::Field(name.to_string());
            if self.session.is_rejected(&segment) {
                continue;
            }
            if let Some(node) = self.session.absent_at(&segment) {
                self.fields.insert(name.to_string(), node);
                continue;
            }
            let key: StrDeserializer<'_, ProbeError> = name.into_deserializer();
            return match seed.deserialize(key) {
                Ok(key) => {
                    self.pending = Some(Pending::Field(name.to_string()));
                    Ok(Some(key))
                }
                Err(err) => {
                    self.session.reject_key(segment);
                    Err(err)
                }
            };
        }
        self.next_unlisted(seed)
    }

    fn next_unlisted<'de, K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, ProbeError> {
        let auditing = self.session.mode == Mode::Audit
            && !self.unlisted_offered
            && self.session.audit_of(&self.path).is_none();
        if !auditing {
            return Ok(None);
        }
        self.unlisted_offered = true;

        let key: StrDeserializer<'_, ProbeError> = UNLISTED_KEY.into_deserializer();
        match seed.deserialize(key) {
            Ok(key) => {
                self.pending = Some(Pending::Unlisted);
                Ok(Some(key))
            }
            Err(err) => {
                // deny_unknown_fields; the container itself is fine
                self.session.record_audit(&self.path, KeyAudit::Rejected);
                self.session.mark_failed();
                Err(err)
            }
        }
    }

    fn next_entry<'de, K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, ProbeError> {
        if self.entry_offered {
            return Ok(None);
        }
        self.entry_offered = true;

        if self.session.is_rejected(&Segment::Entry) {
            return Ok(None);
        }
        if let Some(node) = self.session.absent_at(&Segment::Entry) {
            self.fields.insert(REPRESENTATIVE_KEY.to_string(), node);
            return Ok(None);
        }
        match self.session.within(Segment::Key, |s| seed.deserialize(KeyProbe { session: s })) {
            Ok(key) => {
                self.pending = Some(Pending::Entry);
                Ok(Some(key))
            }
            Err(err) => {
                self.session.reject_key(Segment::Entry);
                Err(err)
            }
        }
    }

    fn finish(mut self, failed: bool) -> ShapeNode {
        // key accepted but the visitor bailed before asking for its value
        if failed {
            match self.pending.take() {
                Some(Pending::Field(name)) => self.session.reject_key(Segment::Field(name)),
                Some(Pending::Entry) => self.session.reject_key(Segment::Entry),
                Some(Pending::Unlisted) | None => {}
            }
        }

        let Container::Struct(names) = self.container else {
            return ShapeNode::keyed_open(self.fields);
        };

        for &name in names.iter().skip(self.cursor) {
            let segment = Segment::Field(name.to_string());
            if self.session.is_rejected(&segment) {
                continue;
            }
            let node = self.session.absent_at(&segment).unwrap_or_else(ShapeNode::any);
            self.fields.entry(name.to_string()).or_insert(node);
        }

        if self.session.mode == Mode::Audit && self.session.audit_of(&self.path).is_none() {
            match self.verdict {
                Some(verdict) => self.session.record_audit(&self.path, verdict),
                None if !failed => self.session.record_audit(&self.path, KeyAudit::Declared),
                None => {}
            }
        }

        // struct-style and never seen consuming an unlisted key
        if self.session.audit_of(&self.path) == Some(KeyAudit::Accepted) {
            ShapeNode::keyed_open(self.fields)
        } else {
            ShapeNode::keyed_fixed(self.fields)
        }
    }
}

impl<'de> MapAccess<'de> for KeyedProbe<'_, '_> {
    type Error = ProbeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, ProbeError> {
        match self.container {
            Container::Struct(names) => self.next_field(names, seed),
            Container::Map => self.next_entry(seed),
        }
    }

    fn next_value_seed<S: DeserializeSeed<'de>>(&mut self, seed: S) -> Result<S::Value, ProbeError> {
        match self.pending.take() {
            Some(Pending::Field(name)) => {
                let segment = Segment::Field(name.clone());
                let (result, node) =
                    self.session.probe_at(segment, |s| seed.deserialize(ProbeDeserializer::new(s)));
                self.fields.insert(name, node);
                result
            }
            Some(Pending::Entry) => {
                let (result, node) =
                    self.session.probe_at(Segment::Entry, |s| seed.deserialize(ProbeDeserializer::new(s)));
                self.fields.insert(REPRESENTATIVE_KEY.to_string(), node);
                result
            }
            Some(Pending::Unlisted) => {
                let mut verdict = KeyAudit::Declared;
                let (result, _) = self.session.probe_at(Segment::Unlisted, |s| {
                    seed.deserialize(UnlistedValue { session: s, verdict: &mut verdict })
                });
                self.verdict = Some(verdict);
                result
            }
            None => Err(ProbeError::custom("value requested before its key")),
        }
    }
}

// ------------------------------- Keys ------------------------------------ //

/// Map keys: scalars get placeholders, enums their first variant.
struct KeyProbe<'s, 'c> {
    session: &'s mut Session<'c>,
}

impl KeyProbe<'_, '_> {
    fn scalar<'de, V: Visitor<'de>>(self, request: Request, visitor: V) -> Result<V::Value, ProbeError> {
        let key = TypeKey::scalar(request.kind(), &visitor);
        self.session.feed_scalar(request, &key, visitor)
    }
}

macro_rules! key_scalar {
    ($($method:ident => $request:ident,)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
            self.scalar(Request::$request, visitor)
        }
    )*};
}

impl<'de> Deserializer<'de> for KeyProbe<'_, '_> {
    type Error = ProbeError;

    key_scalar! {
        deserialize_any => Str,
        deserialize_bool => Bool,
        deserialize_i8 => I8,
        deserialize_i16 => I16,
        deserialize_i32 => I32,
        deserialize_i64 => I64,
        deserialize_i128 => I128,
        deserialize_u8 => U8,
        deserialize_u16 => U16,
        deserialize_u32 => U32,
        deserialize_u64 => U64,
        deserialize_u128 => U128,
        deserialize_f32 => F32,
        deserialize_f64 => F64,
        deserialize_char => Char,
        deserialize_str => Str,
        deserialize_string => String,
        deserialize_bytes => Bytes,
        deserialize_byte_buf => ByteBuf,
        deserialize_identifier => Identifier,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        let Some(&first) = variants.first() else {
            return Err(ProbeError::custom(format_args!("enum `{name}` has no variants")));
        };
        let access: StrDeserializer<'_, ProbeError> = first.into_deserializer();
        visitor.visit_enum(access)
    }

    // compound keys fail on the string they get
    serde::forward_to_deserialize_any! {
        unit unit_struct seq tuple tuple_struct map struct ignored_any
    }
}

// ----------------------------- Audit value -------------------------------- //

/// Value behind the unlisted key. `IgnoredAny` means the key was skipped;
/// anything else means the container keeps what it is given.
struct UnlistedValue<'s, 'c, 'v> {
    session: &'s mut Session<'c>,
    verdict: &'v mut KeyAudit,
}

macro_rules! accept_unlisted {
    ($($method:ident($($arg:ident: $ty:ty),*),)*) => {$(
        fn $method<V: Visitor<'de>>(self, $($arg: $ty,)* visitor: V) -> Result<V::Value, ProbeError> {
            *self.verdict = KeyAudit::Accepted;
            ProbeDeserializer::new(self.session).$method($($arg,)* visitor)
        }
    )*};
}

impl<'de> Deserializer<'de> for UnlistedValue<'_, '_, '_> {
    type Error = ProbeError;

    accept_unlisted! {
        deserialize_any(),
        deserialize_bool(),
        deserialize_i8(),
        deserialize_i16(),
        deserialize_i32(),
        deserialize_i64(),
        deserialize_i128(),
        deserialize_u8(),
        deserialize_u16(),
        deserialize_u32(),
        deserialize_u64(),
        deserialize_u128(),
        deserialize_f32(),
        deserialize_f64(),
        deserialize_char(),
        deserialize_str(),
        deserialize_string(),
        deserialize_bytes(),
        deserialize_byte_buf(),
        deserialize_option(),
        deserialize_unit(),
        deserialize_unit_struct(name: &'static str),
        deserialize_newtype_struct(name: &'static str),
        deserialize_seq(),
        deserialize_tuple(len: usize),
        deserialize_tuple_struct(name: &'static str, len: usize),
        deserialize_map(),
        deserialize_struct(name: &'static str, fields: &'static [&'static str]),
        deserialize_enum(name: &'static str, variants: &'static [&'static str]),
        deserialize_identifier(),
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
        *self.verdict = KeyAudit::Declared;
        visitor.visit_unit()
    }
}
