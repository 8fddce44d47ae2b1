// src/probe/de.rs
//! The synthetic decoding surface.
//!
//! Every request is answered with a placeholder so the type's own decode logic
//! keeps going, and every request emits the shape it asked for.

use serde::de::{Deserializer, Error as _, Visitor};
use serde_json::Value;

use super::ProbeError;
use super::keyed::{self, Container};
use super::request::Request;
use super::session::{Segment, Session};
use super::{unkeyed, variant};
use crate::shape::{Primitive, ShapeNode, TypeKey};

pub(crate) struct ProbeDeserializer<'s, 'c> {
    session: &'s mut Session<'c>,
}

impl<'s, 'c> ProbeDeserializer<'s, 'c> {
    pub(crate) fn new(session: &'s mut Session<'c>) -> Self {
        Self { session }
    }

    fn scalar<'de, V: Visitor<'de>>(self, request: Request, visitor: V) -> Result<V::Value, ProbeError> {
        let key = TypeKey::scalar(request.kind(), &visitor);
        self.session.emit(ShapeNode::single(request.kind()).with_identity(key.clone()));
        self.session.feed_scalar(request, &key, visitor)
    }

    /// Registered placeholder for a named type; emits an unprobed node.
    fn placeholder(&mut self, name: &'static str) -> Option<Value> {
        let key = TypeKey::Named(name);
        let value = self.session.capabilities.placeholder(&key)?;
        self.session.emit(ShapeNode::any().with_identity(key));
        Some(value)
    }
}

macro_rules! probe_scalar {
    ($($method:ident => $request:ident,)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
            self.scalar(Request::$request, visitor)
        }
    )*};
}

impl<'de> Deserializer<'de> for ProbeDeserializer<'_, '_> {
    type Error = ProbeError;

    probe_scalar! {
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
        deserialize_unit => Unit,
        deserialize_identifier => Identifier,
    }

    // Nothing to learn from self-describing requests.
    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
        self.session.emit(ShapeNode::any());
        visitor.visit_unit()
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
        self.session.emit(ShapeNode::any());
        visitor.visit_unit()
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
        if let Some(node) = self.session.absent_at(&Segment::Inner) {
            self.session.emit(node.optional());
            return visitor.visit_none();
        }
        let (result, node) =
            self.session.probe_at(Segment::Inner, |s| visitor.visit_some(ProbeDeserializer::new(s)));
        self.session.emit(node.optional());
        result
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        mut self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        if let Some(value) = self.placeholder(name) {
            return value.deserialize_unit_struct(name, visitor).map_err(ProbeError::custom);
        }
        self.session.emit(ShapeNode::single(Primitive::Null).with_identity(TypeKey::Named(name)));
        visitor.visit_unit()
    }

    /// Transparent: the inner node keeps a named identity of its own, and
    /// takes the newtype's name otherwise.
    fn deserialize_newtype_struct<V: Visitor<'de>>(
        mut self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        if let Some(value) = self.placeholder(name) {
            return value.deserialize_newtype_struct(name, visitor).map_err(ProbeError::custom);
        }
        self.session.guarded(name, |session| {
            let result = visitor.visit_newtype_struct(ProbeDeserializer::new(session));
            let inner = session.take_emitted();
            let node = match inner.name() {
                Some(_) => inner,
                None => inner.with_identity(TypeKey::Named(name)),
            };
            (result, node)
        })
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
        let (result, node) = unkeyed::visit(self.session, None, visitor);
        self.session.emit(node);
        result
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, ProbeError> {
        let (result, node) = unkeyed::visit(self.session, Some(len), visitor);
        self.session.emit(node);
        result
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        mut self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        if let Some(value) = self.placeholder(name) {
            return value.deserialize_tuple_struct(name, len, visitor).map_err(ProbeError::custom);
        }
        self.session.guarded(name, |session| {
            let (result, node) = unkeyed::visit(session, Some(len), visitor);
            (result, node.with_identity(TypeKey::Named(name)))
        })
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
        let (result, node) = keyed::visit(self.session, Container::Map, visitor);
        self.session.emit(node);
        result
    }

    fn deserialize_struct<V: Visitor<'de>>(
        mut self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        if let Some(value) = self.placeholder(name) {
            return value.deserialize_struct(name, fields, visitor).map_err(ProbeError::custom);
        }
        self.session.guarded(name, |session| {
            let (result, node) = keyed::visit(session, Container::Struct(fields), visitor);
            (result, node.with_identity(TypeKey::Named(name)))
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        mut self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        if let Some(value) = self.placeholder(name) {
            return value.deserialize_enum(name, variants, visitor).map_err(ProbeError::custom);
        }
        self.session.guarded(name, |session| variant::visit(session, name, variants, visitor))
    }
}
