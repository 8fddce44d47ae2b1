// src/capability.rs
//! Explicit capability registry.
//!
//! Optional behaviour (date handling, self-description, case sets, human
//! descriptions) is declared once per type and looked up by `TypeKey` while
//! probing and synthesizing.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, DeserializeOwned, Visitor};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cases::{self, CaseEnumerable};
use crate::error::{Error, Result};
use crate::probe::Request;
use crate::schema::Schema;
use crate::shape::{CaseSet, ShapeNode, TypeKey};

/// Type supplying its own schema; probing is skipped.
pub trait SelfDescribing {
    fn schema() -> Schema;
}

/// Type with a human-readable description.
pub trait Described {
    fn description() -> String;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capability {
    pub date: bool,
    pub schema: Option<Schema>,
    pub description: Option<String>,
    pub cases: Option<CaseSet>,
    /// Value fed to the type's decoder instead of the generic placeholders.
    pub placeholder: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    entries: HashMap<TypeKey, Capability>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the chrono date and time types marked as dates.
    pub fn with_defaults() -> Self {
        let mut capabilities = Self::new();
        let registered = capabilities
            .date::<DateTime<Utc>>()
            .and_then(|c| c.date::<DateTime<FixedOffset>>())
            .and_then(|c| c.date::<NaiveDateTime>())
            .and_then(|c| c.date::<NaiveDate>())
            .map(|_| ());
        if let Err(err) = registered {
            warn!(error = %err, "default date capability skipped");
        }
        capabilities
    }

    /// Marks `T` as date-typed. `T::default()` is fed to its decoder.
    pub fn date<T: DeserializeOwned + Serialize + Default>(&mut self) -> Result<&mut Self> {
        let placeholder = serde_json::to_value(T::default())
            .map_err(|source| Error::Placeholder { type_name: type_name::<T>(), source })?;
        let entry = self.entry::<T>()?;
        entry.date = true;
        entry.placeholder = Some(placeholder);
        Ok(self)
    }

    pub fn self_describing<T: DeserializeOwned + SelfDescribing>(&mut self) -> Result<&mut Self> {
        self.entry::<T>()?.schema = Some(T::schema());
        Ok(self)
    }

    pub fn described<T: DeserializeOwned + Described>(&mut self) -> Result<&mut Self> {
        self.entry::<T>()?.description = Some(T::description());
        Ok(self)
    }

    pub fn cases<T: DeserializeOwned + CaseEnumerable>(&mut self) -> Result<&mut Self> {
        let (cases, placeholder) = cases::enumerate::<T>()?;
        let entry = self.entry::<T>()?;
        entry.cases = Some(cases);
        entry.placeholder = placeholder;
        Ok(self)
    }

    pub fn lookup(&self, key: &TypeKey) -> Option<&Capability> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn placeholder(&self, key: &TypeKey) -> Option<Value> {
        self.lookup(key).and_then(|c| c.placeholder.clone())
    }

    /// Registered case sets replace whatever shape was probed.
    pub(crate) fn apply_cases(&self, node: ShapeNode) -> ShapeNode {
        let cases = node.identity.as_ref().and_then(|key| self.lookup(key)).and_then(|c| c.cases.clone());
        match cases {
            Some(cases) => node.with_cases(cases),
            None => node,
        }
    }

    fn entry<T: DeserializeOwned>(&mut self) -> Result<&mut Capability> {
        let key = type_key::<T>().ok_or(Error::Unidentifiable { type_name: type_name::<T>() })?;
        Ok(self.entries.entry(key).or_default())
    }
}

/// Identity `T` reports when decoded; `None` for anonymous containers.
pub fn type_key<T: DeserializeOwned>() -> Option<TypeKey> {
    match T::deserialize(Sniffer) {
        Err(Sniffed::Key(key)) => Some(key),
        _ => None,
    }
}

// ------------------------------ Sniffer ---------------------------------- //

/// Deserializer that stops at the first request and reports what it saw.
struct Sniffer;

#[derive(Debug)]
enum Sniffed {
    Key(TypeKey),
    Other,
}

impl fmt::Display for Sniffed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sniffed::Key(key) => write!(f, "sniffed {key}"),
            Sniffed::Other => f.write_str("no identity"),
        }
    }
}

impl std::error::Error for Sniffed {}

impl de::Error for Sniffed {
    fn custom<T: fmt::Display>(_: T) -> Self {
        Sniffed::Other
    }
}

macro_rules! sniff_scalar {
    ($($method:ident => $request:ident,)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, Sniffed> {
            Err(Sniffed::Key(TypeKey::scalar(Request::$request.kind(), &visitor)))
        }
    )*};
}

macro_rules! sniff_anonymous {
    ($($method:ident,)*) => {$(
        fn $method<V: Visitor<'de>>(self, _: V) -> std::result::Result<V::Value, Sniffed> {
            Err(Sniffed::Other)
        }
    )*};
}

impl<'de> de::Deserializer<'de> for Sniffer {
    type Error = Sniffed;

    sniff_scalar! {
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

    sniff_anonymous! {
        deserialize_any,
        deserialize_ignored_any,
        deserialize_seq,
        deserialize_map,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, Sniffed> {
        visitor.visit_some(self)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _: V,
    ) -> std::result::Result<V::Value, Sniffed> {
        Err(Sniffed::Key(TypeKey::Named(name)))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _: V,
    ) -> std::result::Result<V::Value, Sniffed> {
        Err(Sniffed::Key(TypeKey::Named(name)))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _: usize, _: V) -> std::result::Result<V::Value, Sniffed> {
        Err(Sniffed::Other)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _: usize,
        _: V,
    ) -> std::result::Result<V::Value, Sniffed> {
        Err(Sniffed::Key(TypeKey::Named(name)))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _: &'static [&'static str],
        _: V,
    ) -> std::result::Result<V::Value, Sniffed> {
        Err(Sniffed::Key(TypeKey::Named(name)))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _: &'static [&'static str],
        _: V,
    ) -> std::result::Result<V::Value, Sniffed> {
        Err(Sniffed::Key(TypeKey::Named(name)))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Primitive;
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Pet {
        name: String,
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct UserId(u64);

    #[test]
    fn named_containers_report_their_name() {
        assert_eq!(type_key::<Pet>(), Some(TypeKey::Named("Pet")));
        assert_eq!(type_key::<Option<Pet>>(), Some(TypeKey::Named("Pet")));
        assert_eq!(type_key::<UserId>(), Some(TypeKey::Named("UserId")));
    }

    #[test]
    fn scalars_report_kind_and_expectation() {
        match type_key::<u16>() {
            Some(TypeKey::Scalar { kind, .. }) => assert_eq!(kind, Primitive::UInt16),
            other => panic!("unexpected key {other:?}"),
        }
        assert_eq!(type_key::<DateTime<Utc>>(), type_key::<DateTime<FixedOffset>>());
        assert_ne!(type_key::<NaiveDate>(), type_key::<String>());
    }

    #[test]
    fn anonymous_containers_have_no_key() {
        assert_eq!(type_key::<Vec<Pet>>(), None);
        assert_eq!(type_key::<HashMap<String, Pet>>(), None);
        assert_eq!(type_key::<serde_json::Value>(), None);

        let mut capabilities = Capabilities::new();
        let err = capabilities.date::<Vec<u8>>().unwrap_err();
        assert!(matches!(err, Error::Unidentifiable { .. }));
        assert!(capabilities.is_empty());
    }

    #[test]
    fn defaults_mark_chrono_types_as_dates() {
        let capabilities = Capabilities::with_defaults();
        assert!(!capabilities.is_empty());
        for key in [type_key::<DateTime<Utc>>(), type_key::<NaiveDate>(), type_key::<NaiveDateTime>()] {
            let capability = capabilities.lookup(&key.unwrap()).unwrap();
            assert!(capability.date);
            assert!(capability.placeholder.is_some());
        }
    }
}
