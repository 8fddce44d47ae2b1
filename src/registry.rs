// src/registry.rs
//! Named schemas collected during one synthesis session.
//!
//! Owned by whoever drives the session. Serializes as a plain map so it can be
//! dropped straight into `components.schemas`.

use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::{ReferenceOr, Schema};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Registry {
    schemas: IndexMap<String, ReferenceOr<Schema>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `name`, replacing any earlier entry in place.
    pub fn insert(&mut self, name: &str, schema: impl Into<ReferenceOr<Schema>>) -> Option<ReferenceOr<Schema>> {
        self.schemas.insert(name.to_string(), schema.into())
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceOr<Schema>> {
        self.schemas.get(name)
    }

    /// Inline schema stored under `name`, if it is not itself a reference.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.get(name).and_then(ReferenceOr::as_item)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReferenceOr<Schema>)> {
        self.schemas.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn into_inner(self) -> IndexMap<String, ReferenceOr<Schema>> {
        self.schemas
    }
}
