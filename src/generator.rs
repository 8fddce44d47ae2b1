// src/generator.rs
//! Public entry point: probe a type, synthesize its schema, and keep every
//! extracted component in one registry across calls.

use std::any::type_name;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::capability::Capabilities;
use crate::config::SchemaConfig;
use crate::probe::Probe;
use crate::registry::Registry;
use crate::schema::{ReferenceOr, Schema};
use crate::shape::ShapeNode;
use crate::synth::Synthesizer;

#[derive(Debug)]
pub struct SchemaGenerator {
    config: SchemaConfig,
    capabilities: Capabilities,
    registry: Registry,
}

impl Default for SchemaGenerator {
    fn default() -> Self {
        Self::new(SchemaConfig::default())
    }
}

impl SchemaGenerator {
    /// Starts with the built-in date types registered.
    pub fn new(config: SchemaConfig) -> Self {
        Self::with_capabilities(config, Capabilities::with_defaults())
    }

    pub fn with_capabilities(config: SchemaConfig, capabilities: Capabilities) -> Self {
        Self { config, capabilities, registry: Registry::new() }
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn capabilities_mut(&mut self) -> &mut Capabilities {
        &mut self.capabilities
    }

    /// Shape tree only; the registry is untouched.
    pub fn describe<T: DeserializeOwned>(&self) -> ShapeNode {
        Probe::new(&self.capabilities).describe::<T>()
    }

    /// Root schema for `T`. Named object types come back as a `$ref` with
    /// their definition in [`registry`](Self::registry).
    pub fn schema_for<T: DeserializeOwned>(&mut self) -> ReferenceOr<Schema> {
        let node = self.describe::<T>();
        let schema = Synthesizer::new(&self.config, &self.capabilities).synthesize(&node, &mut self.registry);
        debug!(type_name = type_name::<T>(), components = self.registry.len(), "schema generated");
        schema
    }

    /// The value only names its type.
    pub fn schema_for_value<T: DeserializeOwned>(&mut self, _value: &T) -> ReferenceOr<Schema> {
        self.schema_for::<T>()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }
}

// ------------------------------- Tests ------------------------------------ //
