// src/lib.rs
//! OpenAPI-style schemas straight from Rust types.
//!
//! A type is never instantiated by the caller. Its `Deserialize` impl is run
//! against a recording deserializer that answers every request with a
//! placeholder, which yields a [`ShapeNode`] tree. The tree is then mapped to
//! [`Schema`]s, with named object types extracted into a [`Registry`] and
//! replaced by `$ref`s.
//!
//! ```ignore
//! let mut generator = SchemaGenerator::default();
//! let root = generator.schema_for::<Person>();
//! println!("{}", serde_json::to_string_pretty(generator.registry())?);
//! ```

pub mod capability;
pub mod cases;
pub mod config;
pub mod error;
pub mod generator;
pub mod probe;
pub mod registry;
pub mod schema;
pub mod shape;
pub mod synth;

pub use capability::{Capabilities, Described, SelfDescribing};
pub use cases::{CaseEnumerable, case_labels};
pub use config::{DateRepresentation, KeyCasing, SchemaConfig};
pub use error::{Error, Result};
pub use generator::SchemaGenerator;
pub use probe::{Probe, REPRESENTATIVE_KEY};
pub use registry::Registry;
pub use schema::{ReferenceOr, Schema, SchemaType};
pub use shape::{CaseSet, Primitive, Shape, ShapeNode, TypeKey};
pub use synth::Synthesizer;
