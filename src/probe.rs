// src/probe.rs
//! Structural probe.
//!
//! Reconstructs a type's shape tree without any instance by letting the type
//! deserialize itself from a synthetic deserializer that records every request
//! and answers it with a placeholder.
//!
//! A single `describe` runs in three phases, each repeated until a pass learns
//! nothing new:
//! 1. discover: walk every position, retrying placeholders, marking positions
//!    that cannot be populated, and visiting every enum variant
//! 2. audit: offer each struct-style container one key it never declared
//! 3. assemble: a clean walk that emits the final tree with audit verdicts
//!
//! Failures never escape: a position that cannot be decoded keeps the shape it
//! showed before failing, or becomes unconstrained if it showed none.

mod cycle;
mod de;
mod keyed;
mod request;
mod session;
mod unkeyed;
mod variant;

use std::any::type_name;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::capability::Capabilities;
use crate::shape::ShapeNode;

use de::ProbeDeserializer;
use session::{Mode, Session};

pub use keyed::REPRESENTATIVE_KEY;
pub(crate) use request::Request;
pub(crate) use variant::Payload;

// ------------------------------- Policy ---------------------------------- //

/// Upper bound on passes per phase.
const PASS_LIMIT: usize = 512;

/// Error type of the synthetic deserializer. Never leaves the probe.
#[derive(Debug, Error)]
pub(crate) enum ProbeError {
    #[error("{0}")]
    Custom(String),
    #[error("`{0}` is already being probed")]
    Recursive(&'static str),
}

impl serde::de::Error for ProbeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ProbeError::Custom(msg.to_string())
    }
}

pub struct Probe<'c> {
    capabilities: &'c Capabilities,
}

impl<'c> Probe<'c> {
    pub fn new(capabilities: &'c Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn describe<T: DeserializeOwned>(&self) -> ShapeNode {
        let mut session = Session::new(self.capabilities);
        converge::<T>(&mut session, Mode::Discover);
        converge::<T>(&mut session, Mode::Audit);
        let tree = converge::<T>(&mut session, Mode::Assemble);
        debug!(type_name = type_name::<T>(), passes = session.passes(), "probed");
        tree
    }

    /// The value only names its type; nothing is read from it.
    pub fn describe_value<T: DeserializeOwned>(&self, _value: &T) -> ShapeNode {
        self.describe::<T>()
    }
}

fn converge<T: DeserializeOwned>(session: &mut Session<'_>, mode: Mode) -> ShapeNode {
    let mut tree = ShapeNode::any();
    for _ in 0..PASS_LIMIT {
        session.begin_pass(mode);
        let outcome = T::deserialize(ProbeDeserializer::new(session));
        tree = session.take_emitted();
        if let Err(err) = outcome {
            trace!(?mode, error = %err, "pass incomplete");
        }
        if !session.made_progress() {
            return tree;
        }
    }
    warn!(type_name = type_name::<T>(), ?mode, limit = PASS_LIMIT, "probe did not settle");
    tree
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::type_key;
    use crate::cases::CaseEnumerable;
    use crate::shape::{Primitive, Shape, TypeKey};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, HashMap};
    use std::num::NonZeroU32;

    fn describe<T: DeserializeOwned>() -> ShapeNode {
        Probe::new(&Capabilities::with_defaults()).describe::<T>()
    }

    fn field<'a>(node: &'a ShapeNode, name: &str) -> &'a ShapeNode {
        &node.fields().unwrap_or_else(|| panic!("not keyed: {node:?}"))[name]
    }

    fn element(node: &ShapeNode) -> &ShapeNode {
        match &node.shape {
            Shape::Unkeyed(element) => &**element,
            other => panic!("not unkeyed: {other:?}"),
        }
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Pet {
        name: String,
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Person {
        name: String,
        age: i64,
        pet: Option<Pet>,
    }

    #[test]
    fn struct_is_fixed_with_declared_fields() {
        let node = describe::<Person>();
        assert!(node.is_fixed());
        assert_eq!(node.name(), Some("Person"));
        let fields = node.fields().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["name", "age", "pet"]);
        assert_eq!(fields["name"].shape, Shape::Single(Primitive::String));
        assert_eq!(fields["age"].shape, Shape::Single(Primitive::Int64));
        assert!(!fields["age"].optional);

        let pet = &fields["pet"];
        assert!(pet.optional);
        assert_eq!(pet.name(), Some("Pet"));
        assert!(pet.is_fixed());
    }

    #[test]
    fn maps_are_open_with_one_representative() {
        let node = describe::<HashMap<String, u32>>();
        assert!(!node.is_fixed());
        let fields = node.fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[REPRESENTATIVE_KEY].shape, Shape::Single(Primitive::UInt32));
        assert_eq!(node.identity, None);

        let by_id = describe::<BTreeMap<u64, Pet>>();
        assert_eq!(field(&by_id, REPRESENTATIVE_KEY).name(), Some("Pet"));
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Category {
        name: String,
        parent: Option<Box<Category>>,
        children: Vec<Category>,
        index: HashMap<String, Category>,
    }

    #[test]
    fn recursion_terminates_with_markers() {
        let node = describe::<Category>();
        assert!(node.is_fixed());
        let marker = Shape::Recursive(TypeKey::Named("Category"));

        let parent = field(&node, "parent");
        assert!(parent.optional);
        assert_eq!(parent.shape, marker);
        assert_eq!(element(field(&node, "children")).shape, marker);
        assert_eq!(field(field(&node, "index"), REPRESENTATIVE_KEY).shape, marker);
        assert_eq!(field(&node, "name").shape, Shape::Single(Primitive::String));
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "lowercase")]
    #[allow(dead_code)]
    enum Color {
        Red,
        Green,
        Blue,
    }

    #[test]
    fn unit_enum_is_detected_as_cases() {
        let node = describe::<Color>();
        assert_eq!(node.shape, Shape::Single(Primitive::String));
        assert_eq!(node.name(), Some("Color"));
        assert_eq!(node.cases.unwrap().labels, vec!["red", "green", "blue"]);
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    enum Figure {
        Circle(f64),
        Rect { w: u16, h: u16 },
        Pair(i8, i8),
        Nothing,
    }

    #[test]
    fn data_enum_lists_every_variant() {
        let node = describe::<Figure>();
        assert!(node.is_fixed());
        let fields = node.fields().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["Circle", "Rect", "Pair", "Nothing"]);
        assert!(fields.values().all(|f| f.optional));
        assert_eq!(fields["Circle"].shape, Shape::Single(Primitive::Double));
        assert!(fields["Rect"].is_fixed());
        assert_eq!(field(&fields["Rect"], "w").shape, Shape::Single(Primitive::UInt16));
        assert_eq!(element(&fields["Pair"]).shape, Shape::Single(Primitive::Int8));
        assert_eq!(fields["Nothing"].shape, Shape::Single(Primitive::Null));
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    enum Shade {
        Light,
        Mid,
        Dark,
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    enum Paint {
        Clear,
        Solid(Shade),
        Striped { base: Shade, stripes: Option<Shade> },
        Layered(Box<Paint>),
    }

    #[test]
    fn enums_under_later_variants_are_fully_explored() {
        let node = describe::<Paint>();
        let fields = node.fields().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["Clear", "Solid", "Striped", "Layered"]);

        let labels = |n: &ShapeNode| n.cases.as_ref().map(|c| c.labels.clone());
        let all = Some(vec!["Light".to_string(), "Mid".to_string(), "Dark".to_string()]);

        let solid = &fields["Solid"];
        assert_eq!(solid.shape, Shape::Single(Primitive::String));
        assert_eq!(labels(solid), all);

        let striped = &fields["Striped"];
        assert!(striped.is_fixed());
        assert_eq!(labels(field(striped, "base")), all);
        let stripes = field(striped, "stripes");
        assert!(stripes.optional);
        assert_eq!(labels(stripes), all);

        assert_eq!(fields["Layered"].shape, Shape::Recursive(TypeKey::Named("Paint")));
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Limits {
        max: NonZeroU32,
        tags: Vec<String>,
    }

    #[test]
    fn rejected_placeholder_is_retried() {
        let node = describe::<Limits>();
        assert!(node.is_fixed());
        assert_eq!(field(&node, "max").shape, Shape::Single(Primitive::UInt32));
        assert_eq!(element(field(&node, "tags")).shape, Shape::Single(Primitive::String));
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Stamped {
        at: DateTime<Utc>,
        label: String,
    }

    #[test]
    fn dates_decode_with_or_without_capability() {
        let with = describe::<Stamped>();
        assert_eq!(field(&with, "at").identity, type_key::<DateTime<Utc>>());
        assert_eq!(field(&with, "label").shape, Shape::Single(Primitive::String));

        // without a registered placeholder the generic candidates still get there
        let without = Probe::new(&Capabilities::new()).describe::<Stamped>();
        assert_eq!(field(&without, "at").shape, Shape::Single(Primitive::String));
        assert!(without.is_fixed());
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    #[allow(dead_code)]
    struct Strict {
        id: u8,
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Aliased {
        #[serde(alias = "nm")]
        name: String,
        other: bool,
    }

    #[test]
    fn strict_and_aliased_structs_stay_fixed() {
        let strict = describe::<Strict>();
        assert!(strict.is_fixed());
        assert_eq!(strict.fields().unwrap().len(), 1);

        let aliased = describe::<Aliased>();
        assert!(aliased.is_fixed());
        assert_eq!(field(&aliased, "other").shape, Shape::Single(Primitive::Bool));
        assert!(aliased.fields().unwrap().contains_key("name"));
    }

    /// Declares fields like a struct but keeps every key it is handed.
    #[allow(dead_code)]
    struct Labels(Vec<(String, String)>);

    impl<'de> Deserialize<'de> for Labels {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct LabelsVisitor;

            impl<'de> serde::de::Visitor<'de> for LabelsVisitor {
                type Value = Labels;

                fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str("labels")
                }

                fn visit_map<A: serde::de::MapAccess<'de>>(self, mut map: A) -> Result<Labels, A::Error> {
                    let mut out = Vec::new();
                    while let Some((k, v)) = map.next_entry::<String, String>()? {
                        out.push((k, v));
                    }
                    Ok(Labels(out))
                }
            }

            deserializer.deserialize_struct("Labels", &["app", "tier"], LabelsVisitor)
        }
    }

    #[test]
    fn struct_call_that_accepts_any_key_is_open() {
        let node = describe::<Labels>();
        assert!(!node.is_fixed());
        assert_eq!(node.name(), Some("Labels"));
        let fields = node.fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["app"].shape, Shape::Single(Primitive::String));
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Meters(f32);

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Route {
        legs: (Meters, Meters),
        mixed: (u8, String),
        note: serde_json::Value,
    }

    #[test]
    fn tuples_newtypes_and_any() {
        let node = describe::<Route>();
        let leg = element(field(&node, "legs"));
        assert_eq!(leg.shape, Shape::Single(Primitive::Float));
        assert_eq!(leg.name(), Some("Meters"));
        assert_eq!(element(field(&node, "mixed")).shape, Shape::Any);
        assert_eq!(field(&node, "note").shape, Shape::Any);
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "UPPERCASE")]
    enum Level {
        Low,
        High,
    }

    impl CaseEnumerable for Level {
        fn all_cases() -> Vec<Self> {
            vec![Level::Low, Level::High]
        }
    }

    #[test]
    fn registered_cases_override_probed_shape() {
        let mut capabilities = Capabilities::new();
        capabilities.cases::<Level>().unwrap();
        let node = Probe::new(&capabilities).describe::<Vec<Level>>();
        let item = element(&node);
        assert_eq!(item.shape, Shape::Single(Primitive::String));
        assert_eq!(item.cases.as_ref().unwrap().labels, vec!["LOW", "HIGH"]);
    }

    #[test]
    fn describe_is_idempotent() {
        assert_eq!(describe::<u16>(), describe::<u16>());
        assert_eq!(describe::<Person>(), describe::<Person>());
        assert_eq!(describe::<Figure>(), describe::<Figure>());
    }

    #[test]
    fn describe_value_uses_the_static_type() {
        let pet = Pet { name: "rex".into() };
        let capabilities = Capabilities::new();
        let probe = Probe::new(&capabilities);
        assert_eq!(probe.describe_value(&pet), probe.describe::<Pet>());
    }
}
