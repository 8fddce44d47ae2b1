// src/synth.rs
//! Shape tree -> schema, with reference extraction into a registry.
//!
//! Decision order per node:
//! 1. date capability: the configured date representation
//! 2. self-describing capability: the type's own schema
//! 3. structural mapping of the shape
//!
//! Descriptions are attached next, so they travel with the schema into the
//! registry. Named, referenceable results are then moved into the registry
//! and replaced by a `$ref`.

use indexmap::IndexMap;
use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::capability::{Capabilities, Capability};
use crate::config::SchemaConfig;
use crate::registry::Registry;
use crate::schema::{ReferenceOr, Schema};
use crate::shape::{CaseSet, Primitive, Shape, ShapeNode, TypeKey};

pub struct Synthesizer<'a> {
    config: &'a SchemaConfig,
    capabilities: &'a Capabilities,
}

impl<'a> Synthesizer<'a> {
    pub fn new(config: &'a SchemaConfig, capabilities: &'a Capabilities) -> Self {
        Self { config, capabilities }
    }

    pub fn synthesize(&self, node: &ShapeNode, registry: &mut Registry) -> ReferenceOr<Schema> {
        let capability = node.identity.as_ref().and_then(|key| self.capabilities.lookup(key));

        let schema = match capability {
            Some(Capability { date: true, .. }) => ReferenceOr::Item(self.config.date.schema()),
            Some(Capability { schema: Some(schema), .. }) => ReferenceOr::Item(schema.clone()),
            _ => self.structural(node, registry),
        };
        let schema = match capability.and_then(|c| c.description.as_deref()) {
            Some(text) => schema.with_description(text),
            None => schema,
        };
        self.extract(node, schema, registry)
    }

    fn structural(&self, node: &ShapeNode, registry: &mut Registry) -> ReferenceOr<Schema> {
        let schema = match &node.shape {
            Shape::Any => Schema::any(),
            Shape::Single(kind) => match &node.cases {
                Some(cases) => Schema::enumeration(*kind, literals(cases)),
                None => Schema::primitive(*kind),
            },
            Shape::Keyed { fields, fixed: true } => self.object(fields, registry),
            Shape::Keyed { fields, fixed: false } => {
                let values = match fields.values().next() {
                    Some(representative) => self.synthesize(representative, registry),
                    None => Schema::any().into(),
                };
                Schema::dictionary(values)
            }
            Shape::Unkeyed(element) => Schema::array(self.synthesize(element, registry)),
            Shape::Recursive(key) => return self.recursive(key),
        };
        schema.into()
    }

    /// Properties go through key casing. On collision the later field wins,
    /// both its schema and its optionality, at the first field's position.
    fn object(&self, fields: &IndexMap<String, ShapeNode>, registry: &mut Registry) -> Schema {
        let mut properties = IndexMap::with_capacity(fields.len());
        let mut optional = IndexMap::with_capacity(fields.len());
        for (name, child) in fields {
            let key = self.config.key_casing.apply(name);
            properties.insert(key.clone(), self.synthesize(child, registry));
            optional.insert(key, child.optional);
        }
        let required = optional
            .into_iter()
            .filter(|(_, optional)| !optional)
            .map(|(key, _)| key)
            .collect();
        Schema::object(properties, required)
    }

    // Recursive markers are never expanded, even inline.
    fn recursive(&self, key: &TypeKey) -> ReferenceOr<Schema> {
        let name = key.to_string();
        if !self.config.extract_references {
            warn!(type_name = %name, "recursive type referenced without reference extraction");
        }
        ReferenceOr::schema_ref(&name)
    }

    fn extract(&self, node: &ShapeNode, schema: ReferenceOr<Schema>, registry: &mut Registry) -> ReferenceOr<Schema> {
        if !self.config.extract_references {
            return schema;
        }
        let (Some(name), ReferenceOr::Item(item)) = (node.name(), &schema) else {
            return schema;
        };
        if !item.is_referenceable() {
            return schema;
        }
        match registry.insert(name, schema) {
            Some(_) => debug!(type_name = name, "schema replaced"),
            None => debug!(type_name = name, "schema registered"),
        }
        ReferenceOr::schema_ref(name)
    }
}

/// Case labels as typed JSON literals for the base kind.
fn literals(cases: &CaseSet) -> Vec<Value> {
    cases
        .labels
        .iter()
        .map(|label| match cases.kind {
            Primitive::Bool => Value::Bool(label == "true"),
            Primitive::Float | Primitive::Double => label
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or_else(|| Value::String(label.clone()), Value::Number),
            Primitive::String | Primitive::Null => Value::String(label.clone()),
            _ => label
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| label.parse::<u64>().map(Value::from))
                .unwrap_or_else(|_| Value::String(label.clone())),
        })
        .collect()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Described, SelfDescribing};
    use crate::config::{DateRepresentation, KeyCasing};
    use crate::probe::Probe;
    use crate::schema::SchemaType;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use std::collections::HashMap;

    fn run<T: DeserializeOwned>(
        config: &SchemaConfig,
        capabilities: &Capabilities,
        registry: &mut Registry,
    ) -> ReferenceOr<Schema> {
        let node = Probe::new(capabilities).describe::<T>();
        Synthesizer::new(config, capabilities).synthesize(&node, registry)
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Value {
        serde_json::to_value(value).unwrap()
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
    fn person_and_pet_are_extracted() {
        let capabilities = Capabilities::new();
        let mut registry = Registry::new();
        let out = run::<Person>(&SchemaConfig::default(), &capabilities, &mut registry);

        assert_eq!(to_json(&out), json!({"$ref": "#/components/schemas/Person"}));
        assert_eq!(
            to_json(&registry),
            json!({
                "Pet": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"]
                },
                "Person": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "age": {"type": "integer", "format": "int64"},
                        "pet": {"$ref": "#/components/schemas/Pet"}
                    },
                    "required": ["name", "age"]
                }
            })
        );
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Node {
        value: u8,
        next: Option<Box<Node>>,
    }

    #[test]
    fn recursion_becomes_self_reference() {
        let capabilities = Capabilities::new();
        let mut registry = Registry::new();
        let out = run::<Node>(&SchemaConfig::default(), &capabilities, &mut registry);

        assert_eq!(out.ref_name(), Some("Node"));
        let node = registry.schema("Node").unwrap();
        let next = &node.properties.as_ref().unwrap()["next"];
        assert_eq!(next.ref_name(), Some("Node"));
        assert_eq!(node.required, Some(vec!["value".to_string()]));
    }

    #[test]
    fn same_type_twice_is_one_entry() {
        let capabilities = Capabilities::new();
        let config = SchemaConfig::default();
        let mut registry = Registry::new();
        let first = run::<Pet>(&config, &capabilities, &mut registry);
        let second = run::<Pet>(&config, &capabilities, &mut registry);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    enum Color {
        Red,
        Green,
        Blue,
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Palette {
        main: Color,
        by_name: HashMap<String, Pet>,
        scores: HashMap<String, f32>,
    }

    #[test]
    fn enums_stay_inline_and_maps_become_dictionaries() {
        let capabilities = Capabilities::new();
        let mut registry = Registry::new();
        run::<Palette>(&SchemaConfig::default(), &capabilities, &mut registry);

        assert_eq!(
            to_json(registry.get("Palette").unwrap()),
            json!({
                "type": "object",
                "properties": {
                    "main": {"type": "string", "enum": ["Red", "Green", "Blue"]},
                    "by_name": {
                        "type": "object",
                        "additionalProperties": {"$ref": "#/components/schemas/Pet"}
                    },
                    "scores": {
                        "type": "object",
                        "additionalProperties": {"type": "number", "format": "float"}
                    }
                },
                "required": ["main", "by_name", "scores"]
            })
        );
        assert!(!registry.contains("Color"));
    }

    #[test]
    fn inline_mode_leaves_registry_empty() {
        let capabilities = Capabilities::new();
        let mut registry = Registry::new();
        let out = run::<Person>(&SchemaConfig::inline(), &capabilities, &mut registry);

        assert!(registry.is_empty());
        let person = out.as_item().unwrap();
        assert_eq!(person.schema_type, Some(SchemaType::Object));
        let pet = person.properties.as_ref().unwrap()["pet"].as_item().unwrap();
        assert_eq!(pet.required, Some(vec!["name".to_string()]));
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Account {
        user_name: String,
        #[serde(rename = "userName")]
        legacy_name: Option<String>,
        created: NaiveDate,
        home: Pet,
    }

    impl Described for Pet {
        fn description() -> String {
            "A household animal".to_string()
        }
    }

    #[test]
    fn casing_dates_and_descriptions() {
        let mut capabilities = Capabilities::with_defaults();
        capabilities.described::<Pet>().unwrap();
        let config = SchemaConfig::new(DateRepresentation::EpochSeconds, KeyCasing::CamelCase);
        let mut registry = Registry::new();
        run::<Account>(&config, &capabilities, &mut registry);

        let account = to_json(registry.get("Account").unwrap());
        // `user_name` and `userName` collide; the later, optional one wins
        assert_eq!(
            account,
            json!({
                "type": "object",
                "properties": {
                    "userName": {"type": "string"},
                    "created": {"type": "integer", "format": "int64"},
                    "home": {"$ref": "#/components/schemas/Pet"}
                },
                "required": ["created", "home"]
            })
        );
        let pet = registry.schema("Pet").unwrap();
        assert_eq!(pet.description.as_deref(), Some("A household animal"));
    }

    struct Email;

    impl<'de> Deserialize<'de> for Email {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_newtype_struct("Email", serde::de::IgnoredAny).map(|_| Email)
        }
    }

    impl SelfDescribing for Email {
        fn schema() -> Schema {
            Schema::formatted(SchemaType::String, "email")
        }
    }

    #[test]
    fn self_describing_type_supplies_its_schema() {
        let mut capabilities = Capabilities::new();
        capabilities.self_describing::<Email>().unwrap();
        let mut registry = Registry::new();
        let out = run::<Vec<Email>>(&SchemaConfig::default(), &capabilities, &mut registry);

        assert_eq!(to_json(&out), json!({"type": "array", "items": {"type": "string", "format": "email"}}));
        assert!(registry.is_empty());
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    enum Fill {
        Clear,
        Paint(Color),
    }

    #[test]
    fn unit_enum_inside_a_later_variant_keeps_every_case() {
        let capabilities = Capabilities::new();
        let mut registry = Registry::new();
        let out = run::<Fill>(&SchemaConfig::inline(), &capabilities, &mut registry);
        assert_eq!(
            to_json(&out),
            json!({
                "type": "object",
                "properties": {
                    "Clear": {"type": "string"},
                    "Paint": {"type": "string", "enum": ["Red", "Green", "Blue"]}
                }
            })
        );
    }

    #[test]
    fn integer_case_labels_become_numbers() {
        let cases = CaseSet { kind: Primitive::Int64, labels: vec!["1".into(), "-2".into()] };
        assert_eq!(literals(&cases), vec![json!(1), json!(-2)]);
        let cases = CaseSet { kind: Primitive::Double, labels: vec!["0.5".into()] };
        assert_eq!(literals(&cases), vec![json!(0.5)]);
    }

    #[test]
    fn recursive_reference_survives_inline_mode() {
        let capabilities = Capabilities::new();
        let mut registry = Registry::new();
        let out = run::<Node>(&SchemaConfig::inline(), &capabilities, &mut registry);
        let node = out.as_item().unwrap();
        assert_eq!(node.properties.as_ref().unwrap()["next"].ref_name(), Some("Node"));
        assert!(registry.is_empty());
    }
}
