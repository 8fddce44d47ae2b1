// src/schema.rs
//! Minimal OpenAPI 3 schema objects, enough to carry synthesis output.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::shape::Primitive;

const COMPONENTS_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// Schema object. An unconstrained schema has every field absent and
/// serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ReferenceOr<Schema>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, ReferenceOr<Schema>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<ReferenceOr<Schema>>>,
}

impl Schema {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn typed(schema_type: SchemaType) -> Self {
        Self { schema_type: Some(schema_type), ..Self::default() }
    }

    pub fn formatted(schema_type: SchemaType, format: &str) -> Self {
        Self { format: Some(format.to_string()), ..Self::typed(schema_type) }
    }

    /// Fixed primitive table: narrow integers are int32, wide ones int64.
    pub fn primitive(kind: Primitive) -> Self {
        match kind {
            Primitive::Int8
            | Primitive::Int16
            | Primitive::Int32
            | Primitive::UInt8
            | Primitive::UInt16
            | Primitive::UInt32 => Self::formatted(SchemaType::Integer, "int32"),
            Primitive::Int64 | Primitive::UInt64 => Self::formatted(SchemaType::Integer, "int64"),
            Primitive::Double => Self::formatted(SchemaType::Number, "double"),
            Primitive::Float => Self::formatted(SchemaType::Number, "float"),
            Primitive::Bool => Self::typed(SchemaType::Boolean),
            Primitive::String | Primitive::Null => Self::typed(SchemaType::String),
        }
    }

    pub fn enumeration(kind: Primitive, values: Vec<Value>) -> Self {
        Self { enum_values: Some(values), ..Self::primitive(kind) }
    }

    /// `required` is dropped entirely when empty.
    pub fn object(properties: IndexMap<String, ReferenceOr<Schema>>, required: Vec<String>) -> Self {
        Self {
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
            ..Self::typed(SchemaType::Object)
        }
    }

    pub fn dictionary(values: ReferenceOr<Schema>) -> Self {
        Self { additional_properties: Some(Box::new(values)), ..Self::typed(SchemaType::Object) }
    }

    pub fn array(items: ReferenceOr<Schema>) -> Self {
        Self { items: Some(Box::new(items)), ..Self::typed(SchemaType::Array) }
    }

    /// Objects, dictionaries, and arrays of those (or of references) are worth
    /// a registry entry. Primitives and enums never are.
    pub fn is_referenceable(&self) -> bool {
        match self.schema_type {
            Some(SchemaType::Object) => self.enum_values.is_none(),
            Some(SchemaType::Array) => self.items.as_deref().is_some_and(ReferenceOr::is_referenceable),
            _ => false,
        }
    }
}

/// Inline item or a `$ref` into `components.schemas`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReferenceOr<T> {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Item(T),
}

impl<T> ReferenceOr<T> {
    pub fn schema_ref(name: &str) -> Self {
        ReferenceOr::Reference { reference: format!("{COMPONENTS_PREFIX}{name}"), description: None }
    }

    /// Component name for `#/components/schemas/...` references.
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            ReferenceOr::Reference { reference, .. } => reference.strip_prefix(COMPONENTS_PREFIX),
            ReferenceOr::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&T> {
        match self {
            ReferenceOr::Item(item) => Some(item),
            ReferenceOr::Reference { .. } => None,
        }
    }
}

impl ReferenceOr<Schema> {
    pub fn with_description(self, text: &str) -> Self {
        match self {
            ReferenceOr::Reference { reference, .. } => {
                ReferenceOr::Reference { reference, description: Some(text.to_string()) }
            }
            ReferenceOr::Item(schema) => {
                ReferenceOr::Item(Schema { description: Some(text.to_string()), ..schema })
            }
        }
    }

    pub fn is_referenceable(&self) -> bool {
        match self {
            ReferenceOr::Reference { .. } => true,
            ReferenceOr::Item(schema) => schema.is_referenceable(),
        }
    }
}

impl From<Schema> for ReferenceOr<Schema> {
    fn from(schema: Schema) -> Self {
        ReferenceOr::Item(schema)
    }
}

// ------------------------------- Tests ------------------------------------ //
