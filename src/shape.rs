// src/shape.rs
//! Shape tree: what a type asked for while decoding itself.
//!
//! Nodes are built bottom-up by the probe and handed back by value. A node is
//! exactly one `Shape` arm plus the metadata every node carries (identity,
//! optionality, closed case set).

use std::fmt;

use indexmap::IndexMap;
use serde::de::Visitor;

/// Terminal scalar kinds a decoder can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Null,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::UInt8 => "uint8",
            Primitive::UInt16 => "uint16",
            Primitive::UInt32 => "uint32",
            Primitive::UInt64 => "uint64",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Null => "null",
        }
    }
}

/// Identity of a probed type, as far as a decoder can observe it.
///
/// Named containers report their serde name. Anonymous scalar requests are
/// told apart by the kind asked for and the visitor's `expecting` text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Named(&'static str),
    Scalar { kind: Primitive, expecting: String },
}

impl TypeKey {
    pub(crate) fn scalar<'de, V: Visitor<'de>>(kind: Primitive, visitor: &V) -> Self {
        TypeKey::Scalar { kind, expecting: Expecting(visitor).to_string() }
    }

    /// Registry name; only named types are ever registered.
    pub fn schema_name(&self) -> Option<&'static str> {
        match self {
            TypeKey::Named(name) => Some(*name),
            TypeKey::Scalar { .. } => None,
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Named(name) => f.write_str(name),
            TypeKey::Scalar { kind, expecting } => write!(f, "{} ({expecting})", kind.name()),
        }
    }
}

struct Expecting<'a, V>(&'a V);

impl<'de, V: Visitor<'de>> fmt::Display for Expecting<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.expecting(f)
    }
}

/// Literal labels of a closed value domain, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSet {
    pub kind: Primitive,
    pub labels: Vec<String>,
}

impl CaseSet {
    pub fn strings<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { kind: Primitive::String, labels: labels.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Unconstrained; nothing usable was observed.
    Any,
    Single(Primitive),
    /// `fixed = false` keeps exactly one representative field for every key.
    Keyed { fields: IndexMap<String, ShapeNode>, fixed: bool },
    Unkeyed(Box<ShapeNode>),
    /// Type already on the probing stack.
    Recursive(TypeKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeNode {
    pub shape: Shape,
    pub identity: Option<TypeKey>,
    pub optional: bool,
    pub cases: Option<CaseSet>,
}

impl ShapeNode {
    fn of(shape: Shape) -> Self {
        Self { shape, identity: None, optional: false, cases: None }
    }

    pub fn any() -> Self {
        Self::of(Shape::Any)
    }

    pub fn single(kind: Primitive) -> Self {
        Self::of(Shape::Single(kind))
    }

    pub fn keyed_fixed(fields: IndexMap<String, ShapeNode>) -> Self {
        Self::of(Shape::Keyed { fields, fixed: true })
    }

    /// Open mapping; only the first field survives as the representative.
    pub fn keyed_open(fields: IndexMap<String, ShapeNode>) -> Self {
        let fields = fields.into_iter().take(1).collect();
        Self::of(Shape::Keyed { fields, fixed: false })
    }

    pub fn unkeyed(element: ShapeNode) -> Self {
        Self::of(Shape::Unkeyed(Box::new(element)))
    }

    pub fn recursive(key: TypeKey) -> Self {
        Self::of(Shape::Recursive(key.clone())).with_identity(key)
    }

    pub fn with_identity(mut self, key: TypeKey) -> Self {
        self.identity = Some(key);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Replaces the shape with `Single(cases.kind)` tagged by the labels.
    pub fn with_cases(mut self, cases: CaseSet) -> Self {
        self.shape = Shape::Single(cases.kind);
        self.cases = Some(cases);
        self
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.shape, Shape::Keyed { fixed: true, .. })
    }

    pub fn fields(&self) -> Option<&IndexMap<String, ShapeNode>> {
        match &self.shape {
            Shape::Keyed { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        self.identity.as_ref().and_then(TypeKey::schema_name)
    }
}

// ------------------------------- Tests ------------------------------------ //
