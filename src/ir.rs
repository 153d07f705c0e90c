//! Renderer-facing type descriptor. No statistics here.
use std::collections::BTreeSet;
use serde::Serialize;

use crate::inference::TimestampFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Shape {
    Null,
    Bool,
    Int,
    Float,
    /// Both integral and fractional numbers were seen.
    AmbiguousNumber,
    String,
    Timestamp { format: TimestampFormat },
    Array { element: Box<Descriptor> },
    Object { fields: Vec<Field> },
    /// Uniform string-keyed dictionary.
    Map { value: Box<Descriptor> },
    /// Objects observed, but never with a property.
    EmptyObject,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    #[serde(flatten)]
    pub shape: Shape,
    /// May literally be `null`.
    pub nullable: bool,
    /// May be absent from some observations of the enclosing context.
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub descriptor: Descriptor,
    /// Name cannot become an identifier; render as a comment only.
    pub undeclarable: bool,
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Null => "Null",
            Shape::Bool => "Bool",
            Shape::Int => "Int",
            Shape::Float => "Float",
            Shape::AmbiguousNumber => "AmbiguousNumber",
            Shape::String => "String",
            Shape::Timestamp { .. } => "Timestamp",
            Shape::Array { .. } => "Array",
            Shape::Object { .. } => "Object",
            Shape::Map { .. } => "Map",
            Shape::EmptyObject => "EmptyObject",
            Shape::Any => "Any",
        }
    }
}

impl Descriptor {
    pub fn new(shape: Shape) -> Self {
        Self { shape, nullable: false, optional: false }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Fields of an `Object` descriptor, empty for every other shape.
    pub fn fields(&self) -> &[Field] {
        match &self.shape {
            Shape::Object { fields } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }
}

/// Something a renderer will need support for to declare the tree
/// (imports, helper types, validators).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "format")]
pub enum Capability {
    Sequence,
    Mapping,
    Timestamp(TimestampFormat),
    AmbiguousNumber,
    Dynamic,
    Undeclarable,
}

pub type Capabilities = BTreeSet<Capability>;
