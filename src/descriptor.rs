//! Serialization descriptors: the walker's input.
//!
//! A descriptor is the runtime metadata a serialization layer keeps for one
//! type (field names, element kinds, nullability, polymorphic wiring). They
//! arrive either in memory (built with the constructors below) or as JSON
//! dumped by that layer, e.g.
//!
//! ```json
//! { "kind": "object", "serialName": "example.Person",
//!   "elements": [ { "name": "age", "descriptor": { "kind": "int", "serialName": "kotlin.Int" } } ] }
//! ```
use serde::Deserialize;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Leaf kinds. The serialization layer's finer widths collapse onto the four
/// JSON-visible ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    Float,
    String,
}

/// Closed set of descriptor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Kind {
    Primitive(PrimitiveKind),
    Object,
    Enum,
    List,
    Map,
    PolymorphicOpen,
    PolymorphicSealed,
    Contextual,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub kind: Kind,
    pub serial_name: String,
    #[serde(default)]
    pub is_nullable: bool,
    /// Object fields, enum constants, list element, or map key + value.
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Only set on the declaring base of a sealed hierarchy.
    #[serde(default)]
    pub discriminator_property_name: Option<String>,
    /// Base descriptor when this type is a variant of a sealed hierarchy.
    #[serde(default)]
    pub declared_variant_of: Option<Box<Descriptor>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub name: String,
    /// Absent for enum constants.
    #[serde(default)]
    pub descriptor: Option<Descriptor>,
    #[serde(default)]
    pub is_optional: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TryFrom<String> for Kind {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let kind = match raw.as_str() {
            "boolean" => Kind::Primitive(PrimitiveKind::Boolean),
            "byte" | "short" | "int" | "long" | "integer" => Kind::Primitive(PrimitiveKind::Integer),
            "float" | "double" => Kind::Primitive(PrimitiveKind::Float),
            "char" | "string" => Kind::Primitive(PrimitiveKind::String),
            "object" | "class" => Kind::Object,
            "enum" => Kind::Enum,
            "list" => Kind::List,
            "map" => Kind::Map,
            "polymorphic-open" => Kind::PolymorphicOpen,
            "polymorphic-sealed" => Kind::PolymorphicSealed,
            "contextual" => Kind::Contextual,
            other => return Err(format!("unknown descriptor kind `{other}`")),
        };
        Ok(kind)
    }
}

impl Descriptor {
    pub fn new(kind: Kind, serial_name: impl Into<String>) -> Self {
        Self {
            kind,
            serial_name: serial_name.into(),
            is_nullable: false,
            elements: Vec::new(),
            discriminator_property_name: None,
            declared_variant_of: None,
        }
    }

    pub fn primitive(kind: PrimitiveKind, serial_name: impl Into<String>) -> Self {
        Self::new(Kind::Primitive(kind), serial_name)
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean, "kotlin.Boolean")
    }

    pub fn int() -> Self {
        Self::primitive(PrimitiveKind::Integer, "kotlin.Int")
    }

    pub fn double() -> Self {
        Self::primitive(PrimitiveKind::Float, "kotlin.Double")
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String, "kotlin.String")
    }

    pub fn object(serial_name: impl Into<String>, elements: Vec<Element>) -> Self {
        Self { elements, ..Self::new(Kind::Object, serial_name) }
    }

    /// Enum whose constants keep the given order.
    pub fn enumeration<I, S>(serial_name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let elements = constants
            .into_iter()
            .map(|name| Element { name: name.into(), descriptor: None, is_optional: false })
            .collect();
        Self { elements, ..Self::new(Kind::Enum, serial_name) }
    }

    pub fn list(element: Descriptor) -> Self {
        Self {
            elements: vec![Element::required("0", element)],
            ..Self::new(Kind::List, "kotlin.collections.ArrayList")
        }
    }

    pub fn map(key: Descriptor, value: Descriptor) -> Self {
        Self {
            elements: vec![Element::required("0", key), Element::required("1", value)],
            ..Self::new(Kind::Map, "kotlin.collections.LinkedHashMap")
        }
    }

    pub fn contextual(serial_name: impl Into<String>) -> Self {
        Self::new(Kind::Contextual, serial_name)
    }

    /// Declaring base of a sealed hierarchy.
    pub fn sealed_base(
        serial_name: impl Into<String>,
        discriminator: impl Into<String>,
        elements: Vec<Element>,
    ) -> Self {
        Self {
            elements,
            discriminator_property_name: Some(discriminator.into()),
            ..Self::new(Kind::PolymorphicSealed, serial_name)
        }
    }

    pub fn variant(serial_name: impl Into<String>, base: Descriptor, elements: Vec<Element>) -> Self {
        Self {
            elements,
            declared_variant_of: Some(Box::new(base)),
            ..Self::new(Kind::Object, serial_name)
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Child descriptor at `index`, if the element carries one.
    pub fn element_descriptor(&self, index: usize) -> Option<&Descriptor> {
        self.elements.get(index).and_then(|e| e.descriptor.as_ref())
    }

    pub fn is_variant(&self) -> bool {
        self.declared_variant_of.is_some()
            && matches!(self.kind, Kind::Object | Kind::PolymorphicSealed)
    }
}

impl Element {
    pub fn required(name: impl Into<String>, descriptor: Descriptor) -> Self {
        Self { name: name.into(), descriptor: Some(descriptor), is_optional: false }
    }

    pub fn optional(name: impl Into<String>, descriptor: Descriptor) -> Self {
        Self { name: name.into(), descriptor: Some(descriptor), is_optional: true }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
