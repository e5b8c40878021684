//! Schema value model (the walker's output) and its OpenAPI 3.1 rendering.
use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    /// Usage-site flag; never stored on a registered definition by the walker.
    pub nullable: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Boolean,
    Integer,
    Number,
    String { enum_values: Option<Vec<String>> },
    Array { items: Option<Box<Schema>> },
    Object(ObjectSchema),
    Composed { all_of: Vec<Schema> },
    OneOf(Vec<Schema>),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    /// Element order of the source descriptor.
    pub properties: IndexMap<String, Schema>,
    pub required: IndexSet<String>,
    pub additional_properties: Option<Box<Schema>>,
    /// `discriminator.propertyName` of a sealed base.
    pub discriminator: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self { kind, nullable: false, description: None }
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn integer() -> Self {
        Self::new(SchemaKind::Integer)
    }

    pub fn number() -> Self {
        Self::new(SchemaKind::Number)
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String { enum_values: None })
    }

    pub fn string_enum(values: Vec<String>) -> Self {
        Self::new(SchemaKind::String { enum_values: Some(values) })
    }

    pub fn array(items: Schema) -> Self {
        Self::new(SchemaKind::Array { items: Some(Box::new(items)) })
    }

    /// Array without an `items` constraint.
    pub fn any_array() -> Self {
        Self::new(SchemaKind::Array { items: None })
    }

    pub fn object(object: ObjectSchema) -> Self {
        Self::new(SchemaKind::Object(object))
    }

    pub fn map_of(values: Schema) -> Self {
        Self::object(ObjectSchema {
            additional_properties: Some(Box::new(values)),
            ..ObjectSchema::default()
        })
    }

    /// Generic object used when the concrete type is not statically known.
    pub fn opaque() -> Self {
        Self::object(ObjectSchema::default())
    }

    pub fn composed(all_of: Vec<Schema>) -> Self {
        Self::new(SchemaKind::Composed { all_of })
    }

    pub fn one_of(arms: Vec<Schema>) -> Self {
        Self::new(SchemaKind::OneOf(arms))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Reference(name.into()))
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl ObjectSchema {
    pub fn insert(&mut self, name: impl Into<String>, schema: Schema, required: bool) {
        let name = name.into();
        if required {
            self.required.insert(name.clone());
        }
        self.properties.insert(name, schema);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// JSON RENDERING
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    /// Render per OpenAPI 3.1 / JSON Schema conventions.
    pub fn to_json(&self) -> Value {
        let mut out = match &self.kind {
            SchemaKind::Boolean => json!({ "type": "boolean" }),
            SchemaKind::Integer => json!({ "type": "integer" }),
            SchemaKind::Number => json!({ "type": "number" }),
            SchemaKind::String { enum_values } => {
                let mut o = json!({ "type": "string" });
                if let Some(values) = enum_values {
                    o["enum"] = Value::Array(values.iter().cloned().map(Value::from).collect());
                }
                o
            }
            SchemaKind::Array { items } => {
                let mut o = json!({ "type": "array" });
                if let Some(items) = items {
                    o["items"] = items.to_json();
                }
                o
            }
            SchemaKind::Object(object) => object_to_json(object),
            SchemaKind::Composed { all_of } => {
                json!({ "allOf": all_of.iter().map(Schema::to_json).collect::<Vec<_>>() })
            }
            SchemaKind::OneOf(arms) => {
                json!({ "oneOf": arms.iter().map(Schema::to_json).collect::<Vec<_>>() })
            }
            SchemaKind::Reference(name) => {
                json!({ "$ref": format!("{COMPONENT_REF_PREFIX}{name}") })
            }
        };
        if let Some(description) = &self.description {
            out["description"] = Value::from(description.clone());
        }
        if self.nullable {
            out["nullable"] = Value::Bool(true);
        }
        out
    }
}

fn object_to_json(object: &ObjectSchema) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::from("object"));
    if !object.properties.is_empty() {
        let props = object
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<Map<_, _>>();
        map.insert("properties".into(), Value::Object(props));
    }
    if !object.required.is_empty() {
        map.insert(
            "required".into(),
            Value::Array(object.required.iter().cloned().map(Value::from).collect()),
        );
    }
    if let Some(additional) = &object.additional_properties {
        map.insert("additionalProperties".into(), additional.to_json());
    }
    if let Some(property_name) = &object.discriminator {
        map.insert("discriminator".into(), json!({ "propertyName": property_name }));
    }
    Value::Object(map)
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
