//! Descriptor walker: recursive descriptor → schema synthesis.
//!
//! Leaf kinds map straight onto JSON Schema types, containers recurse into
//! their child descriptors, and sealed hierarchies are emitted as named
//! components:
//!
//! - the declaring base becomes an object carrying the discriminator
//!   property plus its own elements, and is referenced by `$ref`;
//! - each variant becomes `allOf: [$ref base, { local properties }]`.
//!
//! Named types are deduplicated through the [`ComponentRegistry`]: the name
//! is claimed before the walker descends into the type's elements, so a
//! second encounter (including a recursive one) yields a reference.
use tracing::{debug, trace, warn};

use crate::descriptor::{Descriptor, Element, Kind, PrimitiveKind};
use crate::error::{Error, Result};
use crate::naming::{canonical_serial_name, short_name};
use crate::registry::ComponentRegistry;
use crate::schema::{ObjectSchema, Schema};

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkerOptions {
    /// Register plain (non-polymorphic) objects as components too.
    pub register_objects: bool,
    /// Fail with [`Error::UnresolvableDescriptor`] instead of degrading to
    /// an opaque object.
    pub strict: bool,
}

pub struct SchemaWalker<'r> {
    registry: &'r mut ComponentRegistry,
    options: WalkerOptions,
}

impl<'r> SchemaWalker<'r> {
    pub fn new(registry: &'r mut ComponentRegistry) -> Self {
        Self::with_options(registry, WalkerOptions::default())
    }

    pub fn with_options(registry: &'r mut ComponentRegistry, options: WalkerOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &*self.registry
    }

    /// Schema for one usage of `descriptor`. Nullability is applied here, on
    /// the returned value, never on a registered definition.
    pub fn schema_for(&mut self, descriptor: &Descriptor) -> Result<Schema> {
        let schema = self.dispatch(descriptor)?;
        Ok(usage_site(schema, descriptor))
    }

    /// Like [`Self::schema_for`], but registers objects, enums and sealed
    /// types under their short name and returns a reference. Other kinds
    /// have no name of their own (a list is named after its collection
    /// class) and stay inline.
    pub fn schema_for_named(&mut self, descriptor: &Descriptor) -> Result<Schema> {
        let schema = match descriptor.kind {
            _ if descriptor.is_variant() => self.dispatch(descriptor)?,
            Kind::PolymorphicSealed => self.dispatch(descriptor)?,
            Kind::Object | Kind::Enum => self.named(descriptor, |w| w.inline(descriptor))?,
            _ => {
                debug!(serial_name = %descriptor.serial_name, kind = ?descriptor.kind, "kind is not nameable, inlining");
                self.dispatch(descriptor)?
            }
        };
        Ok(usage_site(schema, descriptor))
    }

    // ------------------------------------------------------------------ //

    fn dispatch(&mut self, d: &Descriptor) -> Result<Schema> {
        if let Some(base) = d.declared_variant_of.as_deref() {
            if d.is_variant() {
                return self.variant(d, base);
            }
        }
        match d.kind {
            Kind::Object if self.options.register_objects => self.named(d, |w| w.object(d)),
            _ => self.inline(d),
        }
    }

    fn inline(&mut self, d: &Descriptor) -> Result<Schema> {
        trace!(serial_name = %d.serial_name, kind = ?d.kind, "walking descriptor");
        match d.kind {
            Kind::Primitive(kind) => Ok(primitive(kind)),
            Kind::Enum => Ok(Schema::string_enum(
                d.elements.iter().map(|e| e.name.clone()).collect(),
            )),
            Kind::List => match d.element_descriptor(0) {
                Some(item) => Ok(Schema::array(self.schema_for(item)?)),
                None => {
                    debug!(serial_name = %d.serial_name, "list without element descriptor");
                    Ok(Schema::any_array())
                }
            },
            Kind::Map => {
                // keys are string-like in JSON; only the value type is modeled
                let values = match d.element_descriptor(1) {
                    Some(value) => self.schema_for(value)?,
                    None => Schema::string(),
                };
                Ok(Schema::map_of(values))
            }
            Kind::Contextual => {
                debug!(serial_name = %d.serial_name, "contextual descriptor, emitting opaque object");
                self.degrade(&d.serial_name, "contextual serializer has no static type")
            }
            Kind::PolymorphicOpen => {
                warn!(serial_name = %d.serial_name, "open polymorphism has no discriminator contract");
                self.degrade(&d.serial_name, "open polymorphic hierarchy")
            }
            Kind::Object => self.object(d),
            Kind::PolymorphicSealed => self.sealed_base(d),
        }
    }

    fn object(&mut self, d: &Descriptor) -> Result<Schema> {
        let mut object = ObjectSchema::default();
        for element in &d.elements {
            let schema = self.element(d, element)?;
            object.insert(&element.name, schema, !element.is_optional);
        }
        Ok(Schema::object(object))
    }

    fn sealed_base(&mut self, d: &Descriptor) -> Result<Schema> {
        let discriminator = d
            .discriminator_property_name
            .as_deref()
            .ok_or_else(|| Error::MissingDiscriminator { serial_name: d.serial_name.clone() })?;
        self.named(d, |w| {
            let mut object = ObjectSchema {
                discriminator: Some(discriminator.to_owned()),
                ..ObjectSchema::default()
            };
            object.insert(discriminator, Schema::string(), true);
            for element in &d.elements {
                let schema = w.element(d, element)?;
                object.insert(&element.name, schema, !element.is_optional);
            }
            Ok(Schema::object(object))
        })
    }

    fn variant(&mut self, d: &Descriptor, base: &Descriptor) -> Result<Schema> {
        let discriminator = base
            .discriminator_property_name
            .as_deref()
            .ok_or_else(|| Error::MissingDiscriminator { serial_name: base.serial_name.clone() })?;
        let variant_name = short_name(&d.serial_name);
        self.named(d, |w| {
            let base_ref = w.sealed_base(base)?;

            let mut local = ObjectSchema::default();
            for element in &d.elements {
                let schema = w.element(d, element)?;
                let inherited = if element.name == discriminator {
                    Some(Schema::string())
                } else {
                    match base.elements.iter().find(|b| b.name == element.name) {
                        // named types in the base resolve to references, so this
                        // holds while the base itself is only reserved
                        Some(declared) => Some(w.element(base, declared)?),
                        None => None,
                    }
                };
                let Some(inherited) = inherited else {
                    local.insert(&element.name, schema, !element.is_optional);
                    continue;
                };
                if inherited != schema {
                    return Err(Error::ConflictingVariantProperty {
                        variant: canonical_serial_name(&d.serial_name).to_owned(),
                        property: element.name.clone(),
                    });
                }
            }

            Ok(Schema::composed(vec![base_ref, Schema::object(local)]).with_description(format!(
                "A representation of a `{variant_name}`. Note that `{variant_name}` will be used as the discriminating value."
            )))
        })
    }

    /// Dedup gate for every registrable type: an owned name short-circuits
    /// to a reference before any element is visited.
    fn named<F>(&mut self, d: &Descriptor, body: F) -> Result<Schema>
    where
        F: FnOnce(&mut Self) -> Result<Schema>,
    {
        let name = short_name(&d.serial_name);
        let serial_name = canonical_serial_name(&d.serial_name);
        if let Some(owner) = self.registry.owner(&name) {
            if owner != serial_name {
                return Err(Error::AmbiguousComponentName {
                    name,
                    existing: owner.to_owned(),
                    incoming: serial_name.to_owned(),
                });
            }
            trace!(component = %name, "component already known");
            return Ok(Schema::reference(name));
        }
        self.registry.reserve(&name, serial_name)?;
        match body(self) {
            Ok(schema) => self.registry.register(name, serial_name, schema),
            Err(error) => {
                self.registry.release(&name);
                Err(error)
            }
        }
    }

    fn element(&mut self, owner: &Descriptor, element: &Element) -> Result<Schema> {
        match &element.descriptor {
            Some(child) => self.schema_for(child),
            None => {
                warn!(serial_name = %owner.serial_name, element = %element.name, "element has no descriptor");
                self.degrade(&owner.serial_name, "element has no descriptor")
            }
        }
    }

    fn degrade(&self, serial_name: &str, reason: &'static str) -> Result<Schema> {
        if self.options.strict {
            return Err(Error::UnresolvableDescriptor { serial_name: serial_name.to_owned(), reason });
        }
        Ok(Schema::opaque())
    }
}

fn primitive(kind: PrimitiveKind) -> Schema {
    match kind {
        PrimitiveKind::Boolean => Schema::boolean(),
        PrimitiveKind::Integer => Schema::integer(),
        PrimitiveKind::Float => Schema::number(),
        PrimitiveKind::String => Schema::string(),
    }
}

fn usage_site(schema: Schema, d: &Descriptor) -> Schema {
    if d.is_nullable {
        schema.with_nullable(true)
    } else {
        schema
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SKILLS: [&str; 4] = ["CLUELESS", "LAZY", "ADVENTUROUS", "AGGRESSIVE"];

    fn pet() -> Descriptor {
        Descriptor::sealed_base("example.Pet", "petType", vec![Element::required("name", Descriptor::string())])
    }

    fn cat() -> Descriptor {
        Descriptor::variant(
            "example.Cat",
            pet(),
            vec![
                Element::required("name", Descriptor::string()),
                Element::required("huntingSkill", Descriptor::enumeration("example.HuntingSkill", SKILLS)),
            ],
        )
    }

    fn dog() -> Descriptor {
        Descriptor::variant(
            "example.Dog",
            pet(),
            vec![
                Element::required("name", Descriptor::string()),
                Element::required("packSize", Descriptor::int()),
            ],
        )
    }

    fn walk(d: &Descriptor) -> (Result<Schema>, ComponentRegistry) {
        let mut registry = ComponentRegistry::new();
        let schema = SchemaWalker::new(&mut registry).schema_for(d);
        (schema, registry)
    }

    #[test]
    fn primitives_map_directly() {
        let mut registry = ComponentRegistry::new();
        let mut walker = SchemaWalker::new(&mut registry);
        assert_eq!(walker.schema_for(&Descriptor::boolean()).unwrap(), Schema::boolean());
        assert_eq!(walker.schema_for(&Descriptor::int()).unwrap(), Schema::integer());
        assert_eq!(walker.schema_for(&Descriptor::double()).unwrap(), Schema::number());
        assert_eq!(walker.schema_for(&Descriptor::string()).unwrap(), Schema::string());
        assert!(registry.is_empty());
    }

    #[test]
    fn containers() {
        let (list, _) = walk(&Descriptor::list(Descriptor::string()));
        assert_eq!(list.unwrap(), Schema::array(Schema::string()));

        let (map, _) = walk(&Descriptor::map(Descriptor::string(), Descriptor::int()));
        assert_eq!(map.unwrap(), Schema::map_of(Schema::integer()));

        let keys_only = Descriptor {
            elements: vec![Element::required("0", Descriptor::string())],
            ..Descriptor::new(Kind::Map, "kotlin.collections.HashMap")
        };
        assert_eq!(walk(&keys_only).0.unwrap(), Schema::map_of(Schema::string()));

        let bare_list = Descriptor::new(Kind::List, "kotlin.collections.ArrayList");
        assert_eq!(walk(&bare_list).0.unwrap(), Schema::any_array());
    }

    #[test]
    fn enum_order_is_preserved() {
        let (schema, _) = walk(&Descriptor::enumeration("example.HuntingSkill", SKILLS));
        assert_eq!(
            schema.unwrap(),
            Schema::string_enum(SKILLS.iter().map(|s| s.to_string()).collect())
        );
        let (empty, _) = walk(&Descriptor::enumeration("example.Nothing", Vec::<String>::new()));
        assert_eq!(empty.unwrap(), Schema::string_enum(Vec::new()));
    }

    #[test]
    fn plain_objects_stay_inline() {
        let person = Descriptor::object(
            "example.Person",
            vec![
                Element::required("name", Descriptor::string()),
                Element::optional("age", Descriptor::int()),
            ],
        );
        let (schema, registry) = walk(&person);
        assert_eq!(
            schema.unwrap().to_json(),
            json!({
                "type": "object",
                "properties": { "name": { "type": "string" }, "age": { "type": "integer" } },
                "required": ["name"]
            })
        );
        assert!(registry.is_empty());

        let (empty, _) = walk(&Descriptor::object("example.Empty", Vec::new()));
        assert_eq!(empty.unwrap(), Schema::opaque());
    }

    #[test]
    fn cat_is_all_of_base_and_local_properties() {
        let (schema, registry) = walk(&cat());
        assert_eq!(schema.unwrap(), Schema::reference("Cat"));

        assert_eq!(
            registry.get("Cat").unwrap().to_json(),
            json!({
                "allOf": [
                    { "$ref": "#/components/schemas/Pet" },
                    {
                        "type": "object",
                        "properties": {
                            "huntingSkill": { "type": "string", "enum": SKILLS }
                        },
                        "required": ["huntingSkill"]
                    }
                ],
                "description": "A representation of a `Cat`. Note that `Cat` will be used as the discriminating value."
            })
        );
        assert_eq!(
            registry.get("Pet").unwrap().to_json(),
            json!({
                "type": "object",
                "properties": { "petType": { "type": "string" }, "name": { "type": "string" } },
                "required": ["petType", "name"],
                "discriminator": { "propertyName": "petType" }
            })
        );
        let names: Vec<_> = registry.snapshot().into_keys().collect();
        assert_eq!(names, ["Pet", "Cat"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        let mut walker = SchemaWalker::new(&mut registry);
        let first = walker.schema_for(&dog()).unwrap();
        let second = walker.schema_for(&dog()).unwrap();
        let cat = walker.schema_for(&cat()).unwrap();
        assert_eq!(first, Schema::reference("Dog"));
        assert_eq!(first, second);
        assert_eq!(cat, Schema::reference("Cat"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn nullability_lives_on_the_usage_site() {
        let owner = Descriptor::object(
            "example.Owner",
            vec![
                Element::required("pet", pet()),
                Element::required("previousPet", pet().nullable()),
            ],
        );
        let (schema, registry) = walk(&owner);
        let schema = schema.unwrap();
        let object = schema.as_object().unwrap();
        assert_eq!(object.properties["pet"], Schema::reference("Pet"));
        assert_eq!(object.properties["previousPet"], Schema::reference("Pet").with_nullable(true));
        assert_eq!(registry.len(), 1);
        assert!(!registry.get("Pet").unwrap().nullable);
    }

    #[test]
    fn short_name_collision_is_an_error() {
        let mut registry = ComponentRegistry::new();
        let mut walker = SchemaWalker::new(&mut registry);
        walker.schema_for(&pet()).unwrap();
        let other = Descriptor::sealed_base("zoo.Pet", "kind", Vec::new());
        assert_eq!(
            walker.schema_for(&other).unwrap_err(),
            Error::AmbiguousComponentName {
                name: "Pet".into(),
                existing: "example.Pet".into(),
                incoming: "zoo.Pet".into(),
            }
        );
    }

    #[test]
    fn sealed_without_discriminator_fails() {
        let broken = Descriptor::new(Kind::PolymorphicSealed, "example.Shape");
        assert_eq!(
            walk(&broken).0.unwrap_err(),
            Error::MissingDiscriminator { serial_name: "example.Shape".into() }
        );

        let orphan = Descriptor::variant("example.Circle", broken, Vec::new());
        assert!(matches!(walk(&orphan).0, Err(Error::MissingDiscriminator { .. })));
    }

    #[test]
    fn variant_redeclaring_base_property_with_other_type_fails() {
        let odd = Descriptor::variant("example.Fish", pet(), vec![Element::required("name", Descriptor::int())]);
        let mut registry = ComponentRegistry::new();
        let mut walker = SchemaWalker::new(&mut registry);
        walker.schema_for(&pet()).unwrap();
        assert_eq!(
            walker.schema_for(&odd).unwrap_err(),
            Error::ConflictingVariantProperty { variant: "example.Fish".into(), property: "name".into() }
        );
    }

    #[test]
    fn conflict_is_caught_while_base_is_still_reserved() {
        // Pet { name: String, favourite: Fish }, Fish : Pet { name: Int }
        let fish = Descriptor::variant("example.Fish", pet(), vec![Element::required("name", Descriptor::int())]);
        let pet_with_fish = Descriptor::sealed_base(
            "example.Pet",
            "petType",
            vec![
                Element::required("name", Descriptor::string()),
                Element::required("favourite", fish),
            ],
        );
        let (schema, registry) = walk(&pet_with_fish);
        assert_eq!(
            schema.unwrap_err(),
            Error::ConflictingVariantProperty { variant: "example.Fish".into(), property: "name".into() }
        );
        assert!(!registry.has("Pet"));
        assert!(!registry.has("Fish"));
    }

    #[test]
    fn variant_retyping_the_discriminator_fails() {
        let odd = Descriptor::variant("example.Bird", pet(), vec![Element::required("petType", Descriptor::int())]);
        assert_eq!(
            walk(&odd).0.unwrap_err(),
            Error::ConflictingVariantProperty { variant: "example.Bird".into(), property: "petType".into() }
        );
    }

    #[test]
    fn failed_walk_releases_its_name() {
        let pet = Descriptor::sealed_base(
            "example.Pet",
            "petType",
            vec![Element::required("born", Descriptor::contextual("java.time.Instant"))],
        );
        let mut registry = ComponentRegistry::new();
        let options = WalkerOptions { strict: true, ..WalkerOptions::default() };
        let mut walker = SchemaWalker::with_options(&mut registry, options);
        for _ in 0..2 {
            assert!(matches!(
                walker.schema_for(&pet),
                Err(Error::UnresolvableDescriptor { ref serial_name, .. }) if serial_name == "java.time.Instant"
            ));
        }
        assert!(!registry.has("Pet"));
        assert!(registry.is_empty());
    }

    #[test]
    fn failed_variant_rolls_back_its_base() {
        let bad_cat = Descriptor::variant(
            "example.Cat",
            pet(),
            vec![Element::required("born", Descriptor::contextual("java.time.Instant"))],
        );
        let mut registry = ComponentRegistry::new();
        let options = WalkerOptions { strict: true, ..WalkerOptions::default() };
        let mut walker = SchemaWalker::with_options(&mut registry, options);
        assert!(walker.schema_for(&bad_cat).is_err());
        assert_eq!(walker.schema_for(&dog()).unwrap(), Schema::reference("Dog"));
        let names: Vec<_> = registry.snapshot().into_keys().collect();
        assert_eq!(names, ["Pet", "Dog"]);
        assert!(!registry.has("Cat"));
    }

    #[test]
    fn named_collections_stay_inline() {
        let mut registry = ComponentRegistry::new();
        let mut walker = SchemaWalker::new(&mut registry);
        let strings = Descriptor::list(Descriptor::string());
        let ints = Descriptor::list(Descriptor::int());
        assert_eq!(walker.schema_for_named(&strings).unwrap(), Schema::array(Schema::string()));
        assert_eq!(walker.schema_for_named(&ints).unwrap(), Schema::array(Schema::integer()));
        assert_eq!(walker.schema_for_named(&Descriptor::int()).unwrap(), Schema::integer());
        assert!(registry.is_empty());
    }

    #[test]
    fn self_recursive_hierarchy_terminates() {
        // Node = Leaf | Branch(children: List<Node>)
        let node = Descriptor::sealed_base("example.Node", "type", Vec::new());
        let branch = Descriptor::variant(
            "example.Branch",
            node.clone(),
            vec![Element::required("children", Descriptor::list(node.clone()))],
        );
        let (schema, registry) = walk(&branch);
        assert_eq!(schema.unwrap(), Schema::reference("Branch"));
        let local = &registry.get("Branch").unwrap().to_json()["allOf"][1];
        assert_eq!(local["properties"]["children"]["items"], json!({ "$ref": "#/components/schemas/Node" }));
    }

    #[test]
    fn registered_objects_break_cycles() {
        let mut tree = Descriptor::object("example.Tree", Vec::new());
        tree.elements.push(Element::optional("left", Descriptor::object("example.Tree", Vec::new())));
        let mut registry = ComponentRegistry::new();
        let options = WalkerOptions { register_objects: true, ..WalkerOptions::default() };
        let schema = SchemaWalker::with_options(&mut registry, options).schema_for(&tree).unwrap();
        assert_eq!(schema, Schema::reference("Tree"));
        assert_eq!(
            registry.get("Tree").unwrap().to_json(),
            json!({ "type": "object", "properties": { "left": { "$ref": "#/components/schemas/Tree" } } })
        );
    }

    #[test]
    fn named_request_registers_plain_types() {
        let mut registry = ComponentRegistry::new();
        let mut walker = SchemaWalker::new(&mut registry);
        let skill = Descriptor::enumeration("example.HuntingSkill", SKILLS).nullable();
        let schema = walker.schema_for_named(&skill).unwrap();
        assert_eq!(schema, Schema::reference("HuntingSkill").with_nullable(true));
        assert_eq!(walker.schema_for_named(&pet()).unwrap(), Schema::reference("Pet"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn contextual_and_open_degrade_unless_strict() {
        let instant = Descriptor::contextual("java.time.Instant");
        assert_eq!(walk(&instant).0.unwrap(), Schema::opaque());
        let open = Descriptor::new(Kind::PolymorphicOpen, "kotlin.Any");
        assert_eq!(walk(&open).0.unwrap(), Schema::opaque());

        let mut registry = ComponentRegistry::new();
        let options = WalkerOptions { strict: true, ..WalkerOptions::default() };
        let mut walker = SchemaWalker::with_options(&mut registry, options);
        assert!(matches!(
            walker.schema_for(&instant),
            Err(Error::UnresolvableDescriptor { .. })
        ));
    }
}
