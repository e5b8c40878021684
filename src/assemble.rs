//! Document assembly: walks every body of a catalog with one registry and
//! renders the OpenAPI fragment (`paths` + `components.schemas`).
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::catalog::{Body, Catalog, Operation};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::naming::short_name;
use crate::registry::ComponentRegistry;
use crate::schema::Schema;
use crate::walker::{SchemaWalker, WalkerOptions};

pub const OPENAPI_VERSION: &str = "3.1.0";

/// How several bodies sharing one status and content type are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CombinationPolicy {
    /// `oneOf` over the distinct schemas (a single distinct schema is used as is).
    #[default]
    OneOf,
    /// A single reference to the sealed base when every body is a variant of
    /// the same base; `oneOf` otherwise.
    BaseReference,
}

/// One observed body, walked.
#[derive(Debug, Clone)]
struct Arm {
    schema: Schema,
    /// Short name of the sealed base when the body's type is a variant.
    base: Option<String>,
}

pub struct DocumentAssembler {
    registry: ComponentRegistry,
    options: WalkerOptions,
    policy: CombinationPolicy,
    paths: IndexMap<String, Map<String, Value>>,
}

impl DocumentAssembler {
    pub fn new(options: WalkerOptions, policy: CombinationPolicy) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            options,
            policy,
            paths: IndexMap::new(),
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn add_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        for descriptor in &catalog.components {
            self.add_component(descriptor)?;
        }
        for operation in &catalog.operations {
            self.add_operation(operation)?;
        }
        Ok(())
    }

    /// Register `descriptor` under its short name.
    pub fn add_component(&mut self, descriptor: &Descriptor) -> Result<Schema> {
        self.walker().schema_for_named(descriptor)
    }

    pub fn add_operation(&mut self, op: &Operation) -> Result<()> {
        debug!(path = %op.path, method = op.method.as_str(), "assembling operation");
        let mut operation = Map::new();
        if let Some(summary) = &op.summary {
            operation.insert("summary".into(), Value::from(summary.clone()));
        }
        if let Some(description) = &op.description {
            operation.insert("description".into(), Value::from(description.clone()));
        }
        if let Some(operation_id) = &op.operation_id {
            operation.insert("operationId".into(), Value::from(operation_id.clone()));
        }
        if !op.requests.is_empty() {
            if op.method.accepts_body() {
                let request_body = self.request_body(&op.requests)?;
                operation.insert("requestBody".into(), request_body);
            } else {
                warn!(path = %op.path, method = op.method.as_str(), "ignoring request bodies on a bodiless method");
            }
        }
        let responses = self.responses(&op.responses)?;
        operation.insert("responses".into(), responses);

        let item = self.paths.entry(op.path.clone()).or_default();
        if item.insert(op.method.as_str().into(), Value::Object(operation)).is_some() {
            warn!(path = %op.path, method = op.method.as_str(), "operation declared twice, keeping the last");
        }
        Ok(())
    }

    /// Finish the pass; the registry is dropped with the assembler.
    pub fn finish(self) -> Value {
        let paths = self
            .paths
            .into_iter()
            .map(|(path, item)| (path, Value::Object(item)))
            .collect::<Map<_, _>>();
        json!({
            "openapi": OPENAPI_VERSION,
            "paths": paths,
            "components": { "schemas": self.registry.to_json() }
        })
    }

    // ------------------------------------------------------------------ //

    fn walker(&mut self) -> SchemaWalker<'_> {
        SchemaWalker::with_options(&mut self.registry, self.options)
    }

    fn request_body(&mut self, bodies: &[Body]) -> Result<Value> {
        let mut groups: IndexMap<&str, Vec<&Body>> = IndexMap::new();
        for body in bodies {
            groups.entry(body.content_type()).or_default().push(body);
        }
        let mut content = Map::new();
        for (content_type, group) in groups {
            let media = self.media_type(&group)?;
            content.insert(content_type.to_owned(), media);
        }

        let mut request_body = json!({ "required": true, "content": content });
        let description = bodies
            .iter()
            .filter_map(|b| b.description.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        if !description.is_empty() {
            request_body["description"] = Value::from(description);
        }
        Ok(request_body)
    }

    fn responses(&mut self, bodies: &[Body]) -> Result<Value> {
        let mut groups: IndexMap<(u16, &str), Vec<&Body>> = IndexMap::new();
        for body in bodies {
            groups.entry((body.status(), body.content_type())).or_default().push(body);
        }
        let mut responses = Map::new();
        for ((status, content_type), group) in groups {
            let media = self.media_type(&group)?;
            let response = responses
                .entry(status.to_string())
                .or_insert_with(|| json!({ "description": "", "content": {} }));
            if response["description"] == "" {
                if let Some(description) = group.iter().find_map(|b| b.description.clone()) {
                    response["description"] = Value::from(description);
                }
            }
            response["content"][content_type] = media;
        }
        Ok(Value::Object(responses))
    }

    fn media_type(&mut self, group: &[&Body]) -> Result<Value> {
        let mut arms = Vec::with_capacity(group.len());
        for body in group {
            arms.push(self.arm(body)?);
        }
        let schema = combine(self.policy, arms);
        let mut media = json!({ "schema": schema.to_json() });

        match group {
            [single] => {
                if let Some(example) = &single.example {
                    media["example"] = example.clone();
                }
            }
            _ => {
                let mut examples = Map::new();
                for (i, body) in group.iter().enumerate() {
                    if let Some(example) = &body.example {
                        let label = body
                            .descriptor
                            .as_ref()
                            .map(|d| short_name(&d.serial_name))
                            .unwrap_or_else(|| "example".to_owned());
                        let key = if examples.contains_key(&label) { format!("{label}{i}") } else { label };
                        examples.insert(key, json!({ "value": example }));
                    }
                }
                if !examples.is_empty() {
                    media["examples"] = Value::Object(examples);
                }
            }
        }
        Ok(media)
    }

    fn arm(&mut self, body: &Body) -> Result<Arm> {
        let Some(descriptor) = &body.descriptor else {
            return Ok(Arm { schema: Schema::opaque(), base: None });
        };
        let schema = self.walker().schema_for(descriptor)?;
        let base = descriptor
            .declared_variant_of
            .as_deref()
            .filter(|_| descriptor.is_variant())
            .map(|base| short_name(&base.serial_name));
        Ok(Arm { schema, base })
    }
}

/// Structurally equal schemas count once, in first-seen order.
fn combine(policy: CombinationPolicy, arms: Vec<Arm>) -> Schema {
    let mut distinct: Vec<Arm> = Vec::new();
    for arm in arms {
        if !distinct.iter().any(|d| d.schema == arm.schema) {
            distinct.push(arm);
        }
    }
    if distinct.len() == 1 {
        if let Some(arm) = distinct.pop() {
            return arm.schema;
        }
    }
    if policy == CombinationPolicy::BaseReference {
        if let Some(base) = shared_base(&distinct) {
            return Schema::reference(base);
        }
    }
    Schema::one_of(distinct.into_iter().map(|arm| arm.schema).collect())
}

fn shared_base(arms: &[Arm]) -> Option<String> {
    let first = arms.first()?.base.clone()?;
    arms.iter()
        .all(|arm| arm.base.as_deref() == Some(first.as_str()))
        .then_some(first)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
