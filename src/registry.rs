//! Component registry shared by one document-generation pass.
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::naming::canonical_serial_name;
use crate::schema::Schema;

/// Name → schema map with a per-name owner (the serial name that produced
/// it). A name may only ever be owned by one serial name; re-registering
/// under the same owner replaces the body in place.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    schemas: IndexMap<String, Schema>,
    owners: IndexMap<String, String>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for `serial_name` before its body exists, so recursive
    /// occurrences resolve to a reference instead of descending again.
    pub fn reserve(&mut self, name: &str, serial_name: &str) -> Result<()> {
        self.claim(name, serial_name)
    }

    /// Store `schema` under `name` and return a reference to it.
    pub fn register(&mut self, name: impl Into<String>, serial_name: &str, schema: Schema) -> Result<Schema> {
        let name = name.into();
        self.claim(&name, serial_name)?;
        debug!(component = %name, serial_name, "registered component schema");
        self.schemas.insert(name.clone(), schema);
        Ok(Schema::reference(name))
    }

    /// Undo a reservation whose body was never stored, together with every
    /// name claimed after it. Those were claimed while walking the failed
    /// body and may hold references to it.
    pub fn release(&mut self, name: &str) {
        if self.schemas.contains_key(name) {
            return;
        }
        let Some(index) = self.owners.get_index_of(name) else { return };
        for (dropped, _) in self.owners.drain(index..) {
            self.schemas.shift_remove(&dropped);
        }
        debug!(component = %name, "released reservation");
    }

    /// True for registered and reserved names alike.
    pub fn has(&self, name: &str) -> bool {
        self.owners.contains_key(name)
    }

    /// Serial name that owns `name`.
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.owners.get(name).map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered components in registration order. Reserved names that
    /// never received a body are not included.
    pub fn snapshot(&self) -> IndexMap<String, Schema> {
        self.schemas.clone()
    }

    /// `components.schemas` as JSON.
    pub fn to_json(&self) -> Value {
        let map = self
            .schemas
            .iter()
            .map(|(name, schema)| (name.clone(), schema.to_json()))
            .collect::<Map<_, _>>();
        Value::Object(map)
    }

    fn claim(&mut self, name: &str, serial_name: &str) -> Result<()> {
        let serial_name = canonical_serial_name(serial_name);
        match self.owners.get(name) {
            Some(existing) if existing != serial_name => Err(Error::AmbiguousComponentName {
                name: name.to_owned(),
                existing: existing.clone(),
                incoming: serial_name.to_owned(),
            }),
            Some(_) => Ok(()),
            None => {
                self.owners.insert(name.to_owned(), serial_name.to_owned());
                Ok(())
            }
        }
    }
}
