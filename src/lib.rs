//! Serialization descriptors → OpenAPI 3.1 / JSON Schema.
//!
//! The [`walker::SchemaWalker`] maps one descriptor to a [`schema::Schema`],
//! registering named components (sealed bases and their variants, optionally
//! plain objects) in a [`registry::ComponentRegistry`] that lives for one
//! document-generation pass. [`assemble::DocumentAssembler`] drives the
//! walker over an operation [`catalog::Catalog`] and renders the fragment.
pub mod assemble;
pub mod catalog;
pub mod cli;
pub mod descriptor;
pub mod error;
pub mod jq_exec;
pub mod naming;
pub mod path_de;
pub mod registry;
pub mod schema;
pub mod walker;

pub use assemble::{CombinationPolicy, DocumentAssembler};
pub use descriptor::{Descriptor, Element, Kind, PrimitiveKind};
pub use error::{Error, Result};
pub use registry::ComponentRegistry;
pub use schema::{ObjectSchema, Schema, SchemaKind};
pub use walker::{SchemaWalker, WalkerOptions};
