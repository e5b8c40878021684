//! Failure modes of a schema-synthesis pass.
use thiserror::Error;

/// Errors raised while walking descriptors into schemas.
///
/// Everything except [`Error::UnresolvableDescriptor`] aborts the whole
/// document-generation pass; the unresolvable case is only returned when the
/// walker runs in strict mode and otherwise degrades to an opaque object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("cannot resolve descriptor `{serial_name}`: {reason}")]
    UnresolvableDescriptor {
        serial_name: String,
        reason: &'static str,
    },

    #[error("component name `{name}` is claimed by both `{existing}` and `{incoming}`")]
    AmbiguousComponentName {
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("polymorphic base `{serial_name}` declares no discriminator property")]
    MissingDiscriminator { serial_name: String },

    #[error("variant `{variant}` redeclares base property `{property}` with a different schema")]
    ConflictingVariantProperty { variant: String, property: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
