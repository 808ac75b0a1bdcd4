//! Error types for entity metadata and configuration.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for metadata operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while registering or reading entity metadata.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(docmap::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Metadata was requested for a property the entity does not declare.
    #[error("entity `{entity}` does not declare property `{property}`")]
    #[diagnostic(
        code(docmap::schema::undeclared_property),
        help("the stored field key does not match the entity schema")
    )]
    UndeclaredProperty { entity: String, property: String },

    /// No entity with this class name has been registered.
    #[error("unknown entity `{name}`")]
    #[diagnostic(code(docmap::schema::unknown_entity))]
    UnknownEntity { name: String },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(docmap::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// A type name in metadata could not be resolved.
    #[error("unknown type `{type_name}` for `{entity}.{property}`")]
    #[diagnostic(code(docmap::schema::unknown_type))]
    UnknownType {
        entity: String,
        property: String,
        type_name: String,
    },

    /// Invalid annotation.
    #[error("invalid annotation `@{annotation}`: {message}")]
    #[diagnostic(code(docmap::schema::invalid_annotation))]
    InvalidAnnotation { annotation: String, message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(docmap::schema::config_error))]
    ConfigError { message: String },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(docmap::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },
}

impl SchemaError {
    /// Create an undeclared property error.
    pub fn undeclared_property(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UndeclaredProperty {
            entity: entity.into(),
            property: property.into(),
        }
    }

    /// Create an unknown entity error.
    pub fn unknown_entity(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an unknown type error.
    pub fn unknown_type(
        entity: impl Into<String>,
        property: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self::UnknownType {
            entity: entity.into(),
            property: property.into(),
            type_name: type_name.into(),
        }
    }

    /// Create an invalid annotation error.
    pub fn invalid_annotation(annotation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAnnotation {
            annotation: annotation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Check if this error is an undeclared property lookup.
    pub fn is_undeclared_property(&self) -> bool {
        matches!(self, Self::UndeclaredProperty { .. })
    }
}
