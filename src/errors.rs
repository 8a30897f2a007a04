//! Error Types
//!
//! This module defines the error types used throughout the exporter.
//!
//! # Overview
//!
//! The main error type [`ExportError`] falls into three groups:
//! - Validation errors: a named scene entity violates an export rule
//! - Environment errors: a required tool, variable or file is unavailable
//! - Format errors: configuration, JSON or template failures
//!
//! Every error is fatal. An export either completes both writer passes or the
//! partially written output must be discarded by the caller.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, ExportError>`.
//!
//! ```rust,ignore
//! use gx3d::errors::{ExportError, Result};
//!
//! fn export() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::EntityKind;

/// The main error type for the exporter.
#[derive(Error, Debug)]
pub enum ExportError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// A material's attribute combination cannot be classified.
    #[error("Invalid material '{material}': {reason}")]
    Shading {
        /// Material name
        material: String,
        /// What rule was violated
        reason: String,
    },

    /// A texture reference is malformed.
    #[error("Invalid texture '{texture}': {reason}")]
    Texture {
        /// Texture (or texture slot) name
        texture: String,
        /// What rule was violated
        reason: String,
    },

    /// Mesh data cannot be encoded.
    #[error("Invalid mesh in object '{object}': {reason}")]
    Mesh {
        /// Owning object name
        object: String,
        /// What rule was violated
        reason: String,
    },

    /// Model structure violates a hierarchy rule.
    #[error("Invalid model '{object}': {reason}")]
    Model {
        /// Object name
        object: String,
        /// What rule was violated
        reason: String,
    },

    /// A copied object does not satisfy the origin rules.
    #[error("Invalid instance '{object}': {reason}")]
    Instance {
        /// Instance object name
        object: String,
        /// What rule was violated
        reason: String,
    },

    /// An entity name does not follow the naming rules of its kind.
    #[error("Invalid name '{name}': {reason}")]
    Naming {
        /// Offending name
        name: String,
        /// What rule was violated
        reason: String,
    },

    /// A scene is incomplete.
    #[error("Invalid scene '{scene}': {reason}")]
    Scene {
        /// Scene name
        scene: String,
        /// What rule was violated
        reason: String,
    },

    /// Two distinct entities of a non-shared kind carry the same name.
    #[error("Duplicate {kind} entity '{name}'")]
    DuplicateEntity {
        /// Entity kind
        kind: EntityKind,
        /// Duplicated name
        name: String,
    },

    /// The same lookup key was registered with two different entity types.
    #[error("Key '{key}' is already registered as type {found}, requested as type {expected}")]
    KindMismatch {
        /// Lookup key (usually a resolved file path)
        key: String,
        /// Requested type discriminant
        expected: u64,
        /// Already registered type discriminant
        found: u64,
    },

    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// A required environment variable is not set.
    #[error("Environment variable '{0}' is not set")]
    MissingEnvironment(String),

    /// An external tool failed.
    #[error("Tool '{tool}' failed: {reason}")]
    ToolFailed {
        /// Tool executable
        tool: String,
        /// Failure description
        reason: String,
    },

    /// A referenced file could not be read.
    #[error("Cannot read '{}': {source}", path.display())]
    FileUnavailable {
        /// Resolved path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Output stream I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Format & Parsing Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Codegen template error.
    #[error("Template error: {0}")]
    Template(String),

    /// A writer contract was broken.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExportError {
    /// Returns true for errors caused by the exported content itself.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Shading { .. }
                | Self::Texture { .. }
                | Self::Mesh { .. }
                | Self::Model { .. }
                | Self::Instance { .. }
                | Self::Naming { .. }
                | Self::Scene { .. }
                | Self::DuplicateEntity { .. }
                | Self::KindMismatch { .. }
        )
    }

    pub(crate) fn shading(material: &str, reason: impl Into<String>) -> Self {
        Self::Shading {
            material: material.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn texture(texture: &str, reason: impl Into<String>) -> Self {
        Self::Texture {
            texture: texture.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mesh(object: &str, reason: impl Into<String>) -> Self {
        Self::Mesh {
            object: object.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn model(object: &str, reason: impl Into<String>) -> Self {
        Self::Model {
            object: object.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn instance(object: &str, reason: impl Into<String>) -> Self {
        Self::Instance {
            object: object.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn scene(scene: &str, reason: impl Into<String>) -> Self {
        Self::Scene {
            scene: scene.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<minijinja::Error> for ExportError {
    fn from(err: minijinja::Error) -> Self {
        ExportError::Template(err.to_string())
    }
}

impl From<toml::de::Error> for ExportError {
    fn from(err: toml::de::Error) -> Self {
        ExportError::Config(err.to_string())
    }
}

/// Alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;
