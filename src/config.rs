//! Export Options
//!
//! Options are plain serde structs; every field has a default so a TOML file
//! only needs to list what it changes.
//!
//! ```toml
//! y_up = true
//! enforce_name_prefixes = true
//! shader_backend = "vulkan"
//!
//! [codegen]
//! cpp = false
//! rust_module = "assets"
//! ```

use std::path::Path;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::errors::{ExportError, Result};

/// Backend used to compile shader stages embedded in shader bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderBackend {
    /// Shader bodies carry no stages.
    #[default]
    None,
    /// SPIR-V through `glslangValidator` from the Vulkan SDK.
    Vulkan,
}

/// Which constant listings to emit next to the binary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    pub rust: bool,
    pub cpp: bool,
    /// Outer Rust module name.
    pub rust_module: String,
    /// Outer C++ namespace.
    pub cpp_namespace: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            rust: true,
            cpp: true,
            rust_module: "gx3d".to_string(),
            cpp_namespace: "gx3d".to_string(),
        }
    }
}

/// Top-level exporter configuration.
///
/// # Fields
///
/// | Field                   | Description                                  | Default |
/// |-------------------------|----------------------------------------------|---------|
/// | `y_up`                  | Convert Z-up source space to Y-up            | `false` |
/// | `enforce_name_prefixes` | Require `camera-`, `model-`, ... name prefixes | `false` |
/// | `codegen`               | Constant listings to emit                    | both    |
/// | `shader_backend`        | Shader stage compiler                        | `None`  |
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub y_up: bool,
    pub enforce_name_prefixes: bool,
    pub codegen: CodegenOptions,
    pub shader_backend: ShaderBackend,
}

impl ExportOptions {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ExportError::FileUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Change of basis applied to every exported position and matrix.
    ///
    /// Z-up to Y-up is a -90° rotation about X: `(x, y, z) -> (x, z, -y)`.
    #[must_use]
    pub fn basis(&self) -> Mat4 {
        if self.y_up {
            Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2)
        } else {
            Mat4::IDENTITY
        }
    }
}
