//! Shader stage compilation hook.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::config::ShaderBackend;
use crate::errors::{ExportError, Result};
use crate::shading::Shading;

/// Engine SDK root, holding the shader sources.
pub const ENGINE_SDK_VAR: &str = "VULKUST_SDK";
/// Vulkan SDK root, holding `glslangValidator`.
pub const VULKAN_SDK_VAR: &str = "VULKAN_SDK";

/// Stages compiled for every shading, in body order.
pub const STAGES: [&str; 2] = ["vert", "frag"];

/// Produces the stage binaries embedded in a shader body.
pub trait ShaderCompiler {
    fn compile(&mut self, shading: &Shading) -> Result<Vec<Vec<u8>>>;
}

/// Embeds no stages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullShaderCompiler;

impl ShaderCompiler for NullShaderCompiler {
    fn compile(&mut self, _shading: &Shading) -> Result<Vec<Vec<u8>>> {
        Ok(Vec::new())
    }
}

/// Compiles `<shaders>/<file-stem>.<stage>` to SPIR-V with `glslangValidator`.
#[derive(Debug, Clone)]
pub struct GlslangShaderCompiler {
    shaders_dir: PathBuf,
    compiler: PathBuf,
    scratch_dir: PathBuf,
}

impl GlslangShaderCompiler {
    /// Locates sources and compiler through [`ENGINE_SDK_VAR`] and [`VULKAN_SDK_VAR`].
    pub fn from_env() -> Result<Self> {
        let engine = std::env::var_os(ENGINE_SDK_VAR)
            .ok_or_else(|| ExportError::MissingEnvironment(ENGINE_SDK_VAR.to_string()))?;
        let vulkan = std::env::var_os(VULKAN_SDK_VAR)
            .ok_or_else(|| ExportError::MissingEnvironment(VULKAN_SDK_VAR.to_string()))?;
        Ok(Self::with_paths(
            Path::new(&engine).join("vulkust/src/shaders/vulkan"),
            Path::new(&vulkan).join("bin/glslangValidator"),
        ))
    }

    pub fn with_paths(shaders_dir: impl Into<PathBuf>, compiler: impl Into<PathBuf>) -> Self {
        Self {
            shaders_dir: shaders_dir.into(),
            compiler: compiler.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    fn compile_stage(&self, stem: &str, stage: &str) -> Result<Vec<u8>> {
        let source = self.shaders_dir.join(format!("{stem}.{stage}"));
        let output = self
            .scratch_dir
            .join(format!("gx3d-{}-{stem}.{stage}.spv", std::process::id()));
        let tool = self.compiler.display().to_string();

        let status = Command::new(&self.compiler)
            .args(["-V", "-S", stage])
            .arg(&source)
            .arg("-o")
            .arg(&output)
            .status()
            .map_err(|e| ExportError::ToolFailed {
                tool: tool.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(ExportError::ToolFailed {
                tool,
                reason: format!("cannot compile {} ({status})", source.display()),
            });
        }

        let bytes = std::fs::read(&output).map_err(|source| ExportError::FileUnavailable {
            path: output.clone(),
            source,
        })?;
        // Scratch output is not needed past this point.
        let _ = std::fs::remove_file(&output);
        debug!("Compiled {} ({} bytes)", source.display(), bytes.len());
        Ok(bytes)
    }
}

impl ShaderCompiler for GlslangShaderCompiler {
    fn compile(&mut self, shading: &Shading) -> Result<Vec<Vec<u8>>> {
        let stem = shading.file_stem();
        STAGES.iter().map(|stage| self.compile_stage(&stem, stage)).collect()
    }
}

/// Compiler matching the configured backend.
pub fn compiler_for(backend: ShaderBackend) -> Result<Box<dyn ShaderCompiler>> {
    match backend {
        ShaderBackend::None => Ok(Box::new(NullShaderCompiler)),
        ShaderBackend::Vulkan => {
            let compiler = GlslangShaderCompiler::from_env()?;
            info!("Compiling shaders with {}", compiler.compiler.display());
            Ok(Box::new(compiler))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::Reserved;

    #[test]
    fn test_null_compiler_embeds_nothing() {
        let stages = NullShaderCompiler
            .compile(&Shading::Reserved(Reserved::WhitePos))
            .unwrap();
        assert!(stages.is_empty());
    }

    #[test]
    fn test_missing_tool_is_environment_error() {
        let mut compiler = GlslangShaderCompiler::with_paths("/nonexistent/shaders", "/nonexistent/glslangValidator");
        let err = compiler
            .compile(&Shading::Reserved(Reserved::WhitePos))
            .unwrap_err();
        assert!(matches!(err, ExportError::ToolFailed { .. }));
        assert!(!err.is_validation());
    }
}
