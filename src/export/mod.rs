//! Scene Export
//!
//! Drives one export end to end:
//!
//! 1. Discovery: an [`ExportSession`] walks every scene and registers each
//!    entity with its payload
//! 2. Shader stages: every registered shading is handed to a [`ShaderCompiler`]
//! 3. Writing: the binary file is produced in two passes by [`write_file`]
//! 4. Codegen: Rust and C++ constant listings are rendered from the final ids
//!
//! Any error aborts the export; nothing written so far is usable.
//!
//! # Example
//!
//! ```rust,ignore
//! use gx3d::{ExportOptions, Exporter, SceneDocument};
//!
//! let document = SceneDocument::load("level.json")?;
//! let mut exporter = Exporter::new(ExportOptions::default())?;
//! let report = exporter.export_to_path(&document, "level.gx3d")?;
//! println!("{} bytes", report.total_size);
//! ```

mod session;
mod shader;
mod textures;

pub use session::ExportSession;
pub use shader::{
    ENGINE_SDK_VAR, GlslangShaderCompiler, NullShaderCompiler, STAGES, ShaderCompiler,
    VULKAN_SDK_VAR, compiler_for,
};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::codegen::ConstantTable;
use crate::config::ExportOptions;
use crate::errors::{ExportError, Result};
use crate::registry::{EntityKind, EntityRegistry};
use crate::scene::SceneGraph;
use crate::writer::{WriteSummary, write_file};

/// What an export produced, suitable for logging or JSON output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Entity count per kind label. Instances are not entities.
    pub entities: BTreeMap<&'static str, usize>,
    pub instances: usize,
    pub tables_offset: u64,
    pub total_size: u64,
    /// Files written next to the binary output.
    pub listings: Vec<PathBuf>,
}

impl ExportReport {
    fn new(registry: &EntityRegistry, summary: WriteSummary) -> Self {
        Self {
            entities: EntityKind::ALL
                .iter()
                .map(|&kind| (kind.label(), registry.count(kind)))
                .collect(),
            instances: registry.instances().len(),
            tables_offset: summary.tables_offset,
            total_size: summary.total_size,
            listings: Vec::new(),
        }
    }
}

/// Everything produced by [`Exporter::export`].
#[derive(Debug)]
pub struct Export<W> {
    /// The sink, positioned at the end of the file.
    pub sink: W,
    pub registry: EntityRegistry,
    pub constants: ConstantTable,
    pub rust_listing: Option<String>,
    pub cpp_listing: Option<String>,
    pub report: ExportReport,
}

/// Export front end holding options and the shader stage compiler.
pub struct Exporter {
    options: ExportOptions,
    compiler: Box<dyn ShaderCompiler>,
}

impl Exporter {
    /// Creates an exporter with the compiler selected by `options.shader_backend`.
    pub fn new(options: ExportOptions) -> Result<Self> {
        let compiler = compiler_for(options.shader_backend)?;
        Ok(Self { options, compiler })
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: Box<dyn ShaderCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    #[must_use]
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Exports `graph` into `sink`. `source_name` is quoted in the listings.
    pub fn export<G, W>(&mut self, graph: &G, sink: W, source_name: &str) -> Result<Export<W>>
    where
        G: SceneGraph,
        W: Write + Seek,
    {
        let mut session = ExportSession::new(graph, &self.options);
        session.discover()?;
        session.compile_shaders(self.compiler.as_mut())?;
        let mut registry = session.into_registry();

        let (sink, summary) = write_file(&mut registry, sink)?;

        let codegen = &self.options.codegen;
        let constants = ConstantTable::from_registry(&registry);
        let rust_listing = if codegen.rust {
            Some(constants.render_rust(&codegen.rust_module, source_name)?)
        } else {
            None
        };
        let cpp_listing = if codegen.cpp {
            Some(constants.render_cpp(&codegen.cpp_namespace, source_name)?)
        } else {
            None
        };

        let report = ExportReport::new(&registry, summary);
        info!(
            "Exported {} entities and {} instances ({} bytes)",
            registry.len(),
            report.instances,
            report.total_size
        );

        Ok(Export {
            sink,
            registry,
            constants,
            rust_listing,
            cpp_listing,
            report,
        })
    }

    /// Exports into the file at `out`, with listings at `<out>.rs` and `<out>.hpp`.
    pub fn export_to_path<G: SceneGraph>(&mut self, graph: &G, out: impl AsRef<Path>) -> Result<ExportReport> {
        let out = out.as_ref();
        let source_name = out
            .file_name()
            .map_or_else(|| out.display().to_string(), |n| n.to_string_lossy().into_owned());

        let file = File::create(out).map_err(|source| ExportError::FileUnavailable {
            path: out.to_path_buf(),
            source,
        })?;
        let export = self.export(graph, BufWriter::new(file), &source_name)?;
        export
            .sink
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))?
            .sync_all()?;

        let mut report = export.report;
        for (listing, extension) in [(export.rust_listing, "rs"), (export.cpp_listing, "hpp")] {
            let Some(listing) = listing else { continue };
            let path = listing_path(out, extension);
            std::fs::write(&path, listing)?;
            info!("Wrote {}", path.display());
            report.listings.push(path);
        }
        Ok(report)
    }
}

/// `<out>.<extension>`, keeping the output's own extension.
fn listing_path(out: &Path, extension: &str) -> PathBuf {
    let mut path = out.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

/// Exports with a default [`Exporter`] built from `options`.
pub fn export<G, W>(graph: &G, sink: W, options: &ExportOptions) -> Result<Export<W>>
where
    G: SceneGraph,
    W: Write + Seek,
{
    Exporter::new(options.clone())?.export(graph, sink, "memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_path_keeps_extension() {
        assert_eq!(listing_path(Path::new("/out/level.gx3d"), "rs"), PathBuf::from("/out/level.gx3d.rs"));
        assert_eq!(listing_path(Path::new("level"), "hpp"), PathBuf::from("level.hpp"));
    }

    #[test]
    fn test_null_backend_exporter() {
        let exporter = Exporter::new(ExportOptions::default()).unwrap();
        assert!(!exporter.options().y_up);
    }
}
