#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod codegen;
pub mod config;
pub mod errors;
pub mod export;
pub mod mesh;
pub mod reader;
pub mod registry;
pub mod scene;
pub mod shading;
pub mod writer;

pub use codegen::ConstantTable;
pub use config::{CodegenOptions, ExportOptions, ShaderBackend};
pub use errors::{ExportError, Result};
pub use export::{Export, ExportReport, ExportSession, Exporter, NullShaderCompiler, ShaderCompiler, export};
pub use registry::{EntityId, EntityKind, EntityRegistry};
pub use scene::{ObjectDesc, ObjectKind, SceneDesc, SceneDocument, SceneGraph};
pub use shading::Shading;
pub use writer::write_file;
