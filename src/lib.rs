#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Offline shader pack builder.
//!
//! Compiles every shader of an asset tree, for every macro variant its
//! metadata declares, into one pack file the engine loads at startup.

pub mod backend;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod meta;
pub mod pack;
pub mod variant;

pub use backend::{CompileRequest, CompilerBackend, GlslangBackend, Stage};
pub use compiler::{ShaderCompiler, ShaderUnit};
pub use config::{ShaderCompilerConfig, ToolConfig};
pub use errors::{BackendError, DeclarationError, PackError, Result};
pub use meta::{ShaderMeta, load_meta};
pub use pack::{PackAssembler, PackEntry, ShaderPack};
pub use variant::{MacroLine, PLACEHOLDER, Variant, expand};
