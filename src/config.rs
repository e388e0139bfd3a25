//! Tool Configuration
//!
//! Settings come from a TOML file shared with the rest of the project tools:
//!
//! ```toml
//! project_path = "D:/Project"
//!
//! [shader_compiler]
//! shader_suffix = ".shader"
//! vs_entry = "vert"
//! ps_entry = "frag"
//! ```
//!
//! Every key of `[shader_compiler]` is optional. Directory names are
//! resolved against `project_path`:
//!
//! | Path          | Resolved as                          |
//! |---------------|--------------------------------------|
//! | asset root    | `project_path / assets_dir`          |
//! | shader tree   | `project_path / assets_dir / shader_dir` |
//! | pack file     | `project_path / assets_dir / pack_file`  |

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{PackError, Result};

/// Default name of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Root of the project that owns the asset tree.
    pub project_path: PathBuf,

    #[serde(default)]
    pub shader_compiler: ShaderCompilerConfig,
}

/// The `[shader_compiler]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShaderCompilerConfig {
    /// Only files whose name ends with this suffix are compiled.
    pub shader_suffix: String,
    /// Vertex stage entry point.
    pub vs_entry: String,
    /// Fragment stage entry point.
    pub ps_entry: String,
    pub assets_dir: PathBuf,
    pub shader_dir: PathBuf,
    pub pack_file: PathBuf,
    /// Compiler executable.
    pub compiler: PathBuf,
    /// Scratch directory for transient sources; the OS temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for ShaderCompilerConfig {
    fn default() -> Self {
        Self {
            shader_suffix: ".shader".to_string(),
            vs_entry: "vert".to_string(),
            ps_entry: "frag".to_string(),
            assets_dir: PathBuf::from("assets"),
            shader_dir: PathBuf::from("shaders"),
            pack_file: PathBuf::from("shaders.pack"),
            compiler: PathBuf::from("glslang"),
            temp_dir: None,
        }
    }
}

impl ToolConfig {
    /// Creates a configuration with default compiler settings.
    #[must_use]
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            shader_compiler: ShaderCompilerConfig::default(),
        }
    }

    /// Parses a configuration document. `origin` is only used for errors.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| PackError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Reads and parses a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PackError::io(path, e))?;
        Self::from_toml(&text, path)
    }

    /// The asset root; also the `#include` search root.
    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.project_path.join(&self.shader_compiler.assets_dir)
    }

    /// The directory scanned for shaders.
    #[must_use]
    pub fn shader_dir(&self) -> PathBuf {
        self.assets_dir().join(&self.shader_compiler.shader_dir)
    }

    /// The pack file written by a successful run.
    #[must_use]
    pub fn pack_path(&self) -> PathBuf {
        self.assets_dir().join(&self.shader_compiler.pack_file)
    }

    /// The directory for transient preprocessed sources.
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.shader_compiler
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
