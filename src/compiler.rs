//! Compile Orchestration
//!
//! Drives a full run: discover shaders, load their metadata, expand
//! variants, compile every (shader, variant, stage) through a
//! [`CompilerBackend`], and hand the results to a [`PackAssembler`].
//!
//! The run is strictly sequential and fail-fast. The first error of any
//! kind stops the run and no pack is written.
//!
//! ```rust,ignore
//! use shaderpack::{ShaderCompiler, ToolConfig, GlslangBackend};
//!
//! let config = ToolConfig::load("config.toml".as_ref())?;
//! let backend = GlslangBackend::new(&config.shader_compiler.compiler);
//! let pack = ShaderCompiler::new(&config, backend).run()?;
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::backend::{CompileRequest, CompilerBackend, Stage};
use crate::config::ToolConfig;
use crate::errors::{BackendError, PackError, Result};
use crate::meta::load_meta;
use crate::pack::{PackAssembler, PackEntry, ShaderPack};
use crate::variant::{MacroLine, Variant, expand};

/// A shader source discovered under the shader directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderUnit {
    /// Absolute (or project-relative) path of the source file.
    pub path: PathBuf,
    /// Path relative to the asset root, `/`-separated. Used as the pack key.
    pub relative_path: String,
    /// Declared macro lines; empty without a sidecar.
    pub macro_lines: Vec<MacroLine>,
}

impl ShaderUnit {
    /// Expands the declared macro lines into variants.
    pub fn variants(&self) -> Result<Vec<Variant>> {
        expand(&self.macro_lines).map_err(|source| PackError::Declaration {
            shader: self.relative_path.clone(),
            source,
        })
    }
}

/// Runs the compile pipeline over one asset tree.
pub struct ShaderCompiler<B> {
    backend: B,
    assets_dir: PathBuf,
    shader_dir: PathBuf,
    pack_path: PathBuf,
    temp_dir: PathBuf,
    shader_suffix: String,
    vs_entry: String,
    ps_entry: String,
}

impl<B: CompilerBackend> ShaderCompiler<B> {
    #[must_use]
    pub fn new(config: &ToolConfig, backend: B) -> Self {
        let settings = &config.shader_compiler;
        Self {
            backend,
            assets_dir: config.assets_dir(),
            shader_dir: config.shader_dir(),
            pack_path: config.pack_path(),
            temp_dir: config.temp_dir(),
            shader_suffix: settings.shader_suffix.clone(),
            vs_entry: settings.vs_entry.clone(),
            ps_entry: settings.ps_entry.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn pack_path(&self) -> &Path {
        &self.pack_path
    }

    /// The configured entry point for a stage.
    #[must_use]
    pub fn entry_point(&self, stage: Stage) -> &str {
        match stage {
            Stage::Vertex => &self.vs_entry,
            Stage::Fragment => &self.ps_entry,
        }
    }

    /// Compiles everything and writes the pack. Nothing is written on error.
    pub fn run(&self) -> Result<ShaderPack> {
        let assembler = self.build()?;
        assembler.write(&self.pack_path)
    }

    /// Compiles every shader into an in-memory pack without writing it.
    pub fn build(&self) -> Result<PackAssembler> {
        log::info!("Compiling shaders under {}", self.shader_dir.display());
        fs::create_dir_all(&self.temp_dir).map_err(|e| PackError::io(&self.temp_dir, e))?;

        let mut assembler = PackAssembler::new();
        for path in self.discover()? {
            let unit = self.load_unit(path)?;
            let entries = self.compile_unit(&unit)?;
            assembler.add_shader(unit.relative_path, entries);
        }
        Ok(assembler)
    }

    /// Loads and expands every shader without compiling anything.
    pub fn plan(&self) -> Result<Vec<(ShaderUnit, Vec<Variant>)>> {
        self.discover()?
            .into_iter()
            .map(|path| -> Result<_> {
                let unit = self.load_unit(path)?;
                let variants = unit.variants()?;
                Ok((unit, variants))
            })
            .collect()
    }

    /// Lists shader sources under the shader directory, sorted by name.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.shader_dir.is_dir() {
            return Err(PackError::ShaderDirNotFound(self.shader_dir.clone()));
        }

        let mut shaders = Vec::new();
        for entry in WalkDir::new(&self.shader_dir).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_string_lossy()
                    .ends_with(self.shader_suffix.as_str())
            {
                shaders.push(entry.into_path());
            }
        }
        Ok(shaders)
    }

    /// Resolves the pack key and metadata of one shader.
    pub fn load_unit(&self, path: PathBuf) -> Result<ShaderUnit> {
        let relative_path = relative_key(&self.assets_dir, &path);
        let macro_lines = load_meta(&path)?.variants;
        Ok(ShaderUnit {
            path,
            relative_path,
            macro_lines,
        })
    }

    /// Compiles all variants of one shader, in expansion order.
    pub fn compile_unit(&self, unit: &ShaderUnit) -> Result<Vec<PackEntry>> {
        let variants = unit.variants()?;
        let source = fs::read_to_string(&unit.path).map_err(|e| PackError::io(&unit.path, e))?;

        let mut entries = Vec::with_capacity(variants.len());
        for variant in variants {
            log::info!("Compiling shader {} {variant}", unit.relative_path);
            let compiled = self
                .compile_stage(unit, &source, &variant, Stage::Vertex)
                .and_then(|vert| {
                    let frag = self.compile_stage(unit, &source, &variant, Stage::Fragment)?;
                    Ok((vert, frag))
                });

            match compiled {
                Ok((vert, frag)) => entries.push(PackEntry::new(variant, vert, frag)),
                Err(e) => {
                    log::error!("Compilation failed, see the compiler output above");
                    return Err(e);
                }
            }
        }
        Ok(entries)
    }

    /// Compiles one stage of one variant and returns its bytecode.
    pub fn compile_stage(
        &self,
        unit: &ShaderUnit,
        source: &str,
        variant: &Variant,
        stage: Stage,
    ) -> Result<Vec<u8>> {
        let transient = TransientFiles::new(&self.temp_dir);
        let mut text = variant.define_prelude();
        text.push_str(source);
        fs::write(&transient.source, text).map_err(|e| PackError::io(&transient.source, e))?;
        log::debug!("Transient source {}", transient.source.display());

        let request = CompileRequest {
            entry_point: self.entry_point(stage),
            stage,
            source: &transient.source,
            include_dir: &self.assets_dir,
            output: &transient.output,
        };

        let failure = |source: BackendError| PackError::Backend {
            shader: unit.relative_path.clone(),
            variant: variant.clone(),
            stage,
            source,
        };

        self.backend.compile(&request).map_err(&failure)?;
        match fs::read(&transient.output) {
            Ok(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(failure(BackendError::NoOutput {
                path: transient.output.clone(),
            })),
        }
    }
}

/// Builds the `/`-separated pack key of `path` relative to `root`.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The preprocessed source and bytecode output of one backend call.
/// Both files are removed on drop, whether the call succeeded or not.
struct TransientFiles {
    source: PathBuf,
    output: PathBuf,
}

impl TransientFiles {
    fn new(dir: &Path) -> Self {
        let id = uuid::Uuid::new_v4().simple();
        Self {
            source: dir.join(format!("shaderpack-{id}.src")),
            output: dir.join(format!("shaderpack-{id}.spv")),
        }
    }
}

impl Drop for TransientFiles {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.source);
        let _ = fs::remove_file(&self.output);
    }
}
