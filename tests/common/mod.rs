//! Shared fixtures: a scratch project tree and an in-process compiler.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use shaderpack::{BackendError, CompileRequest, CompilerBackend, Stage, ToolConfig};

/// A throwaway project directory with an `assets/shaders` tree.
pub struct Project {
    pub root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!(
            "shaderpack-test-{}",
            uuid::Uuid::new_v4().simple()
        ));
        fs::create_dir_all(root.join("assets").join("shaders")).unwrap();
        Self { root }
    }

    pub fn assets(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn temp(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn pack_path(&self) -> PathBuf {
        self.assets().join("shaders.pack")
    }

    /// Writes a shader under `assets/shaders`.
    pub fn shader(&self, relative: &str, source: &str) -> PathBuf {
        let path = self.assets().join("shaders").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, source).unwrap();
        path
    }

    /// Writes the `.meta` sidecar of a shader under `assets/shaders`.
    pub fn meta(&self, relative: &str, json: &str) {
        let path = self.assets().join("shaders").join(format!("{relative}.meta"));
        fs::write(path, json).unwrap();
    }

    pub fn config(&self) -> ToolConfig {
        let mut config = ToolConfig::new(&self.root);
        config.shader_compiler.temp_dir = Some(self.temp());
        config
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// What the fake backend saw for one call.
#[derive(Debug, Clone)]
pub struct Call {
    pub entry_point: String,
    pub stage: Stage,
    pub source_text: String,
    pub include_dir: PathBuf,
}

/// Deterministic stand-in for the shader compiler.
///
/// The "bytecode" is `<stage>|<preprocessed source>`, so tests can check
/// exactly which input produced which output.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<Call>>,
    /// Fail when the preprocessed source contains this text at this stage.
    pub fail_on: Option<(String, Stage)>,
    /// Report success without writing any output.
    pub silent: bool,
}

impl FakeBackend {
    pub fn failing_on(marker: &str, stage: Stage) -> Self {
        Self {
            fail_on: Some((marker.to_string(), stage)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn fake_bytecode(stage: Stage, source_text: &str) -> Vec<u8> {
    format!("{stage}|{source_text}").into_bytes()
}

impl CompilerBackend for FakeBackend {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), BackendError> {
        let source_text = fs::read_to_string(request.source).unwrap();
        self.calls.lock().unwrap().push(Call {
            entry_point: request.entry_point.to_string(),
            stage: request.stage,
            source_text: source_text.clone(),
            include_dir: request.include_dir.to_path_buf(),
        });

        if let Some((marker, stage)) = &self.fail_on
            && *stage == request.stage
            && source_text.contains(marker.as_str())
        {
            return Err(BackendError::Exit {
                status: Some(1),
                diagnostics: format!("ERROR: {marker} rejected"),
            });
        }

        if !self.silent {
            fs::write(request.output, fake_bytecode(request.stage, &source_text)).unwrap();
        }
        Ok(())
    }
}

pub fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path).map_or(true, |mut entries| entries.next().is_none())
}
