//! Shader Pack Container
//!
//! The pack is the only artifact a run produces: one pretty-printed JSON
//! document mapping each shader's asset-relative path to its compiled
//! variants.
//!
//! ```json
//! {
//!     "shaders/lit.shader": [
//!         { "variant": ["FOG"], "vert": "AwIjBw...", "frag": "AwIjBw..." },
//!         { "variant": [],      "vert": "AwIjBw...", "frag": "AwIjBw..." }
//!     ]
//! }
//! ```
//!
//! Keys are written in sorted order. Entry order within a shader is the
//! variant expansion order and is part of the format: the first entry is
//! the shader's default variant.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::errors::{PackError, Result};
use crate::variant::Variant;

// ---------------------------------------------------------------------------
// PackEntry
// ---------------------------------------------------------------------------

/// One variant of a shader with the bytecode of both stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackEntry {
    pub variant: Variant,
    #[serde(with = "base64_bytes")]
    pub vert: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub frag: Vec<u8>,
}

impl PackEntry {
    #[must_use]
    pub fn new(variant: Variant, vert: Vec<u8>, frag: Vec<u8>) -> Self {
        Self {
            variant,
            vert,
            frag,
        }
    }

    /// Decoded vertex-stage bytecode.
    #[inline]
    #[must_use]
    pub fn vert_bytes(&self) -> &[u8] {
        &self.vert
    }

    /// Decoded fragment-stage bytecode.
    #[inline]
    #[must_use]
    pub fn frag_bytes(&self) -> &[u8] {
        &self.frag
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ShaderPack
// ---------------------------------------------------------------------------

/// All compiled shaders, keyed by forward-slash relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShaderPack {
    shaders: BTreeMap<String, Vec<PackEntry>>,
}

impl ShaderPack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a pack file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PackError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes with four-space indentation.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only emits valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Total number of entries over all shaders.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.shaders.values().map(Vec::len).sum()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.shaders.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.shaders.contains_key(path)
    }

    /// The ordered entries of one shader.
    #[must_use]
    pub fn entries(&self, path: &str) -> Option<&[PackEntry]> {
        self.shaders.get(path).map(Vec::as_slice)
    }

    /// The first entry of a shader, used when no macros are requested.
    pub fn default_entry(&self, path: &str) -> Result<&PackEntry> {
        self.entries(path)
            .and_then(<[PackEntry]>::first)
            .ok_or_else(|| PackError::ShaderNotInPack(path.to_string()))
    }

    /// Finds the entry whose variant defines exactly `macros`, in any order.
    pub fn select<S: AsRef<str>>(&self, path: &str, macros: &[S]) -> Result<Option<&PackEntry>> {
        let entries = self
            .entries(path)
            .ok_or_else(|| PackError::ShaderNotInPack(path.to_string()))?;
        Ok(entries.iter().find(|e| e.variant.same_set(macros)))
    }

    fn insert(&mut self, path: String, entries: Vec<PackEntry>) {
        self.shaders.insert(path, entries);
    }
}

// ---------------------------------------------------------------------------
// PackAssembler
// ---------------------------------------------------------------------------

/// Collects compiled shaders during a run and writes the pack once at the end.
///
/// Nothing touches the filesystem until [`PackAssembler::write`]; dropping
/// an assembler (for example after a failed run) leaves any previous pack
/// untouched.
#[derive(Debug, Default)]
pub struct PackAssembler {
    pack: ShaderPack,
}

impl PackAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the complete entry list of one shader.
    pub fn add_shader(&mut self, relative_path: impl Into<String>, entries: Vec<PackEntry>) {
        let relative_path = relative_path.into();
        if self.pack.contains(&relative_path) {
            log::warn!("Shader {relative_path} was added twice; keeping the last one");
        }
        self.pack.insert(relative_path, entries);
    }

    #[must_use]
    pub fn pack(&self) -> &ShaderPack {
        &self.pack
    }

    #[must_use]
    pub fn into_pack(self) -> ShaderPack {
        self.pack
    }

    /// Serializes the pack and atomically replaces `path` with it.
    ///
    /// The document is written to a sibling temporary file which is renamed
    /// over the destination only once it is complete.
    pub fn write(self, path: &Path) -> Result<ShaderPack> {
        let json = self.pack.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PackError::io(parent, e))?;
        }

        let staging = staging_path(path);
        let result = write_file(&staging, json.as_bytes())
            .and_then(|()| fs::rename(&staging, path).map_err(|e| PackError::io(path, e)));
        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result?;

        log::info!(
            "Wrote {} ({} shaders, {} variants)",
            path.display(),
            self.pack.len(),
            self.pack.entry_count()
        );
        Ok(self.pack)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_owned();
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    path.with_file_name(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| PackError::io(path, e))?;
    file.write_all(bytes).map_err(|e| PackError::io(path, e))?;
    file.sync_all().map_err(|e| PackError::io(path, e))
}

/// Encodes bytecode the way the pack stores it.
#[must_use]
pub fn encode_bytecode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
