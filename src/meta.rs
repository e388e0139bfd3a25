//! Shader Metadata Sidecars
//!
//! A shader `foo.shader` may carry a JSON sidecar `foo.shader.meta`
//! declaring its macro lines:
//!
//! ```json
//! { "variants": [["USE_FOG"], ["LIT", "UNLIT", "_"]] }
//! ```
//!
//! Other fields are ignored; they belong to the editor that writes the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{PackError, Result};
use crate::variant::MacroLine;

/// Parsed contents of a `.meta` sidecar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ShaderMeta {
    #[serde(default)]
    pub variants: Vec<MacroLine>,
}

impl ShaderMeta {
    /// Parses sidecar text, discarding empty macro lines.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let mut meta: ShaderMeta = serde_json::from_str(text)?;
        meta.variants.retain(|line| !line.is_empty());
        Ok(meta)
    }

    #[inline]
    #[must_use]
    pub fn macro_lines(&self) -> &[MacroLine] {
        &self.variants
    }
}

/// Returns the sidecar path for a shader: `<path>.meta`.
#[must_use]
pub fn meta_path(shader_path: &Path) -> PathBuf {
    let mut path = shader_path.as_os_str().to_owned();
    path.push(".meta");
    PathBuf::from(path)
}

/// Loads the sidecar next to `shader_path`.
///
/// A missing sidecar yields an empty declaration; unreadable or malformed
/// content is an error.
pub fn load_meta(shader_path: &Path) -> Result<ShaderMeta> {
    let path = meta_path(shader_path);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ShaderMeta::default()),
        Err(e) => return Err(PackError::io(path, e)),
    };

    log::debug!("Loaded metadata {}", path.display());
    ShaderMeta::from_json(&text).map_err(|source| PackError::MalformedMeta { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_path_appends_suffix() {
        let path = meta_path(Path::new("assets/shaders/lit.shader"));
        assert_eq!(path, PathBuf::from("assets/shaders/lit.shader.meta"));
    }

    #[test]
    fn test_parse_variants() {
        let meta = ShaderMeta::from_json(r#"{"variants": [["A", "B"], ["C"]]}"#).unwrap();
        assert_eq!(
            meta.macro_lines(),
            &[MacroLine::from(["A", "B"]), MacroLine::from(["C"])]
        );
    }

    #[test]
    fn test_empty_lines_discarded() {
        let meta = ShaderMeta::from_json(r#"{"variants": [[], ["A"], []]}"#).unwrap();
        assert_eq!(meta.macro_lines(), &[MacroLine::from(["A"])]);
    }

    #[test]
    fn test_missing_field_and_extra_fields() {
        let meta = ShaderMeta::from_json(r#"{"blend": "alpha"}"#).unwrap();
        assert!(meta.macro_lines().is_empty());
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(ShaderMeta::from_json(r#"{"variants": [["A", 1]]}"#).is_err());
        assert!(ShaderMeta::from_json("{ not json").is_err());
    }

    #[test]
    fn test_missing_sidecar_is_empty() {
        let dir = std::env::temp_dir().join(format!("shaderpack-meta-{}", uuid::Uuid::new_v4()));
        let meta = load_meta(&dir.join("absent.shader")).unwrap();
        assert_eq!(meta, ShaderMeta::default());
    }
}
