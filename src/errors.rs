//! Error Types
//!
//! This module defines the error types used throughout the pack pipeline.
//!
//! # Overview
//!
//! The main error type [`PackError`] covers every way a run can fail:
//! - Declaration errors (malformed sidecars, invalid macro lines)
//! - Compiler backend failures
//! - Filesystem and configuration errors
//!
//! Every error is fatal: a run either writes one complete pack or nothing.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, PackError>`.
//!
//! ```rust,ignore
//! use shaderpack::errors::{PackError, Result};
//!
//! fn build() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::Stage;
use crate::variant::Variant;

/// An invalid macro-line declaration.
///
/// Line indices refer to positions after empty lines have been discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// A line whose only symbol is the placeholder.
    #[error("macro line {line} contains only the placeholder")]
    PlaceholderOnlyLine { line: usize },

    /// The same symbol appears twice within one line.
    #[error("macro line {line} declares `{name}` more than once")]
    DuplicateInLine { line: usize, name: String },

    /// A macro is declared by two different lines.
    #[error("macro `{name}` is declared by line {first_line} and line {line}")]
    MacroReused {
        name: String,
        first_line: usize,
        line: usize,
    },
}

/// Failure reported by a [`CompilerBackend`](crate::backend::CompilerBackend).
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend process could not be started.
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend exited unsuccessfully.
    #[error("backend exited with {}:\n{diagnostics}", describe_status(.status))]
    Exit {
        status: Option<i32>,
        diagnostics: String,
    },

    /// The backend reported success but left no bytecode behind.
    #[error("backend produced no output at {}", .path.display())]
    NoOutput { path: PathBuf },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// The main error type for a pack run.
#[derive(Error, Debug)]
pub enum PackError {
    // ========================================================================
    // Declaration Errors
    // ========================================================================
    /// A metadata sidecar could not be parsed.
    #[error("Malformed metadata {}: {source}", .path.display())]
    MalformedMeta {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A shader's macro lines failed validation.
    #[error("Invalid variant declaration for {shader}: {source}")]
    Declaration {
        shader: String,
        #[source]
        source: DeclarationError,
    },

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// Compilation of one (shader, variant, stage) failed.
    #[error("Failed to compile {shader} {variant} ({stage}): {source}")]
    Backend {
        shader: String,
        variant: Variant,
        stage: Stage,
        #[source]
        source: BackendError,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error on a known path.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured shader directory does not exist.
    #[error("Shader directory not found: {}", .0.display())]
    ShaderDirNotFound(PathBuf),

    /// Directory traversal failed.
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The configuration file is not valid TOML for this tool.
    #[error("Config parse error in {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // ========================================================================
    // Pack Format Errors
    // ========================================================================
    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested shader is not present in the pack.
    #[error("Shader not found in pack: {0}")]
    ShaderNotInPack(String),
}

impl PackError {
    /// Wraps an [`std::io::Error`] together with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Alias for `Result<T, PackError>`.
pub type Result<T> = std::result::Result<T, PackError>;
