//! Compiler Backend
//!
//! The shading-language compiler is an external collaborator. The pipeline
//! only talks to it through [`CompilerBackend`], so any compiler that turns
//! a source file and an entry point into a bytecode file can be plugged in
//! (and tests can use an in-process fake).
//!
//! [`GlslangBackend`] is the process-backed implementation:
//!
//! ```text
//! glslang -e <entry> -S <vert|frag> -D -V <source> -I<include> -o <output>
//! ```
//!
//! Its stdout and stderr are streamed line by line to the log sink while it
//! runs, and captured so a failure can report them verbatim.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::errors::BackendError;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// A pipeline stage compiled for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "vert")]
    Vertex,
    #[serde(rename = "frag")]
    Fragment,
}

impl Stage {
    /// The stage name understood by the compiler (`-S`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Vertex => "vert",
            Stage::Fragment => "frag",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Backend interface
// ---------------------------------------------------------------------------

/// One compilation job handed to a backend.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Entry point function name.
    pub entry_point: &'a str,
    pub stage: Stage,
    /// Preprocessed source file.
    pub source: &'a Path,
    /// Root of `#include` resolution.
    pub include_dir: &'a Path,
    /// Where the backend must write the bytecode.
    pub output: &'a Path,
}

/// A shading-language compiler.
///
/// On success the bytecode must exist at [`CompileRequest::output`].
pub trait CompilerBackend {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), BackendError>;
}

impl<B: CompilerBackend + ?Sized> CompilerBackend for &B {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), BackendError> {
        (**self).compile(request)
    }
}

impl<B: CompilerBackend + ?Sized> CompilerBackend for Box<B> {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), BackendError> {
        (**self).compile(request)
    }
}

// ---------------------------------------------------------------------------
// GlslangBackend
// ---------------------------------------------------------------------------

/// Runs `glslang` (or a compatible executable) as a child process.
#[derive(Debug, Clone)]
pub struct GlslangBackend {
    program: PathBuf,
}

impl Default for GlslangBackend {
    fn default() -> Self {
        Self::new("glslang")
    }
}

impl GlslangBackend {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, request: &CompileRequest<'_>) -> Command {
        let mut include = std::ffi::OsString::from("-I");
        include.push(request.include_dir);

        let mut cmd = Command::new(&self.program);
        cmd.arg("-e")
            .arg(request.entry_point)
            .arg("-S")
            .arg(request.stage.as_str())
            .arg("-D")
            .arg("-V")
            .arg(request.source)
            .arg(include)
            .arg("-o")
            .arg(request.output)
            .current_dir(request.include_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl CompilerBackend for GlslangBackend {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), BackendError> {
        let mut cmd = self.command(request);
        log::debug!("Running {cmd:?}");

        let mut child = cmd.spawn().map_err(|source| BackendError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        // Some glslang versions echo the input file name; that line is noise.
        let echo = request.source.display().to_string();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (out_lines, err_lines) = std::thread::scope(|scope| {
            let err_worker = scope.spawn(|| {
                stderr.map_or_else(Vec::new, |pipe| forward_lines(pipe, &echo, |l| log::error!("{l}")))
            });
            let out_lines =
                stdout.map_or_else(Vec::new, |pipe| forward_lines(pipe, &echo, |l| log::info!("{l}")));
            (out_lines, err_worker.join().unwrap_or_default())
        });

        let status = child.wait().map_err(|source| BackendError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(BackendError::Exit {
                status: status.code(),
                diagnostics: out_lines.into_iter().chain(err_lines).collect::<Vec<_>>().join("\n"),
            })
        }
    }
}

/// Reads `pipe` to EOF, passing each line except `echo` to `sink`, and
/// returns the forwarded lines.
///
/// Lines are split on raw `\n` and decoded lossily, so output in a
/// non-UTF-8 locale never stops the drain. Only the line terminator is
/// stripped.
fn forward_lines(pipe: impl Read, echo: &str, sink: impl Fn(&str)) -> Vec<String> {
    let mut reader = BufReader::new(pipe);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("Failed to read compiler output: {e}");
                break;
            }
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.strip_suffix('\n').unwrap_or(&*text);
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line == echo {
            continue;
        }
        sink(line);
        lines.push(line.to_string());
    }
    lines
}
