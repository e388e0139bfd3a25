//! Process Backend Tests
//!
//! Runs the full pipeline through `GlslangBackend` with a small shell
//! script standing in for the compiler executable.

#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use common::{Project, dir_is_empty};
use shaderpack::{
    BackendError, CompileRequest, CompilerBackend, GlslangBackend, PackError, ShaderCompiler,
    Stage,
};

/// Echoes the source path (like some glslang builds), fails on `FAIL`,
/// otherwise writes `<stage>:<entry>` as the bytecode.
///
/// `LATIN1` and `CHATTY` sources emit non-UTF-8 bytes, the second one
/// followed by more stdout than a pipe buffer holds.
const FAKE_GLSLANG: &str = r#"#!/bin/sh
echo "$7"
if grep -q FAIL "$7"; then
    echo "ERROR: FAIL found in $4 stage" >&2
    exit 2
fi
if grep -q LATIN1 "$7"; then
    printf '\377 bad byte\n' >&2
    echo 'ERROR: 0:1: real diagnostic' >&2
    exit 1
fi
if grep -q CHATTY "$7"; then
    printf '\377\n'
    head -c 300000 /dev/zero | tr '\0' x
    echo
fi
printf '%s:%s' "$4" "$2" > "${10}"
"#;

fn install_script(dir: &Path) -> PathBuf {
    let path = dir.join("fake-glslang.sh");
    fs::write(&path, FAKE_GLSLANG).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// All scenarios share one test so no other thread forks while the
// script is being written.
#[test]
fn glslang_backend_success_and_failure() {
    let project = Project::new();
    let script = install_script(&project.root);
    let backend = GlslangBackend::new(&script);

    // Success: bytecode comes from the output file the process wrote.
    project.shader("lit.shader", "void main() {}\n");
    project.meta("lit.shader", r#"{"variants": [["FOG"]]}"#);

    let mut config = project.config();
    config.shader_compiler.vs_entry = "VSMain".to_string();
    config.shader_compiler.ps_entry = "PSMain".to_string();

    let pack = ShaderCompiler::new(&config, &backend).run().unwrap();
    let entries = pack.entries("shaders/lit.shader").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].vert, b"vert:VSMain");
    assert_eq!(entries[1].frag, b"frag:PSMain");
    assert!(dir_is_empty(&project.temp()));

    // Failure: stderr is surfaced, the echoed path is not, the pack stays.
    let before = fs::read(project.pack_path()).unwrap();
    project.shader("zz_broken.shader", "FAIL\n");

    let err = ShaderCompiler::new(&config, &backend).run().unwrap_err();
    match err {
        PackError::Backend {
            shader,
            stage,
            source: BackendError::Exit { status, diagnostics },
            ..
        } => {
            assert_eq!(shader, "shaders/zz_broken.shader");
            assert_eq!(stage, Stage::Vertex);
            assert_eq!(status, Some(2));
            assert_eq!(diagnostics, "ERROR: FAIL found in vert stage");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read(project.pack_path()).unwrap(), before);
    assert!(dir_is_empty(&project.temp()));

    // Invalid UTF-8 does not stop the drain: later lines still arrive.
    let latin1 = project.root.join("latin1.vert");
    fs::write(&latin1, "LATIN1\n").unwrap();
    let output = project.root.join("latin1.spv");
    let err = backend
        .compile(&CompileRequest {
            entry_point: "main",
            stage: Stage::Vertex,
            source: &latin1,
            include_dir: &project.root,
            output: &output,
        })
        .unwrap_err();
    match err {
        BackendError::Exit { status, diagnostics } => {
            assert_eq!(status, Some(1));
            assert_eq!(
                diagnostics,
                "\u{FFFD} bad byte\nERROR: 0:1: real diagnostic"
            );
        }
        other => panic!("unexpected error: {other}"),
    }

    // A bad byte ahead of a large stdout burst still lets the process finish.
    let chatty = project.root.join("chatty.vert");
    fs::write(&chatty, "CHATTY\n").unwrap();
    let output = project.root.join("chatty.spv");
    backend
        .compile(&CompileRequest {
            entry_point: "main",
            stage: Stage::Fragment,
            source: &chatty,
            include_dir: &project.root,
            output: &output,
        })
        .unwrap();
    assert_eq!(fs::read(&output).unwrap(), b"frag:main");
}
