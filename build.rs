//! Build script for compiling the shaders used by the frame graph.
//!
//! The `vulkano-shaders` crate provides a `shader!` macro, which is used for
//! the shared fullscreen quad vertex shader. The macro attempts reflection
//! and validation that gets in the way for the rest: the geometry shader
//! stages write `gl_Layer`, several stages share one uniform block between
//! them, and the macro can not target Vulkan 1.3.
//!
//! Those stages are compiled here with `shaderc` directly. The SPIR-V goes
//! to `OUT_DIR` and is pulled in by `src/shader/sources.rs` with
//! `include_bytes!`, and the uniform tables are reflected from the same
//! modules when a program is linked.
use shaderc::{CompilationArtifact, Compiler, ShaderKind};
use std::io::Write;

/// Every stage except `quad.vert`, which goes through `shader!`
const STAGES: &[(&str, ShaderKind)] = &[
    ("geometry.vert", ShaderKind::Vertex),
    ("geometry.frag", ShaderKind::Fragment),
    ("depth_map.vert", ShaderKind::Vertex),
    ("depth_map.geom", ShaderKind::Geometry),
    ("depth_map.frag", ShaderKind::Fragment),
    ("ssao.frag", ShaderKind::Fragment),
    ("ssao_blur.frag", ShaderKind::Fragment),
    ("lighting.frag", ShaderKind::Fragment),
    ("billboard.vert", ShaderKind::Vertex),
    ("billboard.geom", ShaderKind::Geometry),
    ("billboard.frag", ShaderKind::Fragment),
    ("gaussian_blur.frag", ShaderKind::Fragment),
    ("hdr_blend.frag", ShaderKind::Fragment),
    ("overlay.vert", ShaderKind::Vertex),
    ("text.frag", ShaderKind::Fragment),
    ("gui.frag", ShaderKind::Fragment),
    ("minimap.frag", ShaderKind::Fragment),
];

fn main() {
    // Only directory that a build script should write to:
    let out_var = std::env::var("OUT_DIR").unwrap();
    let out_dir = std::path::Path::new(&out_var);

    // Reuse the compiler
    let compiler = Compiler::new().unwrap();

    for (name, kind) in STAGES {
        let path = std::path::Path::new("shaders").join(name);
        println!("cargo:rerun-if-changed={}", path.display());
        let source = std::fs::read_to_string(&path).unwrap();
        let artifact = compile_shader(&compiler, &source, *kind, name);
        let bytes = artifact.as_binary_u8();
        let path = out_dir.join(format!("{name}.spv"));
        save_bytes(&path, bytes);
    }
    println!("cargo:rerun-if-changed=shaders/quad.vert");
}

fn compile_shader(
    compiler: &Compiler,
    source: &str,
    kind: ShaderKind,
    name: &str,
) -> CompilationArtifact {
    let mut options = shaderc::CompileOptions::new().unwrap();
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_3 as u32,
    );
    // `--features visualize` shows the blurred SSAO term instead of lighting
    if std::env::var_os("CARGO_FEATURE_VISUALIZE").is_some() {
        options.add_macro_definition("VISUALIZE_SSAO", None);
    }
    compiler
        .compile_into_spirv(
            source, // GLSL
            kind,
            name, // Used for labels in error messages etc.
            "main",
            Some(&options),
        )
        .unwrap()
}

fn save_bytes(path: &std::path::PathBuf, bytes: &[u8]) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(bytes).unwrap();
}
