// Compiles shaders/shader.{vert,frag} into the SPIR-V files loaded at startup.
// Skipped with a warning when no `glslc` is available.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADERS: &[(&str, &str)] = &[("shader.vert", "vert.spv"), ("shader.frag", "frag.spv")];

fn main() {
    println!("cargo:rerun-if-changed=shaders/shader.vert");
    println!("cargo:rerun-if-changed=shaders/shader.frag");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var("SKIP_SHADERS").is_ok() {
        return;
    }

    let glslc = match find_glslc() {
        Some(glslc) => glslc,
        None => {
            println!("cargo:warning=glslc not found, shaders/*.spv were not rebuilt");
            return;
        }
    };

    let shader_dir = Path::new("shaders");
    for (source, output) in SHADERS {
        let status = Command::new(&glslc)
            .arg(shader_dir.join(source))
            .arg("-o")
            .arg(shader_dir.join(output))
            .status();

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => panic!("glslc failed on {} ({})", source, status),
            Err(e) => println!("cargo:warning=could not run {}: {}", glslc.display(), e),
        }
    }
}

fn find_glslc() -> Option<PathBuf> {
    let exe = if cfg!(target_os = "windows") { "glslc.exe" } else { "glslc" };

    if let Ok(sdk) = env::var("VULKAN_SDK") {
        let bin = if cfg!(target_os = "windows") { "Bin" } else { "bin" };
        let path = Path::new(&sdk).join(bin).join(exe);
        if path.exists() {
            return Some(path);
        }
    }

    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths).map(|dir| dir.join(exe)).find(|path| path.exists())
    })
}
