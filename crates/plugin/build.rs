use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=exports.def");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();

    if target_os != "windows" {
        return;
    }

    // Export the entry points under their undecorated names, as the system
    // d3d9.dll does; 32-bit stdcall would otherwise export `_Name@N`.
    let exports_def = manifest_dir.join("exports.def");
    if target_env == "msvc" {
        println!(
            "cargo:rustc-cdylib-link-arg=/DEF:{}",
            exports_def.display()
        );
    } else {
        println!("cargo:rustc-cdylib-link-arg={}", exports_def.display());
    }
}
