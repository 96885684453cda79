use std::path::Path;

const SEETA_MODEL: &str = "model/seeta_fd_frontal_v1.0.bin";

fn main() {
    println!("cargo:rustc-check-cfg=cfg(bundled_seeta_model)");
    println!("cargo:rerun-if-changed={SEETA_MODEL}");

    // The SeetaFace model is compiled into the binary when it is present.
    // Without it the rustface detector needs `detector.model_path`.
    if Path::new(SEETA_MODEL).exists() {
        println!("cargo:rustc-cfg=bundled_seeta_model");
    } else {
        println!("cargo:warning={SEETA_MODEL} not found, rustface detection needs detector.model_path");
    }
}
