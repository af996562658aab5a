//! Build script for parker-server
//!
//! Exposes build identification to the binary as `GIT_HASH`,
//! `BUILD_TIMESTAMP` and `BUILD_PROFILE`, shown in the startup banner and
//! by `/api/admin/about`.

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    // Short hash, suffixed with "-dirty" for uncommitted changes
    let git_hash = git(&["describe", "--always", "--dirty", "--abbrev=8", "--exclude=*"])
        .unwrap_or_else(|| "unknown".to_string());

    let build_timestamp =
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    let build_profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", build_profile);
}
