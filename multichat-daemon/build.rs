//! Stamps `multichat version` output with where and when the daemon was built.

use std::env;
use std::process::Command;

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env=MULTICHAT_{}={}", key, value);
}

fn short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    emit(
        "BUILD_TARGET",
        &env::var("TARGET").unwrap_or_else(|_| "unknown".to_string()),
    );
    emit(
        "BUILT_AT",
        &chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    // Left unset outside a git checkout
    if let Some(commit) = short_commit() {
        emit("GIT_COMMIT", &commit);
    }

    println!("cargo:rerun-if-changed=../.git/HEAD");
}
