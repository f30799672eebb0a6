//! Stamps the `updraft` binary with its release version.
//!
//! Packagers may pin the version with `UPDRAFT_VERSION` at build time.
//! Otherwise the nearest `v*` release tag is used, falling back to the
//! crate version outside a git checkout.

use std::process::Command;

/// `v1.4.0-3-gabc123` -> `1.4.0-3-gabc123`, or `None` without a usable tag.
fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--match", "v[0-9]*", "--dirty=.dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let described = String::from_utf8(output.stdout).ok()?;
    let version = described.trim().strip_prefix('v')?;
    (!version.is_empty()).then(|| version.to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed=UPDRAFT_VERSION");
    for path in ["../../.git/HEAD", "../../.git/refs/tags"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let version = std::env::var("UPDRAFT_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(git_version)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=UPDRAFT_VERSION={version}");
}
