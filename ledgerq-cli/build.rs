use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Short commit hash of the checkout this binary is built from.
fn git_short_sha(repo: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8(out.stdout).ok()?;
    let sha = sha.trim();
    (!sha.is_empty()).then(|| sha.to_owned())
}

fn main() {
    let repo = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .and_then(|dir| dir.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(".."));

    // Rebuild when the checked-out commit moves.
    let head = repo.join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }
    println!("cargo:rerun-if-changed=build.rs");

    let sha = git_short_sha(&repo).unwrap_or_else(|| "unknown".into());
    let stamp = match env::var("PROFILE").as_deref() {
        Ok("release") | Err(_) => sha,
        Ok(profile) => format!("{sha}, {profile}"),
    };
    println!("cargo:rustc-env=LEDGERQ_BUILD_SHA={stamp}");
}
