use std::env;
use std::process::Command;

/// Release tarballs carry no `.git`; packagers pass the commit in instead.
const COMMIT_OVERRIDE: &str = "BHMIGRATE_BUILD_COMMIT";

fn commit() -> String {
    if let Ok(commit) = env::var(COMMIT_OVERRIDE) {
        let commit = commit.trim();
        if !commit.is_empty() {
            return commit.chars().take(12).collect();
        }
    }

    Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed={}", COMMIT_OVERRIDE);
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit());

    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TARGET={}", target);

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=BHMIGRATE_BUILD_PROFILE={}", profile);
}
