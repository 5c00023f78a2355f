use std::env;
use std::process::Command;

/// Embeds commit and commit date for `pandar --version`.
///
/// `SOURCE_COMMIT` / `SOURCE_DATE` win over git so source tarballs without a
/// `.git` directory still report something meaningful.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SOURCE_COMMIT");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE");

    let commit = non_empty_env("SOURCE_COMMIT")
        .or_else(|| git(&["rev-parse", "HEAD"]))
        .map(|full| full.chars().take(7).collect::<String>())
        .unwrap_or_else(|| "unknown".to_string());
    let date = non_empty_env("SOURCE_DATE")
        .or_else(|| git(&["log", "-1", "--format=%cs"]))
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=PANDAR_BUILD_COMMIT={commit}");
    println!("cargo:rustc-env=PANDAR_BUILD_DATE={date}");
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}
