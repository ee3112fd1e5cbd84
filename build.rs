use std::env::consts::{ARCH, OS};
use std::process::Command;

fn main() -> anyhow::Result<()> {
    // Build a version string to use in the user-agent and `version` command.
    #[cfg(debug_assertions)]
    const BUILD_TYPE: &str = "debug";
    #[cfg(not(debug_assertions))]
    const BUILD_TYPE: &str = "release";

    let revision = match get_commit_hash() {
        Some(hash) if is_working_tree_clean() => hash,
        Some(hash) => format!("{hash}+"),
        None => "unknown".to_string(),
    };

    let version_string = format!(
        "{} ({}, {}, {}/{})",
        env!("CARGO_PKG_VERSION"),
        revision,
        BUILD_TYPE,
        OS,
        ARCH
    );

    println!("cargo:rustc-env=REDAC_VERSION={}", version_string);
    Ok(())
}

fn get_commit_hash() -> Option<String> {
    let output = Command::new("git")
        .arg("log")
        .arg("-1")
        .arg("--pretty=format:%h") // Abbreviated commit hash
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .ok()?;

    if !output.status.success() || output.stdout.is_empty() {
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn is_working_tree_clean() -> bool {
    Command::new("git")
        .arg("diff")
        .arg("--quiet")
        .arg("--exit-code")
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
