//! Build script: embeds a version string into the binary via `RIGUP_VERSION`.

use std::process::Command;

fn main() {
    // RIGUP_VERSION from the environment wins (release workflows set it);
    // local builds pick up a git describe string instead.
    if let Ok(version) = std::env::var("RIGUP_VERSION") {
        println!("cargo:rustc-env=RIGUP_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=RIGUP_VERSION={version}");
    }

    // Rebuild when the checked-out commit or the env var changes.
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=RIGUP_VERSION");
}
