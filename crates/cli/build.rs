fn main() {
    println!("cargo:rerun-if-env-changed=BUILD_GIT_HASH");

    // CI injects the hash; local builds ask git, falling back to "unknown"
    // outside a checkout.
    let hash =
        std::env::var("BUILD_GIT_HASH").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| {
            std::process::Command::new("git")
                .args(["rev-parse", "--short", "HEAD"])
                .output()
                .ok()
                .filter(|o| o.status.success())
                .and_then(|o| String::from_utf8(o.stdout).ok())
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        });

    println!("cargo:rustc-env=BUILD_GIT_HASH={hash}");
}
