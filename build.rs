use std::process::Command;
use vergen::EmitBuilder;

fn main() {
    let in_git_checkout = Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);

    let mut builder = EmitBuilder::builder();
    builder.build_timestamp();
    if in_git_checkout {
        builder.git_sha(true);
    }

    // Health reports read these through option_env!, so a failed emit only
    // degrades the reported build info.
    if let Err(err) = builder.emit() {
        println!("cargo:warning=build metadata unavailable: {err}");
    }
}
