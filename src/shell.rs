use anyhow::{Context, Result};
use std::process::{Command, Output};

/// Run a shell script on the hypervisor host, capturing output.
pub fn run_host(script: &str) -> Result<Output> {
    #[cfg(test)]
    if let Some(output) = crate::shell_mock::intercept(script) {
        return Ok(output);
    }

    Command::new("bash")
        .args(["-c", script])
        .output()
        .with_context(|| format!("Failed to run: {}", script))
}

/// Run a shell script on the host, failing on a non-zero exit.
pub fn run_host_checked(script: &str) -> Result<()> {
    let output = run_host(script)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "Command failed (exit {}): {}{}",
            output.status.code().unwrap_or(-1),
            script,
            if stderr.trim().is_empty() {
                String::new()
            } else {
                format!("\n{}", stderr.trim())
            }
        );
    }
    Ok(())
}
