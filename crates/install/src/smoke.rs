//! Post-install smoke test

use pinst_errors::InstallError;
use pinst_types::{SmokeTest, SmokeTestOutcome};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Run the installed executable and compare its output.
///
/// A failed smoke test does not undo the install; the caller reports it.
pub async fn run_smoke_test(path: &Path, test: &SmokeTest) -> SmokeTestOutcome {
    match execute(path, test).await {
        Ok(()) => SmokeTestOutcome::Passed,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "smoke test failed");
            let reason = match e {
                InstallError::PostInstallVerification { reason, .. } => reason,
                other => other.to_string(),
            };
            SmokeTestOutcome::Failed { reason }
        }
    }
}

async fn execute(path: &Path, test: &SmokeTest) -> Result<(), InstallError> {
    let command = std::iter::once(path.display().to_string())
        .chain(test.args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");
    let failed = |reason: String| InstallError::PostInstallVerification {
        command: command.clone(),
        reason,
    };

    let child = Command::new(path)
        .args(&test.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| failed(format!("cannot execute: {e}")))?;

    let timeout = Duration::from_secs(test.timeout_secs);
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| failed(format!("timed out after {}s", test.timeout_secs)))?
        .map_err(|e| failed(format!("cannot collect output: {e}")))?;

    if let Some(expected) = test.expect_status {
        match output.status.code() {
            Some(code) if code == expected => {}
            Some(code) => {
                return Err(failed(format!("exit status {code}, expected {expected}")));
            }
            None => return Err(failed("terminated by signal".to_string())),
        }
    }

    if let Some(expected) = &test.expect {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if !combined.contains(expected.as_str()) {
            return Err(failed(format!("output does not contain '{expected}'")));
        }
    }

    Ok(())
}
