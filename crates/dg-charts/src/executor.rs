//! Sandboxed chart execution.
//!
//! Runs generated chart source in an isolated Python subprocess:
//! `python3 -I` (no site-packages from the user, no current-directory
//! imports), cleared environment, scratch directory as cwd and HOME, a
//! static import allow-list checked before spawning, and a hard wall-clock
//! timeout. The process is killed on cancellation or timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use dg_core::GenerateError;

/// Modules chart source may import.
const ALLOWED_IMPORTS: &[&str] = &["json", "math", "matplotlib", "numpy"];

/// Default execution timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of an executed chart.
#[derive(Debug)]
pub struct ExecutedChart {
    /// PNG bytes produced by the source.
    pub png: Vec<u8>,
    /// One-line textual summary printed by the source.
    pub insights: String,
}

/// Sandboxed subprocess executor for chart source.
#[derive(Debug, Clone)]
pub struct ChartExecutor {
    python_path: String,
    timeout: Duration,
}

impl ChartExecutor {
    /// Executor using the given Python interpreter.
    #[must_use]
    pub fn new(python_path: impl Into<String>) -> Self {
        Self {
            python_path: python_path.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the execution timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute chart source and collect the produced PNG.
    ///
    /// # Errors
    ///
    /// [`GenerateError::ChartExec`] on import violations, spawn failures,
    /// non-zero exit, timeout, or a missing output file;
    /// [`GenerateError::Cancelled`] when `cancel` fires first.
    pub async fn execute(
        &self,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutedChart, GenerateError> {
        check_imports(source)?;

        let scratch = tempfile::tempdir()
            .map_err(|e| GenerateError::ChartExec(format!("scratch dir: {e}")))?;
        let script = scratch.path().join("chart.py");
        tokio::fs::write(&script, source)
            .await
            .map_err(|e| GenerateError::ChartExec(format!("write source: {e}")))?;

        let mut child = Command::new(&self.python_path)
            .arg("-I")
            .arg(&script)
            .current_dir(scratch.path())
            .env_clear()
            .env("PATH", "/usr/local/bin:/usr/bin:/bin")
            .env("HOME", scratch.path())
            .env("MPLCONFIGDIR", scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerateError::ChartExec(format!("spawn {}: {e}", self.python_path)))?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let status = tokio::select! {
            () = cancel.cancelled() => {
                let _ = child.kill().await;
                return Err(GenerateError::Cancelled);
            }
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                return Err(GenerateError::ChartExec(format!(
                    "timed out after {:?}",
                    self.timeout
                )));
            }
            status = child.wait() => {
                status.map_err(|e| GenerateError::ChartExec(format!("wait: {e}")))?
            }
        };

        let mut stdout = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut stdout).await;
        }

        if !status.success() {
            let mut stderr = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut stderr).await;
            }
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(GenerateError::ChartExec(format!(
                "exit {status}: {}",
                stderr.trim()
            )));
        }

        let png = tokio::fs::read(scratch.path().join("chart.png"))
            .await
            .map_err(|e| GenerateError::ChartExec(format!("no chart.png produced: {e}")))?;

        Ok(ExecutedChart {
            png,
            insights: String::from_utf8_lossy(&stdout).trim().to_owned(),
        })
    }
}

/// Statically verify every import line against the allow-list.
fn check_imports(source: &str) -> Result<(), GenerateError> {
    for line in source.lines() {
        let line = line.trim_start();
        let module = if let Some(rest) = line.strip_prefix("import ") {
            rest
        } else if let Some(rest) = line.strip_prefix("from ") {
            rest
        } else {
            continue;
        };
        let base = module
            .split(|c: char| c == '.' || c.is_whitespace())
            .next()
            .unwrap_or("");
        if !ALLOWED_IMPORTS.contains(&base) {
            return Err(GenerateError::ChartExec(format!(
                "import of '{base}' is not allowed"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist_accepts_chart_imports() {
        let source = "import json\nimport math\nimport matplotlib\nimport matplotlib.pyplot as plt\n";
        assert!(check_imports(source).is_ok());
    }

    #[test]
    fn test_allowlist_rejects_os() {
        for source in [
            "import os",
            "from os import system",
            "import matplotlib\nimport subprocess",
            "  import socket",
        ] {
            let err = check_imports(source).unwrap_err();
            assert!(matches!(err, GenerateError::ChartExec(_)), "{source}");
        }
    }

    #[test]
    fn test_allowlist_rejects_dotted_escape() {
        assert!(check_imports("from os.path import join").is_err());
    }

    #[tokio::test]
    async fn test_cancel_wins_before_spawn_effects() {
        let executor = ChartExecutor::new("definitely-not-a-python");
        let cancel = CancellationToken::new();
        // Unknown interpreter: the spawn itself fails as ChartExec
        let err = executor.execute("import json\n", &cancel).await.unwrap_err();
        assert!(matches!(err, GenerateError::ChartExec(_)));
    }
}
