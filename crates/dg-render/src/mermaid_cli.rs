//! External Mermaid CLI process integration.
//!
//! The CLI receives DSL on stdin and writes SVG to stdout. Each attempt is
//! bounded by a wall-clock timeout; the process is killed on timeout and
//! on cancellation, and one retry is made before giving up.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use dg_core::GenerateError;

/// Wall-clock limit per render attempt.
pub const MERMAID_RENDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Handle to the external Mermaid renderer.
pub struct MermaidCli {
    path: PathBuf,
    timeout: Duration,
}

impl MermaidCli {
    /// CLI at the given path with the default timeout.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            timeout: MERMAID_RENDER_TIMEOUT,
        }
    }

    /// Override the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render DSL to SVG, retrying once on failure.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Cancelled`] if cancellation fires,
    /// [`GenerateError::Render`] after the second failed attempt.
    pub async fn render(
        &self,
        dsl: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        match self.render_once(dsl, cancel).await {
            Ok(svg) => Ok(svg),
            Err(GenerateError::Cancelled) => Err(GenerateError::Cancelled),
            Err(first) => {
                tracing::debug!(error = %first, "mermaid attempt failed, retrying");
                self.render_once(dsl, cancel).await
            }
        }
    }

    async fn render_once(
        &self,
        dsl: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerateError::Render(format!("spawn {}: {e}", self.path.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(dsl.as_bytes())
                .await
                .map_err(|e| GenerateError::Render(format!("write stdin: {e}")))?;
            // Dropping stdin closes the pipe and lets the CLI finish
            drop(stdin);
        }

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let status = tokio::select! {
            () = cancel.cancelled() => {
                let _ = child.kill().await;
                return Err(GenerateError::Cancelled);
            }
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                return Err(GenerateError::Render(format!(
                    "timed out after {:?}",
                    self.timeout
                )));
            }
            status = child.wait() => {
                status.map_err(|e| GenerateError::Render(format!("wait: {e}")))?
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
            return Err(GenerateError::Render(format!(
                "exit {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        let svg = String::from_utf8(stdout)
            .map_err(|_| GenerateError::Render("output is not utf-8".to_owned()))?;
        if svg.contains("<svg") {
            Ok(svg)
        } else {
            Err(GenerateError::Render("output is not svg".to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn fake_cli(dir: &std::path::Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-mmdc");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_renders_stdin_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let cli = MermaidCli::new(fake_cli(
            dir.path(),
            r#"read line; echo "<svg data-src=\"$line\"/>""#,
        ));
        let svg = cli
            .render("flowchart TD", &CancellationToken::new())
            .await
            .unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("flowchart TD"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_svg_output_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = MermaidCli::new(fake_cli(dir.path(), "cat > /dev/null; echo nope"));
        let err = cli
            .render("flowchart TD", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Render(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cli = MermaidCli::new(fake_cli(dir.path(), "cat > /dev/null; sleep 30"))
            .timeout(Duration::from_millis(100));
        let start = std::time::Instant::now();
        let err = cli
            .render("flowchart TD", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Render(_)));
        // Two attempts, each bounded by the timeout
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_skips_retry() {
        let dir = tempfile::tempdir().unwrap();
        let cli = MermaidCli::new(fake_cli(dir.path(), "cat > /dev/null; sleep 30"));
        let cancel = CancellationToken::new();
        let render = cli.render("flowchart TD", &cancel);
        tokio::pin!(render);

        tokio::select! {
            _ = &mut render => panic!("should not finish before cancel"),
            () = tokio::time::sleep(Duration::from_millis(50)) => cancel.cancel(),
        }
        let err = render.await.unwrap_err();
        assert!(matches!(err, GenerateError::Cancelled));
    }

    #[tokio::test]
    async fn test_missing_binary_is_render_error() {
        let cli = MermaidCli::new(PathBuf::from("/no/such/mmdc"));
        let err = cli
            .render("flowchart TD", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Render(_)));
    }
}
