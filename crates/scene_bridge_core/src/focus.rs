//! Best-effort "bring the host to the foreground" hook.
//!
//! Some hosts only process input while their window is focused. Transports
//! call [`nudge`] before every dispatch attempt; whatever goes wrong in here
//! is logged and otherwise ignored.

use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(2);
const SETTLE_DELAY: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Error, Debug)]
pub enum FocusError {
    #[error("focus script not found: {0}")]
    MissingScript(PathBuf),

    #[error("focus command timed out after {0:?}")]
    Timeout(Duration),

    #[error("focus command exited with {0}")]
    Failed(ExitStatus),

    #[error("focus command could not run: {0}")]
    Io(#[from] std::io::Error),
}

pub trait FocusHook: Send + Sync {
    fn nudge(&self) -> Result<(), FocusError>;
}

impl<F> FocusHook for F
where
    F: Fn() -> Result<(), FocusError> + Send + Sync,
{
    fn nudge(&self) -> Result<(), FocusError> {
        self()
    }
}

/// Does nothing. The default hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFocus;

impl FocusHook for NoFocus {
    fn nudge(&self) -> Result<(), FocusError> {
        Ok(())
    }
}

/// Runs an external program that activates the host window, e.g. a
/// PowerShell script calling `SetForegroundWindow`.
#[derive(Debug, Clone)]
pub struct ScriptFocus {
    program: String,
    args: Vec<String>,
    script: Option<PathBuf>,
    timeout: Duration,
    settle: Duration,
}

impl ScriptFocus {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            script: None,
            timeout: SCRIPT_TIMEOUT,
            settle: SETTLE_DELAY,
        }
    }

    /// `powershell -ExecutionPolicy Bypass -File <script>`.
    pub fn powershell(script: impl Into<PathBuf>) -> Self {
        let script = script.into();
        let args = vec![
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-File".to_string(),
            script.display().to_string(),
        ];
        Self {
            script: Some(script),
            ..Self::new("powershell", args)
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pause after a successful run so the window switch completes before
    /// the request goes out.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

impl FocusHook for ScriptFocus {
    fn nudge(&self) -> Result<(), FocusError> {
        if let Some(script) = &self.script {
            if !script.exists() {
                return Err(FocusError::MissingScript(script.clone()));
            }
        }

        let mut child = Command::new(&self.program).args(&self.args).spawn()?;
        let started = Instant::now();

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FocusError::Timeout(self.timeout));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            return Err(FocusError::Failed(status));
        }

        std::thread::sleep(self.settle);
        Ok(())
    }
}

/// Runs the hook off the async executor and swallows any failure.
pub async fn nudge(hook: &Arc<dyn FocusHook>) {
    let hook = Arc::clone(hook);
    match tokio::task::spawn_blocking(move || hook.nudge()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Focus nudge skipped: {}", e),
        Err(e) => tracing::debug!("Focus nudge task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_nudge_swallows_hook_errors() {
        let hook: Arc<dyn FocusHook> = Arc::new(|| -> Result<(), FocusError> {
            Err(FocusError::MissingScript(PathBuf::from("gone.ps1")))
        });
        nudge(&hook).await;
    }

    #[tokio::test]
    async fn test_closure_hook_is_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hook: Arc<dyn FocusHook> = Arc::new(move || -> Result<(), FocusError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        nudge(&hook).await;
        nudge(&hook).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_script_is_reported() {
        let focus = ScriptFocus::powershell("definitely/not/here/focus_host.ps1");
        match focus.nudge() {
            Err(FocusError::MissingScript(path)) => {
                assert!(path.ends_with("focus_host.ps1"));
            }
            other => panic!("Expected MissingScript, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_script_success_and_failure() {
        let ok = ScriptFocus::new("sh", vec!["-c".into(), "exit 0".into()])
            .with_settle(Duration::ZERO);
        assert!(ok.nudge().is_ok());

        let failing = ScriptFocus::new("sh", vec!["-c".into(), "exit 3".into()]);
        assert!(matches!(failing.nudge(), Err(FocusError::Failed(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_script_is_killed() {
        let slow = ScriptFocus::new("sh", vec!["-c".into(), "sleep 5".into()])
            .with_timeout(Duration::from_millis(100));

        let started = Instant::now();
        assert!(matches!(slow.nudge(), Err(FocusError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
