//! Small process-related helpers shared across the workspace.

#[cfg(feature = "tokio")]
use std::ffi::OsStr;
#[cfg(feature = "tokio")]
use std::time::Duration;

#[cfg(all(windows, feature = "tokio"))]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}

/// Asks a child to quit by writing `q` to its stdin, the interactive quit
/// command ffmpeg understands, then waits up to `grace` for it to exit.
///
/// A child that ignores the request, or whose stdin was not piped, is killed.
/// Returns the exit code, `None` if the child was terminated by a signal.
#[cfg(feature = "tokio")]
pub async fn quit_gracefully(
    child: &mut tokio::process::Child,
    grace: Duration,
) -> std::io::Result<Option<i32>> {
    use tokio::io::AsyncWriteExt;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(b"q").await {
            tracing::debug!("Failed to send quit to child: {}", e);
        }
        // closing stdin also signals end of input
        drop(stdin);
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => Ok(status?.code()),
        Err(_) => {
            tracing::warn!("Child did not exit within {:?}; killing process", grace);
            child.kill().await?;
            Ok(child.wait().await?.code())
        }
    }
}

#[cfg(all(test, unix, feature = "tokio"))]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[tokio::test]
    async fn test_quit_reaches_reader() {
        // `head -c 1` exits as soon as it reads the quit byte
        let mut child = tokio_command("head")
            .args(["-c", "1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .unwrap();

        let code = quit_gracefully(&mut child, Duration::from_secs(5)).await.unwrap();
        assert_eq!(code, Some(0));
    }

    #[tokio::test]
    async fn test_unresponsive_child_is_killed() {
        let mut child = tokio_command("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .spawn()
            .unwrap();

        let code = quit_gracefully(&mut child, Duration::from_millis(50)).await.unwrap();
        assert_eq!(code, None);
    }
}
