use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Create a `Command` with a scrubbed environment.
///
/// Calls `env_clear()` and passes through only `PATH`, pinning the locale to
/// `C.UTF-8`. This prevents accidental leakage of API keys, tokens, and
/// other secrets to child processes, and keeps tool output parseable.
pub fn scrubbed_command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }
    cmd.env("LANG", "C.UTF-8");
    cmd.env("LC_ALL", "C.UTF-8");
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    cmd
}

/// Read a stream keeping at most `cap` bytes, draining the remainder so the
/// child never blocks on a full pipe. Returns the captured bytes (cut at a
/// UTF-8 character boundary when truncation occurred) and whether the cap
/// was exceeded.
pub async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> (Vec<u8>, bool) {
    let mut buf: Vec<u8> = Vec::with_capacity(cap.min(64 * 1024));
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() < cap {
                    let take = n.min(cap - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }

    if truncated {
        trim_partial_utf8(&mut buf);
    }
    (buf, truncated)
}

/// Drop a trailing incomplete UTF-8 sequence left by a byte-cap cut, never
/// splitting a multi-byte character.
fn trim_partial_utf8(buf: &mut Vec<u8>) {
    // A UTF-8 character is at most 4 bytes; only the tail can be incomplete.
    let len = buf.len();
    let start = len.saturating_sub(4);
    for i in (start..len).rev() {
        let byte = buf[i];
        if byte & 0xC0 == 0x80 {
            continue; // continuation byte, keep walking back
        }
        let char_len = match byte {
            b if b & 0x80 == 0x00 => 1,
            b if b & 0xE0 == 0xC0 => 2,
            b if b & 0xF0 == 0xE0 => 3,
            b if b & 0xF8 == 0xF0 => 4,
            _ => 1, // invalid start byte; lossy decode will replace it
        };
        if i + char_len > len {
            buf.truncate(i);
        }
        return;
    }
}

/// Stop a supervised child: polite SIGTERM first, escalating to SIGKILL if
/// it has not exited within `grace`.
pub async fn shutdown_child(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
        if tokio::time::timeout(grace, child.wait()).await.is_ok() {
            return;
        }
    }
    let _ = child.kill().await;
}
