use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

use super::{ChildHandle, CompletedRun, RunEvent, RunnerError, UploadRequest};

#[cfg(windows)]
const UPLOAD_SCRIPT: &str = "runUpload.bat";
#[cfg(not(windows))]
const UPLOAD_SCRIPT: &str = "runUpload.sh";

/// Launches the external upload script and captures its output. One child
/// process per call; the caller owns the channel the output arrives on.
pub struct UploadRunner {
    program: PathBuf,
}

impl UploadRunner {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// The upload script ships next to the binary and is resolved from the
    /// current working directory by its fixed name.
    pub fn upload_script_path() -> io::Result<PathBuf> {
        Ok(env::current_dir()?.join(UPLOAD_SCRIPT))
    }

    /// Runs the script with the request's arguments, forwarding stdout and
    /// stderr chunks over `events` as they arrive, and returns the full
    /// capture once the child has exited. The spawned child is published
    /// into `handle` so the caller can kill it mid-run.
    pub fn run(
        &self,
        request: &UploadRequest,
        events: &Sender<RunEvent>,
        handle: &ChildHandle,
    ) -> Result<CompletedRun, RunnerError> {
        let mut child = Command::new(&self.program)
            .args(request.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| capture_error("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| capture_error("stderr was not piped"))?;

        let stderr_events = events.clone();
        let stderr_reader =
            thread::spawn(move || drain(stderr, &stderr_events, RunEvent::Diagnostic));

        // Publish the child for cancellation, then drain stdout without
        // holding the lock so a kill can get through mid-run.
        if let Ok(mut slot) = handle.lock() {
            *slot = Some(child);
        }

        let stdout_text = match drain(stdout, events, RunEvent::Output) {
            Ok(text) => text,
            Err(e) => {
                // A capture failure must not leave the child running.
                reap(handle);
                let _ = stderr_reader.join();
                return Err(e.into());
            }
        };

        // Stdout has closed; take the child back and wait for its exit.
        let child = match handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let status = match child {
            Some(mut child) => child.wait()?,
            None => return Err(capture_error("child process handle was lost")),
        };

        let stderr_text = stderr_reader
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stderr reader panicked"))??;

        Ok(CompletedRun {
            stdout: stdout_text,
            stderr: stderr_text,
            status,
        })
    }
}

fn capture_error(message: &str) -> RunnerError {
    RunnerError::Capture(io::Error::new(io::ErrorKind::Other, message))
}

/// Kills and waits whatever child is parked in the handle.
fn reap(handle: &ChildHandle) {
    if let Ok(mut slot) = handle.lock() {
        if let Some(mut child) = slot.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Reads `reader` to EOF, forwarding each chunk as an event and returning
/// the accumulated text. A dropped receiver just means nobody is watching.
fn drain<R: Read>(
    mut reader: R,
    events: &Sender<RunEvent>,
    wrap: fn(String) -> RunEvent,
) -> io::Result<String> {
    let mut collected = String::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            // Anything still pending is a truncated sequence at EOF.
            if !pending.is_empty() {
                let tail = String::from_utf8_lossy(&pending).into_owned();
                collected.push_str(&tail);
                let _ = events.send(wrap(tail));
            }
            break;
        }
        pending.extend_from_slice(&buf[..n]);
        let chunk = decode_complete_prefix(&mut pending);
        if !chunk.is_empty() {
            collected.push_str(&chunk);
            let _ = events.send(wrap(chunk));
        }
    }
    Ok(collected)
}

/// Decodes every complete UTF-8 character in `pending`, leaving the bytes of
/// a character still in flight for the next read. A multi-byte character can
/// straddle a read boundary, so decoding lossily per read would corrupt it.
/// Invalid sequences become replacement characters rather than stalling the
/// stream.
fn decode_complete_prefix(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(bad) => {
                        out.push('\u{FFFD}');
                        pending.drain(..valid + bad);
                    }
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn request() -> UploadRequest {
        UploadRequest {
            excel_file: PathBuf::from("/data/test data.xlsx"),
            username: "admin".to_string(),
            password: "pw1".to_string(),
            security_token: "tok1".to_string(),
            create_users: false,
        }
    }

    #[cfg(unix)]
    fn script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(UPLOAD_SCRIPT);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    fn run_script(body: &str) -> (CompletedRun, Vec<RunEvent>) {
        let dir = tempfile::tempdir().unwrap();
        let runner = UploadRunner::new(script(&dir, body));
        let (sender, receiver) = channel();
        let handle = ChildHandle::default();
        let run = runner.run(&request(), &sender, &handle).unwrap();
        drop(sender);
        (run, receiver.iter().collect())
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_exactly() {
        let (run, events) = run_script("printf 'Uploaded 42 records.'");
        assert_eq!(run.stdout, "Uploaded 42 records.");
        assert_eq!(run.stderr, "");
        assert!(run.status.success());

        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Output(chunk) => Some(chunk.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, "Uploaded 42 records.");
    }

    #[cfg(unix)]
    #[test]
    fn multibyte_output_survives_read_boundaries() {
        // 4095 filler bytes put the two-byte é across the 4096-byte reads.
        let text = format!("{}é and the rest", "a".repeat(4095));
        let (run, events) = run_script(&format!("printf '%s' '{text}'"));
        assert_eq!(run.stdout, text);

        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Output(chunk) => Some(chunk.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(streamed, text);
    }

    #[test]
    fn straddled_character_is_held_for_the_next_read() {
        let mut pending = vec![b'a', 0xC3];
        assert_eq!(decode_complete_prefix(&mut pending), "a");
        assert_eq!(pending, vec![0xC3]);

        pending.push(0xA9);
        assert_eq!(decode_complete_prefix(&mut pending), "é");
        assert!(pending.is_empty());
    }

    #[test]
    fn invalid_bytes_do_not_stall_decoding() {
        let mut pending = vec![b'a', 0xFF, b'b'];
        assert_eq!(decode_complete_prefix(&mut pending), "a\u{FFFD}b");
        assert!(pending.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn passes_arguments_in_order_without_splitting() {
        let (run, _) = run_script(r#"printf '%s\n' "$@""#);
        assert_eq!(run.stdout, "/data/test data.xlsx\nadmin\npw1\ntok1\nFalse\n");
    }

    #[cfg(unix)]
    #[test]
    fn stderr_is_captured_separately() {
        let (run, events) = run_script("echo diagnostics >&2");
        assert_eq!(run.stdout, "");
        assert_eq!(run.stderr, "diagnostics\n");
        assert!(events
            .iter()
            .any(|e| matches!(e, RunEvent::Diagnostic(chunk) if chunk.contains("diagnostics"))));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_code_is_reported() {
        let (run, _) = run_script("exit 3");
        assert_eq!(run.status.code(), Some(3));
    }

    #[test]
    fn missing_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = UploadRunner::new(dir.path().join(UPLOAD_SCRIPT));
        let (sender, _receiver) = channel();
        let handle = ChildHandle::default();

        let err = runner.run(&request(), &sender, &handle).unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn reap_kills_and_clears_a_parked_child() {
        let child = Command::new("/bin/sh")
            .args(["-c", "sleep 30"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let handle = ChildHandle::default();
        *handle.lock().unwrap() = Some(child);

        reap(&handle);
        assert!(handle.lock().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn kill_via_handle_ends_the_run() {
        use std::sync::Arc;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let path = script(&dir, "sleep 30");
        let (sender, _receiver) = channel();
        let handle = ChildHandle::default();
        let worker_handle = Arc::clone(&handle);
        let worker =
            thread::spawn(move || UploadRunner::new(path).run(&request(), &sender, &worker_handle));

        loop {
            {
                let mut slot = handle.lock().unwrap();
                if let Some(child) = slot.as_mut() {
                    child.kill().unwrap();
                    break;
                }
            }
            thread::sleep(Duration::from_millis(10));
        }

        let run = worker.join().unwrap().unwrap();
        assert!(!run.status.success());
    }
}
