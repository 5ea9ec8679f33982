use std::io;
use std::path::PathBuf;
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Everything the upload script needs for one run. Built from the form
/// fields when the upload button is clicked and dropped when the run ends.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub excel_file: PathBuf,
    pub username: String,
    pub password: String,
    pub security_token: String,
    pub create_users: bool,
}

impl UploadRequest {
    /// Positional arguments in the exact order the upload script expects:
    /// file path, username, password, security token, create-users flag.
    /// The flag is the literal string "True" or "False".
    pub fn to_args(&self) -> Vec<String> {
        let flag = if self.create_users { "True" } else { "False" };
        vec![
            self.excel_file.display().to_string(),
            self.username.clone(),
            self.password.clone(),
            self.security_token.clone(),
            flag.to_string(),
        ]
    }
}

/// True iff every required form field has a value. No format checks.
pub fn all_fields_present(file: &str, username: &str, password: &str, token: &str) -> bool {
    !file.is_empty() && !username.is_empty() && !password.is_empty() && !token.is_empty()
}

/// Events sent from the worker thread back to the UI while a run is active.
#[derive(Debug)]
pub enum RunEvent {
    /// Chunk of the script's stdout, forwarded as it arrives.
    Output(String),
    /// Chunk of the script's stderr.
    Diagnostic(String),
    Finished(ExitStatus),
    Failed(String),
}

/// Full capture of one finished run.
#[derive(Debug)]
pub struct CompletedRun {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// Shared slot for the running child so the UI can kill it on cancel.
pub type ChildHandle = Arc<Mutex<Option<Child>>>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("could not start {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("failed while reading upload output: {0}")]
    Capture(#[from] io::Error),
}
