use crate::upload::{ChildHandle, RunEvent};
use std::sync::mpsc::Receiver;

#[derive(Debug, Clone)]
pub enum RunProgress {
    NotStarted,
    Running,
    Completed { code: Option<i32> },
    Failed,
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::NotStarted
    }
}

#[derive(Default)]
pub struct RunState {
    pub progress: RunProgress,
    pub log: String,
    pub diagnostics: String,
    pub error_message: Option<String>,
    pub cancel_requested: bool,
    pub event_receiver: Option<Receiver<RunEvent>>,
    pub child: ChildHandle,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self.progress, RunProgress::Running)
    }

    pub fn clear(&mut self) {
        *self = RunState::default();
    }

    pub fn status_text(&self) -> String {
        match &self.progress {
            RunProgress::NotStarted => String::new(),
            RunProgress::Running => {
                if self.cancel_requested {
                    "Cancelling...".to_string()
                } else {
                    "Running upload script...".to_string()
                }
            }
            RunProgress::Completed { code } => match code {
                Some(0) => "Upload complete".to_string(),
                Some(code) => format!("Upload script exited with code {code}"),
                None => "Upload script was terminated".to_string(),
            },
            RunProgress::Failed => "Upload failed".to_string(),
        }
    }
}
