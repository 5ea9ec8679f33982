mod state;
mod ui;

use crate::upload::{self, RunEvent, UploadRequest, UploadRunner};
use eframe::{egui, App};
pub use state::{RunProgress, RunState};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

pub const MISSING_FIELDS_MESSAGE: &str = "Please fill out all textboxes";

#[derive(Default)]
pub struct DataLoadApp {
    excel_file: Option<PathBuf>,
    username: String,
    password: String,
    security_token: String,
    create_users: bool,
    state: RunState,
}

impl DataLoadApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        println!("Initializing Data Load UI");
        Self::default()
    }

    /// Final path segment of the selected spreadsheet, for display.
    pub fn excel_file_name(&self) -> Option<String> {
        self.excel_file
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn start_upload(&mut self) {
        let file_name = self.excel_file_name().unwrap_or_default();
        if !upload::all_fields_present(
            &file_name,
            &self.username,
            &self.password,
            &self.security_token,
        ) {
            self.state.error_message = Some(MISSING_FIELDS_MESSAGE.to_string());
            return;
        }
        // all_fields_present guarantees a file was picked
        let Some(excel_file) = self.excel_file.clone() else {
            return;
        };

        let script = match UploadRunner::upload_script_path() {
            Ok(path) => path,
            Err(e) => {
                self.state.error_message = Some(format!("Could not locate upload script: {e}"));
                return;
            }
        };

        println!("Starting upload for {file_name}");
        self.state.clear();
        self.state.progress = RunProgress::Running;

        let request = UploadRequest {
            excel_file,
            username: self.username.clone(),
            password: self.password.clone(),
            security_token: self.security_token.clone(),
            create_users: self.create_users,
        };

        let (sender, receiver) = mpsc::channel();
        self.state.event_receiver = Some(receiver);
        let child = Arc::clone(&self.state.child);

        std::thread::spawn(move || {
            let runner = UploadRunner::new(script);
            match runner.run(&request, &sender, &child) {
                Ok(run) => {
                    let _ = sender.send(RunEvent::Finished(run.status));
                }
                Err(e) => {
                    let _ = sender.send(RunEvent::Failed(e.to_string()));
                }
            }
        });
    }

    pub fn cancel_upload(&mut self) {
        println!("Cancel requested, stopping upload script");
        self.state.cancel_requested = true;
        if let Ok(mut slot) = self.state.child.lock() {
            if let Some(child) = slot.as_mut() {
                if let Err(e) = child.kill() {
                    eprintln!("Failed to stop upload script: {e}");
                }
            }
        }
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        if self.state.is_running() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        let mut finished = false;
        if let Some(receiver) = &self.state.event_receiver {
            let mut had_updates = false;

            while let Ok(event) = receiver.try_recv() {
                had_updates = true;
                match event {
                    RunEvent::Output(chunk) => self.state.log.push_str(&chunk),
                    RunEvent::Diagnostic(chunk) => self.state.diagnostics.push_str(&chunk),
                    RunEvent::Finished(status) => {
                        finished = true;
                        self.state.progress = RunProgress::Completed {
                            code: status.code(),
                        };
                        if self.state.cancel_requested {
                            self.state.error_message = Some("Upload cancelled".to_string());
                        } else if !status.success() {
                            self.state.error_message =
                                Some(format!("Upload script failed ({status})"));
                        }
                        println!("Upload script finished: {status}");
                    }
                    RunEvent::Failed(message) => {
                        finished = true;
                        self.state.progress = RunProgress::Failed;
                        eprintln!("Upload failed: {message}");
                        self.state.error_message = Some(message);
                    }
                }
            }

            if had_updates {
                ctx.request_repaint();
            }
        }

        if finished {
            self.state.event_receiver = None;
        }
    }
}

impl App for DataLoadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
