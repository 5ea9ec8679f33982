mod runner;
mod types;

pub use runner::UploadRunner;
pub use types::{
    all_fields_present, ChildHandle, CompletedRun, RunEvent, RunnerError, UploadRequest,
};
