use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("'{0}' is not a plain file name inside the input folder")]
    InvalidName(String),
    #[error("target name already exists: {}", .0.display())]
    TargetExists(PathBuf),
    #[error("file is in use, close it and try again: {}", .0.display())]
    FileBusy(PathBuf),
    #[error("'{0}' carries its tag in the file name; rename it by hand to change the tag")]
    TagLocked(String),
    #[error("reply is empty")]
    EmptyReply,
    #[error("no pending-review file selected")]
    NoTarget,
    #[error("unknown tag '{0}' (expected standard, template or review)")]
    UnknownTag(String),
    #[error("tag store {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write report: {0}")]
    Report(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ReviewResult<T> = Result<T, ReviewError>;
