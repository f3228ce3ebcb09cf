use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "File '{}' not found. Please create a '{}' file and set your API keys there.",
        .path.display(),
        file_label(.path)
    )]
    MissingCredentialFile { path: PathBuf },
    #[error(
        "No materials replacement rule list found at '{}'. Please create a '{}' file and add your rules there.",
        .path.display(),
        file_label(.path)
    )]
    MissingRuleFile { path: PathBuf },
    #[error("Failed to read '{}': {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse '{}': {detail}", .path.display())]
    Malformed { path: PathBuf, detail: String },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Groq request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Groq request failed with status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("Groq response was malformed: {0}")]
    MalformedResponse(String),
}

/// Everything that can stop a caption run. None of these are retried.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("{0}")]
    Precondition(String),
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
