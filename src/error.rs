//! Error types for loading books and playing speech.
//!
//! Each family maps onto one short user-facing message; the reader session
//! shows that message and logs the detailed error.

use std::path::PathBuf;
use std::time::Duration;

pub const LOAD_FAILED_MESSAGE: &str =
    "Failed to parse the file. Please try a different PDF or Text file.";
pub const SPEECH_FAILED_MESSAGE: &str =
    "Failed to generate speech. Please check your API key or connection.";

/// Failure while turning a file into a book.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF text extraction failed: {0}")]
    Extraction(String),
}

impl LoadError {
    pub fn user_message(&self) -> &'static str {
        LOAD_FAILED_MESSAGE
    }
}

/// Failure of the remote speech service.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("API key is not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("speech request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("speech service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no audio data returned by the speech service")]
    NoAudio,

    #[error("speech service returned an invalid audio payload: {0}")]
    InvalidPayload(String),

    #[error("speech request timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure to interpret returned audio bytes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("audio payload is empty")]
    Empty,

    #[error("audio payload length {0} is not a whole number of 16-bit frames")]
    Truncated(usize),
}

/// Failure of the local audio device.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to open audio output: {0}")]
    Device(String),

    #[error("audio thread is no longer running")]
    ThreadDied,
}

/// Anything that can stop `speak` from reaching the `Playing` state.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Output(#[from] AudioError),
}

impl PlaybackError {
    pub fn user_message(&self) -> &'static str {
        SPEECH_FAILED_MESSAGE
    }
}
