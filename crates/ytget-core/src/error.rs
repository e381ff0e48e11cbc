//! Error types for ytget-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, YtGetError>;

#[derive(Error, Debug)]
pub enum YtGetError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Selection failed: {0}")]
    Select(#[from] SelectError),

    #[error("Mux failed: {0}")]
    Mux(#[from] MuxError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status} for {url}. Maybe there's a 404 error?")]
    NotFound { url: String, status: u16 },

    #[error("Network error: {0}. Maybe there's a connectivity problem?")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No video data found")]
    NoVideoData,
}

#[derive(Error, Debug)]
pub enum SelectError {
    #[error("No format matches {0}")]
    NoMatchingFormat(String),

    #[error("No {0} audio stream to pair with the selected video")]
    NoMatchingAudio(String),

    #[error("Select a video format first and an audio format will be selected for it")]
    AudioSelectedDirectly,

    #[error("Interactive selection needs a terminal")]
    InteractiveUnavailable,

    #[error("Input closed before a format was chosen")]
    InputClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("ffmpeg not found; install it or set paths.ffmpeg")]
    FfmpegNotFound,

    #[error("FFmpeg mux failed with exit code: {0:?}")]
    FfmpegFailed(Option<i32>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
