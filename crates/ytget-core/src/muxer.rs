//! Audio/video muxing using FFmpeg

use crate::error::MuxError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Muxer {
    ffmpeg_path: PathBuf,
}

impl Muxer {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }

    /// Combine a video-only and an audio-only file without re-encoding
    pub async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MuxError> {
        info!("Combining files with ffmpeg: {}", output.display());

        let status = Command::new(&self.ffmpeg_path)
            .args(Self::mux_args(video, audio, output))
            .status()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MuxError::FfmpegNotFound,
                _ => MuxError::Io(e),
            })?;

        if !status.success() {
            return Err(MuxError::FfmpegFailed(status.code()));
        }

        debug!("Muxed to: {}", output.display());
        Ok(())
    }

    fn mux_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(12);
        args.push("-i".into());
        args.push(video.into());
        args.push("-i".into());
        args.push(audio.into());
        args.extend(["-vcodec", "copy", "-acodec", "copy", "-y"].map(OsString::from));
        args.push(output.into());
        args.extend(["-loglevel", "warning"].map(OsString::from));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_args() {
        let args = Muxer::mux_args(Path::new("/tmp/v"), Path::new("/tmp/a"), Path::new("Clip.mp4"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-i", "/tmp/v", "-i", "/tmp/a", "-vcodec", "copy", "-acodec", "copy", "-y",
                "Clip.mp4", "-loglevel", "warning"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_ffmpeg() {
        let muxer = Muxer::new(PathBuf::from("/nonexistent/ffmpeg"));
        let result = muxer
            .mux(Path::new("/tmp/v"), Path::new("/tmp/a"), Path::new("/tmp/out.mp4"))
            .await;
        assert!(matches!(result, Err(MuxError::FfmpegNotFound)));
    }
}
