//! Per-video orchestration: page, catalog, selection, file name, retrieval

use crate::catalog::{build_catalog, Catalog};
use crate::config::Config;
use crate::downloader::{Downloader, Progress};
use crate::error::{MuxError, YtGetError};
use crate::input::video_id;
use crate::muxer::Muxer;
use crate::naming::{extension_for, file_stem, resolve_output_path, CollisionPolicy, NamePrompt};
use crate::page::{Page, PageClient};
use crate::selector::{ChoiceSource, Selection, SelectionPolicy, Selector};

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where a watch page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub append_id: bool,
    pub collision: CollisionPolicy,
    pub policy: SelectionPolicy,
    pub simulate: bool,
    pub temp_dir: PathBuf,
    /// Resolved ffmpeg binary; `None` when it could not be found
    pub ffmpeg: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output.directory.clone(),
            append_id: config.output.append_id,
            collision: config.output.collision,
            policy: config.selection_policy(),
            simulate: false,
            temp_dir: config.temp_dir(),
            ffmpeg: config.ffmpeg_path().ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Video,
    Audio,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRole::Video => write!(f, "video"),
            StreamRole::Audio => write!(f, "audio"),
        }
    }
}

/// Pipeline progress stages
#[derive(Debug, Clone)]
pub enum PipelineStage {
    FetchingPage { source: String },
    Selected { number: usize, format: String, audio: Option<(usize, String)> },
    Downloading { role: StreamRole, progress: Progress },
    Muxing { output: PathBuf },
    Complete { output: PathBuf, duration: Duration, simulated: bool },
    Failed { stage: String, error: String },
}

/// Result of one successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub output: PathBuf,
    pub selection: Selection,
    pub simulated: bool,
}

/// Main processing pipeline
pub struct Pipeline {
    config: PipelineConfig,
    client: PageClient,
    progress_tx: mpsc::Sender<PipelineStage>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        client: PageClient,
        progress_tx: mpsc::Sender<PipelineStage>,
    ) -> Self {
        Self {
            config,
            client,
            progress_tx,
        }
    }

    /// Fetch the page and build its catalog, logging recoverable anomalies.
    pub async fn catalog(&self, source: &Source) -> Result<(Page, Catalog), YtGetError> {
        let _ = self
            .progress_tx
            .send(PipelineStage::FetchingPage {
                source: source.to_string(),
            })
            .await;

        let page = match source {
            Source::Url(url) => self.client.fetch(url).await,
            Source::File(path) => PageClient::read_local(path).await,
        }
        .map_err(|e| self.failed("fetch", e))?;

        let outcome = build_catalog(&page.body).map_err(|e| self.failed("extract", e))?;
        for diagnostic in &outcome.diagnostics {
            warn!("{}: {}", source, diagnostic);
        }

        Ok((page, outcome.catalog))
    }

    /// Run one video end to end. `prompt` answers interactive selection and
    /// file-name collisions.
    pub async fn run<P>(&self, source: &Source, prompt: &mut P) -> Result<PipelineOutcome, YtGetError>
    where
        P: ChoiceSource + NamePrompt,
    {
        let start_time = Instant::now();
        info!("Starting pipeline for: {}", source);

        // 1. Page and catalog
        let (page, catalog) = self.catalog(source).await?;

        // 2. Selection
        let selection = Selector::new(self.config.policy)
            .select(&catalog, &mut *prompt)
            .map_err(|e| self.failed("select", e))?;

        let chosen = catalog
            .get(selection.index)
            .ok_or_else(|| YtGetError::Io(io::Error::other("selected format vanished")))?;
        let audio = selection.audio.and_then(|i| catalog.get(i));

        let _ = self
            .progress_tx
            .send(PipelineStage::Selected {
                number: selection.index + 1,
                format: format!("{} ({})", chosen.id, chosen.media_type),
                audio: selection
                    .audio
                    .zip(audio)
                    .map(|(i, a)| (i + 1, format!("{} ({})", a.id, a.media_type))),
            })
            .await;

        // 3. Output file name
        let id = match source {
            Source::Url(url) => video_id(url),
            Source::File(_) => None,
        };
        let stem = file_stem(page.title().as_deref(), id.as_deref(), self.config.append_id);
        let output = resolve_output_path(
            &self.config.output_dir,
            &stem,
            &extension_for(&chosen.media_type),
            self.config.collision,
            &mut |taken: &Path| prompt.new_name(taken),
        )
        .map_err(|e| self.failed("name", e))?;

        if self.config.simulate {
            info!("Simulated download: {}", output.display());
            return Ok(self.complete(output, selection, start_time, true).await);
        }

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| self.failed("download", e))?;

        // 4. Retrieval, muxing split streams when an audio partner was chosen
        let downloader = Downloader::new(self.client.http().clone());
        match audio {
            Some(audio) => {
                let ffmpeg = self
                    .config
                    .ffmpeg
                    .clone()
                    .ok_or_else(|| self.failed("mux", MuxError::FfmpegNotFound))?;
                let muxer = Muxer::new(ffmpeg);

                let video_tmp = self
                    .temp_file("ytget_video_")
                    .map_err(|e| self.failed("download", e))?;
                let audio_tmp = self
                    .temp_file("ytget_audio_")
                    .map_err(|e| self.failed("download", e))?;
                debug!(
                    "Temporary files: {} {}",
                    video_tmp.path().display(),
                    audio_tmp.path().display()
                );

                self.download(&downloader, StreamRole::Video, &chosen.url, video_tmp.path())
                    .await?;
                self.download(&downloader, StreamRole::Audio, &audio.url, audio_tmp.path())
                    .await?;

                let _ = self
                    .progress_tx
                    .send(PipelineStage::Muxing {
                        output: output.clone(),
                    })
                    .await;
                muxer
                    .mux(video_tmp.path(), audio_tmp.path(), &output)
                    .await
                    .map_err(|e| self.failed("mux", e))?;
                // temporaries are removed on drop
            }
            None => {
                self.download(&downloader, StreamRole::Video, &chosen.url, &output)
                    .await?;
            }
        }

        Ok(self.complete(output, selection, start_time, false).await)
    }

    async fn download(
        &self,
        downloader: &Downloader,
        role: StreamRole,
        url: &str,
        dest: &Path,
    ) -> Result<u64, YtGetError> {
        let tx = self.progress_tx.clone();
        let bytes = downloader
            .retrieve(url, dest, |progress| {
                let _ = tx.try_send(PipelineStage::Downloading { role, progress });
            })
            .await
            .map_err(|e| self.failed("download", e))?;
        Ok(bytes)
    }

    async fn complete(
        &self,
        output: PathBuf,
        selection: Selection,
        start_time: Instant,
        simulated: bool,
    ) -> PipelineOutcome {
        let duration = start_time.elapsed();
        info!("Pipeline complete: {} ({:.1}s)", output.display(), duration.as_secs_f32());

        let _ = self
            .progress_tx
            .send(PipelineStage::Complete {
                output: output.clone(),
                duration,
                simulated,
            })
            .await;

        PipelineOutcome {
            output,
            selection,
            simulated,
        }
    }

    fn temp_file(&self, prefix: &str) -> io::Result<tempfile::NamedTempFile> {
        tempfile::Builder::new()
            .prefix(prefix)
            .tempfile_in(&self.config.temp_dir)
    }

    /// Report a failed stage and pass the error on.
    fn failed<E: Into<YtGetError>>(&self, stage: &str, error: E) -> YtGetError {
        let error = error.into();
        let _ = self.progress_tx.try_send(PipelineStage::Failed {
            stage: stage.to_string(),
            error: error.to_string(),
        });
        error
    }
}
