use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::args::GetOptions;
use ytget_core::{
    config::Config,
    input::{classify, watch_url, Target},
    page::PageClient,
    pipeline::{Pipeline, PipelineConfig, PipelineStage, Source, StreamRole},
    selector::PromptChoice,
};

pub async fn run(
    urls: &[String],
    options: &GetOptions,
    config_path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let client = PageClient::new(&config.network.user_agent, config.timeout())?;

    let args = if urls.is_empty() {
        ask_for_urls()?
    } else {
        urls.to_vec()
    };

    let sources = resolve_sources(&client, &args, options.files).await;
    if sources.is_empty() {
        anyhow::bail!("Nothing to download");
    }

    let summary = process(&sources, options.pipeline_config(&config), client, quiet).await;
    if sources.len() > 1 && !quiet {
        summary.print();
    }

    if summary.failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} of {} downloads failed", summary.failed.len(), sources.len())
    }
}

fn ask_for_urls() -> Result<Vec<String>> {
    print!("Enter the URLs or video ids to download, separated by spaces: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read URLs")?;
    Ok(line.split_whitespace().map(String::from).collect())
}

/// Turn command-line arguments into pages to process, expanding playlists.
/// Arguments that cannot be used are reported and skipped.
pub async fn resolve_sources(client: &PageClient, args: &[String], files: bool) -> Vec<Source> {
    let mut sources = Vec::new();

    for arg in args {
        if files {
            sources.push(Source::File(PathBuf::from(arg)));
            continue;
        }

        match classify(arg) {
            Target::Video(url) => sources.push(Source::Url(url)),
            Target::LocalFile(path) => sources.push(Source::File(path)),
            Target::Playlist(url) => match client.playlist_video_ids(&url).await {
                Ok(ids) if ids.is_empty() => warn!("No videos found in playlist: {}", url),
                Ok(ids) => {
                    info!("Playlist {}: {} videos", url, ids.len());
                    sources.extend(ids.iter().map(|id| Source::Url(watch_url(id))));
                }
                Err(e) => error!("Failed to read playlist {}: {}", url, e),
            },
            Target::Unrecognized(arg) => error!("Confusing argument: {}", arg),
        }
    }

    sources
}

#[derive(Debug, Default)]
pub struct Summary {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

impl Summary {
    pub fn print(&self) {
        println!("\n=== Download Complete ===");
        println!("Succeeded: {}", self.succeeded.len());
        println!("Failed: {}", self.failed.len());

        if !self.failed.is_empty() {
            println!("\nFailed URLs:");
            for (source, error) in &self.failed {
                println!("  {} - {}", source, error);
            }
        }
    }
}

/// Run the pipeline for every source in order. A failure is logged and the
/// next source is processed.
pub async fn process(
    sources: &[Source],
    config: PipelineConfig,
    client: PageClient,
    quiet: bool,
) -> Summary {
    let mut prompt = PromptChoice::new(io::stdin().lock(), io::stdout());
    let mut summary = Summary::default();
    let total = sources.len();

    for (idx, source) in sources.iter().enumerate() {
        if total > 1 && !quiet {
            println!("[{}/{}] {}", idx + 1, total, source);
        }

        let (tx, rx) = mpsc::channel(32);
        let progress_handle = tokio::spawn(render_progress(rx, quiet));

        let pipeline = Pipeline::new(config.clone(), client.clone(), tx);
        let result = pipeline.run(source, &mut prompt).await;
        drop(pipeline);
        let _ = progress_handle.await;

        match result {
            Ok(outcome) => summary.succeeded.push(outcome.output),
            Err(e) => {
                error!("{}: {}", source, e);
                summary.failed.push((source.to_string(), e.to_string()));
            }
        }
    }

    summary
}

async fn render_progress(mut rx: mpsc::Receiver<PipelineStage>, quiet: bool) {
    let mut bar: Option<(StreamRole, ProgressBar)> = None;

    while let Some(stage) = rx.recv().await {
        if quiet {
            continue;
        }

        match stage {
            PipelineStage::FetchingPage { .. } => {}
            PipelineStage::Selected {
                number,
                format,
                audio,
            } => match audio {
                Some((audio_number, audio)) => println!(
                    "Selected #{} {} with audio #{} {}",
                    number, format, audio_number, audio
                ),
                None => println!("Selected #{} {}", number, format),
            },
            PipelineStage::Downloading { role, progress } => {
                if bar.as_ref().map(|(current, _)| *current) != Some(role) {
                    if let Some((_, pb)) = bar.take() {
                        pb.finish();
                    }
                    let pb = download_bar();
                    pb.set_message(format!("Downloading {}", role));
                    bar = Some((role, pb));
                }
                if let Some((_, pb)) = &bar {
                    if let Some(total) = progress.total {
                        pb.set_length(total);
                    }
                    pb.set_position(progress.downloaded);
                }
            }
            PipelineStage::Muxing { output } => {
                if let Some((_, pb)) = bar.take() {
                    pb.finish();
                }
                println!("Combining into {}", output.display());
            }
            PipelineStage::Complete {
                output,
                duration,
                simulated,
            } => {
                if let Some((_, pb)) = bar.take() {
                    pb.finish();
                }
                let verb = if simulated { "Would save" } else { "Saved" };
                println!("{}: {} ({:.1}s)", verb, output.display(), duration.as_secs_f32());
            }
            PipelineStage::Failed { stage, error } => {
                if let Some((_, pb)) = bar.take() {
                    pb.abandon_with_message(format!("Failed at {}: {}", stage, error));
                }
            }
        }
    }
}

fn download_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
        )
        .unwrap()
        .progress_chars("=>-"),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client() -> PageClient {
        PageClient::new("ytget-test", Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_sources_classifies_arguments() {
        let args = vec![
            "dQw4w9WgXcQ".to_string(),
            "https://youtu.be/abc".to_string(),
            "https://example.com/other".to_string(),
            "file:///tmp/watch.html".to_string(),
        ];
        let sources = resolve_sources(&client(), &args, false).await;

        assert_eq!(
            sources,
            vec![
                Source::Url("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
                Source::Url("https://youtu.be/abc".to_string()),
                Source::File(PathBuf::from("/tmp/watch.html")),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_sources_files_flag() {
        let args = vec!["saved.html".to_string(), "https://youtu.be/abc".to_string()];
        let sources = resolve_sources(&client(), &args, true).await;

        assert_eq!(
            sources,
            vec![
                Source::File(PathBuf::from("saved.html")),
                Source::File(PathBuf::from("https://youtu.be/abc")),
            ]
        );
    }
}
