use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use ytget_core::{
    config::Config,
    input::{classify, Target},
    page::PageClient,
    pipeline::{Pipeline, PipelineConfig, Source},
    presenter::render_catalog,
};

pub async fn run(url: &str, files: bool, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let client = PageClient::new(&config.network.user_agent, config.timeout())?;

    let source = if files {
        Source::File(PathBuf::from(url))
    } else {
        match classify(url) {
            Target::Video(url) => Source::Url(url),
            Target::LocalFile(path) => Source::File(path),
            Target::Playlist(url) => {
                anyhow::bail!("{} is a playlist; list formats one video at a time", url)
            }
            Target::Unrecognized(arg) => anyhow::bail!("Confusing argument: {}", arg),
        }
    };

    // Listing doesn't render progress
    let (tx, mut rx) = mpsc::channel(8);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let pipeline = Pipeline::new(PipelineConfig::from_config(&config), client, tx);
    let (page, catalog) = pipeline.catalog(&source).await?;

    if json {
        let value = serde_json::json!({
            "source": page.source,
            "title": page.title(),
            "formats": catalog,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        if let Some(title) = page.title() {
            println!("{}\n", title);
        }
        print!("{}", render_catalog(&catalog));
    }

    Ok(())
}
