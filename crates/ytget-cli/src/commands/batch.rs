use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use super::get;
use crate::args::GetOptions;
use ytget_core::{config::Config, page::PageClient};

pub async fn run(
    input: &Path,
    options: &GetOptions,
    config_path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let config = Config::load(config_path)?;

    // Read URLs from file
    let content = fs::read_to_string(input)
        .await
        .context("Failed to read input file")?;

    let urls = parse_url_list(&content);
    if urls.is_empty() {
        println!("No URLs found in input file");
        return Ok(());
    }

    let client = PageClient::new(&config.network.user_agent, config.timeout())?;
    let sources = get::resolve_sources(&client, &urls, options.files).await;

    if !quiet {
        println!("Processing {} videos\n", sources.len());
    }

    let summary = get::process(&sources, options.pipeline_config(&config), client, quiet).await;
    summary.print();

    Ok(())
}

/// One URL per line; blank lines and `#` comments are ignored.
fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_list() {
        let content = "# favourites\n\
                       https://www.youtube.com/watch?v=aaa\n\
                       \n\
                         bbb  \n\
                       # https://www.youtube.com/watch?v=skipped\n";
        assert_eq!(
            parse_url_list(content),
            vec!["https://www.youtube.com/watch?v=aaa", "bbb"]
        );
        assert!(parse_url_list("\n# only comments\n").is_empty());
    }
}
