use clap::{Parser, Subcommand};
use std::path::PathBuf;
use ytget_core::{
    config::Config,
    naming::CollisionPolicy,
    pipeline::PipelineConfig,
    selector::SelectionMode,
};

#[derive(Parser)]
#[command(name = "ytget")]
#[command(author, version, about = "Download YouTube videos from the command line")]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Video URLs, bare video ids or playlist URLs (shorthand for `get <URL>...`)
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    #[command(flatten)]
    pub options: GetOptions,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download one or more videos
    Get {
        /// Video URLs, bare video ids or playlist URLs
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        #[command(flatten)]
        options: GetOptions,
    },

    /// Download every URL listed in a file
    Batch {
        /// File containing URLs (one per line)
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        options: GetOptions,
    },

    /// List the available formats without downloading
    Formats {
        /// Video URL, bare video id, or saved page with --files
        #[arg(value_name = "URL")]
        url: String,

        /// Read the page from a local file
        #[arg(short, long)]
        files: bool,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check external dependencies
    Doctor,

    /// Show configuration
    Config,
}

#[derive(clap::Args, Clone, Debug, Default)]
#[command(group = clap::ArgGroup::new("quality").multiple(false))]
pub struct GetOptions {
    /// Do everything except download
    #[arg(short, long)]
    pub simulate: bool,

    /// Treat arguments as saved watch pages on disk
    #[arg(short, long)]
    pub files: bool,

    /// Append " - YouTube <id>" to file names
    #[arg(short = 'i', long)]
    pub append_id: bool,

    /// Mux a split video stream with its matching audio (needs ffmpeg)
    #[arg(short, long)]
    pub combine: bool,

    /// Overwrite existing files
    #[arg(short = 'O', long, conflicts_with = "prompt_name")]
    pub overwrite: bool,

    /// Ask for a new name when the file exists
    #[arg(short = 'n', long)]
    pub prompt_name: bool,

    /// Pick the highest quality format without asking
    #[arg(short = 'M', long = "max-quality", group = "quality")]
    pub highest_quality: bool,

    /// Pick the lowest quality format without asking
    #[arg(short = 'm', long = "min-quality", group = "quality")]
    pub lowest_quality: bool,

    /// Pick the highest quality MP4 without asking
    #[arg(short = 'P', long = "max-mp4", group = "quality")]
    pub highest_mp4: bool,

    /// Pick the lowest quality MP4 without asking
    #[arg(short = 'p', long = "min-mp4", group = "quality")]
    pub lowest_mp4: bool,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl GetOptions {
    pub fn selection_mode(&self) -> Option<SelectionMode> {
        if self.highest_quality {
            Some(SelectionMode::HighestQuality)
        } else if self.lowest_quality {
            Some(SelectionMode::LowestQuality)
        } else if self.highest_mp4 {
            Some(SelectionMode::HighestMp4)
        } else if self.lowest_mp4 {
            Some(SelectionMode::LowestMp4)
        } else {
            None
        }
    }

    pub fn collision(&self) -> Option<CollisionPolicy> {
        if self.overwrite {
            Some(CollisionPolicy::Overwrite)
        } else if self.prompt_name {
            Some(CollisionPolicy::Prompt)
        } else {
            None
        }
    }

    /// Loaded configuration with this invocation's flags on top.
    pub fn pipeline_config(&self, config: &Config) -> PipelineConfig {
        let mut pipeline_config = PipelineConfig::from_config(config);

        if let Some(output) = &self.output {
            pipeline_config.output_dir = output.clone();
        }
        if let Some(mode) = self.selection_mode() {
            pipeline_config.policy.mode = mode;
        }
        if let Some(collision) = self.collision() {
            pipeline_config.collision = collision;
        }
        pipeline_config.append_id |= self.append_id;
        pipeline_config.simulate = self.simulate;
        pipeline_config.policy.combine_split_streams |= self.combine;

        pipeline_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_urls_with_flags() {
        let cli = Cli::try_parse_from(["ytget", "-M", "-c", "-s", "abc", "def"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.urls, vec!["abc", "def"]);
        assert_eq!(cli.options.selection_mode(), Some(SelectionMode::HighestQuality));

        let config = cli.options.pipeline_config(&Config::default());
        assert!(config.simulate);
        assert!(config.policy.combine_split_streams);
        assert_eq!(config.policy.mode, SelectionMode::HighestQuality);
        assert_eq!(config.collision, CollisionPolicy::Suffix);
    }

    #[test]
    fn test_quality_flag_letters() {
        let mode = |flag: &str| {
            Cli::try_parse_from(["ytget", flag, "abc"])
                .unwrap()
                .options
                .selection_mode()
        };
        assert_eq!(mode("-M"), Some(SelectionMode::HighestQuality));
        assert_eq!(mode("-m"), Some(SelectionMode::LowestQuality));
        assert_eq!(mode("-P"), Some(SelectionMode::HighestMp4));
        assert_eq!(mode("-p"), Some(SelectionMode::LowestMp4));
        assert_eq!(mode("--max-quality"), Some(SelectionMode::HighestQuality));
        assert_eq!(mode("--min-mp4"), Some(SelectionMode::LowestMp4));
    }

    #[test]
    fn test_quality_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["ytget", "-M", "-p", "abc"]).is_err());
        assert!(Cli::try_parse_from(["ytget", "-O", "-n", "abc"]).is_err());
    }

    #[test]
    fn test_config_defaults_survive_without_flags() {
        let mut config = Config::default();
        config.selection.policy = SelectionMode::LowestQuality;
        config.output.collision = CollisionPolicy::Overwrite;

        let pipeline_config = GetOptions::default().pipeline_config(&config);
        assert_eq!(pipeline_config.policy.mode, SelectionMode::LowestQuality);
        assert_eq!(pipeline_config.collision, CollisionPolicy::Overwrite);
        assert!(!pipeline_config.simulate);
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::try_parse_from(["ytget", "formats", "--json", "abc"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Formats { json: true, files: false, .. })
        ));

        let cli = Cli::try_parse_from(["ytget", "-vv", "batch", "--input", "urls.txt", "-P"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Batch { input, options }) => {
                assert_eq!(input, PathBuf::from("urls.txt"));
                assert!(options.highest_mp4);
                assert_eq!(options.selection_mode(), Some(SelectionMode::HighestMp4));
            }
            _ => panic!("expected batch"),
        }
    }
}
