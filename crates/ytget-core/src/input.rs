//! Classification of command-line targets

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// What a command-line argument refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A watch page URL
    Video(String),
    /// A playlist page URL
    Playlist(String),
    /// A saved watch page on disk
    LocalFile(PathBuf),
    /// Neither a URL we understand nor a bare id
    Unrecognized(String),
}

fn video_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"watch\?v=|watch\?.*&v=|youtu\.be/").unwrap())
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]v=([^&#]+)|youtu\.be/([^?&#/]+)").unwrap())
}

/// Classify one argument. Anything without an `http(s)://` scheme is taken
/// as a bare video id.
pub fn classify(arg: &str) -> Target {
    let arg = arg.trim();

    if let Some(path) = arg.strip_prefix("file://") {
        return Target::LocalFile(PathBuf::from(path));
    }

    if !arg.starts_with("http://") && !arg.starts_with("https://") {
        return Target::Video(watch_url(arg));
    }

    if video_regex().is_match(arg) {
        Target::Video(arg.to_string())
    } else if arg.contains("playlist?list=") {
        Target::Playlist(arg.to_string())
    } else {
        Target::Unrecognized(arg.to_string())
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL, video_id)
}

/// The `v=` parameter of a watch URL, or the path of a `youtu.be` link.
pub fn video_id(url: &str) -> Option<String> {
    let caps = video_id_regex().captures(url)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}
