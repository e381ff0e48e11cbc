//! Output file naming

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Extension used when the media type has no known extension.
pub const UNKNOWN_EXTENSION: &str = ".VIDEO";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// `Title.1.mp4`, `Title.2.mp4`, ... like wget
    #[default]
    Suffix,
    /// Replace the existing file
    Overwrite,
    /// Ask for another name
    Prompt,
}

/// File extension, with its dot, for a `type/subtype` media type.
///
/// A few site types get fixed extensions; everything else goes through the
/// MIME table, preferring the extension named like the subtype.
pub fn extension_for(media_type: &str) -> String {
    let fixed = match media_type {
        "audio/webm" => Some(".weba"),
        "audio/mp4" => Some(".m4a"),
        "video/flv" | "video/x-flv" => Some(".flv"),
        "video/3gpp" => Some(".3gp"),
        _ => None,
    };
    if let Some(ext) = fixed {
        return ext.to_string();
    }

    let Some(extensions) = mime_guess::get_mime_extensions_str(media_type) else {
        return UNKNOWN_EXTENSION.to_string();
    };
    let subtype = media_type
        .split_once('/')
        .map(|(_, subtype)| subtype.trim_start_matches("x-"))
        .unwrap_or_default();

    extensions
        .iter()
        .find(|ext| **ext == subtype)
        .or_else(|| extensions.first())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| UNKNOWN_EXTENSION.to_string())
}

/// Sanitize filename for filesystem
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// File stem for a video: its sanitized title, optionally followed by
/// " - YouTube <id>". Falls back to the id, then to "video".
pub fn file_stem(title: Option<&str>, video_id: Option<&str>, append_id: bool) -> String {
    let title = title
        .map(sanitize_filename)
        .filter(|t| !t.is_empty())
        .or_else(|| video_id.map(sanitize_filename))
        .unwrap_or_else(|| "video".to_string());

    match video_id {
        Some(id) if append_id => format!("{} - YouTube {}", title, sanitize_filename(id)),
        _ => title,
    }
}

/// Asks for a replacement stem when a file name is taken.
pub trait NamePrompt {
    fn new_name(&mut self, taken: &Path) -> io::Result<String>;
}

/// Pick the output path for `stem` + `extension` in `dir`.
///
/// `ask` is called with the taken path under [`CollisionPolicy::Prompt`] and
/// returns a new stem.
pub fn resolve_output_path(
    dir: &Path,
    stem: &str,
    extension: &str,
    policy: CollisionPolicy,
    ask: &mut dyn FnMut(&Path) -> io::Result<String>,
) -> io::Result<PathBuf> {
    let mut path = dir.join(format!("{}{}", stem, extension));

    match policy {
        CollisionPolicy::Overwrite => {}
        CollisionPolicy::Suffix => {
            let mut n = 1u32;
            while path.exists() {
                path = dir.join(format!("{}.{}{}", stem, n, extension));
                n += 1;
            }
        }
        CollisionPolicy::Prompt => {
            while path.exists() {
                let stem = sanitize_filename(&ask(&path)?);
                if !stem.is_empty() {
                    path = dir.join(format!("{}{}", stem, extension));
                }
            }
        }
    }

    Ok(path)
}
