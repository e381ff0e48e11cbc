//! Format catalog built from the stream metadata embedded in a watch page
//!
//! The watch page carries one line with three quoted segments: `fmt_list`
//! (format id to resolution label), `url_encoded_fmt_stream_map` (progressive
//! formats, audio and video muxed) and `adaptive_fmts` (split audio-only and
//! video-only formats). Ordering inside each segment is preserved; the
//! selector relies on it.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::error::ExtractError;
use crate::escape::decode_percent;
use crate::records::{parse_records, RawRecord};

/// Substring identifying the metadata line.
const METADATA_MARKER: &str = "\"url_encoded_fmt_stream_map\"";

const PROGRESSIVE_KEY: &str = "url_encoded_fmt_stream_map";
const ADAPTIVE_KEY: &str = "adaptive_fmts";

/// Auxiliary fields whose values are themselves percent-encoded.
const URL_FORM_FIELDS: &[&str] = &["fallback_host"];

fn fmt_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""fmt_list":"([^"]+)""#).unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Audio and video in one stream
    Progressive,
    /// Audio-only or video-only stream
    Adaptive,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Progressive => write!(f, "progressive"),
            FormatKind::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// One downloadable encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Format {
    /// Format tag (`itag`)
    pub id: String,
    /// Fully decoded resource URL
    pub url: String,
    /// `type/subtype` with codec parameters stripped
    pub media_type: String,
    /// Quality label; progressive formats only
    pub quality: Option<String>,
    /// Resolution label from `fmt_list`; progressive formats only
    pub resolution: Option<String>,
    /// Every other field of the record (`bitrate`, `fps`, `size`, `index`, `init`, ...)
    pub extras: BTreeMap<String, String>,
}

impl Format {
    pub fn extra(&self, name: &str) -> Option<&str> {
        self.extras.get(name).map(String::as_str)
    }

    pub fn is_audio(&self) -> bool {
        self.media_type.starts_with("audio/")
    }

    fn from_record(
        kind: FormatKind,
        position: usize,
        record: &RawRecord,
        quality_by_id: &BTreeMap<String, String>,
    ) -> Result<Self, Diagnostic> {
        let required = |field: &'static str| {
            record
                .get(field)
                .filter(|value| !value.is_empty())
                .ok_or(Diagnostic::MalformedRecord { kind, position, field })
        };

        let id = required("itag")?.to_string();
        let url = decode_percent(required("url")?);
        let media_type = strip_media_type(&decode_percent(required("type")?));

        if reqwest::Url::parse(&url).is_err() {
            return Err(Diagnostic::InvalidUrl { kind, id });
        }

        let (quality, resolution) = match kind {
            FormatKind::Progressive => {
                let resolution = quality_by_id.get(&id).cloned();
                let quality = record
                    .get("quality")
                    .map(str::to_string)
                    .or_else(|| resolution.clone());
                (quality, resolution)
            }
            FormatKind::Adaptive => (None, None),
        };

        let extras = record
            .fields()
            .filter(|(name, _)| !matches!(*name, "itag" | "url" | "type"))
            .filter(|(name, _)| !(kind == FormatKind::Progressive && *name == "quality"))
            .map(|(name, value)| {
                let value = if URL_FORM_FIELDS.contains(&name) {
                    decode_percent(value)
                } else {
                    value.to_string()
                };
                (name.to_string(), value)
            })
            .collect();

        Ok(Self {
            id,
            url,
            media_type,
            quality,
            resolution,
            extras,
        })
    }
}

/// Progressive and adaptive formats of one watch page.
///
/// Indexes address the concatenation `progressive ++ adaptive` and are
/// 0-based.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    progressive: Vec<Format>,
    adaptive: Vec<Format>,
    quality_by_id: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new(
        progressive: Vec<Format>,
        adaptive: Vec<Format>,
        quality_by_id: BTreeMap<String, String>,
    ) -> Self {
        Self {
            progressive,
            adaptive,
            quality_by_id,
        }
    }

    pub fn progressive(&self) -> &[Format] {
        &self.progressive
    }

    pub fn adaptive(&self) -> &[Format] {
        &self.adaptive
    }

    pub fn quality_by_id(&self) -> &BTreeMap<String, String> {
        &self.quality_by_id
    }

    pub fn len(&self) -> usize {
        self.progressive.len() + self.adaptive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Format> {
        self.iter().nth(index)
    }

    pub fn kind_of(&self, index: usize) -> Option<FormatKind> {
        if index < self.progressive.len() {
            Some(FormatKind::Progressive)
        } else if index < self.len() {
            Some(FormatKind::Adaptive)
        } else {
            None
        }
    }

    /// Progressive formats followed by adaptive formats.
    pub fn iter(&self) -> impl Iterator<Item = &Format> {
        self.progressive.iter().chain(self.adaptive.iter())
    }
}

/// A recoverable anomaly met while building a catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("No fmt_list data found, quality labels unavailable")]
    FmtListMissing,

    #[error("No {0} data found")]
    SegmentMissing(&'static str),

    #[error("Malformed fmt_list entry: {0}")]
    MalformedFmtEntry(String),

    #[error("{kind} record {position} has no {field}, dropped")]
    MalformedRecord {
        kind: FormatKind,
        position: usize,
        field: &'static str,
    },

    #[error("{kind} record {position}: skipped field without '=': {piece}")]
    MalformedField {
        kind: FormatKind,
        position: usize,
        piece: String,
    },

    #[error("{kind} format {id} has an invalid url, dropped")]
    InvalidUrl { kind: FormatKind, id: String },

    #[error("{kind} format {id} listed twice, duplicate dropped")]
    DuplicateFormat { kind: FormatKind, id: String },
}

/// A catalog plus the anomalies skipped while building it.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub catalog: Catalog,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the format catalog from a complete watch-page body.
///
/// Fails only when the page has no metadata line; every other problem is
/// reported in [`BuildOutcome::diagnostics`].
pub fn build_catalog(page: &str) -> Result<BuildOutcome, ExtractError> {
    let line = page
        .lines()
        .find(|line| line.contains(METADATA_MARKER))
        .ok_or(ExtractError::NoVideoData)?;

    let mut diagnostics = Vec::new();

    let quality_by_id = match fmt_list_regex().captures(line).and_then(|c| c.get(1)) {
        Some(list) => parse_fmt_list(list.as_str(), &mut diagnostics),
        None => {
            diagnostics.push(Diagnostic::FmtListMissing);
            BTreeMap::new()
        }
    };

    let progressive = segment_formats(
        FormatKind::Progressive,
        line,
        PROGRESSIVE_KEY,
        &quality_by_id,
        &mut diagnostics,
    );
    let adaptive = segment_formats(
        FormatKind::Adaptive,
        line,
        ADAPTIVE_KEY,
        &quality_by_id,
        &mut diagnostics,
    );

    debug!(
        "Catalog: {} progressive, {} adaptive, {} fmt_list entries",
        progressive.len(),
        adaptive.len(),
        quality_by_id.len()
    );

    Ok(BuildOutcome {
        catalog: Catalog::new(progressive, adaptive, quality_by_id),
        diagnostics,
    })
}

/// Entries look like `22\/1280x720\/9\/0\/115`; the label is the second part.
fn parse_fmt_list(list: &str, diagnostics: &mut Vec<Diagnostic>) -> BTreeMap<String, String> {
    let mut quality_by_id = BTreeMap::new();

    for entry in list.split(',').filter(|e| !e.is_empty()) {
        let normalized = entry.replace("\\/", "/");
        let mut parts = normalized.split('/');
        match (parts.next(), parts.next()) {
            (Some(id), Some(label)) if !id.is_empty() => {
                quality_by_id.insert(id.to_string(), label.to_string());
            }
            _ => diagnostics.push(Diagnostic::MalformedFmtEntry(entry.to_string())),
        }
    }

    quality_by_id
}

fn segment_formats(
    kind: FormatKind,
    line: &str,
    key: &'static str,
    quality_by_id: &BTreeMap<String, String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Format> {
    let Some(blob) = quoted_value(line, key) else {
        diagnostics.push(Diagnostic::SegmentMissing(key));
        return Vec::new();
    };

    let mut formats = Vec::new();
    let mut seen = HashSet::new();

    for (i, record) in parse_records(blob).iter().enumerate() {
        let position = i + 1;
        trace!("{} record {}: {:?}", kind, position, record);

        for piece in record.malformed() {
            diagnostics.push(Diagnostic::MalformedField {
                kind,
                position,
                piece: piece.clone(),
            });
        }

        match Format::from_record(kind, position, record, quality_by_id) {
            Ok(format) if seen.insert(format.id.clone()) => formats.push(format),
            Ok(format) => diagnostics.push(Diagnostic::DuplicateFormat { kind, id: format.id }),
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    formats
}

/// The string value of `"key":"..."`, ending at the next unescaped quote.
/// Occurrences of the key that are not followed by a string value are skipped.
fn quoted_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let quoted_key = format!("\"{}\"", key);
    let mut search_from = 0;

    while let Some(found) = line[search_from..].find(&quoted_key) {
        let after_key = search_from + found + quoted_key.len();
        search_from = after_key;

        let rest = &line[after_key..];
        let Some(rest) = rest.trim_start().strip_prefix(':') else {
            continue;
        };
        let Some(value) = rest.trim_start().strip_prefix('"') else {
            continue;
        };
        return Some(until_unescaped_quote(value));
    }

    None
}

fn until_unescaped_quote(value: &str) -> &str {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return &value[..i],
            _ => i += 1,
        }
    }
    value
}

/// `video/webm;+codecs="vp8.0,+vorbis"` becomes `video/webm`.
fn strip_media_type(decoded: &str) -> String {
    decoded
        .split(|c: char| c == ';' || c == '&')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
