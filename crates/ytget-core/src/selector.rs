//! Format selection policies and audio pairing
//!
//! Automatic policies rank positionally: the site lists progressive formats
//! highest quality first, so "highest" is the first entry and "lowest" the
//! last. Adaptive formats are never chosen automatically, even when they
//! carry a higher bitrate. Ranking goes through [`RankingStrategy`] so an
//! ordering-independent ranking can replace it without touching the catalog.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, Format, FormatKind};
use crate::error::SelectError;
use crate::naming::NamePrompt;
use crate::presenter::CatalogTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Show the catalog and ask which format to download
    #[default]
    Interactive,
    /// First progressive format
    HighestQuality,
    /// Last progressive format
    LowestQuality,
    /// First progressive `video/mp4`
    HighestMp4,
    /// Last progressive `video/mp4`
    LowestMp4,
}

impl SelectionMode {
    /// The automatic ranking behind this mode; `None` for interactive.
    pub fn strategy(self) -> Option<Box<dyn RankingStrategy + Send + Sync>> {
        let positional = match self {
            SelectionMode::Interactive => return None,
            SelectionMode::HighestQuality => Positional::new(Edge::First, None),
            SelectionMode::LowestQuality => Positional::new(Edge::Last, None),
            SelectionMode::HighestMp4 => Positional::new(Edge::First, Some(MP4_VIDEO)),
            SelectionMode::LowestMp4 => Positional::new(Edge::Last, Some(MP4_VIDEO)),
        };
        Some(Box::new(positional))
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Interactive => write!(f, "interactive"),
            SelectionMode::HighestQuality => write!(f, "highest quality"),
            SelectionMode::LowestQuality => write!(f, "lowest quality"),
            SelectionMode::HighestMp4 => write!(f, "highest quality mp4"),
            SelectionMode::LowestMp4 => write!(f, "lowest quality mp4"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub mode: SelectionMode,
    /// Pair an adaptive video with an audio stream for muxing
    pub combine_split_streams: bool,
}

const MP4_VIDEO: &str = "video/mp4";

/// Picks a format from a catalog without user input.
pub trait RankingStrategy {
    /// Return a 0-based index into the catalog.
    fn pick(&self, catalog: &Catalog) -> Result<usize, SelectError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    First,
    Last,
}

/// First or last progressive format, optionally restricted to one media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Positional {
    edge: Edge,
    media_type: Option<&'static str>,
}

impl Positional {
    pub fn new(edge: Edge, media_type: Option<&'static str>) -> Self {
        Self { edge, media_type }
    }

    fn describe(&self) -> String {
        let edge = match self.edge {
            Edge::First => "highest",
            Edge::Last => "lowest",
        };
        match self.media_type {
            Some(media_type) => format!("the {} quality {} format", edge, media_type),
            None => format!("the {} quality format", edge),
        }
    }
}

impl RankingStrategy for Positional {
    fn pick(&self, catalog: &Catalog) -> Result<usize, SelectError> {
        let mut candidates = catalog
            .progressive()
            .iter()
            .enumerate()
            .filter(|(_, format)| self.media_type.map_or(true, |t| format.media_type == t))
            .map(|(index, _)| index);

        let found = match self.edge {
            Edge::First => candidates.next(),
            Edge::Last => candidates.last(),
        };

        found.ok_or_else(|| SelectError::NoMatchingFormat(self.describe()))
    }
}

/// Supplies a human choice for interactive selection.
pub trait ChoiceSource {
    /// Return a 0-based index into `catalog`.
    fn choose(&mut self, catalog: &Catalog) -> Result<usize, SelectError>;
}

/// Choice source for non-interactive runs.
#[derive(Debug, Default)]
pub struct NoInput;

impl ChoiceSource for NoInput {
    fn choose(&mut self, _catalog: &Catalog) -> Result<usize, SelectError> {
        Err(SelectError::InteractiveUnavailable)
    }
}

/// Prints the catalog tables and reads a 1-based number, asking again until
/// the answer is an integer in range.
pub struct PromptChoice<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptChoice<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ChoiceSource for PromptChoice<R, W> {
    fn choose(&mut self, catalog: &Catalog) -> Result<usize, SelectError> {
        let count = catalog.len();
        if count == 0 {
            return Err(SelectError::NoMatchingFormat("any format".to_string()));
        }

        write!(self.output, "{}", CatalogTable(catalog))?;
        writeln!(
            self.output,
            "Enter the number (1 through {}) of the video you want to download:",
            count
        )?;

        loop {
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(SelectError::InputClosed);
            }

            match parse_choice(line.trim(), count) {
                Ok(index) => return Ok(index),
                Err(message) => writeln!(self.output, "{}", message)?,
            }
        }
    }
}

impl NamePrompt for NoInput {
    fn new_name(&mut self, taken: &Path) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{} exists and there is no terminal to ask for a new name", taken.display()),
        ))
    }
}

impl<R: BufRead, W: Write> NamePrompt for PromptChoice<R, W> {
    fn new_name(&mut self, taken: &Path) -> io::Result<String> {
        write!(self.output, "File {} exists. Enter a new name: ", taken.display())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }
}

fn parse_choice(input: &str, count: usize) -> Result<usize, String> {
    match input.parse::<i64>() {
        Ok(n) if n >= 1 && (n as u64) <= count as u64 => Ok(n as usize - 1),
        Ok(_) => Err(format!("Please enter an integer between 1 and {}.", count)),
        Err(_) => Err("Please enter an integer.".to_string()),
    }
}

/// The chosen format and, for a combined adaptive video, its audio partner.
/// Both are 0-based indexes into the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub index: usize,
    pub audio: Option<usize>,
}

pub struct Selector {
    strategy: Option<Box<dyn RankingStrategy + Send + Sync>>,
    combine_split_streams: bool,
}

impl Selector {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            strategy: policy.mode.strategy(),
            combine_split_streams: policy.combine_split_streams,
        }
    }

    /// Use a custom ranking in place of the policy's.
    pub fn with_strategy(
        strategy: Box<dyn RankingStrategy + Send + Sync>,
        combine_split_streams: bool,
    ) -> Self {
        Self {
            strategy: Some(strategy),
            combine_split_streams,
        }
    }

    /// Choose a format, asking `chooser` when the policy is interactive.
    pub fn select(
        &self,
        catalog: &Catalog,
        chooser: &mut dyn ChoiceSource,
    ) -> Result<Selection, SelectError> {
        let index = match &self.strategy {
            Some(strategy) => strategy.pick(catalog)?,
            None => chooser.choose(catalog)?,
        };

        let chosen = catalog
            .get(index)
            .ok_or_else(|| SelectError::NoMatchingFormat(format!("number {}", index + 1)))?;

        let audio = if self.combine_split_streams
            && catalog.kind_of(index) == Some(FormatKind::Adaptive)
        {
            Some(pair_audio(catalog, chosen)?)
        } else {
            None
        };

        debug!(
            "Selected format {} ({}){}",
            chosen.id,
            chosen.media_type,
            audio
                .and_then(|i| catalog.get(i))
                .map(|a| format!(" with audio {} ({})", a.id, a.media_type))
                .unwrap_or_default()
        );

        Ok(Selection { index, audio })
    }
}

/// Audio type that pairs with a video type: webm with webm, mp4 otherwise.
pub fn wanted_audio_type(video_type: &str) -> &'static str {
    if video_type == "video/webm" {
        "audio/webm"
    } else {
        "audio/mp4"
    }
}

/// First format in catalog order whose type pairs with `video`.
///
/// First match, not best bitrate.
pub fn pair_audio(catalog: &Catalog, video: &Format) -> Result<usize, SelectError> {
    if video.is_audio() {
        return Err(SelectError::AudioSelectedDirectly);
    }

    let wanted = wanted_audio_type(&video.media_type);
    catalog
        .iter()
        .position(|format| format.media_type == wanted)
        .ok_or_else(|| SelectError::NoMatchingAudio(wanted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    fn format(id: &str, media_type: &str) -> Format {
        Format {
            id: id.to_string(),
            url: format!("http://x/{}", id),
            media_type: media_type.to_string(),
            quality: None,
            resolution: None,
            extras: BTreeMap::new(),
        }
    }

    fn catalog(progressive: &[(&str, &str)], adaptive: &[(&str, &str)]) -> Catalog {
        Catalog::new(
            progressive.iter().map(|(id, t)| format(id, t)).collect(),
            adaptive.iter().map(|(id, t)| format(id, t)).collect(),
            BTreeMap::new(),
        )
    }

    fn auto(mode: SelectionMode, catalog: &Catalog) -> Result<Selection, SelectError> {
        Selector::new(SelectionPolicy {
            mode,
            combine_split_streams: false,
        })
        .select(catalog, &mut NoInput)
    }

    /// Always answers with one fixed 0-based index.
    struct Fixed(usize);

    impl ChoiceSource for Fixed {
        fn choose(&mut self, _catalog: &Catalog) -> Result<usize, SelectError> {
            Ok(self.0)
        }
    }

    fn combined(catalog: &Catalog, index: usize) -> Result<Selection, SelectError> {
        Selector::new(SelectionPolicy {
            mode: SelectionMode::Interactive,
            combine_split_streams: true,
        })
        .select(catalog, &mut Fixed(index))
    }

    #[test]
    fn test_mp4_policies_are_positional() {
        let c = catalog(&[("A", "video/mp4"), ("B", "video/webm"), ("C", "video/mp4")], &[]);
        assert_eq!(auto(SelectionMode::HighestMp4, &c).unwrap().index, 0);
        assert_eq!(auto(SelectionMode::LowestMp4, &c).unwrap().index, 2);
    }

    #[test]
    fn test_quality_policies_ignore_type() {
        let c = catalog(
            &[("43", "video/webm"), ("18", "video/mp4"), ("22", "video/mp4"), ("36", "video/3gpp")],
            &[("137", "video/mp4")],
        );
        assert_eq!(auto(SelectionMode::HighestQuality, &c).unwrap().index, 0);
        assert_eq!(auto(SelectionMode::LowestQuality, &c).unwrap().index, 3);
        assert_eq!(auto(SelectionMode::HighestMp4, &c).unwrap().index, 1);
        assert_eq!(auto(SelectionMode::LowestMp4, &c).unwrap().index, 2);
    }

    #[test]
    fn test_no_mp4_is_no_matching_format() {
        let c = catalog(&[("43", "video/webm")], &[("137", "video/mp4")]);
        assert!(matches!(
            auto(SelectionMode::HighestMp4, &c),
            Err(SelectError::NoMatchingFormat(_))
        ));
        assert!(matches!(
            auto(SelectionMode::LowestMp4, &c),
            Err(SelectError::NoMatchingFormat(_))
        ));
    }

    #[test]
    fn test_adaptive_never_picked_automatically() {
        let c = catalog(&[], &[("137", "video/mp4"), ("140", "audio/mp4")]);
        assert!(matches!(
            auto(SelectionMode::HighestQuality, &c),
            Err(SelectError::NoMatchingFormat(_))
        ));
    }

    #[test]
    fn test_interactive_without_input_fails() {
        let c = catalog(&[("18", "video/mp4")], &[]);
        assert!(matches!(
            auto(SelectionMode::Interactive, &c),
            Err(SelectError::InteractiveUnavailable)
        ));
    }

    #[test]
    fn test_audio_pairing_defaults_to_first_mp4_audio() {
        let c = catalog(
            &[("18", "video/mp4")],
            &[
                ("36", "video/3gpp"),
                ("171", "audio/webm"),
                ("140", "audio/mp4"),
                ("141", "audio/mp4"),
            ],
        );
        let selection = combined(&c, 1).unwrap();
        assert_eq!(selection, Selection { index: 1, audio: Some(3) });
    }

    #[test]
    fn test_audio_pairing_prefers_progressive_order() {
        let c = catalog(&[("x", "audio/mp4")], &[("137", "video/mp4"), ("140", "audio/mp4")]);
        assert_eq!(combined(&c, 1).unwrap().audio, Some(0));
    }

    #[test]
    fn test_webm_video_pairs_with_webm_audio() {
        let c = catalog(
            &[],
            &[("140", "audio/mp4"), ("248", "video/webm"), ("171", "audio/webm")],
        );
        assert_eq!(combined(&c, 1).unwrap().audio, Some(2));
        assert_eq!(wanted_audio_type("video/webm"), "audio/webm");
        assert_eq!(wanted_audio_type("video/x-unknown"), "audio/mp4");
    }

    #[test]
    fn test_audio_selected_directly_is_an_error() {
        let c = catalog(&[], &[("137", "video/mp4"), ("140", "audio/mp4")]);
        assert!(matches!(combined(&c, 1), Err(SelectError::AudioSelectedDirectly)));
    }

    #[test]
    fn test_no_matching_audio() {
        let c = catalog(&[], &[("248", "video/webm"), ("140", "audio/mp4")]);
        assert!(matches!(combined(&c, 0), Err(SelectError::NoMatchingAudio(t)) if t == "audio/webm"));
    }

    #[test]
    fn test_progressive_choice_is_not_paired() {
        let c = catalog(&[("18", "video/mp4")], &[("140", "audio/mp4")]);
        assert_eq!(combined(&c, 0).unwrap().audio, None);
    }

    #[test]
    fn test_adaptive_without_combine_is_not_paired() {
        let c = catalog(&[], &[("137", "video/mp4"), ("140", "audio/mp4")]);
        let selection = Selector::new(SelectionPolicy::default())
            .select(&c, &mut Fixed(1))
            .unwrap();
        assert_eq!(selection, Selection { index: 1, audio: None });
    }

    #[test]
    fn test_prompt_reprompts_until_valid() {
        let c = catalog(&[("18", "video/mp4"), ("5", "video/flv")], &[]);
        let mut output = Vec::new();
        let mut prompt = PromptChoice::new(Cursor::new("abc\n0\n9\n-2\n 2 \n"), &mut output);

        assert_eq!(prompt.choose(&c).unwrap(), 1);

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Enter the number (1 through 2)"));
        assert!(printed.contains("Please enter an integer."));
        assert_eq!(printed.matches("between 1 and 2").count(), 3);
    }

    #[test]
    fn test_prompt_input_closed() {
        let c = catalog(&[("18", "video/mp4")], &[]);
        let mut prompt = PromptChoice::new(Cursor::new("x\n"), Vec::new());
        assert!(matches!(prompt.choose(&c), Err(SelectError::InputClosed)));
    }

    #[test]
    fn test_custom_strategy() {
        struct LastAdaptive;

        impl RankingStrategy for LastAdaptive {
            fn pick(&self, catalog: &Catalog) -> Result<usize, SelectError> {
                catalog
                    .len()
                    .checked_sub(1)
                    .ok_or_else(|| SelectError::NoMatchingFormat("anything".to_string()))
            }
        }

        let c = catalog(&[("18", "video/mp4")], &[("137", "video/mp4"), ("140", "audio/mp4")]);
        let selector = Selector::with_strategy(Box::new(LastAdaptive), false);
        assert_eq!(selector.select(&c, &mut NoInput).unwrap().index, 2);
    }

    #[test]
    fn test_prompt_asks_for_new_name() {
        let mut out = Vec::new();
        let mut prompt = PromptChoice::new(Cursor::new("  Other Name \n"), &mut out);
        let name = prompt.new_name(Path::new("out/Clip.mp4")).unwrap();
        assert_eq!(name, "Other Name");
        assert!(String::from_utf8(out).unwrap().starts_with("File out/Clip.mp4 exists."));

        let mut closed = PromptChoice::new(Cursor::new(""), Vec::new());
        assert!(closed.new_name(Path::new("x")).is_err());
        assert!(NoInput.new_name(Path::new("x")).is_err());
    }
}
