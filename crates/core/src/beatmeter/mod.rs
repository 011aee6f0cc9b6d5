//! Beat timelines exported by the beat-meter generator.
//!
//! The export is a JSON document describing tracks of beat patterns. Only the
//! track marked `play` contributes cut sections; the `Base` track carries the
//! tempo and length of the whole round.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{CutError, Result};

/// A stretch of the round with a constant beat pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatSection {
    /// Section start in seconds from the round start.
    pub start: f64,
    pub stop: f64,
    #[serde(default)]
    pub bpm: Option<f64>,
    /// Length of one full pattern in seconds. Takes precedence over `bpm`.
    #[serde(default)]
    pub pattern_duration: Option<f64>,
}

impl BeatSection {
    pub fn with_bpm(start: f64, stop: f64, bpm: f64) -> Self {
        Self {
            start,
            stop,
            bpm: Some(bpm),
            pattern_duration: None,
        }
    }

    pub fn with_pattern(start: f64, stop: f64, pattern_duration: f64) -> Self {
        Self {
            start,
            stop,
            bpm: None,
            pattern_duration: Some(pattern_duration),
        }
    }

    /// Length of one four-beat pattern in seconds.
    pub fn pattern_length(&self) -> Option<f64> {
        self.pattern_duration.or_else(|| self.bpm.map(|bpm| 4.0 * 60.0 / bpm))
    }

    fn validate(&self, index: usize) -> Result<()> {
        let field = |name: &str| format!("beat_sections[{index}].{name}");

        if !(self.start.is_finite() && self.start >= 0.0) {
            return Err(CutError::invalid(
                field("start"),
                format!("must be a non-negative number, got {}", self.start),
            ));
        }
        if !(self.stop.is_finite() && self.stop >= self.start) {
            return Err(CutError::invalid(
                field("stop"),
                format!("must not precede start {}, got {}", self.start, self.stop),
            ));
        }
        match (self.bpm, self.pattern_duration) {
            (None, None) => Err(CutError::invalid(
                field("bpm"),
                "undefined beat section: neither bpm nor pattern_duration is set",
            )),
            (_, Some(pattern)) if !(pattern.is_finite() && pattern > 0.0) => Err(
                CutError::invalid(field("pattern_duration"), format!("must be positive, got {pattern}")),
            ),
            (Some(bpm), None) if !(bpm.is_finite() && bpm > 0.0) => Err(CutError::invalid(
                field("bpm"),
                format!("must be positive, got {bpm}"),
            )),
            _ => Ok(()),
        }
    }
}

/// Validates every section of a beat timeline.
pub fn validate_sections(sections: &[BeatSection]) -> Result<()> {
    sections
        .iter()
        .enumerate()
        .try_for_each(|(index, section)| section.validate(index))
}

/// Round settings recovered from a beat-meter export.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatMeterConfig {
    pub sections: Vec<BeatSection>,
    /// Frame rate of the rendered beat meter.
    pub fps: f64,
    pub music: PathBuf,
    pub bpm: f64,
    pub duration: f64,
}

impl BeatMeterConfig {
    /// Reads an export from disk. The music path is resolved relative to the
    /// export's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&contents)?;
        if config.music.is_relative() {
            if let Some(dir) = path.parent() {
                config.music = dir.join(&config.music);
            }
        }
        tracing::debug!(
            ?path,
            sections = config.sections.len(),
            bpm = config.bpm,
            duration = config.duration,
            "loaded beat meter config"
        );
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawExport = serde_json::from_str(json)?;
        let data = raw.data;

        let sections = data
            .content
            .elems
            .iter()
            .find(|track| track.play)
            .ok_or_else(|| CutError::invalid("bmcfg", "no track is marked to play"))?
            .content
            .elems
            .iter()
            .map(RawSection::to_section)
            .collect::<Vec<_>>();

        let meter = if data.flying {
            data.flying_beatmeter
        } else {
            data.waveform_beatmeter
        };
        let fps = meter
            .map(|meter| meter.frames)
            .ok_or_else(|| CutError::invalid("bmcfg", "beat meter frame rate is missing"))?;

        let music = data
            .audio
            .elems
            .first()
            .ok_or_else(|| CutError::invalid("bmcfg", "no music track referenced"))?;
        let music = urlencoding::decode(music)
            .map_err(|err| CutError::invalid("bmcfg", format!("music path: {err}")))?;

        let base = data
            .content
            .elems
            .iter()
            .find(|track| track.title.as_deref() == Some("Base"))
            .and_then(|track| track.content.elems.first())
            .ok_or_else(|| CutError::invalid("bmcfg", "`Base` track is missing"))?;
        let bpm = base
            .pattern
            .val
            .bpm
            .ok_or_else(|| CutError::invalid("bmcfg", "`Base` track has no bpm"))?;

        Ok(Self {
            sections,
            fps,
            music: PathBuf::from(music.into_owned()),
            bpm,
            duration: base.stop,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawExport {
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    content: RawElems<RawTrack>,
    #[serde(default)]
    flying: bool,
    #[serde(rename = "flyingBeatmeter", default)]
    flying_beatmeter: Option<RawMeter>,
    #[serde(rename = "waveformBeatmeter", default)]
    waveform_beatmeter: Option<RawMeter>,
    audio: RawElems<String>,
}

#[derive(Debug, Deserialize)]
struct RawElems<T> {
    #[serde(rename = "#elems")]
    elems: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    play: bool,
    content: RawElems<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(rename = "_1")]
    start: f64,
    #[serde(rename = "_2")]
    stop: f64,
    #[serde(rename = "_3")]
    pattern: RawPattern,
}

impl RawSection {
    fn to_section(&self) -> BeatSection {
        BeatSection {
            start: self.start,
            stop: self.stop,
            bpm: self.pattern.val.bpm,
            pattern_duration: self.pattern.val.pattern_duration,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPattern {
    #[serde(rename = "#val")]
    val: RawPatternValue,
}

#[derive(Debug, Deserialize)]
struct RawPatternValue {
    #[serde(default)]
    bpm: Option<f64>,
    #[serde(rename = "patternDuration", default)]
    pattern_duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawMeter {
    frames: f64,
}
