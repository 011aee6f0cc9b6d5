use std::{
    cmp::Ordering,
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    beatmeter::{self, BeatMeterConfig, BeatSection},
    credits::RoundCredits,
    CutError, Result,
};

pub const DEFAULT_FPS: f64 = 30.0;
pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_SPEED: u8 = 3;

/// Top-level settings for one compilation: output format plus every round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base file name and title of the video.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_xdim")]
    pub xdim: u32,
    #[serde(default = "default_ydim")]
    pub ydim: u32,
    /// Number of candidate versions offered per cut.
    #[serde(default = "default_one")]
    pub versions: usize,
    /// Number of rounds compiled concurrently.
    #[serde(default = "default_one")]
    pub threads: usize,
    /// Combine rounds with title, transitions and credits.
    #[serde(default)]
    pub assemble: bool,
    /// Base seed for reproducible cuts. A fresh one is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub rounds: Vec<RoundConfig>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: None,
            fps: DEFAULT_FPS,
            xdim: default_xdim(),
            ydim: default_ydim(),
            versions: 1,
            threads: 1,
            assemble: false,
            seed: None,
            rounds: Vec::new(),
        }
    }
}

impl OutputConfig {
    /// Loads settings from a JSON file.
    ///
    /// Relative paths inside the file are resolved against the file's own
    /// directory. Rounds that reference a beat-meter export pick up their beat
    /// sections, tempo and duration from it.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: OutputConfig = serde_json::from_str(&contents)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.load_beatmeters()?;
        config.assign_missing_names(&mut rand::thread_rng());
        tracing::debug!(?path, rounds = config.rounds.len(), "loaded settings");
        Ok(config)
    }

    /// Duration of one output frame in seconds.
    pub fn frame_time(&self) -> f64 {
        1.0 / self.fps
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("compilation")
    }

    /// Gives every unnamed round (and the output itself) a random name.
    pub fn assign_missing_names<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.name.is_none() {
            self.name = Some(random_name(rng));
        }
        for round in &mut self.rounds {
            if round.name.is_none() {
                round.name = Some(random_name(rng));
            }
        }
    }

    /// Validates output settings and every round in one pass.
    pub fn validate(&self) -> Result<()> {
        check_range("fps", self.fps, 1.0, 360.0)?;
        check_range("xdim", self.xdim, 1, 10_000)?;
        check_range("ydim", self.ydim, 1, 10_000)?;
        check_range("versions", self.versions, 1, 36)?;
        check_range("threads", self.threads, 1, 8)?;

        if self.rounds.is_empty() {
            return Err(CutError::invalid("rounds", "no round configs provided"));
        }

        let mut seen = HashSet::new();
        for round in &self.rounds {
            round.validate()?;
            if let Some(name) = &round.name {
                if !seen.insert(name.as_str()) {
                    return Err(CutError::invalid(
                        "name",
                        format!("round names must be unique: {name}"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for round in &mut self.rounds {
            round.resolve_paths(base);
        }
    }

    fn load_beatmeters(&mut self) -> Result<()> {
        for round in &mut self.rounds {
            if let Some(path) = round.bmcfg.clone() {
                let beatmeter = BeatMeterConfig::from_path(&path)?;
                round.apply_beatmeter(beatmeter);
            }
        }
        Ok(())
    }
}

/// Settings for a single round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    /// Round length in seconds. Taken from the beat-meter export when one is
    /// referenced.
    #[serde(default)]
    pub duration: f64,
    /// Cut speed from 1 (slow) to 5 (fast).
    #[serde(default = "default_speed")]
    pub speed: u8,
    #[serde(default)]
    pub cut: CutStrategyKind,
    /// Beat-meter generator export describing the round's beat sections.
    #[serde(default)]
    pub bmcfg: Option<PathBuf>,
    #[serde(default)]
    pub beat_sections: Option<Vec<BeatSection>>,
    /// Music track, filled from the beat-meter export when not given.
    #[serde(default)]
    pub music: Option<PathBuf>,
    /// Background footage for the round's transition card.
    #[serde(default)]
    pub background: Option<PathBuf>,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub credits: RoundCredits,
}

impl RoundConfig {
    /// Creates a round with default tempo settings and the given sources.
    pub fn new(name: impl Into<String>, duration: f64, sources: Vec<SourceSpec>) -> Self {
        Self {
            name: Some(name.into()),
            bpm: DEFAULT_BPM,
            duration,
            speed: DEFAULT_SPEED,
            cut: CutStrategyKind::default(),
            bmcfg: None,
            beat_sections: None,
            music: None,
            background: None,
            sources,
            credits: RoundCredits::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Beat sections to cut against, if the round has a non-empty timeline.
    pub fn sections(&self) -> Option<&[BeatSection]> {
        self.beat_sections
            .as_deref()
            .filter(|sections| !sections.is_empty())
    }

    /// Copies beat sections, tempo and duration from a beat-meter export.
    pub fn apply_beatmeter(&mut self, beatmeter: BeatMeterConfig) {
        self.bpm = beatmeter.bpm;
        self.duration = beatmeter.duration;
        if self.music.is_none() {
            self.music = Some(beatmeter.music);
        }
        self.beat_sections = Some(beatmeter.sections);
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.display_name();
        check_range("bpm", self.bpm, 1.0, 10_000.0).map_err(|err| in_round(name, err))?;
        check_range("duration", self.duration, 1.0, 10_000.0)
            .map_err(|err| in_round(name, err))?;
        check_range("speed", self.speed, 1, 5).map_err(|err| in_round(name, err))?;

        if self.sources.is_empty() {
            return Err(in_round(
                name,
                CutError::invalid("sources", "at least one source is required"),
            ));
        }
        for (index, source) in self.sources.iter().enumerate() {
            if !(source.duration.is_finite() && source.duration > 0.0) {
                return Err(in_round(
                    name,
                    CutError::invalid(
                        format!("sources[{index}].duration"),
                        format!("{} has non-positive duration {}", source.path.display(), source.duration),
                    ),
                ));
            }
        }

        if let Some(sections) = &self.beat_sections {
            beatmeter::validate_sections(sections).map_err(|err| in_round(name, err))?;
        }
        self.credits.validate().map_err(|err| in_round(name, err))
    }

    fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            source.path = resolve(base, &source.path);
        }
        for path in [&mut self.bmcfg, &mut self.music, &mut self.background]
            .into_iter()
            .flatten()
        {
            *path = resolve(base, path);
        }
    }
}

/// One input clip. Probing the media for its duration happens outside the
/// core, so the settings carry it alongside the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub path: PathBuf,
    /// Total duration in seconds.
    pub duration: f64,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

/// The closed set of cutting strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutStrategyKind {
    /// Stay on one source until it runs out, then move to the next.
    Skip,
    /// Random source per cut, every source tracks the round's progress.
    #[default]
    Interleave,
    /// Random source per cut, cursors reshuffled after every cut.
    Randomize,
    /// Sources in strict round-robin order.
    Sequence,
}

impl CutStrategyKind {
    pub const ALL: [CutStrategyKind; 4] = [
        CutStrategyKind::Skip,
        CutStrategyKind::Interleave,
        CutStrategyKind::Randomize,
        CutStrategyKind::Sequence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Interleave => "interleave",
            Self::Randomize => "randomize",
            Self::Sequence => "sequence",
        }
    }
}

impl fmt::Display for CutStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CutStrategyKind {
    type Err = CutError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                CutError::invalid(
                    "cut",
                    format!("invalid choice `{value}`; must be one of [skip, interleave, randomize, sequence]"),
                )
            })
    }
}

/// Checks `min <= value <= max`, naming `field` on failure.
pub(crate) fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + fmt::Display + Copy,
{
    if value > max {
        Err(CutError::invalid(
            field,
            format!("greater than maximum ({value}); must be <= {max}"),
        ))
    } else if matches!(value.partial_cmp(&min), None | Some(Ordering::Less)) {
        Err(CutError::invalid(
            field,
            format!("less than minimum ({value}); must be >= {min}"),
        ))
    } else {
        Ok(())
    }
}

fn in_round(name: &str, err: CutError) -> CutError {
    match err {
        CutError::InvalidConfig { field, reason } => CutError::InvalidConfig {
            field,
            reason: format!("round `{name}`: {reason}"),
        },
        other => other,
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = rng
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .filter(char::is_ascii_alphabetic)
        .take(4)
        .collect();
    format!("Random {suffix}")
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

fn default_xdim() -> u32 {
    1920
}

fn default_ydim() -> u32 {
    1080
}

fn default_one() -> usize {
    1
}

fn default_bpm() -> f64 {
    DEFAULT_BPM
}

fn default_speed() -> u8 {
    DEFAULT_SPEED
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn round(name: &str) -> RoundConfig {
        RoundConfig::new(name, 60.0, vec![SourceSpec::new("a.mp4", 600.0)])
    }

    fn output(rounds: Vec<RoundConfig>) -> OutputConfig {
        OutputConfig {
            rounds,
            ..Default::default()
        }
    }

    #[test]
    fn fills_defaults_from_minimal_json() {
        let json = r#"{
            "rounds": [
                { "duration": 90, "sources": [{ "path": "clip.mp4", "duration": 300 }] }
            ]
        }"#;
        let config: OutputConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.fps, DEFAULT_FPS);
        assert_eq!(config.versions, 1);
        let round = &config.rounds[0];
        assert_eq!(round.bpm, DEFAULT_BPM);
        assert_eq!(round.speed, DEFAULT_SPEED);
        assert_eq!(round.cut, CutStrategyKind::Interleave);
    }

    #[test]
    fn parses_strategy_names() {
        for kind in CutStrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<CutStrategyKind>().unwrap(), kind);
        }
        let err = "shuffle".parse::<CutStrategyKind>().unwrap_err();
        assert_eq!(err.field(), Some("cut"));
    }

    #[test]
    fn rejects_non_positive_bpm() {
        let mut bad = round("one");
        bad.bpm = 0.0;
        let err = output(vec![bad]).validate().unwrap_err();
        assert_eq!(err.field(), Some("bpm"));
        assert!(format!("{err}").contains("round `one`"));
    }

    #[test]
    fn rejects_speed_out_of_range() {
        let mut bad = round("one");
        bad.speed = 6;
        assert_eq!(bad.validate().unwrap_err().field(), Some("speed"));
    }

    #[test]
    fn rejects_duplicate_round_names() {
        let err = output(vec![round("same"), round("same")])
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn rejects_missing_sources() {
        let mut bad = round("one");
        bad.sources.clear();
        assert_eq!(bad.validate().unwrap_err().field(), Some("sources"));
    }

    #[test]
    fn rejects_empty_settings() {
        assert_eq!(output(vec![]).validate().unwrap_err().field(), Some("rounds"));
    }

    #[test]
    fn assigns_random_names() {
        let mut unnamed = round("x");
        unnamed.name = None;
        let mut config = output(vec![unnamed]);
        config.assign_missing_names(&mut StdRng::seed_from_u64(7));

        let name = config.rounds[0].name.as_deref().unwrap();
        assert!(name.starts_with("Random "));
        assert_eq!(name.len(), "Random ".len() + 4);
        assert!(config.name.is_some());
    }

    #[test]
    fn resolves_relative_paths_against_settings_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings.json");
        std::fs::write(
            &settings,
            r#"{ "rounds": [ { "name": "r", "duration": 30,
                 "sources": [{ "path": "clips/a.mp4", "duration": 100 }] } ] }"#,
        )
        .unwrap();

        let config = OutputConfig::from_path(&settings).unwrap();
        assert_eq!(
            config.rounds[0].sources[0].path,
            dir.path().join("clips/a.mp4")
        );
        config.validate().unwrap();
    }
}
