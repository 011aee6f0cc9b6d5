use std::path::PathBuf;

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::{
    config::{CutStrategyKind, OutputConfig, RoundConfig},
    cutter::Cutter,
    preview::{Candidate, PreviewSurface, VersionSelector},
    render::Segment,
    source::SourceSet,
    timeline::{RoundClock, RoundTimeline},
    timing::BeatClock,
    CutError, Result,
};

/// Output settings that influence how a round is cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileOptions {
    /// Duration of one output frame in seconds.
    pub frame_time: f64,
    /// Candidate versions per slot.
    pub versions: usize,
}

impl CompileOptions {
    pub fn new(fps: f64, versions: usize) -> Self {
        Self {
            frame_time: 1.0 / fps,
            versions,
        }
    }
}

impl From<&OutputConfig> for CompileOptions {
    fn from(config: &OutputConfig) -> Self {
        Self::new(config.fps, config.versions)
    }
}

/// The cut list of one compiled round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundPlan {
    pub name: String,
    pub duration: f64,
    pub strategy: CutStrategyKind,
    /// Source paths, indexed like the cuts' `source_index`.
    pub sources: Vec<PathBuf>,
    pub timeline: RoundTimeline,
    /// Whether the preview surface dropped out during this round.
    pub downgraded: bool,
}

impl RoundPlan {
    pub fn total_length(&self) -> f64 {
        self.timeline.total_length()
    }

    /// Cuts resolved to source files, ready for the renderer.
    pub fn segments(&self) -> Vec<Segment> {
        self.timeline
            .cuts()
            .iter()
            .map(|scheduled| Segment {
                source: self.sources[scheduled.cut.source_index].clone(),
                start: scheduled.cut.start,
                end: scheduled.cut.end(),
                at: scheduled.at,
            })
            .collect()
    }
}

/// Compiles one round into its ordered cut list.
///
/// Configuration errors are reported before any cut is made. Everything that
/// goes wrong afterwards (sources running dry, the preview surface going away)
/// is absorbed and only logged.
pub fn compile_round(
    round: &RoundConfig,
    options: CompileOptions,
    surface: &mut dyn PreviewSurface,
    mut rng: StdRng,
) -> Result<RoundPlan> {
    round.validate()?;
    if !(options.frame_time.is_finite() && options.frame_time > 0.0) {
        return Err(CutError::invalid(
            "fps",
            format!("frame time must be positive, got {}", options.frame_time),
        ));
    }
    if options.versions == 0 {
        return Err(CutError::invalid("versions", "at least one version is required"));
    }

    let mut beats = BeatClock::for_round(round, options.frame_time)?;
    let sources = SourceSet::from_specs(&round.sources, &mut rng);
    let mut cutter = Cutter::new(round.cut, sources, round.duration, options.versions, rng);
    let mut selector = VersionSelector::new(options.versions, surface);
    let mut clock = RoundClock::new(round.duration, options.frame_time);
    let mut timeline = RoundTimeline::new();

    tracing::info!(
        round = round.display_name(),
        strategy = %round.cut,
        duration = round.duration,
        sources = round.sources.len(),
        versions = options.versions,
        "compiling round"
    );

    while !clock.is_finished() {
        let elapsed = clock.elapsed();
        let length = beats.next_length(elapsed);

        let cuts: Vec<_> = (0..selector.versions())
            .map(|_| cutter.next_cut(length, elapsed))
            .collect();
        let chosen = if cuts.len() > 1 {
            let candidates: Vec<_> = cuts
                .iter()
                .enumerate()
                .map(|(version, cut)| Candidate::from_cut(version, cut, cutter.sources()))
                .collect();
            let chosen = selector.choose(&candidates);
            if selector.is_downgraded() {
                cutter.set_versions(1);
            }
            chosen
        } else {
            0
        };

        let cut = cuts[chosen];
        tracing::debug!(
            elapsed,
            length,
            source = cut.source_index,
            start = cut.start,
            progress = clock.progress(),
            "cut"
        );
        timeline.push(elapsed, cut);
        clock.advance(length);
    }

    tracing::info!(
        round = round.display_name(),
        cuts = timeline.len(),
        "round compiled"
    );

    Ok(RoundPlan {
        name: round.display_name().to_string(),
        duration: round.duration,
        strategy: round.cut,
        sources: cutter.sources().paths(),
        timeline,
        downgraded: selector.is_downgraded(),
    })
}

/// Convenience wrapper that seeds the generator from `seed`.
pub fn compile_round_seeded(
    round: &RoundConfig,
    options: CompileOptions,
    surface: &mut dyn PreviewSurface,
    seed: u64,
) -> Result<RoundPlan> {
    compile_round(round, options, surface, StdRng::seed_from_u64(seed))
}
