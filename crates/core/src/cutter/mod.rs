//! Cutting strategies.
//!
//! A [`Cutter`] owns the sources of one round and decides, cut by cut, which
//! source to take the next clip from and how every read cursor moves
//! afterwards. All strategies share the same two operations:
//!
//! - [`Cutter::select_source`] picks a source that has room for the cut,
//! - [`Cutter::advance`] moves cursors after the cut has been recorded.
//!
//! Running short of material is expected near the end of short sources. It is
//! handled by pulling cursors back towards the start and logging a warning,
//! never by failing the round.

use std::f64::consts::PI;

use rand::{rngs::StdRng, Rng};

use crate::{
    config::CutStrategyKind,
    source::{SourceCursor, SourceSet},
    timeline::CutDescriptor,
};

/// Random draws per selection before cursors are pulled back.
pub const MAX_DRAWS: usize = 1000;
/// Cursor halvings before the cutter gives up on freshness entirely.
pub const MAX_DEGRADATIONS: usize = 64;

/// Per-strategy selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Interleaver,
    Randomizer,
    /// Index of the source the next cut comes from.
    Sequencer { next: usize },
    /// Index of the source currently being consumed.
    Skipper { current: usize },
}

impl From<CutStrategyKind> for Strategy {
    fn from(kind: CutStrategyKind) -> Self {
        match kind {
            CutStrategyKind::Interleave => Self::Interleaver,
            CutStrategyKind::Randomize => Self::Randomizer,
            CutStrategyKind::Sequence => Self::Sequencer { next: 0 },
            CutStrategyKind::Skip => Self::Skipper { current: 0 },
        }
    }
}

/// Schedules cuts across the sources of one round.
#[derive(Debug)]
pub struct Cutter {
    kind: CutStrategyKind,
    strategy: Strategy,
    sources: SourceSet,
    round_duration: f64,
    versions: usize,
    rng: StdRng,
}

impl Cutter {
    /// Creates a cutter that takes exclusive ownership of `sources`.
    ///
    /// `sources` must not be empty; round validation guarantees this.
    pub fn new(
        kind: CutStrategyKind,
        sources: SourceSet,
        round_duration: f64,
        versions: usize,
        rng: StdRng,
    ) -> Self {
        debug_assert!(!sources.is_empty(), "a cutter needs at least one source");
        Self {
            kind,
            strategy: kind.into(),
            sources,
            round_duration,
            versions: versions.max(1),
            rng,
        }
    }

    pub fn kind(&self) -> CutStrategyKind {
        self.kind
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Hands the sources back at the end of the round.
    pub fn into_sources(self) -> SourceSet {
        self.sources
    }

    pub fn versions(&self) -> usize {
        self.versions
    }

    /// Updates the number of versions cut per slot. Wider version counts
    /// spread the cursor jumps further apart.
    pub fn set_versions(&mut self, versions: usize) {
        self.versions = versions.max(1);
    }

    /// Picks the source for a cut of `length` seconds.
    pub fn select_source(&mut self, length: f64) -> usize {
        match self.strategy {
            Strategy::Interleaver | Strategy::Randomizer => self.select_random(length),
            Strategy::Sequencer { next } => {
                self.make_room(next, length);
                self.strategy = Strategy::Sequencer {
                    next: (next + 1) % self.sources.len(),
                };
                next
            }
            Strategy::Skipper { current } => {
                let current = self.select_skipping(current, length);
                self.strategy = Strategy::Skipper { current };
                current
            }
        }
    }

    /// Describes a cut of `length` from the source at `index`.
    pub fn cut(&self, index: usize, length: f64) -> CutDescriptor {
        self.sources[index].cut(index, length)
    }

    /// Moves cursors after a cut of `length` placed at `elapsed` seconds into
    /// the round.
    pub fn advance(&mut self, length: f64, elapsed: f64) {
        let progress = (elapsed / self.round_duration).clamp(0.0, 1.0);
        let spread = self.versions as f64 * length;
        let rng = &mut self.rng;

        match self.strategy {
            Strategy::Interleaver => {
                for source in self.sources.iter_mut() {
                    jump_to_progress(source, rng, progress, length, spread);
                }
            }
            Strategy::Randomizer => {
                for source in self.sources.iter_mut() {
                    reshuffle(source, rng, length);
                }
            }
            Strategy::Sequencer { next } => {
                jump_to_progress(&mut self.sources[next], rng, progress, length, spread);
            }
            Strategy::Skipper { current } => {
                let total = self.sources.total_duration();
                let done = self.sources.duration_before(current) / total;
                let source = &mut self.sources[current];
                let share = source.total_duration() / total;
                let expected = (progress - done) / share * source.total_duration();
                let position = gauss(rng, expected, spread).min(source.total_duration());
                source.place(position, rng);
            }
        }
    }

    /// Selects, records and advances in one step.
    pub fn next_cut(&mut self, length: f64, elapsed: f64) -> CutDescriptor {
        let index = self.select_source(length);
        let cut = self.cut(index, length);
        self.advance(length, elapsed);
        cut
    }

    /// Uniform draw among sources with room for `length`, pulling every cursor
    /// back when none is found.
    fn select_random(&mut self, length: f64) -> usize {
        let count = self.sources.len();
        for degradation in 0..=MAX_DEGRADATIONS {
            for _ in 0..MAX_DRAWS {
                let index = self.rng.gen_range(0..count);
                if self.sources[index].fits(length) {
                    return index;
                }
            }
            if degradation == MAX_DEGRADATIONS {
                break;
            }
            if degradation == 0 {
                tracing::warn!(
                    length,
                    attempts = MAX_DRAWS,
                    "not enough source material, halving every cursor"
                );
            }
            self.sources.halve_all();
        }

        let index = self.sources.longest().unwrap_or(0);
        rewind_unfit(&mut self.sources[index], length);
        index
    }

    /// Makes room for `length` in one source by halving its cursor.
    fn make_room(&mut self, index: usize, length: f64) {
        let source = &mut self.sources[index];
        for halvings in 0..MAX_DEGRADATIONS {
            if source.fits(length) {
                return;
            }
            if halvings == 0 {
                tracing::warn!(
                    source = %source.path().display(),
                    length,
                    "not enough source material, halving cursor"
                );
            }
            source.halve();
        }
        if !source.fits(length) {
            rewind_unfit(source, length);
        }
    }

    /// Moves forward past exhausted sources, never back.
    fn select_skipping(&mut self, current: usize, length: f64) -> usize {
        let last = self.sources.len() - 1;
        let mut index = current.min(last);
        while index < last && self.sources[index].is_exhausted(length) {
            index += 1;
            self.sources[index].place(0.0, &mut self.rng);
            tracing::debug!(
                source = index,
                path = %self.sources[index].path().display(),
                "moving on to next source"
            );
        }
        self.make_room(index, length);
        index
    }
}

/// Jumps a cursor to where the round's progress says it should be, with a
/// Gaussian spread so versions and interleaved sources differ.
fn jump_to_progress(
    source: &mut SourceCursor,
    rng: &mut StdRng,
    progress: f64,
    length: f64,
    spread: f64,
) {
    let target = progress * source.total_duration();
    let position = gauss(rng, target, spread).min(source.total_duration() - length);
    source.place(position, rng);
}

/// Places a cursor uniformly within the range that still fits `length`.
fn reshuffle(source: &mut SourceCursor, rng: &mut StdRng, length: f64) {
    let latest = (source.total_duration() - length).max(0.0);
    let position = if latest > 0.0 {
        rng.gen_range(0.0..latest)
    } else {
        0.0
    };
    source.place(position.min(latest), rng);
}

fn rewind_unfit(source: &mut SourceCursor, length: f64) {
    tracing::warn!(
        source = %source.path().display(),
        length,
        duration = source.total_duration(),
        "source is shorter than the cut, using it from the start"
    );
    source.rewind();
}

/// Samples a normal distribution with the Box-Muller transform.
pub fn gauss<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    if !(std_dev > 0.0) {
        return mean;
    }
    // gen() yields [0, 1); flip it so ln() never sees zero.
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn cutter(kind: CutStrategyKind, durations: &[f64], round_duration: f64) -> Cutter {
        let sources = durations
            .iter()
            .enumerate()
            .map(|(index, duration)| SourceCursor::new(format!("{index}.mp4"), *duration, 0.0))
            .collect();
        Cutter::new(
            kind,
            SourceSet::new(sources),
            round_duration,
            1,
            StdRng::seed_from_u64(42),
        )
    }

    /// Runs a round of fixed-length cuts and returns the descriptors.
    fn run(cutter: &mut Cutter, length: f64, round_duration: f64) -> Vec<CutDescriptor> {
        let mut elapsed = 0.0;
        let mut cuts = Vec::new();
        while round_duration - elapsed > 1e-9 {
            cuts.push(cutter.next_cut(length, elapsed));
            elapsed += length;
        }
        cuts
    }

    fn assert_within_sources(cutter: &Cutter, cuts: &[CutDescriptor]) {
        for cut in cuts {
            let source = &cutter.sources()[cut.source_index];
            assert!(cut.start >= 0.0, "negative start in {cut:?}");
            assert!(
                cut.end() <= source.total_duration() + 1e-9,
                "{cut:?} runs past {}",
                source.total_duration()
            );
        }
    }

    #[test]
    fn gauss_is_centred_on_mean() {
        let mut rng = StdRng::seed_from_u64(9);
        let samples: Vec<f64> = (0..20_000).map(|_| gauss(&mut rng, 50.0, 4.0)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;

        assert!((mean - 50.0).abs() < 0.2);
        assert!((variance.sqrt() - 4.0).abs() < 0.2);
        assert_eq!(gauss(&mut rng, 3.0, 0.0), 3.0);
    }

    #[test]
    fn every_strategy_stays_inside_its_sources() {
        for kind in CutStrategyKind::ALL {
            let mut cutter = cutter(kind, &[120.0, 300.0, 45.0, 600.0], 240.0);
            let cuts = run(&mut cutter, 4.0, 240.0);
            assert_eq!(cuts.len(), 60);
            assert_within_sources(&cutter, &cuts);
        }
    }

    #[test]
    fn sequencer_round_robins() {
        let mut cutter = cutter(CutStrategyKind::Sequence, &[400.0, 400.0, 400.0], 120.0);
        let order: Vec<usize> = run(&mut cutter, 2.0, 120.0)
            .iter()
            .map(|cut| cut.source_index)
            .collect();

        for (position, index) in order.iter().enumerate() {
            assert_eq!(*index, position % 3);
        }
    }

    #[test]
    fn skipper_never_goes_back() {
        let mut cutter = cutter(CutStrategyKind::Skip, &[60.0, 90.0, 60.0], 120.0);
        let cuts = run(&mut cutter, 2.0, 120.0);
        let order: Vec<usize> = cuts.iter().map(|cut| cut.source_index).collect();

        assert!(order.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(order[0], 0);
        assert!(order.contains(&1));
        assert_within_sources(&cutter, &cuts);
    }

    #[test]
    fn skipper_holds_on_last_source() {
        let mut cutter = cutter(CutStrategyKind::Skip, &[10.0, 10.0], 200.0);
        let order: Vec<usize> = run(&mut cutter, 4.0, 200.0)
            .iter()
            .map(|cut| cut.source_index)
            .collect();

        assert!(order.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(*order.last().unwrap(), 1);
    }

    #[test]
    fn random_selection_halves_cursors_when_material_runs_out() {
        let mut cutter = cutter(CutStrategyKind::Interleave, &[100.0, 100.0], 60.0);
        for source in cutter.sources.iter_mut() {
            *source = SourceCursor::new(source.path().to_path_buf(), 100.0, 98.0);
        }

        let index = cutter.select_source(10.0);
        let source = &cutter.sources()[index];
        assert!(source.fits(10.0));
        assert!(source.cursor() < 98.0);
    }

    #[test]
    fn cut_longer_than_every_source_uses_the_longest_from_start() {
        let mut cutter = cutter(CutStrategyKind::Randomize, &[5.0, 8.0], 60.0);
        let index = cutter.select_source(20.0);
        assert_eq!(index, 1);
        assert_eq!(cutter.sources()[1].cursor(), 0.0);
    }

    #[test]
    fn interleaver_tracks_round_progress() {
        let mut cutter = cutter(CutStrategyKind::Interleave, &[1000.0, 2000.0], 100.0);
        cutter.advance(1.0, 50.0);

        let first = cutter.sources()[0].cursor();
        let second = cutter.sources()[1].cursor();
        assert!((first - 500.0).abs() < 10.0, "cursor at {first}");
        assert!((second - 1000.0).abs() < 10.0, "cursor at {second}");
    }

    #[test]
    fn randomizer_keeps_room_for_the_cut() {
        let mut cutter = cutter(CutStrategyKind::Randomize, &[200.0, 30.0], 100.0);
        for _ in 0..200 {
            cutter.advance(8.0, 10.0);
            assert!(cutter.sources().iter().all(|source| source.fits(8.0)));
        }
    }

    #[test]
    fn sequencer_only_moves_the_next_source() {
        let mut cutter = cutter(CutStrategyKind::Sequence, &[500.0, 500.0], 100.0);
        assert_eq!(cutter.select_source(2.0), 0);
        cutter.advance(2.0, 50.0);

        assert_eq!(cutter.sources()[0].cursor(), 0.0);
        assert!(cutter.sources()[1].cursor() > 200.0);
    }

    #[test]
    fn skipper_places_cursor_by_share_of_material() {
        let mut cutter = cutter(CutStrategyKind::Skip, &[100.0, 300.0], 100.0);
        cutter.strategy = Strategy::Skipper { current: 1 };
        // Half way through the round the first quarter of the material is
        // done, so the second source should be a third of the way in.
        cutter.advance(0.5, 50.0);

        let cursor = cutter.sources()[1].cursor();
        assert!((cursor - 100.0).abs() < 3.0, "cursor at {cursor}");
    }

    #[test]
    fn same_seed_same_cuts() {
        let first = run(
            &mut cutter(CutStrategyKind::Interleave, &[300.0, 300.0], 60.0),
            3.0,
            60.0,
        );
        let second = run(
            &mut cutter(CutStrategyKind::Interleave, &[300.0, 300.0], 60.0),
            3.0,
            60.0,
        );
        assert_eq!(first, second);
    }
}
