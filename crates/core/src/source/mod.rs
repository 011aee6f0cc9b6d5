use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Serialize;

use crate::{config::SourceSpec, timeline::CutDescriptor};

/// Shortest intro skip in seconds.
pub const INTRO_SKIP_MIN: f64 = 15.0;
/// Random spread added on top of [`INTRO_SKIP_MIN`].
pub const INTRO_SKIP_SPREAD: f64 = 10.0;

/// Draws a random intro skip in `[15, 25)` seconds.
pub fn intro_skip<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    INTRO_SKIP_MIN + rng.gen::<f64>() * INTRO_SKIP_SPREAD
}

/// Lowest cursor allowed for a source of `total_duration` given an intro skip.
/// Short sources may be used from the very beginning.
pub fn cursor_floor(total_duration: f64, skip: f64) -> f64 {
    if total_duration > 3.0 * skip {
        skip
    } else {
        0.0
    }
}

/// One input source together with its read position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCursor {
    path: PathBuf,
    total_duration: f64,
    cursor: f64,
}

impl SourceCursor {
    pub fn new(path: impl Into<PathBuf>, total_duration: f64, cursor: f64) -> Self {
        Self {
            path: path.into(),
            total_duration,
            cursor: cursor.clamp(0.0, total_duration),
        }
    }

    /// Opens a source with its cursor past a random intro skip.
    pub fn with_intro_skip<R: Rng + ?Sized>(
        path: impl Into<PathBuf>,
        total_duration: f64,
        rng: &mut R,
    ) -> Self {
        let cursor = cursor_floor(total_duration, intro_skip(rng));
        Self::new(path, total_duration, cursor)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Seconds left between the cursor and the end of the source.
    pub fn remaining(&self) -> f64 {
        self.total_duration - self.cursor
    }

    /// Whether a cut of `length` can start at the cursor.
    pub fn fits(&self, length: f64) -> bool {
        self.cursor + length <= self.total_duration
    }

    /// Whether the source has nothing left for a cut of `length`.
    pub fn is_exhausted(&self, length: f64) -> bool {
        self.cursor + length >= self.total_duration
    }

    pub fn halve(&mut self) {
        self.cursor /= 2.0;
    }

    pub fn rewind(&mut self) {
        self.cursor = 0.0;
    }

    /// Moves the cursor to `position`, respecting the intro-skip floor.
    ///
    /// The floor is drawn fresh on every call so repeated placements near the
    /// start do not all land on the same frame.
    pub fn place<R: Rng + ?Sized>(&mut self, position: f64, rng: &mut R) {
        let floor = cursor_floor(self.total_duration, intro_skip(rng));
        let position = if position.is_finite() { position } else { floor };
        self.cursor = position.max(floor).min(self.total_duration);
    }

    /// Describes a cut of `length` starting at the cursor.
    pub fn cut(&self, index: usize, length: f64) -> CutDescriptor {
        CutDescriptor {
            source_index: index,
            start: self.cursor,
            length,
        }
    }
}

/// The sources of one round, indexed by position.
///
/// A set is owned by exactly one cutter for the lifetime of a round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSet {
    sources: Vec<SourceCursor>,
}

impl SourceSet {
    pub fn new(sources: Vec<SourceCursor>) -> Self {
        Self { sources }
    }

    /// Opens every source of a round with a random intro skip.
    pub fn from_specs<R: Rng + ?Sized>(specs: &[SourceSpec], rng: &mut R) -> Self {
        Self::new(
            specs
                .iter()
                .map(|spec| SourceCursor::with_intro_skip(spec.path.clone(), spec.duration, rng))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SourceCursor> {
        self.sources.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceCursor> {
        self.sources.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SourceCursor> {
        self.sources.iter_mut()
    }

    /// Combined length of all sources.
    pub fn total_duration(&self) -> f64 {
        self.sources.iter().map(SourceCursor::total_duration).sum()
    }

    /// Combined length of the sources before `index`.
    pub fn duration_before(&self, index: usize) -> f64 {
        self.sources[..index.min(self.sources.len())]
            .iter()
            .map(SourceCursor::total_duration)
            .sum()
    }

    pub fn halve_all(&mut self) {
        self.sources.iter_mut().for_each(SourceCursor::halve);
    }

    /// Index of the longest source.
    pub fn longest(&self) -> Option<usize> {
        self.sources
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_duration.total_cmp(&b.total_duration))
            .map(|(index, _)| index)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.sources.iter().map(|source| source.path.clone()).collect()
    }
}

impl std::ops::Index<usize> for SourceSet {
    type Output = SourceCursor;

    fn index(&self, index: usize) -> &Self::Output {
        &self.sources[index]
    }
}

impl std::ops::IndexMut<usize> for SourceSet {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.sources[index]
    }
}
