use std::{collections::VecDeque, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{source::SourceSet, timeline::CutDescriptor};

/// A candidate clip offered for selection, resolved to its source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Zero-based version number.
    pub version: usize,
    pub source: PathBuf,
    pub start: f64,
    pub end: f64,
}

impl Candidate {
    pub fn from_cut(version: usize, cut: &CutDescriptor, sources: &SourceSet) -> Self {
        Self {
            version,
            source: sources[cut.source_index].path().to_path_buf(),
            start: cut.start,
            end: cut.end(),
        }
    }
}

/// Answer from a preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewChoice {
    /// Zero-based index of the chosen candidate.
    Chosen(usize),
    /// The surface could not be shown or the user aborted.
    Unavailable,
}

/// Interactive surface that shows candidate versions and returns a choice.
///
/// Offering is blocking: compilation of the round waits for the answer.
pub trait PreviewSurface {
    fn offer(&mut self, candidates: &[Candidate]) -> PreviewChoice;
}

/// Surface for environments without a display; always unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSurface;

impl PreviewSurface for HeadlessSurface {
    fn offer(&mut self, _candidates: &[Candidate]) -> PreviewChoice {
        PreviewChoice::Unavailable
    }
}

/// Replays a fixed list of answers, then reports unavailability.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSurface {
    answers: VecDeque<PreviewChoice>,
    offers: Vec<usize>,
}

impl ScriptedSurface {
    pub fn new(answers: impl IntoIterator<Item = PreviewChoice>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            offers: Vec::new(),
        }
    }

    /// Number of candidates shown on each offer so far.
    pub fn offers(&self) -> &[usize] {
        &self.offers
    }
}

impl PreviewSurface for ScriptedSurface {
    fn offer(&mut self, candidates: &[Candidate]) -> PreviewChoice {
        self.offers.push(candidates.len());
        self.answers.pop_front().unwrap_or(PreviewChoice::Unavailable)
    }
}

impl<S: PreviewSurface + ?Sized> PreviewSurface for Box<S> {
    fn offer(&mut self, candidates: &[Candidate]) -> PreviewChoice {
        (**self).offer(candidates)
    }
}

/// Collapses the candidate versions of each slot into one.
///
/// Once the surface reports unavailability the selector drops to a single
/// version for the rest of the round and never asks again.
pub struct VersionSelector<'a> {
    requested: usize,
    downgraded: bool,
    surface: &'a mut dyn PreviewSurface,
}

impl<'a> VersionSelector<'a> {
    pub fn new(requested: usize, surface: &'a mut dyn PreviewSurface) -> Self {
        Self {
            requested: requested.max(1),
            downgraded: false,
            surface,
        }
    }

    /// Versions to cut for the next slot.
    pub fn versions(&self) -> usize {
        if self.downgraded {
            1
        } else {
            self.requested
        }
    }

    pub fn is_downgraded(&self) -> bool {
        self.downgraded
    }

    /// Returns the index of the chosen candidate.
    pub fn choose(&mut self, candidates: &[Candidate]) -> usize {
        if candidates.len() <= 1 || self.versions() == 1 {
            return 0;
        }

        loop {
            match self.surface.offer(candidates) {
                PreviewChoice::Chosen(index) if index < candidates.len() => return index,
                PreviewChoice::Chosen(index) => {
                    tracing::warn!(
                        choice = index + 1,
                        available = candidates.len(),
                        "not a valid version, offering again"
                    );
                }
                PreviewChoice::Unavailable => {
                    tracing::warn!("preview unavailable, switching to a single version for this round");
                    self.downgraded = true;
                    return 0;
                }
            }
        }
    }
}

impl std::fmt::Debug for VersionSelector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionSelector")
            .field("requested", &self.requested)
            .field("downgraded", &self.downgraded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(count: usize) -> Vec<Candidate> {
        (0..count)
            .map(|version| Candidate {
                version,
                source: PathBuf::from(format!("{version}.mp4")),
                start: 20.0,
                end: 24.0,
            })
            .collect()
    }

    #[test]
    fn single_version_skips_the_surface() {
        let mut surface = ScriptedSurface::new([PreviewChoice::Chosen(1)]);
        let mut selector = VersionSelector::new(1, &mut surface);

        assert_eq!(selector.choose(&candidates(1)), 0);
        drop(selector);
        assert!(surface.offers().is_empty());
    }

    #[test]
    fn returns_the_chosen_version() {
        let mut surface = ScriptedSurface::new([PreviewChoice::Chosen(2)]);
        let mut selector = VersionSelector::new(3, &mut surface);

        assert_eq!(selector.choose(&candidates(3)), 2);
        assert!(!selector.is_downgraded());
    }

    #[test]
    fn invalid_choices_are_offered_again() {
        let mut surface =
            ScriptedSurface::new([PreviewChoice::Chosen(7), PreviewChoice::Chosen(1)]);
        let mut selector = VersionSelector::new(2, &mut surface);

        assert_eq!(selector.choose(&candidates(2)), 1);
        drop(selector);
        assert_eq!(surface.offers(), &[2, 2]);
    }

    #[test]
    fn unavailable_surface_downgrades_permanently() {
        let mut surface = ScriptedSurface::new([
            PreviewChoice::Unavailable,
            PreviewChoice::Chosen(1),
        ]);
        let mut selector = VersionSelector::new(4, &mut surface);

        assert_eq!(selector.choose(&candidates(4)), 0);
        assert!(selector.is_downgraded());
        assert_eq!(selector.versions(), 1);
        assert_eq!(selector.choose(&candidates(4)), 0);
        drop(selector);
        assert_eq!(surface.offers(), &[4]);
    }

    #[test]
    fn headless_surface_is_unavailable() {
        let mut surface = HeadlessSurface;
        let mut selector = VersionSelector::new(2, &mut surface);
        assert_eq!(selector.choose(&candidates(2)), 0);
        assert!(selector.is_downgraded());
    }
}
