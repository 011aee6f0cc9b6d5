//! Cut lengths for a round.
//!
//! Without a beat timeline the cuts follow an accelerating montage: long cuts
//! at the start that halve in length as the round passes each quarter. With a
//! beat timeline the cuts follow the patterns of each section and snap to the
//! section boundaries.

use crate::{beatmeter::BeatSection, config::RoundConfig, CutError, Result};

/// Progress points at which the simple tempo halves the cut length.
const ACCELERATION_STEPS: [f64; 3] = [0.25, 0.5, 0.75];

/// Produces the length of every cut in a round.
#[derive(Debug, Clone)]
pub enum BeatClock {
    Accelerating(AcceleratingTempo),
    Sections(SectionWalker),
}

impl BeatClock {
    /// Picks the timing mode for a round and validates its tempo settings.
    pub fn for_round(round: &RoundConfig, frame_time: f64) -> Result<Self> {
        match round.sections() {
            Some(sections) => Self::sections(
                sections.to_vec(),
                round.bpm,
                round.speed,
                round.duration,
                frame_time,
            ),
            None => Self::accelerating(round.bpm, round.speed, round.duration, frame_time),
        }
    }

    pub fn accelerating(bpm: f64, speed: u8, duration: f64, frame_time: f64) -> Result<Self> {
        check_tempo(bpm, speed, duration)?;
        Ok(Self::Accelerating(AcceleratingTempo {
            seconds_per_beat: 60.0 / bpm,
            base_multiple: 4.0 * 2f64.powi(5 - i32::from(speed)),
            duration,
            frame_time,
        }))
    }

    pub fn sections(
        sections: Vec<BeatSection>,
        bpm: f64,
        speed: u8,
        duration: f64,
        frame_time: f64,
    ) -> Result<Self> {
        check_tempo(bpm, speed, duration)?;
        crate::beatmeter::validate_sections(&sections)?;
        Ok(Self::Sections(SectionWalker {
            sections,
            bpm,
            speed_scale: 2f64.powi(3 - i32::from(speed)),
            duration,
            frame_time,
            section: 0,
            subsection: 0,
            current: None,
            emitted: false,
        }))
    }

    /// Length of the next cut for a round that has already covered `elapsed`
    /// seconds. Always positive and never runs past the end of the round.
    pub fn next_length(&mut self, elapsed: f64) -> f64 {
        match self {
            Self::Accelerating(tempo) => tempo.next_length(elapsed),
            Self::Sections(walker) => walker.next_length(elapsed),
        }
    }
}

/// Whole-beat cuts that get shorter as the round progresses.
#[derive(Debug, Clone)]
pub struct AcceleratingTempo {
    seconds_per_beat: f64,
    base_multiple: f64,
    duration: f64,
    frame_time: f64,
}

impl AcceleratingTempo {
    /// Number of beats per cut at `elapsed`.
    pub fn beats_at(&self, elapsed: f64) -> f64 {
        let progress = elapsed / self.duration;
        let multiple = ACCELERATION_STEPS
            .iter()
            .filter(|step| progress > **step)
            .fold(self.base_multiple, |multiple, _| multiple / 2.0);
        multiple.max(1.0)
    }

    fn next_length(&self, elapsed: f64) -> f64 {
        let length = self.seconds_per_beat * self.beats_at(elapsed);
        land_on_boundary(length, self.duration - elapsed, self.frame_time)
    }
}

/// Walks a beat timeline section by section.
#[derive(Debug, Clone)]
pub struct SectionWalker {
    sections: Vec<BeatSection>,
    bpm: f64,
    speed_scale: f64,
    duration: f64,
    frame_time: f64,
    section: usize,
    subsection: usize,
    current: Option<Subdivision>,
    emitted: bool,
}

/// How one section is split into equal cuts.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Subdivision {
    length: f64,
    count: usize,
}

impl SectionWalker {
    fn next_length(&mut self, elapsed: f64) -> f64 {
        let remaining = self.duration - elapsed;
        let Some(subdivision) = self.current_subdivision() else {
            // Sections ran out before the round did; fill the rest in one cut.
            return remaining;
        };

        let mut length = subdivision.length;
        if !self.emitted {
            // Pre-roll before the first detected beat.
            length += self.sections[self.section].start;
        }
        if self.subsection + 1 == subdivision.count {
            length = match self.sections.get(self.section + 1) {
                // Absorb beat-detection drift at section boundaries.
                Some(next) => next.start - elapsed,
                None => remaining,
            };
        }
        self.subsection += 1;
        self.emitted = true;

        if length <= 0.0 {
            tracing::warn!(
                section = self.section,
                elapsed,
                "beat section boundary lies behind the timeline, using pattern length"
            );
            length = subdivision.length;
        }
        land_on_boundary(length.min(remaining), remaining, self.frame_time)
    }

    /// Returns the subdivision of the section the next cut belongs to,
    /// stepping over finished and empty sections.
    fn current_subdivision(&mut self) -> Option<Subdivision> {
        loop {
            let section = self.sections.get(self.section)?;
            let subdivision = match self.current {
                Some(subdivision) => subdivision,
                None => {
                    let end = self
                        .sections
                        .get(self.section + 1)
                        .map_or(section.stop, |next| next.start);
                    let span = end - section.start;
                    if span <= 0.0 {
                        tracing::warn!(section = self.section, span, "skipping empty beat section");
                        self.section += 1;
                        continue;
                    }
                    let pattern = section.pattern_length().unwrap_or(4.0 * 60.0 / self.bpm);
                    let length = (pattern * self.speed_scale).min(span);
                    let subdivision = Subdivision {
                        length,
                        count: ((span / length).round() as usize).max(1),
                    };
                    self.current = Some(subdivision);
                    self.subsection = 0;
                    subdivision
                }
            };

            if self.subsection < subdivision.count {
                return Some(subdivision);
            }
            self.section += 1;
            self.current = None;
        }
    }
}

/// Stretches or truncates `length` so the round never ends on a sliver shorter
/// than a frame and never runs past its end.
fn land_on_boundary(length: f64, remaining: f64, frame_time: f64) -> f64 {
    if length >= remaining - frame_time {
        remaining
    } else {
        length
    }
}

fn check_tempo(bpm: f64, speed: u8, duration: f64) -> Result<()> {
    if !(bpm.is_finite() && bpm > 0.0) {
        return Err(CutError::invalid("bpm", format!("must be positive, got {bpm}")));
    }
    if !(duration.is_finite() && duration > 0.0) {
        return Err(CutError::invalid(
            "duration",
            format!("must be positive, got {duration}"),
        ));
    }
    if !(1..=5).contains(&speed) {
        return Err(CutError::invalid(
            "speed",
            format!("must be between 1 and 5, got {speed}"),
        ));
    }
    Ok(())
}
