use serde::{Deserialize, Serialize};

/// One cut taken from a source: `length` seconds starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutDescriptor {
    pub source_index: usize,
    pub start: f64,
    pub length: f64,
}

impl CutDescriptor {
    /// End of the cut within its source.
    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}

/// Elapsed time within a round, advanced cut by cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundClock {
    elapsed: f64,
    duration: f64,
    frame_time: f64,
}

impl RoundClock {
    pub fn new(duration: f64, frame_time: f64) -> Self {
        Self {
            elapsed: 0.0,
            duration,
            frame_time,
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn remaining(&self) -> f64 {
        self.duration - self.elapsed
    }

    /// Fraction of the round covered so far.
    pub fn progress(&self) -> f64 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// A round is finished once less than one frame is left to fill.
    pub fn is_finished(&self) -> bool {
        self.remaining() <= self.frame_time
    }

    pub fn advance(&mut self, delta: f64) {
        self.elapsed = (self.elapsed + delta).max(0.0);
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

/// A cut placed on the round's output timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCut {
    /// Position of the cut in the round, in seconds.
    pub at: f64,
    pub cut: CutDescriptor,
}

/// Ordered cuts of one round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundTimeline {
    cuts: Vec<ScheduledCut>,
}

impl RoundTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, at: f64, cut: CutDescriptor) {
        self.cuts.push(ScheduledCut { at, cut });
    }

    pub fn cuts(&self) -> &[ScheduledCut] {
        &self.cuts
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Sum of all cut lengths.
    pub fn total_length(&self) -> f64 {
        self.cuts.iter().map(|scheduled| scheduled.cut.length).sum()
    }

    /// Source indices in timeline order.
    pub fn source_order(&self) -> Vec<usize> {
        self.cuts
            .iter()
            .map(|scheduled| scheduled.cut.source_index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_finishes_within_a_frame() {
        let mut clock = RoundClock::new(10.0, 0.1);
        clock.advance(9.95);
        assert!(clock.is_finished());
        assert!((clock.progress() - 0.995).abs() < 1e-9);

        clock.reset();
        assert!(!clock.is_finished());
    }

    #[test]
    fn timeline_sums_lengths() {
        let mut timeline = RoundTimeline::new();
        timeline.push(
            0.0,
            CutDescriptor {
                source_index: 1,
                start: 20.0,
                length: 4.0,
            },
        );
        timeline.push(
            4.0,
            CutDescriptor {
                source_index: 0,
                start: 30.0,
                length: 2.5,
            },
        );

        assert_eq!(timeline.total_length(), 6.5);
        assert_eq!(timeline.source_order(), vec![1, 0]);
        assert_eq!(timeline.cuts()[0].cut.end(), 24.0);
    }
}
