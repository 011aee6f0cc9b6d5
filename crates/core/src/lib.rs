//! Core library for beatcut, a beat-synchronised video compilation cutter.
//!
//! A round pairs a piece of music with a set of source clips. The beat clock
//! decides how long each cut lasts, a cutting strategy decides where in the
//! sources each cut comes from, and the resulting cut list is turned into an
//! edit list for an external renderer. Decoding and encoding media is out of
//! scope here.

pub mod batch;
pub mod beatmeter;
pub mod compile;
pub mod config;
pub mod credits;
pub mod cutter;
pub mod error;
pub mod preview;
pub mod render;
pub mod source;
pub mod timeline;
pub mod timing;

pub use batch::compile_all;
pub use beatmeter::{BeatMeterConfig, BeatSection};
pub use compile::{compile_round, compile_round_seeded, CompileOptions, RoundPlan};
pub use config::{CutStrategyKind, OutputConfig, RoundConfig, SourceSpec};
pub use credits::{AudioCredit, CreditRow, RoundCredits, VideoCredit};
pub use cutter::Cutter;
pub use error::{CutError, Result};
pub use preview::{
    Candidate, HeadlessSurface, PreviewChoice, PreviewSurface, ScriptedSurface, VersionSelector,
};
pub use render::{EditItem, EditList, Segment};
pub use source::{SourceCursor, SourceSet};
pub use timeline::{CutDescriptor, RoundClock, RoundTimeline, ScheduledCut};
pub use timing::BeatClock;
