//! Edit list handed to the external renderer.
//!
//! The renderer sub-clips every [`Segment`] from its source, concatenates the
//! items in order and crossfades between them. This module only decides what
//! goes where.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    compile::RoundPlan,
    config::OutputConfig,
    credits::{credit_rows, CreditRow},
    Result,
};

/// Length of the crossfade between items, in seconds.
pub const FADE_DURATION: f64 = 0.5;
/// How long title and round transition cards stay on screen.
pub const TRANSITION_DURATION: f64 = 3.0;

/// A cut resolved to its source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub source: PathBuf,
    pub start: f64,
    pub end: f64,
    /// Position of the segment within its round.
    pub at: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One entry of the final video, in playback order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditItem {
    /// Text on black.
    Title { text: String, duration: f64 },
    /// Black gap between sections.
    Black { duration: f64 },
    /// Round announcement, optionally over background footage.
    Transition {
        text: String,
        duration: f64,
        background: Option<PathBuf>,
    },
    Round {
        name: String,
        duration: f64,
        segments: Vec<Segment>,
    },
    /// Scrolling credits roll.
    Credits { rows: Vec<CreditRow> },
}

impl EditItem {
    /// Playback length, if fixed. The credits roll length depends on the
    /// rendered text height.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Title { duration, .. }
            | Self::Black { duration }
            | Self::Transition { duration, .. }
            | Self::Round { duration, .. } => Some(*duration),
            Self::Credits { .. } => None,
        }
    }
}

/// Ordered items making up the output video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditList {
    pub name: String,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub items: Vec<EditItem>,
}

impl EditList {
    /// Builds the edit list for compiled rounds.
    ///
    /// With `assemble` set the rounds are wrapped with a title card, round
    /// transitions and the credits roll; otherwise the list holds the rounds
    /// only, one per intermediate file.
    pub fn build(config: &OutputConfig, plans: &[RoundPlan]) -> Self {
        let items = if config.assemble {
            assembled_items(config, plans)
        } else {
            plans.iter().map(round_item).collect()
        };

        Self {
            name: config.display_name().to_string(),
            fps: config.fps,
            width: config.xdim,
            height: config.ydim,
            items,
        }
    }

    /// Total length of all items with a fixed duration.
    pub fn fixed_duration(&self) -> f64 {
        self.items.iter().filter_map(EditItem::duration).sum()
    }

    pub fn rounds(&self) -> impl Iterator<Item = &EditItem> {
        self.items
            .iter()
            .filter(|item| matches!(item, EditItem::Round { .. }))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(?path, items = self.items.len(), "wrote edit list");
        Ok(())
    }
}

fn round_item(plan: &RoundPlan) -> EditItem {
    EditItem::Round {
        name: plan.name.clone(),
        duration: plan.duration,
        segments: plan.segments(),
    }
}

fn black() -> EditItem {
    EditItem::Black {
        duration: 2.0 * FADE_DURATION,
    }
}

fn assembled_items(config: &OutputConfig, plans: &[RoundPlan]) -> Vec<EditItem> {
    let mut items = vec![EditItem::Title {
        text: config.display_name().to_string(),
        duration: TRANSITION_DURATION,
    }];

    for (index, plan) in plans.iter().enumerate() {
        let background = config
            .rounds
            .iter()
            .find(|round| round.display_name() == plan.name)
            .and_then(|round| round.background.clone());
        items.push(black());
        items.push(EditItem::Transition {
            text: format!("Round {}\n{}", index + 1, plan.name),
            duration: TRANSITION_DURATION,
            background,
        });
        items.push(round_item(plan));
    }

    let rows = credit_rows(
        config
            .rounds
            .iter()
            .enumerate()
            .map(|(index, round)| (index + 1, &round.credits)),
    );
    if !rows.is_empty() {
        items.push(black());
        items.push(EditItem::Credits { rows });
    }
    items
}
