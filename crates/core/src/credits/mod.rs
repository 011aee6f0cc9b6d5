use serde::{Deserialize, Serialize};

use crate::{CutError, Result};

/// Credit for one piece of music used in a round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioCredit {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
}

impl AudioCredit {
    pub fn lines(&self) -> Vec<String> {
        [&self.artist, &self.song]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.artist.is_none() {
            return Err(CutError::invalid("credits.audio.artist", "artist is required"));
        }
        if self.song.is_none() {
            return Err(CutError::invalid("credits.audio.song", "song is required"));
        }
        Ok(())
    }
}

/// Credit for one source video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoCredit {
    #[serde(default)]
    pub studio: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Release date as `YYYY.MM.DD`.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub performers: Vec<String>,
}

impl VideoCredit {
    pub fn lines(&self) -> Vec<String> {
        [&self.studio, &self.date, &self.title]
            .into_iter()
            .flatten()
            .chain(&self.performers)
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<()> {
        match &self.date {
            Some(date) if !is_dotted_date(date) => Err(CutError::invalid(
                "credits.video.date",
                format!("incorrect date format `{date}`, should be YYYY.MM.DD"),
            )),
            _ => Ok(()),
        }
    }
}

/// Everything credited for one round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundCredits {
    #[serde(default)]
    pub audio: Vec<AudioCredit>,
    #[serde(default)]
    pub video: Vec<VideoCredit>,
}

impl RoundCredits {
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty() && self.video.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.iter().try_for_each(AudioCredit::validate)?;
        self.video.iter().try_for_each(VideoCredit::validate)
    }
}

/// One line of the two-column credits roll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRow {
    pub heading: String,
    pub text: String,
}

impl CreditRow {
    fn new(heading: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::default()
    }
}

/// Lays out the credits of every round as heading/text rows.
///
/// `rounds` pairs each round's one-based number with its credits.
pub fn credit_rows<'a>(rounds: impl IntoIterator<Item = (usize, &'a RoundCredits)>) -> Vec<CreditRow> {
    let mut rows = Vec::new();
    for (number, credits) in rounds {
        if credits.is_empty() {
            continue;
        }
        push_block(
            &mut rows,
            &format!("ROUND {number} MUSIC"),
            credits.audio.iter().map(AudioCredit::lines),
        );
        push_block(
            &mut rows,
            &format!("ROUND {number} VIDEOS"),
            credits.video.iter().map(VideoCredit::lines),
        );
        rows.extend([CreditRow::blank(), CreditRow::blank()]);
    }
    rows
}

/// Pushes one group of credits; only the first line of the group carries the
/// heading.
fn push_block(rows: &mut Vec<CreditRow>, heading: &str, credits: impl Iterator<Item = Vec<String>>) {
    let mut heading = Some(heading);
    for lines in credits {
        for line in lines {
            rows.push(CreditRow::new(heading.take().unwrap_or_default(), line));
        }
        rows.push(CreditRow::blank());
    }
}

fn is_dotted_date(date: &str) -> bool {
    let parts: Vec<&str> = date.split('.').collect();
    let [year, month, day] = parts.as_slice() else {
        return false;
    };
    let field = |value: &str, digits: usize, range: std::ops::RangeInclusive<u32>| {
        value.len() == digits && value.parse::<u32>().is_ok_and(|n| range.contains(&n))
    };
    field(*year, 4, 1..=9999) && field(*month, 2, 1..=12) && field(*day, 2, 1..=31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(artist: &str, song: &str) -> AudioCredit {
        AudioCredit {
            artist: Some(artist.to_string()),
            song: Some(song.to_string()),
        }
    }

    #[test]
    fn lays_out_round_headings_once_per_group() {
        let credits = RoundCredits {
            audio: vec![audio("Artist A", "Song A"), audio("Artist B", "Song B")],
            video: vec![VideoCredit {
                studio: Some("Studio".to_string()),
                title: Some("Title".to_string()),
                date: Some("2020.01.31".to_string()),
                performers: vec!["Someone".to_string()],
            }],
        };

        let rows = credit_rows([(2, &credits)]);
        let headed: Vec<_> = rows.iter().filter(|row| !row.heading.is_empty()).collect();

        assert_eq!(headed.len(), 2);
        assert_eq!(headed[0], &CreditRow::new("ROUND 2 MUSIC", "Artist A"));
        assert_eq!(headed[1], &CreditRow::new("ROUND 2 VIDEOS", "Studio"));
        assert!(rows.iter().any(|row| row.text == "Song B"));
        let video_text: Vec<_> = rows
            .iter()
            .skip_while(|row| row.heading != "ROUND 2 VIDEOS")
            .take(4)
            .map(|row| row.text.as_str())
            .collect();
        assert_eq!(video_text, ["Studio", "2020.01.31", "Title", "Someone"]);
    }

    #[test]
    fn skips_rounds_without_credits() {
        let empty = RoundCredits::default();
        assert!(credit_rows([(1, &empty)]).is_empty());
    }

    #[test]
    fn validates_audio_fields_and_dates() {
        let missing_song = RoundCredits {
            audio: vec![AudioCredit {
                artist: Some("x".to_string()),
                song: None,
            }],
            video: vec![],
        };
        assert_eq!(
            missing_song.validate().unwrap_err().field(),
            Some("credits.audio.song")
        );

        let bad_date = RoundCredits {
            audio: vec![],
            video: vec![VideoCredit {
                date: Some("2020-01-31".to_string()),
                ..Default::default()
            }],
        };
        assert_eq!(
            bad_date.validate().unwrap_err().field(),
            Some("credits.video.date")
        );
    }

    #[test]
    fn dotted_dates() {
        assert!(is_dotted_date("1999.12.01"));
        assert!(!is_dotted_date("1999.13.01"));
        assert!(!is_dotted_date("99.12.01"));
        assert!(!is_dotted_date("1999.12"));
    }
}
