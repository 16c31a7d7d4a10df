// Pitcher domain types.

use chrono::NaiveDate;
use serde::Serialize;

use crate::fatigue::fatigue;
use crate::status::FatigueStatus;

/// One game pitched on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appearance {
    pub date: NaiveDate,
    pub pitch_count: u32,
}

impl Appearance {
    pub fn new(date: NaiveDate, pitch_count: u32) -> Self {
        Self { date, pitch_count }
    }
}

/// A pitcher and every appearance ingested for them, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Pitcher {
    /// Display name, as spelled on the first accepted row.
    pub name: String,
    pub team: String,
    pub handedness: String,
    pub appearances: Vec<Appearance>,
}

impl Pitcher {
    pub fn new(
        name: impl Into<String>,
        team: impl Into<String>,
        handedness: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            handedness: handedness.into(),
            appearances: Vec::new(),
        }
    }

    pub fn add_appearance(&mut self, appearance: Appearance) {
        self.appearances.push(appearance);
    }

    /// Fill in handedness from a later row. The first non-empty value wins.
    pub fn backfill_handedness(&mut self, handedness: &str) {
        if self.handedness.is_empty() && !handedness.is_empty() {
            self.handedness = handedness.to_string();
        }
    }

    /// Lookup key used for case-insensitive identity.
    pub fn key(&self) -> String {
        name_key(&self.name)
    }

    /// Score this pitcher against `reference_date`.
    pub fn score(&self, reference_date: NaiveDate) -> ScoredPitcher {
        let fatigue = fatigue(self, reference_date);
        ScoredPitcher {
            name: self.name.clone(),
            team: self.team.clone(),
            handedness: self.handedness.clone(),
            fatigue,
            status: FatigueStatus::from_fatigue(fatigue),
        }
    }
}

/// Normalize a pitcher name for identity comparisons. Whitespace is
/// significant; ingested names are already trimmed by the reader.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// The record shape returned by the list and lookup endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPitcher {
    pub name: String,
    pub team: String,
    pub handedness: String,
    pub fatigue: f64,
    pub status: FatigueStatus,
}
