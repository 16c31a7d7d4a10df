// Fatigue status bands shown next to each pitcher.

use serde::Serialize;

/// Traffic-light band for a fatigue score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FatigueStatus {
    /// 90 and above: needs rest.
    Red,
    /// 75 up to 90.
    Orange,
    /// 50 up to 75.
    Yellow,
    /// Below 50: fresh.
    Green,
}

impl FatigueStatus {
    pub fn from_fatigue(fatigue: f64) -> Self {
        if fatigue >= 90.0 {
            FatigueStatus::Red
        } else if fatigue >= 75.0 {
            FatigueStatus::Orange
        } else if fatigue >= 50.0 {
            FatigueStatus::Yellow
        } else {
            FatigueStatus::Green
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FatigueStatus::Red => "red",
            FatigueStatus::Orange => "orange",
            FatigueStatus::Yellow => "yellow",
            FatigueStatus::Green => "green",
        }
    }
}

impl std::fmt::Display for FatigueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
