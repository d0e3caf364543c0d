use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScoreBand {
    Low,
    Medium,
    High,
}

impl ScoreBand {
    pub fn display_name(&self) -> &'static str {
        match self {
            ScoreBand::Low => "Low",
            ScoreBand::Medium => "Medium",
            ScoreBand::High => "High",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Band boundaries over a 0..=100 score: `Low < medium_from <= Medium < high_from <= High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelBands {
    pub medium_from: u8,
    pub high_from: u8,
}

impl Default for LabelBands {
    fn default() -> Self {
        Self {
            medium_from: 30,
            high_from: 70,
        }
    }
}

impl LabelBands {
    pub fn new(medium_from: u8, high_from: u8) -> AppResult<Self> {
        let bands = Self {
            medium_from,
            high_from,
        };
        bands.validate()?;
        Ok(bands)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.medium_from == 0 || self.medium_from >= self.high_from || self.high_from > 100 {
            return Err(AppError::config(format!(
                "Score bands must satisfy 0 < medium ({}) < high ({}) <= 100",
                self.medium_from, self.high_from
            )));
        }
        Ok(())
    }

    pub fn band_for(&self, value: u8) -> ScoreBand {
        if value >= self.high_from {
            ScoreBand::High
        } else if value >= self.medium_from {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }
}
