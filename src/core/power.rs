// Transmit power levels as offered by a radio model
// Reference: chirp/chirp_common.py lines 178-241

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PowerError {
    #[error("Invalid power specification: {0}")]
    InvalidFormat(String),
}

lazy_static! {
    static ref POWER_RE: Regex =
        Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)\s*([Ww]?)\s*$").expect("power pattern compiles");
}

/// One selectable power level, labelled the way the radio displays it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerLevel {
    label: String,
    dbm: f32,
}

impl PowerLevel {
    pub fn from_watts(label: impl Into<String>, watts: f32) -> Self {
        Self {
            label: label.into(),
            dbm: watts_to_dbm(watts),
        }
    }

    pub fn from_dbm(label: impl Into<String>, dbm: f32) -> Self {
        Self {
            label: label.into(),
            dbm,
        }
    }

    /// Level labelled after its wattage, e.g. "5.0W" or "50W"
    pub fn auto_named(watts: f32) -> Self {
        let label = if watts >= 10.0 {
            format!("{}W", watts as i32)
        } else {
            format!("{:.1}W", watts)
        };
        Self::from_watts(label, watts)
    }

    pub fn dbm(&self) -> f32 {
        self.dbm
    }

    pub fn watts(&self) -> f32 {
        dbm_to_watts(self.dbm)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Parse user input such as "5", "5W" or "0.5 w"
    pub fn parse(text: &str) -> Result<Self, PowerError> {
        let caps = POWER_RE
            .captures(text)
            .ok_or_else(|| PowerError::InvalidFormat(text.to_string()))?;
        let watts: f32 = caps[1]
            .parse()
            .map_err(|_| PowerError::InvalidFormat(text.to_string()))?;
        Ok(Self::auto_named(watts))
    }

    /// Index of the level in `levels` closest to this one in dBm
    pub fn closest_in(&self, levels: &[PowerLevel]) -> Option<usize> {
        levels
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.dbm - self.dbm).abs();
                let db = (b.dbm - self.dbm).abs();
                da.total_cmp(&db)
            })
            .map(|(i, _)| i)
    }
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl PartialOrd for PowerLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.dbm.partial_cmp(&other.dbm)
    }
}

pub fn watts_to_dbm(watts: f32) -> f32 {
    10.0 * watts.log10() + 30.0
}

/// dBm to watts, rounded to 0.1 W
pub fn dbm_to_watts(dbm: f32) -> f32 {
    (10.0_f32.powf(dbm / 10.0) / 1000.0 * 10.0).round() / 10.0
}
