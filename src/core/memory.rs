// One radio memory channel in radio-independent form
// Reference: chirp/chirp_common.py lines 280-645

use super::constants::*;
use super::power::PowerLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid tone: {0}")]
    InvalidTone(f32),

    #[error("Invalid DTCS code: {0}")]
    InvalidDtcs(u16),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Invalid tone mode: {0}")]
    InvalidToneMode(String),

    #[error("Invalid duplex: {0}")]
    InvalidDuplex(String),

    #[error("Invalid skip value: {0}")]
    InvalidSkip(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub number: u32,
    pub name: String,
    /// Receive frequency in Hz
    pub freq: u64,
    /// Transmit CTCSS tone in Hz
    pub rtone: f32,
    /// Receive CTCSS tone in Hz
    pub ctone: f32,
    pub dtcs: u16,
    pub rx_dtcs: u16,
    /// "", "Tone", "TSQL", "DTCS" or "Cross"
    pub tmode: String,
    /// e.g. "Tone->DTCS", only meaningful when `tmode` is "Cross"
    pub cross_mode: String,
    /// Transmit/receive DTCS polarity, "NN".."RR"
    pub dtcs_polarity: String,
    /// "" or "S" (skip during scan)
    pub skip: String,
    pub power: Option<PowerLevel>,
    /// "", "+", "-", "split" or "off"
    pub duplex: String,
    /// Shift in Hz, or the transmit frequency when `duplex` is "split"
    pub offset: u64,
    pub mode: String,
    /// Tuning step in kHz
    pub tuning_step: f32,
    pub empty: bool,
    /// Model-specific settings that have no common field
    #[serde(default)]
    pub extra: BTreeMap<String, i64>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Memory {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            name: String::new(),
            freq: 0,
            rtone: 88.5,
            ctone: 88.5,
            dtcs: 23,
            rx_dtcs: 23,
            tmode: String::new(),
            cross_mode: "Tone->Tone".to_string(),
            dtcs_polarity: "NN".to_string(),
            skip: String::new(),
            power: None,
            duplex: String::new(),
            offset: 600_000,
            mode: "FM".to_string(),
            tuning_step: 5.0,
            empty: false,
            extra: BTreeMap::new(),
        }
    }

    pub fn new_empty(number: u32) -> Self {
        Self {
            empty: true,
            ..Self::new(number)
        }
    }

    /// Parse "146.520", "146.520 MHz" or "146520 kHz" into Hz
    pub fn parse_freq(text: &str) -> Result<u64> {
        let text = text.trim();
        let invalid = || MemoryError::InvalidFrequency(text.to_string());

        if text.is_empty() {
            return Ok(0);
        }
        if let Some(mhz) = text.strip_suffix("MHz") {
            return Self::parse_freq(mhz);
        }
        if let Some(khz) = text.strip_suffix("kHz") {
            let khz: u64 = khz.trim().parse().map_err(|_| invalid())?;
            return khz.checked_mul(1000).ok_or_else(invalid);
        }

        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        if frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let mhz: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let hz: u64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<6}", frac).parse().map_err(|_| invalid())?
        };
        mhz.checked_mul(1_000_000)
            .and_then(|v| v.checked_add(hz))
            .ok_or_else(invalid)
    }

    /// Hz as "146.520000"
    pub fn format_freq(freq: u64) -> String {
        format!("{}.{:06}", freq / 1_000_000, freq % 1_000_000)
    }

    /// Transmit frequency implied by `duplex` and `offset`
    pub fn tx_freq(&self) -> Option<u64> {
        match self.duplex.as_str() {
            "" => Some(self.freq),
            "+" => self.freq.checked_add(self.offset),
            "-" => self.freq.checked_sub(self.offset),
            "split" => Some(self.offset),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !TONE_MODES.contains(&self.tmode.as_str()) {
            return Err(MemoryError::InvalidToneMode(self.tmode.clone()));
        }
        if !is_valid_tone(self.rtone) {
            return Err(MemoryError::InvalidTone(self.rtone));
        }
        if !is_valid_tone(self.ctone) {
            return Err(MemoryError::InvalidTone(self.ctone));
        }
        if !is_valid_dtcs(self.dtcs) {
            return Err(MemoryError::InvalidDtcs(self.dtcs));
        }
        if !is_valid_dtcs(self.rx_dtcs) {
            return Err(MemoryError::InvalidDtcs(self.rx_dtcs));
        }
        if !MODES.contains(&self.mode.as_str()) {
            return Err(MemoryError::InvalidMode(self.mode.clone()));
        }
        if !DUPLEX_MODES.contains(&self.duplex.as_str()) {
            return Err(MemoryError::InvalidDuplex(self.duplex.clone()));
        }
        if !SKIP_VALUES.contains(&self.skip.as_str()) {
            return Err(MemoryError::InvalidSkip(self.skip.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.empty {
            return write!(f, "Memory {}: (empty)", self.number);
        }
        let dup = if self.duplex.is_empty() {
            "/"
        } else {
            &self.duplex
        };
        let tone = match self.tmode.as_str() {
            "" => String::new(),
            "Tone" => format!(" T{:.1}", self.rtone),
            "TSQL" => format!(" S{:.1}", self.ctone),
            "DTCS" => format!(" D{:03}{}", self.dtcs, self.dtcs_polarity),
            other => format!(" {} {}", other, self.cross_mode),
        };
        write!(
            f,
            "Memory {}: {}{}{} {} ({}){}{}",
            self.number,
            Self::format_freq(self.freq),
            dup,
            Self::format_freq(self.offset),
            self.mode,
            self.name,
            tone,
            self.power
                .as_ref()
                .map(|p| format!(" [{}]", p))
                .unwrap_or_default()
        )
    }
}
