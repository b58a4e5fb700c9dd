// Per-model constants and the checks a memory must pass before encoding
// Reference: chirp/chirp_common.py lines 760-1000 (RadioFeatures, validate_memory)

use super::traits::{RadioError, RadioResult};
use crate::core::{Memory, PowerLevel};
use serde::{Deserialize, Serialize};

/// Everything a driver needs to know about one radio model.
/// Passed explicitly to conversion code; nothing here is mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub vendor: String,
    pub model: String,
    /// Image size in bytes
    pub memsize: usize,
    /// First and last channel number, inclusive
    pub memory_bounds: (u32, u32),
    /// Hz per unit of the stored BCD frequency
    pub freq_scale: u64,
    /// Inclusive receive ranges in Hz
    pub valid_bands: Vec<(u64, u64)>,
    pub valid_modes: Vec<String>,
    pub valid_tmodes: Vec<String>,
    pub valid_duplexes: Vec<String>,
    pub valid_skips: Vec<String>,
    pub power_levels: Vec<PowerLevel>,
    pub name_length: usize,
    pub valid_characters: String,
    /// Byte used to pad names shorter than `name_length`
    pub name_pad: u8,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vendor: String::new(),
            model: String::new(),
            memsize: 0,
            memory_bounds: (0, 0),
            freq_scale: 1,
            valid_bands: Vec::new(),
            valid_modes: vec!["FM".to_string()],
            valid_tmodes: vec![String::new()],
            valid_duplexes: vec![String::new()],
            valid_skips: vec![String::new()],
            power_levels: Vec::new(),
            name_length: 0,
            valid_characters: String::new(),
            name_pad: b' ',
        }
    }
}

impl ModelConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn channel_count(&self) -> usize {
        let (start, end) = self.memory_bounds;
        end.saturating_sub(start) as usize + 1
    }

    /// Zero-based record index of channel `number`
    pub fn check_number(&self, number: u32) -> RadioResult<usize> {
        let (start, end) = self.memory_bounds;
        if number < start || number > end {
            return Err(RadioError::InvalidMemory(number));
        }
        Ok((number - start) as usize)
    }

    pub fn in_band(&self, freq: u64) -> bool {
        self.valid_bands
            .iter()
            .any(|&(lo, hi)| (lo..=hi).contains(&freq))
    }

    /// Reject memories this model cannot store
    pub fn validate_memory(&self, mem: &Memory) -> RadioResult<()> {
        self.check_number(mem.number)?;
        if mem.empty {
            return Ok(());
        }
        mem.validate()?;

        if !self.in_band(mem.freq) {
            return Err(RadioError::Radio(format!(
                "Frequency {} is out of supported range",
                Memory::format_freq(mem.freq)
            )));
        }
        if matches!(mem.duplex.as_str(), "+" | "-" | "split") {
            match mem.tx_freq() {
                Some(tx) if self.in_band(tx) => {}
                Some(tx) => {
                    return Err(RadioError::Radio(format!(
                        "Transmit frequency {} is out of supported range",
                        Memory::format_freq(tx)
                    )))
                }
                None => {
                    return Err(RadioError::Radio(format!(
                        "Offset {} leaves no transmit frequency",
                        Memory::format_freq(mem.offset)
                    )))
                }
            }
        }

        let checks = [
            ("mode", &mem.mode, &self.valid_modes),
            ("tone mode", &mem.tmode, &self.valid_tmodes),
            ("duplex", &mem.duplex, &self.valid_duplexes),
            ("skip", &mem.skip, &self.valid_skips),
        ];
        for (what, value, allowed) in checks {
            if !allowed.iter().any(|a| a == value) {
                return Err(RadioError::Radio(format!(
                    "Unsupported {} {:?} on {} {}",
                    what, value, self.vendor, self.model
                )));
            }
        }

        if mem.name.chars().count() > self.name_length {
            return Err(RadioError::Radio(format!(
                "Name {:?} is longer than {} characters",
                mem.name, self.name_length
            )));
        }
        if let Some(bad) = mem
            .name
            .chars()
            .find(|c| !self.valid_characters.contains(*c))
        {
            return Err(RadioError::Radio(format!(
                "Character {:?} is not supported in names",
                bad
            )));
        }

        Ok(())
    }

    /// Coerce a name into something the radio can display
    pub fn filter_name(&self, name: &str) -> String {
        let upper_only = !self.valid_characters.chars().any(|c| c.is_lowercase());
        name.chars()
            .take(self.name_length)
            .map(|c| if upper_only { c.to_ascii_uppercase() } else { c })
            .map(|c| {
                if self.valid_characters.contains(c) {
                    c
                } else {
                    ' '
                }
            })
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    /// Index into `power_levels` for a memory's power: exact label match,
    /// then nearest in dBm, then the first level
    pub fn power_index(&self, power: Option<&PowerLevel>) -> usize {
        let Some(power) = power else {
            return 0;
        };
        self.power_levels
            .iter()
            .position(|p| p.label() == power.label())
            .or_else(|| power.closest_in(&self.power_levels))
            .unwrap_or(0)
    }
}
