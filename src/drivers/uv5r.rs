// Baofeng UV-5R driver
// Reference: chirp/drivers/uv5r.py
//
// Channel records are read and written through the declarative layout below;
// this module only converts between those fields and the common Memory.

use super::config::ModelConfig;
use super::traits::{check_image_size, CloneModeRadio, Radio, RadioError, RadioResult};
use crate::bitwise::{
    bcd, compile_schema, Endianness, FieldHandle, LayoutTree, SchemaError, StructuredView,
};
use crate::core::{Memory, PowerLevel, CHARSET_UPPER_NUMERIC, DTCS_CODES};
use crate::memmap::ByteImage;
use crate::register_radio_driver;
use lazy_static::lazy_static;
use std::sync::Arc;

/// Memory size for UV-5R (6152 bytes)
const MEMSIZE: usize = 0x1808;

/// Image sizes written by the various firmware/aux-block combinations
const IMAGE_SIZES: &[usize] = &[0x1808, 0x1948, 0x1950];

const MEMORY_BASE: usize = 0x0008;

/// Tone words at or above this value hold CTCSS Hz * 10; below it, a DTCS index
const TONE_CTCSS_THRESHOLD: u16 = 0x0258;

/// Offset added to a DTCS index for reversed polarity
const DTCS_REVERSED: u16 = 0x69;

const NAME_LENGTH: usize = 7;

/// Per-channel settings with no common Memory field
const EXTRA_FIELDS: &[&str] = &["bcl", "pttid", "scode"];

const MEM_FORMAT: &str = r#"
#seekto 0x0008;
struct {
  lbcd rxfreq[4];
  lbcd txfreq[4];
  ul16 rxtone;
  ul16 txtone;
  u8 unused1:3,
     isuhf:1,
     scode:4;
  u8 unknown1:7,
     txtoneicon:1;
  u8 mailicon:3,
     unknown2:3,
     lowpower:2;
  u8 unknown3:1,
     wide:1,
     unknown4:2,
     bcl:1,
     scan:1,
     pttid:2;
} memory[128];

#seekto 0x1008;
struct {
  char name[7];
  u8 unknown2[9];
} names[128];
"#;

lazy_static! {
    static ref LAYOUT: Result<Arc<LayoutTree>, SchemaError> =
        compile_schema(MEM_FORMAT).map(Arc::new);

    /// The radio's DTCS table has one code the common table lacks
    static ref UV5R_DTCS: Vec<u16> = {
        let mut codes = DTCS_CODES.to_vec();
        codes.push(645);
        codes.sort_unstable();
        codes
    };
}

fn layout() -> RadioResult<Arc<LayoutTree>> {
    LAYOUT.as_ref().map(Arc::clone).map_err(|e| e.clone().into())
}

pub fn model_config() -> ModelConfig {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    ModelConfig {
        vendor: "Baofeng".to_string(),
        model: "UV-5R".to_string(),
        memsize: MEMSIZE,
        memory_bounds: (0, 127),
        freq_scale: 10,
        valid_bands: vec![(136_000_000, 174_000_000), (400_000_000, 520_000_000)],
        valid_modes: strings(&["FM", "NFM"]),
        valid_tmodes: strings(&["", "Tone", "TSQL", "DTCS", "Cross"]),
        valid_duplexes: strings(&["", "-", "+", "split", "off"]),
        valid_skips: strings(&["", "S"]),
        power_levels: vec![
            PowerLevel::from_watts("High", 4.0),
            PowerLevel::from_watts("Low", 1.0),
        ],
        name_length: NAME_LENGTH,
        valid_characters: format!("{}!@#$%^&*()+-=[]:\";'<>?,./", CHARSET_UPPER_NUMERIC),
        name_pad: 0xFF,
    }
}

/// One 16-bit tone word, decoded
#[derive(Debug, Clone, Copy, PartialEq)]
enum ToneWord {
    None,
    Tone(f32),
    Dtcs(u16, char),
}

impl ToneWord {
    fn mode(&self) -> &'static str {
        match self {
            ToneWord::None => "",
            ToneWord::Tone(_) => "Tone",
            ToneWord::Dtcs(..) => "DTCS",
        }
    }
}

fn decode_tone_word(value: u16) -> RadioResult<ToneWord> {
    if value == 0 || value == 0xFFFF {
        return Ok(ToneWord::None);
    }
    if value >= TONE_CTCSS_THRESHOLD {
        return Ok(ToneWord::Tone(value as f32 / 10.0));
    }

    let (index, polarity) = if value > DTCS_REVERSED {
        ((value - DTCS_REVERSED - 1) as usize, 'R')
    } else {
        ((value - 1) as usize, 'N')
    };
    UV5R_DTCS
        .get(index)
        .map(|&code| ToneWord::Dtcs(code, polarity))
        .ok_or_else(|| RadioError::Radio(format!("Invalid tone word {:04X}", value)))
}

fn encode_tone_word(word: ToneWord) -> RadioResult<u16> {
    match word {
        ToneWord::None => Ok(0),
        ToneWord::Tone(hz) => Ok((hz * 10.0).round() as u16),
        ToneWord::Dtcs(code, polarity) => {
            let index = UV5R_DTCS
                .iter()
                .position(|&c| c == code)
                .ok_or_else(|| RadioError::Radio(format!("Invalid DTCS code: {}", code)))?;
            let word = index as u16 + 1;
            Ok(if polarity == 'R' {
                word + DTCS_REVERSED
            } else {
                word
            })
        }
    }
}

/// Work out tone mode, tones and polarity from the transmit/receive words
fn decode_tone_mode(tx: ToneWord, rx: ToneWord, mem: &mut Memory) {
    let mut polarity = ['N', 'N'];

    match tx {
        ToneWord::Tone(hz) => mem.rtone = hz,
        ToneWord::Dtcs(code, pol) => {
            mem.dtcs = code;
            polarity[0] = pol;
        }
        ToneWord::None => {}
    }
    match rx {
        ToneWord::Tone(hz) => mem.ctone = hz,
        ToneWord::Dtcs(code, pol) => {
            mem.rx_dtcs = code;
            polarity[1] = pol;
        }
        ToneWord::None => {}
    }

    mem.tmode = match (tx, rx) {
        (ToneWord::None, ToneWord::None) => String::new(),
        (ToneWord::Tone(_), ToneWord::None) => "Tone".to_string(),
        (ToneWord::Tone(t), ToneWord::Tone(r)) if t == r => "TSQL".to_string(),
        (ToneWord::Dtcs(t, _), ToneWord::Dtcs(r, _)) if t == r => "DTCS".to_string(),
        _ => {
            mem.cross_mode = format!("{}->{}", tx.mode(), rx.mode());
            "Cross".to_string()
        }
    };
    mem.dtcs_polarity = polarity.iter().collect();
}

/// Transmit and receive tone words for a memory
fn encode_tone_mode(mem: &Memory) -> RadioResult<(u16, u16)> {
    let mut pol = mem.dtcs_polarity.chars();
    let tx_pol = pol.next().unwrap_or('N');
    let rx_pol = pol.next().unwrap_or('N');

    let (tx, rx) = match mem.tmode.as_str() {
        "" => (ToneWord::None, ToneWord::None),
        "Tone" => (ToneWord::Tone(mem.rtone), ToneWord::None),
        "TSQL" => (ToneWord::Tone(mem.ctone), ToneWord::Tone(mem.ctone)),
        "DTCS" => (
            ToneWord::Dtcs(mem.dtcs, tx_pol),
            ToneWord::Dtcs(mem.dtcs, rx_pol),
        ),
        "Cross" => {
            let (txmode, rxmode) = mem.cross_mode.split_once("->").ok_or_else(|| {
                RadioError::Radio(format!("Unsupported cross mode: {}", mem.cross_mode))
            })?;
            let tx = match txmode {
                "Tone" => ToneWord::Tone(mem.rtone),
                "DTCS" => ToneWord::Dtcs(mem.dtcs, tx_pol),
                _ => ToneWord::None,
            };
            let rx = match rxmode {
                "Tone" => ToneWord::Tone(mem.ctone),
                "DTCS" => ToneWord::Dtcs(mem.rx_dtcs, rx_pol),
                _ => ToneWord::None,
            };
            (tx, rx)
        }
        other => {
            return Err(RadioError::Radio(format!(
                "Unsupported tone mode: {}",
                other
            )))
        }
    };

    Ok((encode_tone_word(tx)?, encode_tone_word(rx)?))
}

/// Channel name from its 0xFF-padded bytes
fn decode_name(name: &FieldHandle<'_>) -> RadioResult<String> {
    let raw = name.get_raw()?;
    let text: String = raw
        .iter()
        .map(|&b| if b == 0xFF { ' ' } else { b as char })
        .collect();
    Ok(text.trim_end().to_string())
}

/// Decode one channel record; `None` when the slot is erased
fn decode_memory(
    config: &ModelConfig,
    number: u32,
    rec: &FieldHandle<'_>,
    nam: &FieldHandle<'_>,
) -> RadioResult<Option<Memory>> {
    if rec.get_raw()?.first() == Some(&0xFF) {
        return Ok(None);
    }

    let Some(rx) = rec.field("rxfreq")?.get_bcd()? else {
        tracing::debug!(
            "Memory #{} has invalid BCD frequency, treating as empty",
            number
        );
        return Ok(None);
    };

    let mut mem = Memory::new(number);
    mem.freq = rx * config.freq_scale;

    let txfreq = rec.field("txfreq")?;
    if txfreq.is_filled_with(0xFF)? {
        mem.duplex = "off".to_string();
        mem.offset = 0;
    } else {
        match txfreq.get_bcd()? {
            Some(tx) if tx == rx => {
                mem.duplex = String::new();
                mem.offset = 0;
            }
            Some(tx) => {
                let tx = tx * config.freq_scale;
                let diff = tx.abs_diff(mem.freq);
                if diff > 70_000_000 {
                    mem.duplex = "split".to_string();
                    mem.offset = tx;
                } else {
                    mem.duplex = if tx > mem.freq { "+" } else { "-" }.to_string();
                    mem.offset = diff;
                }
            }
            None => {
                tracing::warn!("Memory #{} has invalid transmit frequency", number);
                mem.duplex = "off".to_string();
                mem.offset = 0;
            }
        }
    }

    mem.name = decode_name(&nam.field("name")?)?;

    let tx = decode_tone_word(rec.field("txtone")?.get_int()? as u16)?;
    let rx = decode_tone_word(rec.field("rxtone")?.get_int()? as u16)?;
    decode_tone_mode(tx, rx, &mut mem);

    if !rec.field("scan")?.get_bool()? {
        mem.skip = "S".to_string();
    }

    let lowpower = rec.field("lowpower")?.get_int()? as usize;
    mem.power = match config.power_levels.get(lowpower) {
        Some(level) => Some(level.clone()),
        None => {
            tracing::warn!("Memory #{} has unknown power level {}", number, lowpower);
            config.power_levels.first().cloned()
        }
    };

    mem.mode = if rec.field("wide")?.get_bool()? {
        "FM"
    } else {
        "NFM"
    }
    .to_string();

    for &name in EXTRA_FIELDS {
        mem.extra
            .insert(name.to_string(), rec.field(name)?.get_int()?);
    }

    Ok(Some(mem))
}

/// Write one channel record. The memory is validated before anything is
/// written, and the record and name are put back if a later write fails.
fn encode_memory(
    config: &ModelConfig,
    mem: &Memory,
    rec: &FieldHandle<'_>,
    nam: &FieldHandle<'_>,
) -> RadioResult<()> {
    if mem.empty {
        rec.fill_raw(0xFF)?;
        nam.fill_raw(0xFF)?;
        return Ok(());
    }

    config.validate_memory(mem)?;
    let (txtone, rxtone) = encode_tone_mode(mem)?;
    let txfreq = match mem.duplex.as_str() {
        "off" => None,
        _ => Some(mem.tx_freq().ok_or_else(|| {
            RadioError::Radio(format!("Invalid duplex mode: {}", mem.duplex))
        })?),
    };

    // Keep settings the common Memory does not carry
    let was_empty = rec.get_raw()?.first() == Some(&0xFF);
    let previous = if was_empty {
        tracing::debug!("Memory #{} was empty", mem.number);
        Vec::new()
    } else {
        EXTRA_FIELDS
            .iter()
            .map(|&name| Ok((name, rec.field(name)?.get_int()?)))
            .collect::<RadioResult<Vec<_>>>()?
    };

    let saved = (rec.get_raw()?, nam.get_raw()?);
    let written = write_record(config, mem, rec, nam, txfreq, (txtone, rxtone), previous);
    if written.is_err() {
        rec.set_raw(&saved.0)?;
        nam.set_raw(&saved.1)?;
    }
    written
}

fn write_record(
    config: &ModelConfig,
    mem: &Memory,
    rec: &FieldHandle<'_>,
    nam: &FieldHandle<'_>,
    txfreq: Option<u64>,
    (txtone, rxtone): (u16, u16),
    previous: Vec<(&str, i64)>,
) -> RadioResult<()> {
    rec.fill_raw(0x00)?;
    rec.field("rxfreq")?
        .set_int((mem.freq / config.freq_scale) as i64)?;
    match txfreq {
        Some(tx) => rec.field("txfreq")?.set_int((tx / config.freq_scale) as i64)?,
        None => rec.field("txfreq")?.fill_raw(0xFF)?,
    }

    nam.field("name")?.set_str_padded(&mem.name, config.name_pad)?;

    rec.field("txtone")?.set_int(txtone as i64)?;
    rec.field("rxtone")?.set_int(rxtone as i64)?;
    rec.field("scan")?.set_bool(mem.skip != "S")?;
    rec.field("wide")?.set_bool(mem.mode == "FM")?;
    rec.field("lowpower")?
        .set_int(config.power_index(mem.power.as_ref()) as i64)?;

    for (name, value) in previous {
        rec.field(name)?.set_int(value)?;
    }
    for (name, &value) in &mem.extra {
        if EXTRA_FIELDS.contains(&name.as_str()) {
            rec.field(name)?.set_int(value)?;
        } else {
            tracing::warn!("Ignoring unknown setting {} on memory #{}", name, mem.number);
        }
    }

    Ok(())
}

/// UV-5R Radio Driver
pub struct UV5RRadio {
    config: ModelConfig,
    view: Option<StructuredView>,
}

impl UV5RRadio {
    /// Create a new UV-5R radio instance
    pub fn new() -> Self {
        Self {
            config: model_config(),
            view: None,
        }
    }

    fn records(&self, number: u32) -> RadioResult<(FieldHandle<'_>, FieldHandle<'_>)> {
        let index = self.config.check_number(number)?;
        let view = self.view.as_ref().ok_or(RadioError::NoImage)?;
        let rec = view.field("memory")?.index(index)?;
        let nam = view.field("names")?.index(index)?;
        Ok((rec, nam))
    }
}

impl Default for UV5RRadio {
    fn default() -> Self {
        Self::new()
    }
}

/// Implementation of Radio trait for UV-5R
impl Radio for UV5RRadio {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn get_memory(&self, number: u32) -> RadioResult<Option<Memory>> {
        let (rec, nam) = self.records(number)?;
        decode_memory(&self.config, number, &rec, &nam)
    }

    fn set_memory(&mut self, memory: &Memory) -> RadioResult<()> {
        let (rec, nam) = self.records(memory.number)?;
        encode_memory(&self.config, memory, &rec, &nam)
    }
}

/// Implementation of CloneModeRadio trait for UV-5R
impl CloneModeRadio for UV5RRadio {
    fn load_image(&mut self, image: ByteImage) -> RadioResult<()> {
        check_image_size(&self.config, &image)?;
        self.view = Some(StructuredView::new(image, layout()?));
        Ok(())
    }

    fn view(&self) -> Option<&StructuredView> {
        self.view.as_ref()
    }

    fn match_model(data: &[u8], filename: &str) -> bool {
        if !IMAGE_SIZES.contains(&data.len()) {
            return false;
        }

        let lower = filename.to_ascii_lowercase();
        if ![".img", ".dat", ".uv5"].iter().any(|ext| lower.ends_with(ext)) {
            return false;
        }

        // First channel must be erased or hold a plausible frequency
        let first = &data[MEMORY_BASE..MEMORY_BASE + 4];
        if first.iter().all(|&b| b == 0xFF) {
            return true;
        }
        match bcd::decode_packed(first, Endianness::Little) {
            Ok(value) => {
                let freq = value * 10;
                (130_000_000..=180_000_000).contains(&freq)
                    || (390_000_000..=530_000_000).contains(&freq)
            }
            Err(_) => false,
        }
    }
}

register_radio_driver!(
    UV5RRadio,
    "Baofeng",
    "UV-5R",
    "Dual-band handheld (VHF/UHF, FM only)",
    MEMSIZE
);
