// Icom IC-T7H driver
// Reference: chirp/drivers/ict7h.py
//
// Frequencies are big-endian BCD in 100 kHz units with the 10 kHz digit and
// a 500 Hz fraction packed into the following byte. Emptiness lives in a
// separate flags array.

use super::config::ModelConfig;
use super::traits::{check_image_size, CloneModeRadio, Radio, RadioError, RadioResult};
use crate::bitwise::{compile_schema, FieldHandle, LayoutTree, SchemaError, StructuredView};
use crate::core::{tone_index, Memory, MemoryError, TONES};
use crate::memmap::ByteImage;
use crate::register_radio_driver;
use lazy_static::lazy_static;
use std::sync::Arc;

const MEMSIZE: usize = 0x03B0;

const MEM_FORMAT: &str = r#"
struct {
  bbcd freq[2];
  u8  lastfreq:4,
      fraction:4;
  bbcd offset[2];
  u8  unknown;
  u8  rtone;
  u8  ctone;
} memory[60];

#seekto 0x0270;
struct {
  u8 empty:1,
     tmode:2,
     duplex:2,
     unknown3:1,
     skip:1,
     unknown4:1;
} flags[60];
"#;

/// Indexed by the 2-bit tmode flag
const TMODES: &[&str] = &["", "", "Tone", "TSQL"];
const DUPLEX: &[&str] = &["", "", "-", "+"];

const FREQ_UNIT: u64 = 100_000;
const LASTFREQ_UNIT: u64 = 10_000;
const FRACTION_UNIT: u64 = 500;
const OFFSET_UNIT: u64 = 10_000;

lazy_static! {
    static ref LAYOUT: Result<Arc<LayoutTree>, SchemaError> =
        compile_schema(MEM_FORMAT).map(Arc::new);
}

fn layout() -> RadioResult<Arc<LayoutTree>> {
    LAYOUT.as_ref().map(Arc::clone).map_err(|e| e.clone().into())
}

pub fn model_config() -> ModelConfig {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    ModelConfig {
        vendor: "Icom".to_string(),
        model: "IC-T7H".to_string(),
        memsize: MEMSIZE,
        memory_bounds: (1, 60),
        freq_scale: FREQ_UNIT,
        valid_bands: vec![(118_000_000, 174_000_000), (400_000_000, 470_000_000)],
        valid_modes: strings(&["FM"]),
        valid_tmodes: strings(&["", "Tone", "TSQL"]),
        valid_duplexes: strings(&["", "-", "+"]),
        valid_skips: strings(&["", "S"]),
        power_levels: Vec::new(),
        name_length: 0,
        valid_characters: String::new(),
        name_pad: b' ',
    }
}

/// CTCSS tone from its 1-based table index
fn decode_tone(number: u32, index: i64) -> Option<f32> {
    let tone = usize::try_from(index - 1).ok().and_then(|i| TONES.get(i).copied());
    if tone.is_none() {
        tracing::warn!("Memory #{} has invalid tone index {}", number, index);
    }
    tone
}

fn encode_tone(tone: f32) -> RadioResult<i64> {
    tone_index(tone)
        .map(|i| i as i64 + 1)
        .ok_or_else(|| MemoryError::InvalidTone(tone).into())
}

fn decode_memory(
    number: u32,
    rec: &FieldHandle<'_>,
    flag: &FieldHandle<'_>,
) -> RadioResult<Option<Memory>> {
    if flag.field("empty")?.get_bool()? {
        return Ok(None);
    }

    let Some(freq) = rec.field("freq")?.get_bcd()? else {
        tracing::debug!("Memory #{} has invalid BCD frequency, treating as empty", number);
        return Ok(None);
    };

    let mut mem = Memory::new(number);
    mem.freq = freq * FREQ_UNIT
        + rec.field("lastfreq")?.get_int()? as u64 * LASTFREQ_UNIT
        + rec.field("fraction")?.get_int()? as u64 * FRACTION_UNIT;
    mem.offset = rec.field("offset")?.get_bcd()?.unwrap_or(0) * OFFSET_UNIT;

    if let Some(tone) = decode_tone(number, rec.field("rtone")?.get_int()?) {
        mem.rtone = tone;
    }
    if let Some(tone) = decode_tone(number, rec.field("ctone")?.get_int()?) {
        mem.ctone = tone;
    }

    mem.tmode = TMODES[flag.field("tmode")?.get_int()? as usize].to_string();
    mem.duplex = DUPLEX[flag.field("duplex")?.get_int()? as usize].to_string();
    mem.mode = "FM".to_string();
    if flag.field("skip")?.get_bool()? {
        mem.skip = "S".to_string();
    }

    Ok(Some(mem))
}

fn encode_memory(
    config: &ModelConfig,
    mem: &Memory,
    rec: &FieldHandle<'_>,
    flag: &FieldHandle<'_>,
) -> RadioResult<()> {
    if mem.empty {
        flag.field("empty")?.set_bool(true)?;
        return Ok(());
    }

    config.validate_memory(mem)?;

    let top = mem.freq / FREQ_UNIT;
    let lastfreq = mem.freq % FREQ_UNIT / LASTFREQ_UNIT;
    let rest = mem.freq % LASTFREQ_UNIT;
    if rest % FRACTION_UNIT != 0 || rest / FRACTION_UNIT > 0x0F {
        return Err(RadioError::Radio(format!(
            "Frequency {} is not on a supported step",
            Memory::format_freq(mem.freq)
        )));
    }
    let offset = mem.offset / OFFSET_UNIT;
    if offset > 9999 {
        return Err(RadioError::Radio(format!(
            "Offset {} is too large",
            Memory::format_freq(mem.offset)
        )));
    }
    let rtone = encode_tone(mem.rtone)?;
    let ctone = encode_tone(mem.ctone)?;
    let tmode = TMODES.iter().position(|&m| m == mem.tmode).unwrap_or(0);
    let duplex = DUPLEX.iter().position(|&d| d == mem.duplex).unwrap_or(0);

    rec.field("freq")?.set_int(top as i64)?;
    rec.field("lastfreq")?.set_int(lastfreq as i64)?;
    rec.field("fraction")?.set_int((rest / FRACTION_UNIT) as i64)?;
    rec.field("offset")?.set_int(offset as i64)?;
    rec.field("rtone")?.set_int(rtone)?;
    rec.field("ctone")?.set_int(ctone)?;

    flag.field("tmode")?.set_int(tmode as i64)?;
    flag.field("duplex")?.set_int(duplex as i64)?;
    flag.field("skip")?.set_bool(mem.skip == "S")?;
    flag.field("empty")?.set_bool(false)?;
    Ok(())
}

/// IC-T7H Radio Driver
pub struct ICT7HRadio {
    config: ModelConfig,
    view: Option<StructuredView>,
}

impl ICT7HRadio {
    pub fn new() -> Self {
        Self {
            config: model_config(),
            view: None,
        }
    }

    fn records(&self, number: u32) -> RadioResult<(FieldHandle<'_>, FieldHandle<'_>)> {
        let index = self.config.check_number(number)?;
        let view = self.view.as_ref().ok_or(RadioError::NoImage)?;
        Ok((
            view.field("memory")?.index(index)?,
            view.field("flags")?.index(index)?,
        ))
    }
}

impl Default for ICT7HRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl Radio for ICT7HRadio {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn get_memory(&self, number: u32) -> RadioResult<Option<Memory>> {
        let (rec, flag) = self.records(number)?;
        decode_memory(number, &rec, &flag)
    }

    fn set_memory(&mut self, memory: &Memory) -> RadioResult<()> {
        let (rec, flag) = self.records(memory.number)?;
        encode_memory(&self.config, memory, &rec, &flag)
    }
}

impl CloneModeRadio for ICT7HRadio {
    fn load_image(&mut self, image: ByteImage) -> RadioResult<()> {
        check_image_size(&self.config, &image)?;
        self.view = Some(StructuredView::new(image, layout()?));
        Ok(())
    }

    fn view(&self) -> Option<&StructuredView> {
        self.view.as_ref()
    }

    /// No signature in the image, so go by size alone
    fn match_model(data: &[u8], _filename: &str) -> bool {
        data.len() == MEMSIZE
    }
}

register_radio_driver!(
    ICT7HRadio,
    "Icom",
    "IC-T7H",
    "Dual-band handheld (VHF/UHF, FM only)",
    MEMSIZE
);

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> ICT7HRadio {
        let mut image = ByteImage::zeroed(MEMSIZE);
        // every slot starts empty
        image.fill_range(0x0270, 60, 0x80).unwrap();
        let mut radio = ICT7HRadio::new();
        radio.load_image(image).unwrap();
        radio
    }

    #[test]
    fn test_layout() {
        let layout = layout().unwrap();
        assert_eq!(layout.root().field("flags").unwrap().offset, 0x0270);
        assert_eq!(layout.root().field("memory").unwrap().kind.span_bytes(), 60 * 8);
    }

    #[test]
    fn test_record_bytes() {
        let mut radio = loaded();
        let mut mem = Memory::new(1);
        mem.freq = 146_525_000;
        mem.duplex = "-".to_string();
        mem.offset = 600_000;
        mem.tmode = "Tone".to_string();
        mem.rtone = 100.0;
        radio.set_memory(&mem).unwrap();

        let bytes = radio.image_bytes().unwrap();
        // 1465 | 2, 10 | 0060 | unknown | rtone 13 | ctone 9
        assert_eq!(&bytes[0..8], &[0x14, 0x65, 0x2A, 0x00, 0x60, 0x00, 13, 9]);
        // empty=0 tmode=2 duplex=2 skip=0
        assert_eq!(bytes[0x0270], 0b0_10_10_0_0_0);
    }

    #[test]
    fn test_memory_roundtrip() {
        let mut radio = loaded();
        let mut mem = Memory::new(60);
        mem.freq = 446_005_000;
        mem.duplex = "+".to_string();
        mem.offset = 5_000_000;
        mem.tmode = "TSQL".to_string();
        mem.ctone = 131.8;
        mem.skip = "S".to_string();
        radio.set_memory(&mem).unwrap();

        let decoded = radio.get_memory(60).unwrap().unwrap();
        assert_eq!(decoded.freq, 446_005_000);
        assert_eq!(decoded.duplex, "+");
        assert_eq!(decoded.offset, 5_000_000);
        assert_eq!(decoded.tmode, "TSQL");
        assert_eq!(decoded.ctone, 131.8);
        assert_eq!(decoded.skip, "S");
    }

    #[test]
    fn test_tmode_flag_decoding() {
        let mut radio = loaded();
        let mut mem = Memory::new(2);
        mem.freq = 145_000_000;
        radio.set_memory(&mem).unwrap();
        radio.view().unwrap().set("flags[1].tmode", 3).unwrap();
        assert_eq!(radio.get_memory(2).unwrap().unwrap().tmode, "TSQL");
        radio.view().unwrap().set("flags[1].tmode", 1).unwrap();
        assert_eq!(radio.get_memory(2).unwrap().unwrap().tmode, "");
    }

    #[test]
    fn test_empty_flag() {
        let mut radio = loaded();
        assert!(radio.get_memories().unwrap().is_empty());

        let mut mem = Memory::new(5);
        mem.freq = 145_000_000;
        radio.set_memory(&mem).unwrap();
        assert_eq!(radio.get_memories().unwrap().len(), 1);

        radio.delete_memory(5).unwrap();
        assert!(radio.get_memory(5).unwrap().is_none());
        assert_eq!(radio.image_bytes().unwrap()[0x0270 + 4] & 0x80, 0x80);
    }

    #[test]
    fn test_rejects_unsupported() {
        let mut radio = loaded();
        let before = radio.image_bytes().unwrap();

        let mut mem = Memory::new(3);
        mem.freq = 145_000_100;
        assert!(radio.set_memory(&mem).is_err());

        mem.freq = 480_000_000;
        assert!(radio.set_memory(&mem).is_err());

        mem.freq = 145_000_000;
        mem.tmode = "DTCS".to_string();
        assert!(radio.set_memory(&mem).is_err());

        mem.tmode = String::new();
        mem.rtone = 100.1;
        assert!(radio.set_memory(&mem).is_err());

        assert!(matches!(radio.get_memory(0), Err(RadioError::InvalidMemory(0))));
        assert_eq!(radio.image_bytes().unwrap(), before);
    }

    #[test]
    fn test_match_model() {
        assert!(ICT7HRadio::match_model(&[0u8; MEMSIZE], "t7h.img"));
        assert!(!ICT7HRadio::match_model(&[0u8; 0x1808], "t7h.img"));
    }
}
