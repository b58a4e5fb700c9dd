//! Parse .img file utility
//! Loads a CHIRP .img file and displays decoded memories

use chirp_bitwise::core::Memory;
use chirp_bitwise::drivers::{driver_for, list_drivers, CloneModeRadio, Radio};
use chirp_bitwise::formats::load_img;
use std::env;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file.img> [memory_number]", args[0]);
        eprintln!("\nExamples:");
        eprintln!(
            "  {} radio.img                # Show all non-empty memories",
            args[0]
        );
        eprintln!(
            "  {} radio.img 40             # Show only memory #40",
            args[0]
        );
        eprintln!(
            "  {} radio.img 32-50          # Show memories 32-50",
            args[0]
        );
        eprintln!("\nSupported radios:");
        for info in list_drivers() {
            eprintln!("  {:<20} {}", info.full_name(), info.description);
        }
        std::process::exit(1);
    }

    let img_file = &args[1];
    let filter = args.get(2).map(|s| s.as_str());

    println!("Loading .img file: {}", img_file);
    let (image, metadata) = load_img(img_file)?;
    println!("Radio: {} {}", metadata.vendor, metadata.model);
    println!("CHIRP version: {}", metadata.chirp_version);
    println!("Image size: {} bytes\n", image.len());

    let info = driver_for(image.as_bytes(), img_file, &metadata.vendor, &metadata.model)
        .ok_or_else(|| anyhow::anyhow!("No driver recognises {}", img_file))?;
    tracing::info!("Using driver: {}", info.full_name());

    let mut radio = info.create();
    radio.load_image(image)?;

    match filter {
        None => {
            println!("=== All Non-Empty Memories ===\n");
            let memories = radio.get_memories()?;
            println!("Found {} non-empty memories\n", memories.len());

            for mem in &memories {
                print_memory(mem);
            }
        }
        Some(range) if range.contains('-') => {
            let (start, end) = range
                .split_once('-')
                .ok_or_else(|| anyhow::anyhow!("Bad range {}", range))?;
            let start: u32 = start.parse()?;
            let end: u32 = end.parse()?;

            println!("=== Memories {} to {} ===\n", start, end);
            for num in start..=end {
                match radio.get_memory(num)? {
                    Some(mem) => print_memory(&mem),
                    None => println!("Memory #{}: <empty>\n", num),
                }
            }
        }
        Some(num_str) => {
            let num: u32 = num_str.parse()?;
            println!("=== Memory #{} ===\n", num);

            match radio.get_memory(num)? {
                Some(mem) => print_memory(&mem),
                None => println!("Memory #{}: <empty>", num),
            }
            print_raw_record(&*radio, num)?;
        }
    }

    Ok(())
}

fn print_memory(mem: &Memory) {
    println!("Memory #{}: \"{}\"", mem.number, mem.name);
    println!(
        "  Frequency:    {} Hz ({:.4} MHz)",
        mem.freq,
        mem.freq as f64 / 1_000_000.0
    );
    println!("  Mode:         {}", mem.mode);
    println!(
        "  Duplex:       {}",
        if mem.duplex.is_empty() {
            "none"
        } else {
            &mem.duplex
        }
    );
    println!(
        "  Offset:       {} Hz ({:.2} MHz)",
        mem.offset,
        mem.offset as f64 / 1_000_000.0
    );

    if !mem.tmode.is_empty() {
        println!("  Tone Mode:    {}", mem.tmode);
        match mem.tmode.as_str() {
            "Tone" => println!("  CTCSS TX:     {} Hz", mem.rtone),
            "TSQL" => println!("  CTCSS:        {} Hz", mem.ctone),
            "DTCS" => println!("  DTCS:         {:03} {}", mem.dtcs, mem.dtcs_polarity),
            _ => println!("  Cross:        {}", mem.cross_mode),
        }
    }

    if let Some(power) = &mem.power {
        println!("  Power:        {} ({:.1} W)", power, power.watts());
    }
    println!(
        "  Skip:         {}",
        if mem.skip.is_empty() {
            "none"
        } else {
            &mem.skip
        }
    );
    for (key, value) in &mem.extra {
        println!("  {:<13} {}", format!("{}:", key), value);
    }
    println!();
}

/// Hex of the channel record backing memory `number`
fn print_raw_record(radio: &dyn CloneModeRadio, number: u32) -> anyhow::Result<()> {
    let Some(view) = radio.view() else {
        return Ok(());
    };
    let index = radio.config().check_number(number)?;
    let record = view.field("memory")?.index(index)?;
    let start = record.byte_offset();

    println!("  Raw record ({}):", record.path_str());
    print!(
        "{}",
        view.image()
            .printable(Some(start..start + record.size_bytes()))?
    );
    println!();
    Ok(())
}
