//! Layout dump utility
//! Compiles a memory-layout schema and prints an image through it

use anyhow::Context;
use chirp_bitwise::bitwise::{compile_schema_with, CompileOptions, FieldHandle, StructuredView};
use chirp_bitwise::formats::load_img;
use std::env;
use std::sync::Arc;
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
    let json = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();
    if positional.len() < 2 {
        eprintln!("Usage: {} <schema.txt> <image> [path] [--json]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} uv5r.txt radio.img                 # Every field", args[0]);
        eprintln!("  {} uv5r.txt radio.img memory[3]       # One record + hex", args[0]);
        eprintln!("  {} uv5r.txt radio.img names --json    # JSON value", args[0]);
        std::process::exit(1);
    }

    let schema_file = positional[0];
    let image_file = positional[1];
    let path = positional.get(2).map(|s| s.as_str());

    let schema = std::fs::read_to_string(schema_file)
        .with_context(|| format!("reading schema {}", schema_file))?;
    let options = CompileOptions {
        flag_overlapping_seeks: true,
    };
    let layout = compile_schema_with(&schema, &options)
        .with_context(|| format!("compiling {}", schema_file))?;
    tracing::info!(
        "Compiled {}: {} bytes, {} top-level fields",
        schema_file,
        layout.size_bytes(),
        layout.root().fields().len()
    );

    let (image, metadata) =
        load_img(image_file).with_context(|| format!("loading image {}", image_file))?;
    if let Some((vendor, model)) = metadata.radio() {
        tracing::info!("Image from {} {}", vendor, model);
    }
    tracing::info!("Image size: {} bytes", image.len());

    let view = StructuredView::new(image, Arc::new(layout));
    let field = match path {
        Some(p) => view.path(p)?,
        None => view.root(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&field.get()?)?);
        return Ok(());
    }

    print_field(&field, 0)?;

    if path.is_some() {
        let start = field.byte_offset();
        let end = start + field.size_bytes();
        println!();
        print!("{}", view.image().printable(Some(start..end))?);
    }

    Ok(())
}

/// Print a field and everything under it, one leaf per line
fn print_field(field: &FieldHandle<'_>, depth: usize) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    let label = field.path_str().rsplit('.').next().unwrap_or_default();
    let label = if label.is_empty() { "(root)" } else { label };

    let array_of_structs = field
        .kind()
        .as_array()
        .is_some_and(|a| a.element.as_struct().is_some());

    if field.is_struct() {
        println!("{}{} @ 0x{:04X} {{", indent, label, field.byte_offset());
        for name in field.field_names() {
            print_field(&field.field(name)?, depth + 1)?;
        }
        println!("{}}}", indent);
    } else if array_of_structs {
        for element in field.elements()? {
            print_field(&element, depth)?;
        }
    } else {
        let value = match field.get() {
            Ok(v) => v.to_string(),
            Err(e) => format!("<{}>", e.root_cause()),
        };
        println!(
            "{}{} @ 0x{:04X} ({}) = {}",
            indent,
            label,
            field.byte_offset(),
            field.kind().describe(),
            value
        );
    }
    Ok(())
}
