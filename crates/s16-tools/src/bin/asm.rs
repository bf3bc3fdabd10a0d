use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use s16_tools::{assemble_full, words_to_le};

#[derive(Parser, Debug)]
#[command(author, version, about = "s16 assembler")]
struct Opts {
    /// Input assembly file (one instruction or directive per line)
    #[arg(short, long)]
    input: PathBuf,
    /// Output image (little-endian 16-bit words)
    #[arg(short, long)]
    output: PathBuf,
    /// Print an address/word/source listing
    #[arg(long)]
    listing: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let text = fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let asm = assemble_full(&text).with_context(|| format!("assembling {}", opts.input.display()))?;
    tracing::debug!(words = asm.words.len(), labels = asm.labels.len(), "assembled");

    if opts.listing {
        let src: Vec<&str> = text.lines().collect();
        for (addr, (word, line)) in asm.words.iter().zip(&asm.lines).enumerate() {
            let s = src.get(line - 1).map(|s| s.trim()).unwrap_or("");
            println!("{addr:#06x}: {word:04x}    {s}");
        }
        for (name, addr) in &asm.labels {
            println!("{name} = {addr:#06x}");
        }
    }

    fs::write(&opts.output, words_to_le(&asm.words))
        .with_context(|| format!("writing {}", opts.output.display()))?;
    Ok(())
}
