use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::Path;

use s16_rs::decoder::Decoder;
use s16_rs::disasm::fmt_decoded;
use s16_rs::isa::s16::S16Decoder;
use s16_tools::{load_raw_image, read_word};

#[derive(Parser, Debug)]
#[command(author, version, about = "s16 disassembler CLI", long_about=None)]
struct Cli {
    /// Load address (in words) for the image
    #[arg(long, default_value = "0")]
    base: String,
    /// Skip N words at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Input image path
    #[arg(value_name = "IMAGE")]
    input: String,
    /// Limit words loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Subcommand
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded segments (single segment for a raw image)
    Sections,
    /// Disassemble a word range [start, end)
    Range {
        /// Start address (hex or dec)
        start: String,
        /// End address (hex or dec, exclusive)
        end: String,
        /// Show the instruction word
        #[arg(long)]
        show_words: bool,
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat { Text, Json }

#[derive(Debug, Clone, serde::Serialize)]
struct LineOut { addr: u16, word: u16, text: String }

fn parse_u16(s: &str) -> Result<u16> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u16::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u16>()?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let base = parse_u16(&cli.base)?;
    let img = load_raw_image(Path::new(&cli.input), base, cli.skip, cli.len)?;

    match cli.cmd {
        Command::Sections => {
            println!("{:<10} {:<8} {:<8} {:<6} {:<6}", "name", "start", "end", "perms", "kind");
            for s in &img.segments {
                let start = s.base as u32;
                let end = start + s.words.len() as u32;
                println!("{:<10} {start:#06x}   {end:#06x}   {:<6} {:<6}", s.name, s.perms, s.kind);
            }
        }
        Command::Range { start, end, show_words, format, out } => {
            let start = parse_u16(&start)? as u32;
            let end = parse_u16(&end)? as u32;
            anyhow::ensure!(end >= start, "end must be >= start");

            let dec = S16Decoder::new();
            let mut lines = Vec::new();
            for addr in start..end {
                let addr = addr as u16;
                let Some(word) = read_word(&img, addr) else { break };
                let text = match dec.decode(word) {
                    Some(d) => fmt_decoded(&d),
                    None => format!(".word {word:#06x}"),
                };
                lines.push(LineOut { addr, word, text });
            }

            let buf = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&lines)?,
                OutputFormat::Text => {
                    let mut buf = String::new();
                    for l in &lines {
                        if show_words {
                            let _ = writeln!(buf, "{:#06x}: {:04x}    {}", l.addr, l.word, l.text);
                        } else {
                            let _ = writeln!(buf, "{:#06x}: {}", l.addr, l.text);
                        }
                    }
                    buf
                }
            };
            if let Some(path) = out { std::fs::write(path, buf)?; } else { print!("{}", buf); }
        }
    }
    Ok(())
}
