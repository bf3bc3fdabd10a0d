use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use s16_rs::memory::words_from_le;
use s16_rs::{CpuConfig, FlagMode, Machine, RegisterLayout, StepObserver, Termination, TraceObserver};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run an s16 program image (little-endian 16-bit words)"
)]
struct Opts {
    /// Maximum number of cycles before the run is cut off
    #[arg(short, long, default_value_t = 10_000u64)]
    budget: u64,
    /// JSON machine configuration (layout, flag_mode, memory map)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,
    /// Register layout, overrides the configuration file
    #[arg(long, value_enum)]
    layout: Option<Layout>,
    /// Flag classification, overrides the configuration file
    #[arg(long, value_enum)]
    flag_mode: Option<Mode>,
    /// Log every cycle with its disassembly
    #[arg(long)]
    trace: bool,
    /// Print the final state as JSON
    #[arg(long)]
    json: bool,
    #[arg(value_name = "IMAGE")]
    input: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    Split,
    Packed,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Signed,
    Unsigned,
}

fn load_config(opts: &Opts) -> Result<CpuConfig> {
    let mut cfg = match &opts.config {
        Some(path) => {
            let txt = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&txt).with_context(|| format!("parsing {path}"))?
        }
        None => CpuConfig::default(),
    };
    if let Some(l) = opts.layout {
        cfg.layout = match l {
            Layout::Split => RegisterLayout::Split,
            Layout::Packed => RegisterLayout::Packed,
        };
    }
    if let Some(m) = opts.flag_mode {
        cfg.flag_mode = match m {
            Mode::Signed => FlagMode::Signed,
            Mode::Unsigned => FlagMode::Unsigned,
        };
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let cfg = load_config(&opts)?;

    let bytes = std::fs::read(&opts.input).with_context(|| format!("reading {}", opts.input))?;
    let words = words_from_le(&bytes).with_context(|| format!("decoding {}", opts.input))?;

    let mut machine = Machine::new(cfg)?;
    machine.load(&words)?;

    let mut tracer = TraceObserver::new();
    let mut quiet = |_: &s16_rs::Snapshot| {};
    let observer: &mut dyn StepObserver = if opts.trace { &mut tracer } else { &mut quiet };

    let outcome = match machine.run_with(opts.budget, observer) {
        Ok(outcome) => outcome,
        Err(fault) => {
            tracing::error!(pc = fault.state.pc, steps = fault.state.steps, "{}", fault.trap);
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&fault.state)?);
            }
            return Err(fault.into());
        }
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let s = &outcome.state;
        match outcome.reason {
            Termination::Halted => println!("halted after {} steps", s.steps),
            Termination::BudgetExhausted => println!("budget of {} steps exhausted", opts.budget),
        }
        for (i, r) in s.regs.iter().enumerate() {
            println!("  {:<3} {r:#06x} ({r})", s16_rs::disasm::reg_name(i as u8));
        }
        println!("  pc  {:#06x}", s.pc);
        println!("  flags {:?}", s.flags);
    }
    Ok(())
}
