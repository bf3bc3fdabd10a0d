//! Machine state aggregate and the fetch-execute loop.
//!
//! A [`Machine`] owns the CPU, the memory, the decoder and the executor for a
//! single run. [`Machine::run`] cycles until HALT, until the step budget runs
//! out, or until a trap, and hands a [`Snapshot`] to a [`StepObserver`] after
//! every completed cycle.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::cpu::{Cpu, CpuConfig, Trap, REG_COUNT};
use crate::decoder::Decoder;
use crate::disasm::fmt_decoded;
use crate::exec::IntExecutor;
use crate::flags::Flags;
use crate::isa::s16::S16Decoder;
use crate::memory::{Bus, MemoryError, WordMemory};

/// Observable machine state after a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub pc: u16,
    pub regs: [u16; REG_COUNT],
    pub flags: Flags,
    pub last_word: u16,
    pub steps: u64,
    pub running: bool,
}

/// Called once per completed cycle. Receives a copy of the state, so it
/// cannot change the machine.
pub trait StepObserver {
    fn on_step(&mut self, snap: &Snapshot);
}

impl<F: FnMut(&Snapshot)> StepObserver for F {
    fn on_step(&mut self, snap: &Snapshot) {
        self(snap)
    }
}

/// Records every snapshot.
#[derive(Debug, Default)]
pub struct Recorder {
    pub snapshots: Vec<Snapshot>,
}

impl StepObserver for Recorder {
    fn on_step(&mut self, snap: &Snapshot) {
        self.snapshots.push(snap.clone());
    }
}

/// Logs each cycle with its disassembly at `info` level.
#[derive(Debug, Default)]
pub struct TraceObserver {
    dec: S16Decoder,
}

impl TraceObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepObserver for TraceObserver {
    fn on_step(&mut self, snap: &Snapshot) {
        let asm = self
            .dec
            .decode(snap.last_word)
            .map(|d| fmt_decoded(&d))
            .unwrap_or_else(|| format!(".word {:#06x}", snap.last_word));
        tracing::info!(
            step = snap.steps,
            pc = format_args!("{:#06x}", snap.pc),
            word = format_args!("{:#06x}", snap.last_word),
            flags = ?snap.flags,
            regs = ?snap.regs,
            "{asm}"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// HALT executed.
    Halted,
    /// The step budget ran out before HALT.
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub reason: Termination,
    pub state: Snapshot,
}

/// A fatal trap together with the state at the point of failure.
#[derive(thiserror::Error, Debug)]
#[error("fault after {} steps at pc {:#06x}: {trap}", .state.steps, .state.pc)]
pub struct Fault {
    #[source]
    pub trap: Trap,
    pub state: Snapshot,
}

pub struct Machine<B: Bus = WordMemory> {
    pub cpu: Cpu,
    pub bus: B,
    dec: S16Decoder,
    exec: IntExecutor,
    steps: u64,
    last_word: u16,
}

impl Machine<WordMemory> {
    /// Builds a machine with zeroed memory laid out per `cfg.memory`.
    pub fn new(cfg: CpuConfig) -> Result<Self, MemoryError> {
        Self::with_bus(cfg, WordMemory::new(cfg.memory)?)
    }

    /// Writes `program` into ROM and resets the CPU to the start of it.
    pub fn load(&mut self, program: &[u16]) -> Result<(), MemoryError> {
        self.bus.load_program(program)?;
        debug!(words = program.len(), "program loaded");
        self.reset();
        Ok(())
    }
}

impl<B: Bus> Machine<B> {
    /// Builds a machine over a caller-supplied bus. `cfg.memory` must be a
    /// valid map and must not claim more words than the bus holds.
    pub fn with_bus(cfg: CpuConfig, bus: B) -> Result<Self, MemoryError> {
        cfg.memory.validate()?;
        if bus.capacity().is_some_and(|words| cfg.memory.size > words) {
            return Err(MemoryError::InvalidMap { reason: "map larger than the bus" });
        }
        Ok(Self {
            cpu: Cpu::new(cfg),
            bus,
            dec: S16Decoder::new(),
            exec: IntExecutor,
            steps: 0,
            last_word: 0,
        })
    }

    pub fn reset(&mut self) {
        self.cpu.reset(0);
        self.steps = 0;
        self.last_word = 0;
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.cpu.pc,
            regs: self.cpu.regs,
            flags: self.cpu.flags,
            last_word: self.last_word,
            steps: self.steps,
            running: self.cpu.running,
        }
    }

    /// Executes one cycle.
    pub fn step(&mut self) -> Result<(), Fault> {
        match self.cpu.step(&mut self.bus, &self.dec, &self.exec) {
            Ok(d) => {
                self.steps += 1;
                self.last_word = d.raw;
                trace!(pc = self.cpu.pc, word = d.raw, op = ?d.op, "step");
                Ok(())
            }
            Err(trap) => Err(Fault {
                trap,
                state: self.snapshot(),
            }),
        }
    }

    /// Runs at most `budget` cycles without an observer.
    pub fn run(&mut self, budget: u64) -> Result<RunOutcome, Fault> {
        self.run_with(budget, &mut |_: &Snapshot| {})
    }

    /// Runs at most `budget` cycles, reporting each completed one to `observer`.
    pub fn run_with<O: StepObserver + ?Sized>(
        &mut self,
        budget: u64,
        observer: &mut O,
    ) -> Result<RunOutcome, Fault> {
        let mut used = 0u64;
        while self.cpu.running {
            if used == budget {
                warn!(budget, pc = self.cpu.pc, "step budget exhausted");
                return Ok(RunOutcome {
                    reason: Termination::BudgetExhausted,
                    state: self.snapshot(),
                });
            }
            self.step()?;
            used += 1;
            observer.on_step(&self.snapshot());
        }
        debug!(steps = self.steps, pc = self.cpu.pc, "halted");
        Ok(RunOutcome {
            reason: Termination::Halted,
            state: self.snapshot(),
        })
    }
}
