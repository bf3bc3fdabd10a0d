use anyhow::Error;
use crate::decoder::{Decoded, Decoder};
use crate::exec::Executor;
use crate::flags::{pack_psr, FlagMode, Flags, PSR_PC_MASK};
use crate::memory::{Bus, MemoryMap};
use serde::{Deserialize, Serialize};

pub const REG_COUNT: usize = 8;

/// Stack pointer.
pub const SP: usize = 5;
/// Link register.
pub const LR: usize = 6;
/// Program-status register in the packed layout, R7 otherwise.
pub const PSR: usize = 7;

/// Where PC and flags live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterLayout {
    /// PC and flags are separate; index 7 is a general-purpose register.
    #[default]
    Split,
    /// Index 7 mirrors flags and a 13-bit PC, refreshed after every cycle.
    Packed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub layout: RegisterLayout,
    pub flag_mode: FlagMode,
    pub memory: MemoryMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub pc: u16,                // Program Counter
    pub flags: Flags,           // Condition code
    pub regs: [u16; REG_COUNT], // R0..R4, SP, LR, R7/PSR
    pub running: bool,          // Cleared by HALT
    pub cfg: CpuConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("Invalid instruction {word:#06x} at {pc:#06x}")]
    InvalidInstruction { pc: u16, word: u16 },
    #[error("Address error at {addr:#06x}: {source}")]
    Address { addr: u32, #[source] source: Error },
    #[error("Stack overflow: sp {sp:#06x} at floor {floor:#06x}")]
    StackOverflow { sp: u16, floor: u16 },
    #[error("Stack underflow: sp {sp:#06x} at base {base:#06x}")]
    StackUnderflow { sp: u16, base: u16 },
}

impl Cpu {
    pub fn new(cfg: CpuConfig) -> Self {
        let mut cpu = Self {
            pc: 0,
            flags: Flags::Zero,
            regs: [0; REG_COUNT],
            running: true,
            cfg,
        };
        cpu.reset(0);
        cpu
    }

    pub fn reset(&mut self, reset_pc: u16) {
        self.regs = [0; REG_COUNT];
        self.regs[SP] = self.cfg.memory.stack_base;
        self.flags = Flags::Zero;
        self.pc = reset_pc;
        self.running = true;
        self.sync_psr();
    }

    /// Classifies `result` into the condition code.
    pub fn set_flags(&mut self, result: u16) {
        self.flags = Flags::of(result, self.cfg.flag_mode);
    }

    fn sync_psr(&mut self) {
        if self.cfg.layout == RegisterLayout::Packed {
            self.pc &= PSR_PC_MASK;
            self.regs[PSR] = pack_psr(self.flags, self.pc);
        }
    }

    /// One fetch-decode-execute cycle. Returns the executed instruction.
    pub fn step<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<Decoded, Trap> {
        let pc = self.pc;
        let raw = bus
            .read(pc as u32)
            .map_err(|source| Trap::Address { addr: pc as u32, source })?;
        // Advance first; taken branches overwrite it
        self.pc = pc.wrapping_add(1);
        let res = match dec.decode(raw) {
            Some(d) => exec.exec(self, bus, d).map(|()| d),
            None => Err(Trap::InvalidInstruction { pc, word: raw }),
        };
        // refresh the mirror on the fault path too
        self.sync_psr();
        res
    }
}
