pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod flags;
pub mod instructions;
pub mod machine;
pub mod memory;

pub mod isa {
    pub mod s16; // canonical encoding, table driven
}

pub use cpu::{Cpu, CpuConfig, RegisterLayout, Trap};
pub use flags::{FlagMode, Flags, Psr};
pub use machine::{Fault, Machine, Recorder, RunOutcome, Snapshot, StepObserver, Termination, TraceObserver};
pub use memory::{Bus, MemoryError, MemoryMap, WordMemory};
