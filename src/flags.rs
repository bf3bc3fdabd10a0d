use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Three-way condition code. Exactly one variant holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Flags {
    Negative,
    #[default]
    Zero,
    Positive,
}

/// How a 16-bit result is classified into a condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagMode {
    /// Two's complement: bit 15 set means negative.
    #[default]
    Signed,
    /// Results are unsigned, so `Negative` never holds.
    Unsigned,
}

bitflags! {
/// Condition bits as they sit in the packed program-status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr: u16 {
const N = 1 << 15; // Negative
const Z = 1 << 14; // Zero
const P = 1 << 13; // Positive
}
}

/// PC bits held by the packed program-status register.
pub const PSR_PC_MASK: u16 = 0x1FFF;

impl Flags {
    pub fn of(result: u16, mode: FlagMode) -> Self {
        match mode {
            FlagMode::Signed => match (result as i16).signum() {
                -1 => Flags::Negative,
                0 => Flags::Zero,
                _ => Flags::Positive,
            },
            FlagMode::Unsigned => {
                if result == 0 {
                    Flags::Zero
                } else {
                    Flags::Positive
                }
            }
        }
    }

    pub fn to_psr(self) -> Psr {
        match self {
            Flags::Negative => Psr::N,
            Flags::Zero => Psr::Z,
            Flags::Positive => Psr::P,
        }
    }

    /// Recovers the condition code from PSR bits. When several bits are set
    /// N wins over Z over P; no bits at all reads as Zero.
    pub fn from_psr(psr: Psr) -> Self {
        if psr.contains(Psr::N) {
            Flags::Negative
        } else if psr.contains(Psr::P) && !psr.contains(Psr::Z) {
            Flags::Positive
        } else {
            Flags::Zero
        }
    }
}

/// Packs flags and PC into a single program-status word.
pub fn pack_psr(flags: Flags, pc: u16) -> u16 {
    flags.to_psr().bits() | (pc & PSR_PC_MASK)
}

/// Splits a program-status word into flags and PC.
pub fn unpack_psr(word: u16) -> (Flags, u16) {
    (
        Flags::from_psr(Psr::from_bits_truncate(word)),
        word & PSR_PC_MASK,
    )
}
