use serde::{Deserialize, Serialize};

/// One variant per 4-bit opcode, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Op {
    Branch = 0x0,
    BranchEq = 0x1,  // beq / bne
    BranchOrd = 0x2, // bgt / blt
    Load = 0x3,
    Store = 0x4,
    Mov = 0x5,
    And = 0x6,
    Or = 0x7,
    Not = 0x8,
    Add = 0x9,
    Sub = 0xA,
    Cmp = 0xB,
    Push = 0xC,
    Pop = 0xD,
    Jump = 0xE,
    Halt = 0xF,
}

impl Op {
    pub const ALL: [Op; 16] = [
        Op::Branch,
        Op::BranchEq,
        Op::BranchOrd,
        Op::Load,
        Op::Store,
        Op::Mov,
        Op::And,
        Op::Or,
        Op::Not,
        Op::Add,
        Op::Sub,
        Op::Cmp,
        Op::Push,
        Op::Pop,
        Op::Jump,
        Op::Halt,
    ];

    /// Opcode from the top nibble of an instruction word.
    pub fn from_word(raw: u16) -> Self {
        Self::ALL[(raw >> 12) as usize]
    }

    pub fn opcode(self) -> u16 {
        self as u16
    }
}

/// A decoded instruction. Fields that the form does not use stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub op: Op,
    pub mode: u8,
    pub rd: u8, // destination, or base register of a store
    pub rs: u8, // source, or value register of a store
    pub rt: u8, // second source or offset register
    pub imm: u16,
    pub raw: u16,
}

pub trait Decoder {
    fn decode(&self, raw: u16) -> Option<Decoded>;
}
