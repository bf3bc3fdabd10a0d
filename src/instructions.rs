//! The canonical encoding table. The decoder, the encoder, the disassembler
//! and the assembler all read instruction layouts from [`TABLE`].

use crate::decoder::Op;

/// Operand shape of a form, used to render and to parse operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// No operands.
    None,
    /// Absolute branch target.
    Target,
    /// `rd`
    Reg,
    /// `rd, rs`
    RegReg,
    /// `rd, #imm`
    RegImm,
    /// `rd, rs, rt`
    ThreeReg,
    /// `rd, rs, #imm`
    RegRegImm,
    /// `[base]`
    Indirect,
    /// `[base, rt]`
    IndirectIndexed,
    /// `[base, #imm]`
    IndirectOffset,
    /// `rd, #imm` loaded as data
    Immediate,
    /// `[rd, #imm]` as a jump vector
    JumpIndirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Rd,
    Rs,
    Rt,
    Imm,
}

/// A bit range inside the instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub field: Field,
    pub lo: u8,
    pub width: u8,
}

impl Slot {
    pub fn max(&self) -> u16 {
        ((1u32 << self.width) - 1) as u16
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Form {
    pub mode: u8,
    pub mnemonic: &'static str,
    pub addr: AddrMode,
    pub slots: &'static [Slot],
}

impl Form {
    pub fn slot(&self, field: Field) -> Option<&Slot> {
        self.slots.iter().find(|s| s.field == field)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    /// Mode selector bits, most significant first.
    pub select: &'static [u8],
    pub forms: &'static [Form],
}

impl InstrDesc {
    pub fn form(&self, mode: u8) -> Option<&Form> {
        self.forms.iter().find(|f| f.mode == mode)
    }

    /// Mode value of `raw` for this opcode.
    pub fn mode_of(&self, raw: u16) -> u8 {
        self.select
            .iter()
            .fold(0u8, |m, &bit| (m << 1) | ((raw >> bit) & 1) as u8)
    }
}

const fn slot(field: Field, lo: u8, width: u8) -> Slot {
    Slot { field, lo, width }
}

const fn form(mode: u8, mnemonic: &'static str, addr: AddrMode, slots: &'static [Slot]) -> Form {
    Form { mode, mnemonic, addr, slots }
}

use AddrMode as A;
use Field::{Imm, Rd, Rs, Rt};

const IMM12: &[Slot] = &[slot(Imm, 0, 12)];
const IMM11: &[Slot] = &[slot(Imm, 0, 11)];

// Load: rd[9:7] rs[6:4]; store swaps the roles (value in rs, base in rd).
const LDR_IND: &[Slot] = &[slot(Rd, 7, 3), slot(Rs, 4, 3)];
const LDR_IDX: &[Slot] = &[slot(Rd, 7, 3), slot(Rs, 4, 3), slot(Rt, 1, 3)];
const LDR_OFF: &[Slot] = &[slot(Rd, 7, 3), slot(Rs, 4, 3), slot(Imm, 0, 4)];
const LDR_IMM: &[Slot] = &[slot(Rd, 7, 3), slot(Imm, 0, 7)];
const STR_IND: &[Slot] = &[slot(Rs, 7, 3), slot(Rd, 4, 3)];
const STR_IDX: &[Slot] = &[slot(Rs, 7, 3), slot(Rd, 4, 3), slot(Rt, 1, 3)];
const STR_OFF: &[Slot] = &[slot(Rs, 7, 3), slot(Rd, 4, 3), slot(Imm, 0, 4)];

const RR: &[Slot] = &[slot(Rd, 8, 3), slot(Rs, 5, 3)];
const RI8: &[Slot] = &[slot(Rd, 8, 3), slot(Imm, 0, 8)];
const RI7: &[Slot] = &[slot(Rd, 8, 3), slot(Imm, 1, 7)];
const RRR: &[Slot] = &[slot(Rd, 8, 3), slot(Rs, 5, 3), slot(Rt, 2, 3)];
const RRI4: &[Slot] = &[slot(Rd, 8, 3), slot(Rs, 5, 3), slot(Imm, 1, 4)];
const RD: &[Slot] = &[slot(Rd, 8, 3)];
const STACK_RS: &[Slot] = &[slot(Rs, 9, 3)];
const STACK_RD: &[Slot] = &[slot(Rd, 9, 3)];
const JMP: &[Slot] = &[slot(Rd, 9, 3), slot(Imm, 0, 9)];

// Selected by bit 11 (two/three operand) and bit 0 (register/immediate).
const fn alu(mn: &'static str) -> [Form; 4] {
    [
        form(0, mn, A::RegReg, RR),
        form(1, mn, A::RegImm, RI7),
        form(2, mn, A::ThreeReg, RRR),
        form(3, mn, A::RegRegImm, RRI4),
    ]
}

const AND_FORMS: [Form; 4] = alu("and");
const OR_FORMS: [Form; 4] = alu("or");
const ADD_FORMS: [Form; 4] = alu("add");
const SUB_FORMS: [Form; 4] = alu("sub");

pub static TABLE: [InstrDesc; 16] = [
    InstrDesc {
        op: Op::Branch,
        select: &[],
        forms: &[form(0, "b", A::Target, IMM12)],
    },
    InstrDesc {
        op: Op::BranchEq,
        select: &[11],
        forms: &[form(0, "beq", A::Target, IMM11), form(1, "bne", A::Target, IMM11)],
    },
    InstrDesc {
        op: Op::BranchOrd,
        select: &[11],
        forms: &[form(0, "bgt", A::Target, IMM11), form(1, "blt", A::Target, IMM11)],
    },
    InstrDesc {
        op: Op::Load,
        select: &[11, 10],
        forms: &[
            form(0, "ldr", A::Indirect, LDR_IND),
            form(1, "ldr", A::IndirectIndexed, LDR_IDX),
            form(2, "ldr", A::IndirectOffset, LDR_OFF),
            form(3, "ldr", A::Immediate, LDR_IMM),
        ],
    },
    InstrDesc {
        op: Op::Store,
        select: &[11, 10],
        // mode 3 is reserved
        forms: &[
            form(0, "str", A::Indirect, STR_IND),
            form(1, "str", A::IndirectIndexed, STR_IDX),
            form(2, "str", A::IndirectOffset, STR_OFF),
        ],
    },
    InstrDesc {
        op: Op::Mov,
        select: &[11],
        forms: &[form(0, "mov", A::RegReg, RR), form(1, "mov", A::RegImm, RI8)],
    },
    InstrDesc {
        op: Op::And,
        select: &[11, 0],
        forms: &AND_FORMS,
    },
    InstrDesc {
        op: Op::Or,
        select: &[11, 0],
        forms: &OR_FORMS,
    },
    InstrDesc {
        op: Op::Not,
        select: &[],
        forms: &[form(0, "not", A::Reg, RD)],
    },
    InstrDesc {
        op: Op::Add,
        select: &[11, 0],
        forms: &ADD_FORMS,
    },
    InstrDesc {
        op: Op::Sub,
        select: &[11, 0],
        forms: &SUB_FORMS,
    },
    InstrDesc {
        op: Op::Cmp,
        select: &[11],
        forms: &[form(0, "cmp", A::RegReg, RR), form(1, "cmp", A::RegImm, RI8)],
    },
    InstrDesc {
        op: Op::Push,
        select: &[],
        forms: &[form(0, "push", A::Reg, STACK_RS)],
    },
    InstrDesc {
        op: Op::Pop,
        select: &[],
        forms: &[form(0, "pop", A::Reg, STACK_RD)],
    },
    InstrDesc {
        op: Op::Jump,
        select: &[],
        forms: &[form(0, "jmp", A::JumpIndirect, JMP)],
    },
    InstrDesc {
        op: Op::Halt,
        select: &[],
        forms: &[form(0, "halt", A::None, &[])],
    },
];

pub fn desc(op: Op) -> &'static InstrDesc {
    &TABLE[op as usize]
}

/// All forms answering to `mnemonic` (lowercase).
pub fn lookup(mnemonic: &str) -> impl Iterator<Item = (Op, &'static Form)> + '_ {
    TABLE.iter().flat_map(move |d| {
        d.forms
            .iter()
            .filter(move |f| f.mnemonic == mnemonic)
            .map(move |f| (d.op, f))
    })
}
