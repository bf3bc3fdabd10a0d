use bitvec::prelude::*;

use crate::decoder::{Decoded, Decoder, Op};
use crate::instructions::{self, Field, Slot};

/// Decoder for the canonical 16-bit encoding.
/// Every layout comes from [`instructions::TABLE`]; nothing is hard-coded here.
#[derive(Debug, Clone, Copy, Default)]
pub struct S16Decoder;

impl S16Decoder {
    pub fn new() -> Self {
        Self
    }
}

fn extract(raw: u16, slot: &Slot) -> u16 {
    let lo = slot.lo as usize;
    raw.view_bits::<Lsb0>()[lo..lo + slot.width as usize].load_le::<u16>()
}

fn deposit(word: &mut u16, lo: u8, width: u8, value: u16) {
    let lo = lo as usize;
    word.view_bits_mut::<Lsb0>()[lo..lo + width as usize].store_le(value);
}

impl Decoder for S16Decoder {
    fn decode(&self, raw: u16) -> Option<Decoded> {
        let op = Op::from_word(raw);
        let desc = instructions::desc(op);
        let mode = desc.mode_of(raw);
        let form = desc.form(mode)?;

        let mut d = Decoded { op, mode, rd: 0, rs: 0, rt: 0, imm: 0, raw };
        for slot in form.slots {
            let v = extract(raw, slot);
            match slot.field {
                Field::Rd => d.rd = v as u8,
                Field::Rs => d.rs = v as u8,
                Field::Rt => d.rt = v as u8,
                Field::Imm => d.imm = v,
            }
        }
        Some(d)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{op:?} has no addressing mode {mode}")]
    NoSuchForm { op: Op, mode: u8 },
    #[error("{field:?} value {value:#x} does not fit in {width} bits")]
    OutOfRange { field: Field, value: u16, width: u8 },
    #[error("missing {0:?} operand")]
    Missing(Field),
    #[error("{0:?} operand not used by this form")]
    Unexpected(Field),
}

/// Builds an instruction word for `op` in addressing `mode` from operand values.
pub fn encode(op: Op, mode: u8, operands: &[(Field, u16)]) -> Result<u16, EncodeError> {
    let desc = instructions::desc(op);
    let form = desc.form(mode).ok_or(EncodeError::NoSuchForm { op, mode })?;

    if let Some((field, _)) = operands.iter().find(|(f, _)| form.slot(*f).is_none()) {
        return Err(EncodeError::Unexpected(*field));
    }

    let mut word = op.opcode() << 12;
    let n = desc.select.len();
    for (i, &bit) in desc.select.iter().enumerate() {
        let v = (mode >> (n - 1 - i)) & 1;
        deposit(&mut word, bit, 1, v as u16);
    }
    for slot in form.slots {
        let &(_, value) = operands
            .iter()
            .find(|(f, _)| *f == slot.field)
            .ok_or(EncodeError::Missing(slot.field))?;
        if value > slot.max() {
            return Err(EncodeError::OutOfRange {
                field: slot.field,
                value,
                width: slot.width,
            });
        }
        deposit(&mut word, slot.lo, slot.width, value);
    }
    Ok(word)
}

/// Re-encodes a decoded instruction, dropping any ignored bits of the original.
pub fn encode_decoded(d: &Decoded) -> Result<u16, EncodeError> {
    let desc = instructions::desc(d.op);
    let form = desc.form(d.mode).ok_or(EncodeError::NoSuchForm { op: d.op, mode: d.mode })?;
    let operands: Vec<(Field, u16)> = form
        .slots
        .iter()
        .map(|s| {
            let v = match s.field {
                Field::Rd => d.rd as u16,
                Field::Rs => d.rs as u16,
                Field::Rt => d.rt as u16,
                Field::Imm => d.imm,
            };
            (s.field, v)
        })
        .collect();
    encode(d.op, d.mode, &operands)
}
