use crate::decoder::{Decoded, Op};
use crate::instructions::{self, AddrMode};

/// Assembler name of a register index.
pub fn reg_name(r: u8) -> String {
    match r {
        5 => "sp".to_string(),
        6 => "lr".to_string(),
        _ => format!("r{r}"),
    }
}

/// Renders `d` in the syntax accepted by the assembler.
pub fn fmt_decoded(d: &Decoded) -> String {
    let Some(form) = instructions::desc(d.op).form(d.mode) else {
        return format!(".word {:#06x}", d.raw);
    };
    let mn = form.mnemonic;
    let (rd, rs, rt) = (reg_name(d.rd), reg_name(d.rs), reg_name(d.rt));
    match (form.addr, d.op) {
        (AddrMode::None, _) => mn.to_string(),
        (AddrMode::Target, _) => format!("{mn} {:#05x}", d.imm),
        (AddrMode::Reg, Op::Push) => format!("{mn} {rs}"),
        (AddrMode::Reg, _) => format!("{mn} {rd}"),
        (AddrMode::RegReg, _) => format!("{mn} {rd}, {rs}"),
        (AddrMode::RegImm, _) | (AddrMode::Immediate, _) => format!("{mn} {rd}, #{:#x}", d.imm),
        (AddrMode::ThreeReg, _) => format!("{mn} {rd}, {rs}, {rt}"),
        (AddrMode::RegRegImm, _) => format!("{mn} {rd}, {rs}, #{:#x}", d.imm),
        (AddrMode::JumpIndirect, _) => {
            if d.imm == 0 { format!("{mn} [{rd}]") } else { format!("{mn} [{rd}, #{:#x}]", d.imm) }
        }
        (AddrMode::Indirect, _) | (AddrMode::IndirectIndexed, _) | (AddrMode::IndirectOffset, _) => mem(mn, d, form.addr),
    }
}

// ldr names the loaded register first and the base in rs; str names the
// stored value (rs) first and the base in rd.
fn mem(mn: &str, d: &Decoded, addr: AddrMode) -> String {
    let (reg, base) = if d.op == Op::Store { (d.rs, d.rd) } else { (d.rd, d.rs) };
    let (reg, base) = (reg_name(reg), reg_name(base));
    match addr {
        AddrMode::IndirectIndexed => format!("{mn} {reg}, [{base}, {}]", reg_name(d.rt)),
        AddrMode::IndirectOffset => format!("{mn} {reg}, [{base}, #{:#x}]", d.imm),
        _ => format!("{mn} {reg}, [{base}]"),
    }
}
