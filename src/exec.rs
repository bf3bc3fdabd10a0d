use crate::cpu::{Cpu, Trap, SP};
use crate::decoder::{Decoded, Op};
use crate::flags::Flags;
use crate::memory::Bus;

pub trait Executor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, d: Decoded) -> Result<(), Trap>;
}

/// Integer executor. PC already points past the instruction when a handler runs.
pub struct IntExecutor;
impl Executor for IntExecutor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, d: Decoded) -> Result<(), Trap> {
        match d.op {
            Op::Branch => cpu.pc = d.imm,
            Op::BranchEq => branch_eq(cpu, &d),
            Op::BranchOrd => branch_ord(cpu, &d),
            Op::Load => load(cpu, bus, &d)?,
            Op::Store => store(cpu, bus, &d)?,
            Op::Mov => mov(cpu, &d),
            Op::And => alu(cpu, &d, |a, b| a & b),
            Op::Or => alu(cpu, &d, |a, b| a | b),
            Op::Not => {
                let res = !cpu.regs[d.rd as usize];
                cpu.regs[d.rd as usize] = res;
                cpu.set_flags(res);
            }
            Op::Add => alu(cpu, &d, u16::wrapping_add),
            Op::Sub => alu(cpu, &d, u16::wrapping_sub),
            Op::Cmp => {
                let a = cpu.regs[d.rd as usize];
                let b = if d.mode == 0 { cpu.regs[d.rs as usize] } else { d.imm };
                cpu.set_flags(a.wrapping_sub(b));
            }
            Op::Push => push(cpu, bus, &d)?,
            Op::Pop => pop(cpu, bus, &d)?,
            Op::Jump => {
                let addr = cpu.regs[d.rd as usize] as u32 + d.imm as u32;
                cpu.pc = read(bus, addr)?;
            }
            Op::Halt => cpu.running = false,
        }
        Ok(())
    }
}

fn read<B: Bus>(bus: &mut B, addr: u32) -> Result<u16, Trap> {
    bus.read(addr).map_err(|source| Trap::Address { addr, source })
}

fn write<B: Bus>(bus: &mut B, addr: u32, val: u16) -> Result<(), Trap> {
    bus.write(addr, val)
        .map_err(|source| Trap::Address { addr, source })
}

// mode 0: taken on Zero (beq), mode 1: taken otherwise (bne)
fn branch_eq(cpu: &mut Cpu, d: &Decoded) {
    let zero = cpu.flags == Flags::Zero;
    if zero == (d.mode == 0) {
        cpu.pc = d.imm;
    }
}

// mode 0: taken on Positive (bgt), mode 1: taken on Negative (blt)
fn branch_ord(cpu: &mut Cpu, d: &Decoded) {
    let want = if d.mode == 0 { Flags::Positive } else { Flags::Negative };
    if cpu.flags == want {
        cpu.pc = d.imm;
    }
}

/// Effective address of a load/store. Computed without wraparound so that
/// overrunning the address space faults.
fn effective(cpu: &Cpu, d: &Decoded, base: u8) -> u32 {
    let base = cpu.regs[base as usize] as u32;
    match d.mode {
        1 => base + cpu.regs[d.rt as usize] as u32,
        2 => base + d.imm as u32,
        _ => base,
    }
}

fn load<B: Bus>(cpu: &mut Cpu, bus: &mut B, d: &Decoded) -> Result<(), Trap> {
    let val = if d.mode == 3 {
        d.imm
    } else {
        read(bus, effective(cpu, d, d.rs))?
    };
    cpu.regs[d.rd as usize] = val;
    Ok(())
}

fn store<B: Bus>(cpu: &mut Cpu, bus: &mut B, d: &Decoded) -> Result<(), Trap> {
    let addr = effective(cpu, d, d.rd);
    write(bus, addr, cpu.regs[d.rs as usize])
}

fn mov(cpu: &mut Cpu, d: &Decoded) {
    let res = if d.mode == 0 { cpu.regs[d.rs as usize] } else { d.imm };
    cpu.regs[d.rd as usize] = res;
    cpu.set_flags(res);
}

fn alu(cpu: &mut Cpu, d: &Decoded, f: impl Fn(u16, u16) -> u16) {
    let r = &cpu.regs;
    let (a, b) = match d.mode {
        0 => (r[d.rd as usize], r[d.rs as usize]),
        1 => (r[d.rd as usize], d.imm),
        2 => (r[d.rs as usize], r[d.rt as usize]),
        _ => (r[d.rs as usize], d.imm),
    };
    let res = f(a, b);
    cpu.regs[d.rd as usize] = res;
    cpu.set_flags(res);
}

fn push<B: Bus>(cpu: &mut Cpu, bus: &mut B, d: &Decoded) -> Result<(), Trap> {
    let map = cpu.cfg.memory;
    let sp = cpu.regs[SP];
    if sp > map.stack_base {
        return Err(Trap::StackUnderflow { sp, base: map.stack_base });
    }
    if sp <= map.stack_floor {
        return Err(Trap::StackOverflow { sp, floor: map.stack_floor });
    }
    cpu.regs[SP] = sp - 1;
    write(bus, cpu.regs[SP] as u32, cpu.regs[d.rs as usize])
}

fn pop<B: Bus>(cpu: &mut Cpu, bus: &mut B, d: &Decoded) -> Result<(), Trap> {
    let map = cpu.cfg.memory;
    let sp = cpu.regs[SP];
    if sp >= map.stack_base {
        return Err(Trap::StackUnderflow { sp, base: map.stack_base });
    }
    if sp < map.stack_floor {
        return Err(Trap::StackOverflow { sp, floor: map.stack_floor });
    }
    cpu.regs[d.rd as usize] = read(bus, sp as u32)?;
    cpu.regs[SP] = cpu.regs[SP].wrapping_add(1);
    Ok(())
}
