use pretty_assertions::assert_eq;
use s16_rs::exec::IntExecutor;
use s16_rs::isa::s16::S16Decoder;
use s16_rs::{Bus, Cpu, CpuConfig, Flags, Machine, Termination, WordMemory};

fn b(target: u16) -> u16 { target & 0x0FFF }
fn beq(target: u16) -> u16 { 0x1000 | (target & 0x07FF) }
fn bne(target: u16) -> u16 { 0x1800 | (target & 0x07FF) }
fn bgt(target: u16) -> u16 { 0x2000 | (target & 0x07FF) }
fn blt(target: u16) -> u16 { 0x2800 | (target & 0x07FF) }
fn jmp(rd: u16, imm9: u16) -> u16 { 0xE000 | (rd << 9) | imm9 }
fn mov_i(rd: u16, imm8: u16) -> u16 { 0x5800 | (rd << 8) | imm8 }
fn sub_i(rd: u16, imm7: u16) -> u16 { 0xA000 | (rd << 8) | (imm7 << 1) | 1 }
const HALT: u16 = 0xF000;

/// Executes the single instruction at address 0 with `flags` preset, returns the new PC.
fn pc_after(word: u16, flags: Flags) -> u16 {
    let mut mem = WordMemory::default();
    mem.load_program(&[word]).unwrap();
    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.flags = flags;
    cpu.step(&mut mem, &S16Decoder::new(), &IntExecutor).unwrap();
    cpu.pc
}

#[test]
fn unconditional_branch_is_absolute() {
    assert_eq!(pc_after(b(0x123), Flags::Zero), 0x123);
    assert_eq!(pc_after(b(0xFFF), Flags::Negative), 0xFFF);
    // a branch to itself still lands on itself
    assert_eq!(pc_after(b(0), Flags::Positive), 0);
}

#[test]
fn beq_and_bne_are_exclusive() {
    for flags in [Flags::Negative, Flags::Zero, Flags::Positive] {
        let eq = pc_after(beq(0x40), flags) == 0x40;
        let ne = pc_after(bne(0x40), flags) == 0x40;
        assert!(eq != ne, "exactly one of beq/bne must be taken for {flags:?}");
        assert_eq!(eq, flags == Flags::Zero);
    }
}

#[test]
fn bgt_and_blt_follow_sign() {
    assert_eq!(pc_after(bgt(0x20), Flags::Positive), 0x20);
    assert_eq!(pc_after(bgt(0x20), Flags::Zero), 1);
    assert_eq!(pc_after(bgt(0x20), Flags::Negative), 1);
    assert_eq!(pc_after(blt(0x20), Flags::Negative), 0x20);
    assert_eq!(pc_after(blt(0x20), Flags::Zero), 1);
    assert_eq!(pc_after(blt(0x20), Flags::Positive), 1);
}

#[test]
fn not_taken_branch_falls_through() {
    let mut m = Machine::new(CpuConfig::default()).unwrap();
    // flags are Zero after reset, so bne falls through to mov
    m.load(&[bne(3), mov_i(0, 7), HALT, mov_i(0, 9), HALT]).unwrap();
    let out = m.run(10).unwrap();
    assert_eq!(out.reason, Termination::Halted);
    assert_eq!(out.state.regs[0], 7);
    assert_eq!(out.state.pc, 3);
}

#[test]
fn countdown_loop() {
    let mut m = Machine::new(CpuConfig::default()).unwrap();
    m.load(&[
        mov_i(0, 5), // 0
        sub_i(0, 1), // 1
        bne(1),      // 2
        HALT,        // 3
    ])
    .unwrap();
    let out = m.run(100).unwrap();
    assert_eq!(out.reason, Termination::Halted);
    assert_eq!(out.state.regs[0], 0);
    assert_eq!(out.state.steps, 1 + 5 * 2 + 1);
    assert_eq!(out.state.pc, 4);
}

#[test]
fn jmp_loads_target_from_memory() {
    let mut mem = WordMemory::default();
    // jmp [r1, #2] with r1 = 0x100 reads its target from 0x102
    mem.load_program(&[jmp(1, 2)]).unwrap();
    mem.write(0x102, 0x0456).unwrap();
    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.regs[1] = 0x100;
    cpu.step(&mut mem, &S16Decoder::new(), &IntExecutor).unwrap();
    assert_eq!(cpu.pc, 0x0456);
    assert_eq!(cpu.flags, Flags::Zero);
}

#[test]
fn jmp_through_table_in_program() {
    let mut m = Machine::new(CpuConfig::default()).unwrap();
    m.load(&[
        mov_i(2, 4), // 0: r2 = table
        jmp(2, 1),   // 1: pc = M[5]
        HALT,        // 2
        HALT,        // 3
        0x0000,      // 4
        0x0006,      // 5
        mov_i(3, 1), // 6
        HALT,        // 7
    ])
    .unwrap();
    let out = m.run(10).unwrap();
    assert_eq!(out.state.regs[3], 1);
    assert_eq!(out.state.pc, 8);
    assert_eq!(out.state.steps, 4);
}
