use pretty_assertions::assert_eq;
use s16_rs::cpu::PSR;
use s16_rs::flags::pack_psr;
use s16_rs::{
    Bus, CpuConfig, Flags, Machine, MemoryMap, Recorder, RegisterLayout, Snapshot, Termination,
    TraceObserver, Trap,
};

const REFERENCE: [u16; 6] = [0x5801, 0x590F, 0x4080, 0x3100, 0x6C28, 0xF000];

fn loaded(cfg: CpuConfig, program: &[u16]) -> Machine {
    let mut m = Machine::new(cfg).unwrap();
    m.load(program).unwrap();
    m
}

#[test]
fn observer_sees_every_cycle() {
    let mut m = loaded(CpuConfig::default(), &REFERENCE);
    let mut rec = Recorder::default();
    let out = m.run_with(100, &mut rec).unwrap();

    assert_eq!(rec.snapshots.len(), 6);
    let pcs: Vec<u16> = rec.snapshots.iter().map(|s| s.pc).collect();
    assert_eq!(pcs, [1, 2, 3, 4, 5, 6]);
    let words: Vec<u16> = rec.snapshots.iter().map(|s| s.last_word).collect();
    assert_eq!(words, REFERENCE);
    let steps: Vec<u64> = rec.snapshots.iter().map(|s| s.steps).collect();
    assert_eq!(steps, [1, 2, 3, 4, 5, 6]);
    assert_eq!(rec.snapshots.last(), Some(&out.state));
    assert!(!out.state.running);
}

#[test]
fn closure_observer() {
    let mut m = loaded(CpuConfig::default(), &REFERENCE);
    let mut seen = Vec::new();
    m.run_with(100, &mut |s: &Snapshot| seen.push(s.regs[4])).unwrap();
    assert_eq!(seen, [0, 0, 0, 0, 15, 15]);
}

#[test]
fn trace_observer_runs() {
    let mut m = loaded(CpuConfig::default(), &REFERENCE);
    let out = m.run_with(100, &mut TraceObserver::new()).unwrap();
    assert_eq!(out.reason, Termination::Halted);
}

#[test]
fn halted_machine_stays_halted() {
    let mut m = loaded(CpuConfig::default(), &REFERENCE);
    let first = m.run(100).unwrap();
    let mut calls = 0;
    let second = m.run_with(100, &mut |_: &Snapshot| calls += 1).unwrap();
    assert_eq!(second.reason, Termination::Halted);
    assert_eq!(second.state, first.state);
    assert_eq!(calls, 0);
}

#[test]
fn zero_budget_does_nothing() {
    let mut m = loaded(CpuConfig::default(), &REFERENCE);
    let before = m.snapshot();
    let out = m.run(0).unwrap();
    assert_eq!(out.reason, Termination::BudgetExhausted);
    assert_eq!(out.state, before);
}

#[test]
fn budget_can_be_resumed() {
    let mut m = loaded(CpuConfig::default(), &REFERENCE);
    let out = m.run(4).unwrap();
    assert_eq!(out.reason, Termination::BudgetExhausted);
    assert_eq!(out.state.steps, 4);
    assert_eq!(out.state.regs[2], 15);
    let out = m.run(4).unwrap();
    assert_eq!(out.reason, Termination::Halted);
    assert_eq!(out.state.steps, 6);
}

#[test]
fn reset_restores_initial_state() {
    let mut m = loaded(CpuConfig::default(), &REFERENCE);
    let initial = m.snapshot();
    m.run(100).unwrap();
    m.reset();
    assert_eq!(m.snapshot(), initial);
    // memory keeps the earlier store
    assert_eq!(m.bus.read(1).unwrap(), 15);
}

#[test]
fn packed_layout_mirrors_psr() {
    let cfg = CpuConfig { layout: RegisterLayout::Packed, ..Default::default() };
    let mut m = loaded(cfg, &REFERENCE);
    assert_eq!(m.snapshot().regs[PSR], pack_psr(Flags::Zero, 0));

    let mut rec = Recorder::default();
    m.run_with(100, &mut rec).unwrap();
    for s in &rec.snapshots {
        assert_eq!(s.regs[PSR], pack_psr(s.flags, s.pc));
    }
    assert_eq!(rec.snapshots[0].regs[PSR], 0x2001);
}

#[test]
fn packed_layout_overrides_writes_to_r7() {
    let cfg = CpuConfig { layout: RegisterLayout::Packed, ..Default::default() };
    // mov r7, #0x55 ; halt
    let mut m = loaded(cfg, &[0x5F55, 0xF000]);
    let out = m.run(10).unwrap();
    assert_eq!(out.state.regs[PSR], pack_psr(Flags::Positive, 2));

    // the split layout keeps r7 general purpose
    let mut m = loaded(CpuConfig::default(), &[0x5F55, 0xF000]);
    assert_eq!(m.run(10).unwrap().state.regs[7], 0x55);
}

#[test]
fn fault_reports_state_at_failure() {
    // mov r0, #3 ; pop r1 on an empty stack
    let mut m = loaded(CpuConfig::default(), &[0x5803, 0xD200, 0xF000]);
    let mut rec = Recorder::default();
    let fault = m.run_with(10, &mut rec).unwrap_err();
    assert!(matches!(fault.trap, Trap::StackUnderflow { .. }));
    assert_eq!(rec.snapshots.len(), 1);
    assert_eq!(fault.state.steps, 1);
    assert_eq!(fault.state.regs[0], 3);
    assert_eq!(fault.state.last_word, 0x5803);
    assert!(fault.state.running);
}

#[test]
fn packed_layout_fault_state_has_current_psr() {
    let cfg = CpuConfig { layout: RegisterLayout::Packed, ..Default::default() };
    // mov r0, #3 ; pop r1 on an empty stack
    let mut m = loaded(cfg, &[0x5803, 0xD200, 0xF000]);
    let fault = m.run(10).unwrap_err();
    assert!(matches!(fault.trap, Trap::StackUnderflow { .. }));
    assert_eq!(fault.state.regs[PSR], pack_psr(Flags::Positive, 2));

    // reserved store form as the first word
    let mut m = loaded(cfg, &[0x4C00]);
    let fault = m.run(10).unwrap_err();
    assert!(matches!(fault.trap, Trap::InvalidInstruction { pc: 0, .. }));
    assert_eq!(fault.state.regs[PSR], pack_psr(Flags::Zero, 1));
}

#[test]
fn fetch_past_memory_faults() {
    let map = MemoryMap { size: 0x1000, rom_words: 0x10, stack_base: 0xFFF, stack_floor: 0xF00, protect_rom: false };
    let cfg = CpuConfig { memory: map, ..Default::default() };
    // jmp [r7, #2] reads its target 0x2000 from the word after halt
    let mut m = loaded(cfg, &[0xEE02, 0xF000, 0x2000]);
    let fault = m.run(5).unwrap_err();
    assert!(matches!(fault.trap, Trap::Address { addr: 0x2000, .. }));
    assert_eq!(fault.state.steps, 1);
    assert_eq!(fault.state.pc, 0x2000);
}

#[test]
fn snapshot_serializes() {
    let mut m = loaded(CpuConfig::default(), &REFERENCE);
    let out = m.run(100).unwrap();
    let json = serde_json::to_string(&out).unwrap();
    assert!(json.contains("\"Halted\""));
    let back: s16_rs::RunOutcome = serde_json::from_str(&json).unwrap();
    assert_eq!(back, out);
}
