use pocket_core::core::save_state::{StateReader, StateWriter};
use pocket_core::core::BusMaster;
use pocket_core::cpu::tlcs900h::registers::{XHL, XWA};
use pocket_core::cpu::{Cpu, CpuFault, Tlcs900h};
mod common;
use common::TestBus;

const ORIGIN: u32 = 0x20_0000;

fn setup(program: &[u8]) -> (Tlcs900h, TestBus) {
    let mut cpu = Tlcs900h::new();
    let mut bus = TestBus::new();
    bus.load(ORIGIN, program);
    cpu.boot(ORIGIN, 0x6C00);
    (cpu, bus)
}

fn step(cpu: &mut Tlcs900h, bus: &mut TestBus) -> u32 {
    cpu.step(bus, BusMaster::Cpu(0)).unwrap().cycles()
}

fn fault(pc: u32, opcode: u8, sub_opcode: Option<u8>) -> CpuFault {
    CpuFault::IllegalInstruction {
        pc,
        opcode,
        sub_opcode,
    }
}

// ============================================================
// Primary holes
// ============================================================

#[test]
fn test_undefined_opcode_faults() {
    let (mut cpu, mut bus) = setup(&[0x01]);
    let before = cpu.regs.clone();
    let result = cpu.step(&mut bus, BusMaster::Cpu(0));
    assert_eq!(result, Err(fault(ORIGIN, 0x01, None)));
    assert_eq!(cpu.regs, before);
    assert_eq!(cpu.fault(), Some(fault(ORIGIN, 0x01, None)));
}

#[test]
fn test_fault_is_sticky() {
    let (mut cpu, mut bus) = setup(&[0x01, 0x00]);
    let first = cpu.step(&mut bus, BusMaster::Cpu(0));
    let second = cpu.step(&mut bus, BusMaster::Cpu(0));
    assert_eq!(first, second);
    assert_eq!(cpu.regs.pc, ORIGIN);
}

#[test]
fn test_fault_blocks_interrupts() {
    let (mut cpu, mut bus) = setup(&[0x01]);
    let _ = cpu.step(&mut bus, BusMaster::Cpu(0));
    bus.raise(1, 7, 0x20_4000);
    assert!(cpu.step(&mut bus, BusMaster::Cpu(0)).is_err());
    assert!(bus.acknowledged.is_empty());
}

#[test]
fn test_fault_display_names_pc() {
    let text = fault(0x20_0010, 0x1F, None).to_string();
    assert!(text.contains("0x1F"));
    assert!(text.contains("0x200010"));
}

// ============================================================
// Second-level holes
// ============================================================

#[test]
fn test_register_group_hole() {
    // A, sub-opcode 0x01
    let (mut cpu, mut bus) = setup(&[0xC9, 0x01]);
    assert_eq!(
        cpu.step(&mut bus, BusMaster::Cpu(0)),
        Err(fault(ORIGIN, 0xC9, Some(0x01)))
    );
}

#[test]
fn test_width_not_accepted() {
    // DAA on a word register
    let (mut cpu, mut bus) = setup(&[0xD8, 0x10]);
    assert_eq!(
        cpu.step(&mut bus, BusMaster::Cpu(0)),
        Err(fault(ORIGIN, 0xD8, Some(0x10)))
    );
}

#[test]
fn test_bad_register_code() {
    let (mut cpu, mut bus) = setup(&[0xC7, 0x40, 0x06]);
    assert_eq!(
        cpu.step(&mut bus, BusMaster::Cpu(0)),
        Err(fault(ORIGIN, 0xC7, Some(0x40)))
    );
}

#[test]
fn test_mul_into_unpaired_register() {
    // MUL W,0x10: W has no containing word register
    let (mut cpu, mut bus) = setup(&[0xC8, 0x08, 0x10]);
    assert_eq!(
        cpu.step(&mut bus, BusMaster::Cpu(0)),
        Err(fault(ORIGIN, 0xC8, Some(0x08)))
    );
}

#[test]
fn test_invalid_control_register() {
    // LDC 0x22,XWA: DMAM is byte-wide
    let (mut cpu, mut bus) = setup(&[0xE8, 0x2E, 0x22]);
    assert_eq!(
        cpu.step(&mut bus, BusMaster::Cpu(0)),
        Err(fault(ORIGIN, 0xE8, Some(0x22)))
    );
    assert_eq!(cpu.control.dma_mode(0), 0);
}

#[test]
fn test_ret_cc_needs_plain_prefix() {
    let (mut cpu, mut bus) = setup(&[0xB1, 0xF8]);
    assert_eq!(
        cpu.step(&mut bus, BusMaster::Cpu(0)),
        Err(fault(ORIGIN, 0xB1, Some(0xF8)))
    );
    assert_eq!(cpu.regs.xsp(), 0x6C00);
}

#[test]
fn test_block_transfer_pointer_pairing() {
    // LDI through (XWA) has no destination pointer
    let (mut cpu, mut bus) = setup(&[0x80, 0x10]);
    assert_eq!(
        cpu.step(&mut bus, BusMaster::Cpu(0)),
        Err(fault(ORIGIN, 0x80, Some(0x10)))
    );
}

#[test]
fn test_invalid_addressing_mode_byte() {
    // (r32) mode with the reserved 0x0B form
    let (mut cpu, mut bus) = setup(&[0xC3, 0x0B, 0x20]);
    assert_eq!(
        cpu.step(&mut bus, BusMaster::Cpu(0)),
        Err(fault(ORIGIN, 0xC3, Some(0x0B)))
    );
}

// ============================================================
// No partial side effects
// ============================================================

#[test]
fn test_pre_decrement_not_applied_on_fault() {
    // LD XHL,0x1000 ; (-XHL) by 2 then an undefined sub-opcode
    let (mut cpu, mut bus) = setup(&[0x43, 0x00, 0x10, 0x00, 0x00, 0xC4, 0xED, 0x00]);
    step(&mut cpu, &mut bus);
    let result = cpu.step(&mut bus, BusMaster::Cpu(0));
    assert_eq!(result, Err(fault(ORIGIN + 5, 0xC4, Some(0x00))));
    assert_eq!(cpu.regs.long(XHL), 0x1000);
    assert_eq!(cpu.regs.pc, ORIGIN + 5);
}

#[test]
fn test_memory_untouched_on_fault() {
    // LD XWA,0x1000 ; store-immediate prefix with an undefined sub-opcode
    let (mut cpu, mut bus) = setup(&[0x40, 0x00, 0x10, 0x00, 0x00, 0xB0, 0x01, 0xAA]);
    bus.memory[0x1000] = 0x55;
    step(&mut cpu, &mut bus);
    assert!(cpu.step(&mut bus, BusMaster::Cpu(0)).is_err());
    assert_eq!(bus.memory[0x1000], 0x55);
    assert_eq!(cpu.regs.long(XWA), 0x1000);
}

// ============================================================
// Recovery and persistence
// ============================================================

#[test]
fn test_reset_clears_fault() {
    let (mut cpu, mut bus) = setup(&[0x01]);
    let _ = cpu.step(&mut bus, BusMaster::Cpu(0));
    cpu.reset();
    assert_eq!(cpu.fault(), None);
    assert_eq!(cpu.regs.sr.bits(), 0xF800);
}

#[test]
fn test_save_load_round_trip() {
    // LD XWA,0x12345678 ; INCF ; LD XWA,0x0BADF00D ; EI 3 ; HALT
    let (mut cpu, mut bus) = setup(&[
        0x40, 0x78, 0x56, 0x34, 0x12, 0x0C, 0x40, 0x0D, 0xF0, 0xAD, 0x0B, 0x06, 0x03, 0x05,
    ]);
    for _ in 0..5 {
        step(&mut cpu, &mut bus);
    }
    cpu.control.set_dma_source(2, 0x00AB_CDEF);
    cpu.control.set_intnest(3);

    let mut w = StateWriter::new();
    cpu.save(&mut w);
    let bytes = w.into_bytes();

    let mut restored = Tlcs900h::new();
    let mut r = StateReader::new(&bytes);
    restored.load(&mut r).unwrap();
    assert_eq!(r.remaining(), 0);
    assert_eq!(restored.regs, cpu.regs);
    assert_eq!(restored.control, cpu.control);
    assert!(restored.halted);
    assert_eq!(restored.regs.bank_long(0, 0), 0x1234_5678);
    assert_eq!(restored.regs.bank_long(1, 0), 0x0BAD_F00D);
}

#[test]
fn test_save_load_preserves_fault() {
    let (mut cpu, mut bus) = setup(&[0xC9, 0x01]);
    let _ = cpu.step(&mut bus, BusMaster::Cpu(0));

    let mut w = StateWriter::new();
    cpu.save(&mut w);
    let bytes = w.into_bytes();

    let mut restored = Tlcs900h::new();
    restored.load(&mut StateReader::new(&bytes)).unwrap();
    assert_eq!(restored.fault(), Some(fault(ORIGIN, 0xC9, Some(0x01))));
}

#[test]
fn test_load_rejects_truncated_state() {
    let cpu = Tlcs900h::new();
    let mut w = StateWriter::new();
    cpu.save(&mut w);
    let bytes = w.into_bytes();

    let mut restored = Tlcs900h::new();
    let result = restored.load(&mut StateReader::new(&bytes[..bytes.len() - 4]));
    assert!(result.is_err());
}
