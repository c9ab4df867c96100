use pocket_core::core::machine::Machine;
use pocket_core::core::save_state::StateError;
use pocket_core::core::{Bus, BusExt, BusMaster, Width};
use pocket_core::cpu::CpuFault;
use pocket_core::device::PeripheralFault;
use pocket_machines::cartridge::{BIOS_SIZE, Cartridge, CartridgeError};
use pocket_machines::config::{BootMode, MachineConfig};
use pocket_machines::ngp::{
    CYCLES_PER_FRAME, CYCLES_PER_SCANLINE, INPUT_A, INPUT_UP, NgpSystem, SYSTEM_VECTORS, source,
};

const ENTRY: u32 = 0x20_0040;
const HANDLER: u32 = 0x20_0100;
const CPU: BusMaster = BusMaster::Cpu(0);

/// Cycles from power-on to the start of vertical blank.
const TO_VBLANK: u64 = CYCLES_PER_SCANLINE * 152;

fn image(program: &[u8], handler: &[u8], size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    data[..28].copy_from_slice(b"COPYRIGHT BY SNK CORPORATION");
    data[0x1C..0x20].copy_from_slice(&ENTRY.to_le_bytes());
    data[0x23] = 0x10;
    data[0x24..0x2C].copy_from_slice(b"TESTCART");
    data[0x40..0x40 + program.len()].copy_from_slice(program);
    data[0x100..0x100 + handler.len()].copy_from_slice(handler);
    data
}

fn system_with(program: &[u8], handler: &[u8], config: &MachineConfig) -> NgpSystem {
    let cart = Cartridge::from_bytes(image(program, handler, 0x1000)).unwrap();
    NgpSystem::new(cart, None, config).unwrap()
}

fn system(program: &[u8]) -> NgpSystem {
    system_with(program, &[0x68, 0xFE], &MachineConfig::default())
}

fn vector(sys: &mut NgpSystem, src: u8, target: u32) {
    sys.store(CPU, SYSTEM_VECTORS + 4 * src as u32, Width::Long, target);
}

// =================================================================
// Boot
// =================================================================

#[test]
fn test_hle_boot_state() {
    let mut sys = system(&[0x68, 0xFE]);
    let regs = sys.register_snapshot();
    assert_eq!(regs.pc, ENTRY);
    assert_eq!(regs.xsp, 0x6C00);
    assert_eq!(regs.sr, 0xF800);
    assert_eq!(regs.iff, 7);
    assert!(!regs.halted);

    // Unset system vectors land on the BIOS return stub.
    assert_eq!(sys.load(CPU, SYSTEM_VECTORS, Width::Long), 0xFF_0010);
    assert_eq!(sys.load(CPU, SYSTEM_VECTORS + 4 * 17, Width::Long), 0xFF_0010);
    assert_eq!(sys.read(CPU, 0xFF_0010), 0x07);
    assert_eq!(sys.read(CPU, 0x00_8000), 0xC0);
    assert_eq!(sys.read(CPU, 0x00_6F91), 0x10);
    assert!(sys.is_color());
}

#[test]
fn test_color_mode_override() {
    let config = MachineConfig {
        color: Some(false),
        ..MachineConfig::default()
    };
    let mut sys = system_with(&[0x68, 0xFE], &[], &config);
    assert!(!sys.is_color());
    assert_eq!(sys.read(CPU, 0x00_6F91), 0x00);
}

#[test]
fn test_boot_through_bios_reset_vector() {
    let mut bios = vec![0u8; BIOS_SIZE];
    bios[0xFF00..0xFF04].copy_from_slice(&0x00FF_1000u32.to_le_bytes());
    let config = MachineConfig {
        boot: BootMode::Bios,
        ..MachineConfig::default()
    };
    let cart = Cartridge::from_bytes(image(&[], &[], 0x1000)).unwrap();
    let sys = NgpSystem::new(cart, Some(&bios), &config).unwrap();
    assert_eq!(sys.register_snapshot().pc, 0xFF_1000);
    assert_eq!(sys.register_snapshot().xsp, 0x6C00);
}

#[test]
fn test_bios_boot_without_image_uses_entry_point() {
    let config = MachineConfig {
        boot: BootMode::Bios,
        ..MachineConfig::default()
    };
    let sys = system_with(&[], &[], &config);
    assert_eq!(sys.register_snapshot().pc, ENTRY);
}

#[test]
fn test_bad_bios_size_is_rejected() {
    let cart = Cartridge::from_bytes(image(&[], &[], 0x1000)).unwrap();
    let err = NgpSystem::new(cart, Some(&[0u8; 100]), &MachineConfig::default()).unwrap_err();
    assert_eq!(err, CartridgeError::BiosSize { size: 100 });
}

#[test]
fn test_software_interrupt_returns_through_stub() {
    // SWI 1 ; JR T,$
    let mut sys = system(&[0xF9, 0x68, 0xFE]);
    let report = sys.run_cycles(100);
    assert!(!report.is_stopped());
    let regs = sys.register_snapshot();
    assert_eq!(regs.pc, ENTRY + 1);
    assert_eq!(regs.xsp, 0x6C00);
}

#[test]
fn test_reset_restores_power_on_state() {
    let config = MachineConfig {
        ram_fill: 0xAA,
        ..MachineConfig::default()
    };
    let mut sys = system_with(&[0x68, 0xFE], &[], &config);
    assert_eq!(sys.read(CPU, 0x00_4000), 0xAA);
    sys.write(CPU, 0x00_4000, 0x12);
    sys.run_cycles(5000);
    assert!(sys.scanline() > 0);

    sys.reset();
    assert_eq!(sys.clock(), 0);
    assert_eq!(sys.scanline(), 0);
    assert_eq!(sys.read(CPU, 0x00_4000), 0xAA);
    assert_eq!(sys.register_snapshot().pc, ENTRY);
}

// =================================================================
// Memory map
// =================================================================

#[test]
fn test_open_bus_reads_ff() {
    let mut sys = system(&[]);
    assert_eq!(sys.read(CPU, 0x00_1000), 0xFF);
    assert_eq!(sys.read(CPU, 0x50_0000), 0xFF);
    sys.write(CPU, 0x50_0000, 0x12);
    assert_eq!(sys.read(CPU, 0x50_0000), 0xFF);
}

#[test]
fn test_work_ram_shared_ram_and_bios() {
    let mut sys = system(&[]);
    sys.write(CPU, 0x00_4000, 0x42);
    sys.write(CPU, 0x00_6FFF, 0x43);
    sys.write(CPU, 0x00_7000, 0x44);
    assert_eq!(sys.read(CPU, 0x00_4000), 0x42);
    assert_eq!(sys.read(CPU, 0x00_6FFF), 0x43);
    assert_eq!(sys.read(CPU, 0x00_7000), 0x44);

    sys.write(CPU, 0xFF_0010, 0x00);
    assert_eq!(sys.read(CPU, 0xFF_0010), 0x07);
}

#[test]
fn test_cartridge_windows() {
    let mut sys = system(&[]);
    assert_eq!(sys.read(CPU, 0x20_0000), b'C');
    assert_eq!(sys.read(CPU, 0x20_0024), b'T');
    // CS1 starts on page 1, past the end of a small image.
    assert_eq!(sys.read(CPU, 0x80_0000), 0xFF);
    // Cartridge ROM ignores writes.
    sys.write(CPU, 0x20_0000, 0x00);
    assert_eq!(sys.read(CPU, 0x20_0000), b'C');
}

#[test]
fn test_bank_latch_selects_pages() {
    let mut data = image(&[], &[], 0x50_0000);
    data[0x20_0000] = 0x33;
    data[0x40_0000] = 0x5A;
    let cart = Cartridge::from_bytes(data).unwrap();
    let mut sys = NgpSystem::new(cart, None, &MachineConfig::default()).unwrap();

    assert_eq!(sys.bank_page(1), Some(1));
    assert_eq!(sys.read(CPU, 0x80_0000), 0x33);

    sys.write(CPU, 0x9F_FFFF, 2);
    assert_eq!(sys.bank_page(1), Some(2));
    assert_eq!(sys.read(CPU, 0x80_0000), 0x5A);

    // Page numbers wrap at the image size (three pages).
    sys.write(CPU, 0x3F_FFFF, 4);
    assert_eq!(sys.bank_page(0), Some(1));
    assert_eq!(sys.read(CPU, 0x20_0000), 0x33);
}

#[test]
fn test_small_cartridge_has_no_bank_latch() {
    let mut sys = system(&[]);
    sys.write(CPU, 0x3F_FFFF, 1);
    assert_eq!(sys.bank_page(0), Some(0));
}

#[test]
fn test_input_port_and_comm_byte() {
    let mut sys = system(&[]);
    sys.set_input(INPUT_UP, true);
    sys.set_input(INPUT_A, true);
    assert_eq!(sys.read(CPU, 0xB0), 0x11);
    sys.set_input(INPUT_UP, false);
    assert_eq!(sys.read(CPU, 0xB0), 0x10);

    sys.write(CPU, 0xBC, 0x5A);
    assert_eq!(sys.read(CPU, 0xBC), 0x5A);
}

#[test]
fn test_input_map_has_all_buttons() {
    let sys = system(&[]);
    let map = sys.input_map();
    assert_eq!(map.len(), 7);
    assert!(map.iter().any(|b| b.name == "Option"));
}

#[test]
fn test_read_only_writes_are_reported() {
    // LD (0xB0),0xFF ; LD (0x8009),0x12 ; JR T,$
    let mut sys = system(&[0x08, 0xB0, 0xFF, 0xF1, 0x09, 0x80, 0x00, 0x12, 0x68, 0xFE]);
    let report = sys.run_cycles(50);
    assert!(!report.is_stopped());
    assert_eq!(
        report.faults,
        vec![
            PeripheralFault::ReadOnly { offset: 0xB0, value: 0xFF },
            PeripheralFault::ReadOnly { offset: 0x8009, value: 0x12 },
        ]
    );
    // Faults are handed over once.
    assert!(sys.run_cycles(50).faults.is_empty());
}

// =================================================================
// Video timing
// =================================================================

#[test]
fn test_scanline_counter_and_vblank_status() {
    let mut sys = system(&[0x68, 0xFE]);
    sys.run_cycles(CYCLES_PER_SCANLINE * 10);
    assert_eq!(sys.scanline(), 10);
    assert_eq!(sys.read(CPU, 0x00_8009), 10);
    assert!(!sys.in_vblank());

    sys.run_cycles(TO_VBLANK - CYCLES_PER_SCANLINE * 10);
    assert_eq!(sys.scanline(), 152);
    assert!(sys.in_vblank());
    assert_eq!(sys.read(CPU, 0x00_8010) & 0x40, 0x40);

    sys.run_cycles(CYCLES_PER_FRAME - TO_VBLANK);
    assert_eq!(sys.scanline(), 0);
    assert!(!sys.in_vblank());
    assert_eq!(sys.read(CPU, 0x00_8010) & 0x40, 0);
}

#[test]
fn test_run_frame_consumes_one_frame() {
    let mut sys = system(&[0x68, 0xFE]);
    let report = sys.run_frame();
    assert_eq!(report.consumed, CYCLES_PER_FRAME);
    assert_eq!(sys.cycles_per_frame(), CYCLES_PER_FRAME);
}

#[test]
fn test_input_mirrored_at_vblank() {
    let mut sys = system(&[0x68, 0xFE]);
    sys.set_input(INPUT_A, true);
    sys.run_cycles(TO_VBLANK - 100);
    assert_eq!(sys.read(CPU, 0x00_6F82), 0x00);
    sys.run_cycles(200);
    assert_eq!(sys.read(CPU, 0x00_6F82), 0x10);
}

// =================================================================
// Interrupts
// =================================================================

#[test]
fn test_vblank_interrupt_vectors_through_system_table() {
    // LD (0x71),4 ; EI 0 ; JR T,$
    let mut sys = system(&[0x08, 0x71, 0x04, 0x06, 0x00, 0x68, 0xFE]);
    vector(&mut sys, source::VBLANK, HANDLER);

    sys.run_cycles(TO_VBLANK - 100);
    assert_eq!(sys.register_snapshot().pc, ENTRY + 5);

    sys.run_cycles(200);
    let regs = sys.register_snapshot();
    assert_eq!(regs.pc, HANDLER);
    assert_eq!(regs.iff, 5);
    assert_eq!(sys.load(CPU, 0x6BFC, Width::Long), ENTRY + 5);
    assert!(!sys.interrupts().is_pending(source::VBLANK));
}

#[test]
fn test_vblank_interrupt_gated_by_video_control() {
    // LD (0x71),4 ; LD (0x8000),0 ; EI 0 ; JR T,$
    let mut sys = system(&[
        0x08, 0x71, 0x04, 0xF1, 0x00, 0x80, 0x00, 0x00, 0x06, 0x00, 0x68, 0xFE,
    ]);
    vector(&mut sys, source::VBLANK, HANDLER);
    sys.run_cycles(TO_VBLANK + 100);
    assert_eq!(sys.register_snapshot().pc, ENTRY + 10);
    assert_eq!(sys.interrupts().pending_count(), 0);
}

#[test]
fn test_priority_register_reports_and_clears_pending() {
    // LD (0x71),4 ; JR T,$  (mask stays at 7)
    let mut sys = system(&[0x08, 0x71, 0x04, 0x68, 0xFE]);
    sys.run_cycles(TO_VBLANK + 100);
    assert!(sys.interrupts().is_pending(source::VBLANK));
    assert_eq!(sys.read(CPU, 0x71), 0x0C);

    sys.write(CPU, 0x71, 0x04);
    assert!(!sys.interrupts().is_pending(source::VBLANK));
    assert_eq!(sys.read(CPU, 0x71), 0x04);
}

#[test]
fn test_halted_cpu_wakes_on_vblank() {
    // LD (0x71),4 ; EI 0 ; HALT
    let mut sys = system(&[0x08, 0x71, 0x04, 0x06, 0x00, 0x05]);
    vector(&mut sys, source::VBLANK, HANDLER);

    sys.run_cycles(TO_VBLANK - 100);
    assert!(sys.cpu().halted);
    sys.run_cycles(200);
    assert!(!sys.cpu().halted);
    assert_eq!(sys.register_snapshot().pc, HANDLER);
}

#[test]
fn test_halt_fast_forwards_to_scheduled_events() {
    let mut sys = system(&[0x05]);
    let report = sys.run_cycles(1000);
    assert_eq!(report.consumed, 1000);
    assert_eq!(sys.clock(), 1000);
    assert_eq!(sys.scanline(), 1);
    assert!(sys.cpu().halted);
}

#[test]
fn test_external_interrupt_source() {
    // LD (0x70),3 ; EI 0 ; JR T,$
    let mut sys = system(&[0x08, 0x70, 0x03, 0x06, 0x00, 0x68, 0xFE]);
    vector(&mut sys, source::RTC_ALARM, HANDLER);
    sys.run_cycles(40);
    sys.raise_interrupt(source::RTC_ALARM);
    sys.run_cycles(40);
    assert_eq!(sys.register_snapshot().pc, HANDLER);
    assert_eq!(sys.register_snapshot().iff, 4);
}

#[test]
fn test_out_of_range_source_is_ignored() {
    // EI 0 ; JR T,$
    let mut sys = system(&[0x06, 0x00, 0x68, 0xFE]);
    sys.raise_interrupt(32);
    sys.raise_interrupt(0xFF);
    let report = sys.run_cycles(40);
    assert!(!report.is_stopped());
    assert_eq!(sys.interrupts().pending_count(), 0);
    assert_eq!(sys.register_snapshot().pc, ENTRY + 2);
}

#[test]
fn test_disabled_source_waits_for_its_level() {
    // EI 0 ; JR T,$  (VBlank left at level 0)
    let mut sys = system(&[0x06, 0x00, 0x68, 0xFE]);
    vector(&mut sys, source::VBLANK, HANDLER);
    sys.run_cycles(TO_VBLANK + 100);
    assert!(sys.interrupts().is_pending(source::VBLANK));
    assert_eq!(sys.register_snapshot().pc, ENTRY + 2);

    // Level 4 with the request flag kept set.
    sys.write(CPU, 0x71, 0x0C);
    sys.run_cycles(40);
    let regs = sys.register_snapshot();
    assert_eq!(regs.pc, HANDLER);
    assert_eq!(regs.iff, 5);
    assert!(!sys.interrupts().is_pending(source::VBLANK));
}

#[test]
fn test_pending_request_uses_current_level() {
    // LD (0x71),2 ; EI 3 ; JR T,$
    let mut sys = system(&[0x08, 0x71, 0x02, 0x06, 0x03, 0x68, 0xFE]);
    vector(&mut sys, source::VBLANK, HANDLER);
    sys.run_cycles(TO_VBLANK + 100);
    // Level 2 is below the mask.
    assert!(sys.interrupts().is_pending(source::VBLANK));
    assert_eq!(sys.register_snapshot().pc, ENTRY + 5);

    sys.write(CPU, 0x71, 0x0E);
    sys.run_cycles(40);
    assert_eq!(sys.register_snapshot().pc, HANDLER);
    assert_eq!(sys.register_snapshot().iff, 7);
}

// =================================================================
// Timers
// =================================================================

#[test]
fn test_timer0_counts_hblanks() {
    // LD (0x73),5 ; LD (0x22),2 ; LD (0x20),0x01 ; JR T,$
    let mut sys = system(&[0x08, 0x73, 0x05, 0x08, 0x22, 0x02, 0x08, 0x20, 0x01, 0x68, 0xFE]);
    sys.run_cycles(CYCLES_PER_SCANLINE + 10);
    assert!(!sys.interrupts().is_pending(source::TIMER0));

    sys.run_cycles(CYCLES_PER_SCANLINE);
    assert!(sys.interrupts().is_pending(source::TIMER0));
    assert_eq!(sys.read(CPU, 0x73), 0x0D);
}

#[test]
fn test_prescaled_timer_interrupt_is_taken() {
    // LD (0x73),0x50 ; LD (0x24),0x04 ; LD (0x23),4 ; LD (0x20),0x82 ; EI 0 ; JR T,$
    // Timer 1 on T1 (8 cycles), compare 4: a match every 32 cycles.
    let mut sys = system(&[
        0x08, 0x73, 0x50, 0x08, 0x24, 0x04, 0x08, 0x23, 0x04, 0x08, 0x20, 0x82, 0x06, 0x00,
        0x68, 0xFE,
    ]);
    vector(&mut sys, source::TIMER0 + 1, HANDLER);
    sys.run_cycles(200);
    assert_eq!(sys.register_snapshot().pc, HANDLER);
    assert_eq!(sys.register_snapshot().iff, 6);
}

#[test]
fn test_timer2_without_clock_is_a_fault() {
    // LD (0x20),0x04 ; JR T,$
    let mut sys = system(&[0x08, 0x20, 0x04, 0x68, 0xFE]);
    let report = sys.run_cycles(20);
    assert_eq!(
        report.faults,
        vec![PeripheralFault::UnsupportedClock { timer: 2, source_select: 0 }]
    );
}

// =================================================================
// Micro-DMA
// =================================================================

#[test]
fn test_vblank_starts_micro_dma() {
    let mut sys = system(&[
        0x40, 0x00, 0x50, 0x00, 0x00, // LD XWA,0x5000
        0xE8, 0x2E, 0x00, // LDC DMAS0,XWA
        0x40, 0x00, 0x51, 0x00, 0x00, // LD XWA,0x5100
        0xE8, 0x2E, 0x10, // LDC DMAD0,XWA
        0x30, 0x02, 0x00, // LD WA,2
        0xD8, 0x2E, 0x20, // LDC DMAC0,WA
        0x21, 0x00, // LD A,0
        0xC9, 0x2E, 0x22, // LDC DMAM0,A
        0x08, 0x79, 0x03, // LD (0x79),3
        0x08, 0x7C, 0x0B, // LD (0x7C),0x0B
        0x68, 0xFE, // JR T,$
    ]);
    sys.write(CPU, 0x00_5000, 0xAA);

    let report = sys.run_cycles(TO_VBLANK + 100);
    assert!(report.faults.is_empty());
    assert_eq!(sys.read(CPU, 0x00_5100), 0xAA);
    assert_eq!(sys.read(CPU, 0x7C), 0x0B);
    assert!(!sys.interrupts().is_pending(source::DMA_END0));

    sys.write(CPU, 0x00_5000, 0xBB);
    sys.run_cycles(CYCLES_PER_FRAME);
    assert_eq!(sys.read(CPU, 0x00_5101), 0xBB);
    // Count exhausted: the channel disarms and signals completion.
    assert_eq!(sys.read(CPU, 0x7C), 0x00);
    assert!(sys.interrupts().is_pending(source::DMA_END0));
    assert!(!sys.interrupts().is_pending(source::VBLANK));
}

#[test]
fn test_unsupported_dma_mode_is_reported() {
    // LD A,3 ; LDC DMAM0,A ; LD (0x7C),0x0B ; JR T,$
    let mut sys = system(&[0x21, 0x03, 0xC9, 0x2E, 0x22, 0x08, 0x7C, 0x0B, 0x68, 0xFE]);
    let report = sys.run_cycles(TO_VBLANK + 100);
    assert!(!report.is_stopped());
    assert_eq!(
        report.faults,
        vec![PeripheralFault::UnsupportedDmaMode { channel: 0, mode: 3 }]
    );
}

// =================================================================
// Cycle accounting
// =================================================================

#[test]
fn test_run_cycles_carries_overrun() {
    // NOPs, two cycles each.
    let mut sys = system(&[]);
    let report = sys.run_cycles(3);
    assert_eq!(report.consumed, 3);
    assert_eq!(sys.clock(), 4);
    let pc = sys.register_snapshot().pc;

    // The overrun covers the next request.
    sys.run_cycles(1);
    assert_eq!(sys.clock(), 4);
    assert_eq!(sys.register_snapshot().pc, pc);

    sys.run_cycles(2);
    assert_eq!(sys.clock(), 6);
    assert_eq!(sys.register_snapshot().pc, pc + 1);
}

#[test]
fn test_run_zero_cycles_changes_nothing() {
    let mut sys = system(&[0x68, 0xFE]);
    sys.run_cycles(100);
    let before = sys.save_state();
    let regs = sys.register_snapshot();

    let report = sys.run_cycles(0);
    assert_eq!(report.consumed, 0);
    assert_eq!(sys.register_snapshot(), regs);
    assert_eq!(sys.save_state(), before);
}

#[test]
fn test_illegal_instruction_stops_run() {
    let mut sys = system(&[0x01]);
    let report = sys.run_cycles(100);
    assert_eq!(report.consumed, 0);
    assert_eq!(
        report.stop,
        Some(CpuFault::IllegalInstruction {
            pc: ENTRY,
            opcode: 0x01,
            sub_opcode: None
        })
    );
    assert_eq!(sys.register_snapshot().pc, ENTRY);

    // Stays stopped until reset.
    assert!(sys.run_cycles(100).is_stopped());
    sys.reset();
    assert!(sys.cpu().fault().is_none());
}

// =================================================================
// Save states
// =================================================================

fn busy_system() -> NgpSystem {
    // LD (0x71),4 ; LD (0x22),3 ; LD (0x20),0x01 ; EI 0 ; JR T,$
    let mut sys = system(&[
        0x08, 0x71, 0x04, 0x08, 0x22, 0x03, 0x08, 0x20, 0x01, 0x06, 0x00, 0x68, 0xFE,
    ]);
    vector(&mut sys, source::VBLANK, HANDLER);
    sys
}

#[test]
fn test_save_load_roundtrip() {
    let mut sys = busy_system();
    sys.run_cycles(TO_VBLANK - 3);
    let blob = sys.save_state();
    let regs = sys.register_snapshot();
    let clock = sys.clock();

    sys.run_cycles(CYCLES_PER_FRAME);
    assert_ne!(sys.clock(), clock);

    sys.load_state(&blob).unwrap();
    assert_eq!(sys.register_snapshot(), regs);
    assert_eq!(sys.clock(), clock);
    assert_eq!(sys.save_state(), blob);

    // The restored machine runs on identically.
    let mut twin = busy_system();
    twin.load_state(&blob).unwrap();
    sys.run_cycles(1000);
    twin.run_cycles(1000);
    assert_eq!(sys.save_state(), twin.save_state());
}

#[test]
fn test_save_restores_bank_pages() {
    let cart = Cartridge::from_bytes(image(&[0x68, 0xFE], &[], 0x50_0000)).unwrap();
    let mut sys = NgpSystem::new(cart, None, &MachineConfig::default()).unwrap();
    sys.write(CPU, 0x9F_FFFF, 2);
    let blob = sys.save_state();
    sys.write(CPU, 0x9F_FFFF, 0);
    assert_eq!(sys.bank_page(1), Some(0));
    sys.load_state(&blob).unwrap();
    assert_eq!(sys.bank_page(1), Some(2));
}

#[test]
fn test_load_rejects_bad_magic() {
    let mut sys = busy_system();
    let mut blob = sys.save_state();
    blob[0] = b'X';
    sys.run_cycles(100);
    let before = sys.save_state();
    assert_eq!(sys.load_state(&blob), Err(StateError::BadMagic));
    assert_eq!(sys.save_state(), before);
}

#[test]
fn test_load_rejects_other_version() {
    let mut sys = busy_system();
    let mut blob = sys.save_state();
    blob[4..6].copy_from_slice(&2u16.to_le_bytes());
    assert_eq!(
        sys.load_state(&blob),
        Err(StateError::UnsupportedVersion { found: 2, expected: 1 })
    );
}

#[test]
fn test_load_rejects_other_cartridge() {
    let other = Cartridge::from_bytes(image(&[0x00, 0x00], &[], 0x1000)).unwrap();
    let other = NgpSystem::new(other, None, &MachineConfig::default()).unwrap();
    let mut sys = busy_system();
    let blob = other.save_state();
    let before = sys.save_state();
    let err = sys.load_state(&blob).unwrap_err();
    assert!(matches!(err, StateError::WrongCartridge { .. }));
    assert_eq!(sys.save_state(), before);
}

#[test]
fn test_load_rejects_wrong_size() {
    let mut sys = busy_system();
    let blob = sys.save_state();
    let len = blob.len();

    let mut long = blob.clone();
    long.push(0);
    assert_eq!(
        sys.load_state(&long),
        Err(StateError::SizeMismatch { expected: len, actual: len + 1 })
    );
    assert_eq!(
        sys.load_state(&blob[..len - 1]),
        Err(StateError::SizeMismatch { expected: len, actual: len - 1 })
    );
    assert_eq!(sys.save_state(), blob);
}

#[test]
fn test_load_rejects_out_of_range_scanline() {
    let mut sys = busy_system();
    let mut blob = sys.save_state();
    // Tail of the blob: line, vblank, input, requests, bank pages, scheduler, overrun.
    let line = blob.len() - (2 + 1 + 1 + 4 + 8 + 32 + 8);
    assert_eq!(u16::from_le_bytes([blob[line], blob[line + 1]]), sys.scanline());

    blob[line..line + 2].copy_from_slice(&500u16.to_le_bytes());
    assert_eq!(
        sys.load_state(&blob),
        Err(StateError::InvalidField { field: "scanline", value: 500 })
    );
}

#[test]
fn test_load_rejects_clock_at_end_of_range() {
    let mut sys = busy_system();
    let mut blob = sys.save_state();
    // Scheduler: now, frame budget, scanline due, frame due; then overrun.
    let now = blob.len() - (32 + 8);
    blob[now..now + 8].copy_from_slice(&(u64::MAX - 1).to_le_bytes());
    blob[now + 16..now + 24].copy_from_slice(&u64::MAX.to_le_bytes());

    let before = sys.save_state();
    assert!(matches!(
        sys.load_state(&blob),
        Err(StateError::InvalidField { field: "scheduler clock", .. })
    ));
    assert_eq!(sys.save_state(), before);
}

// =================================================================
// Host-facing serialization
// =================================================================

#[test]
fn test_config_from_toml() {
    let config: MachineConfig = toml::from_str(
        r#"
        bios = "/roms/ngp_bios.bin"
        ram_fill = 255
        boot = "bios"
        color = false
        "#,
    )
    .unwrap();
    assert_eq!(config.bios.as_deref(), Some(std::path::Path::new("/roms/ngp_bios.bin")));
    assert_eq!(config.ram_fill, 0xFF);
    assert_eq!(config.boot, BootMode::Bios);
    assert_eq!(config.color, Some(false));

    let empty: MachineConfig = toml::from_str("").unwrap();
    assert_eq!(empty, MachineConfig::default());
}

#[test]
fn test_register_snapshot_serializes_to_json() {
    let sys = system(&[]);
    let json = serde_json::to_value(sys.register_snapshot()).unwrap();
    assert_eq!(json["pc"], ENTRY);
    assert_eq!(json["xsp"], 0x6C00);
    assert_eq!(json["halted"], false);
}
