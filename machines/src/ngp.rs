use pocket_core::core::machine::{InputButton, Machine, RunReport};
use pocket_core::core::save_state::{StateError, StateHeader, StateReader, StateWriter};
use pocket_core::core::{
    Backing, Bus, BusExt, BusMaster, Component, InterruptController, InterruptState, MemoryMap,
    PendingInterrupt, Scheduler, TickKind, Width, select_highest,
};
use pocket_core::cpu::{CpuStateTrait, Step, Tlcs900h, Tlcs900hState};
use pocket_core::device::{Peripheral, PeripheralFault, SharedRam, Timers};

use crate::cartridge::{BIOS_SIZE, Cartridge, CartridgeError, load_bios};
use crate::config::{BootMode, MachineConfig};

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
// CPU clock: 6.144 MHz
// 515 CPU cycles per scanline, 199 scanlines per frame (~59.95 Hz)
// Lines 152-198 are vertical blank.
pub const CYCLES_PER_SCANLINE: u64 = 515;
pub const SCANLINES_PER_FRAME: u64 = 199;
pub const CYCLES_PER_FRAME: u64 = CYCLES_PER_SCANLINE * SCANLINES_PER_FRAME;
pub const VBLANK_LINE: u16 = 152;

// ---------------------------------------------------------------------------
// Memory map
// ---------------------------------------------------------------------------
const PAGE_SIZE: u32 = 0x20_0000;
const WORK_RAM_BASE: u32 = 0x00_4000;
const WORK_RAM_SIZE: usize = 0x3000;
const VIDEO_BASE: u32 = 0x00_8000;
const VIDEO_SIZE: usize = 0x4000;
const SFR_SIZE: usize = 0x100;

const RAM_WORK: u8 = 0;
const ROM_BIOS: u8 = 0;
const IO_SFR: u8 = 0;
const IO_SHARED: u8 = 1;
const IO_VIDEO: u8 = 2;
const WINDOW_CS0: u8 = 0;
const WINDOW_CS1: u8 = 1;

// SFR offsets
const TIMER_FIRST: usize = 0x20;
const TIMER_LAST: usize = 0x2F;
const PRIORITY_FIRST: usize = 0x70;
const PRIORITY_LAST: usize = 0x7A;
const DMA_START_VECTOR: usize = 0x7C;
const INPUT_PORT: usize = 0xB0;
const COMM_PORT: usize = 0xBC;

// Video register offsets (from 0x8000)
const VIDEO_IRQ_CONTROL: usize = 0x00;
const VIDEO_SCANLINE: usize = 0x09;
const VIDEO_STATUS: usize = 0x10;
const VBLANK_IRQ_ENABLE: u8 = 0x80;
const STATUS_VBLANK: u8 = 0x40;

/// System interrupt vector table in work RAM, one long per source.
pub const SYSTEM_VECTORS: u32 = 0x00_6FB8;
const INPUT_MIRROR: u32 = 0x00_6F82;
const COLOR_MODE_FLAG: u32 = 0x00_6F91;
const RESET_VECTOR: u32 = 0xFF_FF00;
const BOOT_STACK: u32 = 0x00_6C00;
/// RETI placed in the built-in BIOS image; unset vectors point here.
const HLE_RETURN_STUB: u32 = 0xFF_0010;

const STATE_MAGIC: [u8; 4] = *b"NGPS";
const STATE_VERSION: u16 = 1;

/// Interrupt source numbers (index into the system vector table).
pub mod source {
    pub const RTC_ALARM: u8 = 4;
    pub const VBLANK: u8 = 5;
    pub const SOUND: u8 = 6;
    pub const TIMER0: u8 = 7;
    pub const DMA_END0: u8 = 14;
}

/// Source, priority register, bit position of its 3-bit level, and the
/// vector number micro-DMA start registers use for it (if it can start one).
const SOURCES: &[(u8, usize, u8, Option<u8>)] = &[
    (source::RTC_ALARM, 0x70, 0, Some(0x0A)),
    (source::VBLANK, 0x71, 0, Some(0x0B)),
    (source::SOUND, 0x71, 4, Some(0x0C)),
    (source::TIMER0, 0x73, 0, Some(0x10)),
    (source::TIMER0 + 1, 0x73, 4, Some(0x11)),
    (source::TIMER0 + 2, 0x74, 0, Some(0x12)),
    (source::TIMER0 + 3, 0x74, 4, Some(0x13)),
    (source::DMA_END0, 0x79, 0, None),
    (source::DMA_END0 + 1, 0x79, 4, None),
    (source::DMA_END0 + 2, 0x7A, 0, None),
    (source::DMA_END0 + 3, 0x7A, 4, None),
];

// ---------------------------------------------------------------------------
// Input button IDs
// ---------------------------------------------------------------------------
pub const INPUT_UP: u8 = 0;
pub const INPUT_DOWN: u8 = 1;
pub const INPUT_LEFT: u8 = 2;
pub const INPUT_RIGHT: u8 = 3;
pub const INPUT_A: u8 = 4;
pub const INPUT_B: u8 = 5;
pub const INPUT_OPTION: u8 = 6;

const NGP_INPUT_MAP: &[InputButton] = &[
    InputButton { id: INPUT_UP, name: "Up" },
    InputButton { id: INPUT_DOWN, name: "Down" },
    InputButton { id: INPUT_LEFT, name: "Left" },
    InputButton { id: INPUT_RIGHT, name: "Right" },
    InputButton { id: INPUT_A, name: "A" },
    InputButton { id: INPUT_B, name: "B" },
    InputButton { id: INPUT_OPTION, name: "Option" },
];

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Everything on the main CPU's bus: memory, on-chip peripherals and the
/// interrupt latch.
///
/// Memory map:
///   0x000000-0x0000FF  SFR (timers 0x20-0x2F, interrupt priorities 0x70-0x7A,
///                      micro-DMA start vectors 0x7C-0x7F, joypad 0xB0,
///                      sound CPU latch 0xBC)
///   0x004000-0x006FFF  Work RAM (system vectors at 0x6FB8)
///   0x007000-0x007FFF  Shared RAM (sound CPU)
///   0x008000-0x00BFFF  Video registers and RAM
///   0x200000-0x3FFFFF  Cartridge CS0 window (2 MiB page, default page 0)
///   0x800000-0x9FFFFF  Cartridge CS1 window (2 MiB page, default page 1)
///   0xFF0000-0xFFFFFF  BIOS
#[derive(Clone, Debug)]
pub struct NgpBoard {
    map: MemoryMap,
    cart: Cartridge,
    bios: Box<[u8; BIOS_SIZE]>,
    /// False when the built-in return-stub BIOS is mapped.
    real_bios: bool,
    work_ram: Box<[u8; WORK_RAM_SIZE]>,
    video: Box<[u8; VIDEO_SIZE]>,
    sfr: [u8; SFR_SIZE],
    timers: Timers,
    shared: SharedRam,
    intc: InterruptController,
    ram_fill: u8,

    line: u16,
    vblank: bool,
    /// Joypad state, active-high.
    input: u8,
    /// Sources raised since the last service pass, as a bit set.
    requests: u32,
    faults: Vec<PeripheralFault>,
}

impl NgpBoard {
    fn new(cart: Cartridge, bios: Option<Box<[u8; BIOS_SIZE]>>, ram_fill: u8) -> Self {
        let mut map = MemoryMap::new(PAGE_SIZE);
        map.map_region(0x00_0000..=0x00_00FF, Backing::Io(IO_SFR));
        map.map_region(0x00_4000..=0x00_6FFF, Backing::Ram(RAM_WORK));
        map.map_region(0x00_7000..=0x00_7FFF, Backing::Io(IO_SHARED));
        map.map_region(0x00_8000..=0x00_BFFF, Backing::Io(IO_VIDEO));
        map.map_region(0x20_0000..=0x3F_FFFF, Backing::Window(WINDOW_CS0));
        map.map_region(0x80_0000..=0x9F_FFFF, Backing::Window(WINDOW_CS1));
        map.map_region(0xFF_0000..=0xFF_FFFF, Backing::Rom(ROM_BIOS));

        let real_bios = bios.is_some();
        let bios = bios.unwrap_or_else(|| Self::stub_bios(cart.header().entry_point));

        let mut board = Self {
            map,
            cart,
            bios,
            real_bios,
            work_ram: Box::new([ram_fill; WORK_RAM_SIZE]),
            video: Box::new([0; VIDEO_SIZE]),
            sfr: [0; SFR_SIZE],
            timers: Timers::new(),
            shared: SharedRam::new(),
            intc: InterruptController::new(),
            ram_fill,
            line: 0,
            vblank: false,
            input: 0,
            requests: 0,
            faults: Vec::new(),
        };
        board.reset();
        board
    }

    /// Built-in BIOS: every software interrupt except SWI 0 (reset) lands on a RETI.
    fn stub_bios(entry_point: u32) -> Box<[u8; BIOS_SIZE]> {
        let mut bios = Box::new([0u8; BIOS_SIZE]);
        bios[(HLE_RETURN_STUB & 0xFFFF) as usize] = 0x07;
        let table = (RESET_VECTOR & 0xFFFF) as usize;
        for n in 0..8 {
            let target = if n == 0 { entry_point } else { HLE_RETURN_STUB };
            bios[table + 4 * n..table + 4 * n + 4].copy_from_slice(&target.to_le_bytes());
        }
        bios
    }

    fn reset(&mut self) {
        self.work_ram.fill(self.ram_fill);
        self.video.fill(0);
        self.sfr = [0; SFR_SIZE];
        self.timers.reset();
        self.shared.reset();
        self.intc.clear();
        self.line = 0;
        self.vblank = false;
        self.requests = 0;
        self.faults.clear();
        self.map.set_bank_window(WINDOW_CS0, 0);
        self.map.set_bank_window(WINDOW_CS1, 1);
    }

    /// System state the BIOS leaves behind before jumping to the cartridge.
    fn hle_setup(&mut self, color: bool) {
        if !self.real_bios {
            for index in 0..18u32 {
                self.store(BusMaster::Cpu(0), SYSTEM_VECTORS + 4 * index, Width::Long, HLE_RETURN_STUB);
            }
        }
        self.video[VIDEO_IRQ_CONTROL] = 0xC0;
        self.work_ram[(COLOR_MODE_FLAG - WORK_RAM_BASE) as usize] = if color { 0x10 } else { 0x00 };
    }

    /// Images over two pages bank-switch through a latch at the top of each window.
    fn banked(&self) -> bool {
        self.cart.page_count(PAGE_SIZE) > 2
    }

    fn report(&mut self, fault: PeripheralFault) {
        tracing::warn!(%fault, "peripheral fault");
        self.faults.push(fault);
    }

    fn request(&mut self, source: u8) {
        match 1u32.checked_shl(source as u32) {
            Some(bit) => self.requests |= bit,
            None => tracing::warn!(source, "interrupt source out of range, ignored"),
        }
    }

    /// Vector stored for `source` in the system table, if the slot is in work RAM.
    fn vector(&self, source: u8) -> Option<u32> {
        let at = (SYSTEM_VECTORS - WORK_RAM_BASE) as usize + 4 * source as usize;
        let bytes = self.work_ram.get(at..at + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// A latched request as the CPU sees it now: the level currently
    /// programmed for its source and the current table entry.
    fn resolve(&self, source: u8) -> Option<PendingInterrupt> {
        let level = self.priority(source);
        if level == 0 {
            return None;
        }
        Some(PendingInterrupt::new(source, level, self.vector(source)?))
    }

    fn priority(&self, source: u8) -> u8 {
        SOURCES
            .iter()
            .find(|(s, ..)| *s == source)
            .map_or(0, |&(_, reg, shift, _)| (self.sfr[reg] >> shift) & 7)
    }

    /// Micro-DMA channel whose start vector names `source`.
    fn dma_channel_for(&self, source: u8) -> Option<usize> {
        let code = SOURCES.iter().find(|(s, ..)| *s == source)?.3?;
        (0..4).find(|&ch| self.sfr[DMA_START_VECTOR + ch] == code)
    }

    /// Latch `source` in the interrupt controller. A source at level 0 stays
    /// pending until its level is raised or the request flag is cleared.
    fn latch(&mut self, source: u8) {
        let request = self.resolve(source).unwrap_or(PendingInterrupt::new(source, 0, 0));
        self.intc.raise(request);
    }

    fn collect_timer_matches(&mut self) {
        let matches = self.timers.take_matches();
        for timer in 0..4u8 {
            if matches & (1 << timer) != 0 {
                self.request(source::TIMER0 + timer);
            }
        }
    }

    fn on_tick(&mut self, kind: TickKind) {
        match kind {
            TickKind::Scanline => {
                self.timers.tick(kind);
                self.line += 1;
                if self.line == VBLANK_LINE {
                    self.enter_vblank();
                }
            }
            TickKind::Frame => {
                self.line = 0;
                self.vblank = false;
            }
            TickKind::SoundSample => {}
        }
    }

    fn enter_vblank(&mut self) {
        self.vblank = true;
        self.work_ram[(INPUT_MIRROR - WORK_RAM_BASE) as usize] = self.input;
        if self.video[VIDEO_IRQ_CONTROL] & VBLANK_IRQ_ENABLE != 0 {
            self.request(source::VBLANK);
        }
    }

    // --- Register blocks ---

    fn read_sfr(&mut self, offset: usize) -> u8 {
        match offset {
            TIMER_FIRST..=TIMER_LAST => self.timers.read((offset - TIMER_FIRST) as u32),
            PRIORITY_FIRST..=PRIORITY_LAST => {
                // Bits 3 and 7 report a pending request for the low/high field.
                SOURCES
                    .iter()
                    .filter(|(s, reg, ..)| *reg == offset && self.intc.is_pending(*s))
                    .fold(self.sfr[offset], |v, &(_, _, shift, _)| v | (0x08 << shift))
            }
            INPUT_PORT => self.input,
            COMM_PORT => self.shared.comm(),
            _ => self.sfr[offset],
        }
    }

    fn write_sfr(&mut self, offset: usize, value: u8) {
        match offset {
            TIMER_FIRST..=TIMER_LAST => {
                if let Err(fault) = self.timers.write((offset - TIMER_FIRST) as u32, value) {
                    self.report(fault);
                }
            }
            PRIORITY_FIRST..=PRIORITY_LAST => {
                // Writing 0 to a request flag clears the pending request.
                self.sfr[offset] = value & 0x77;
                for &(src, reg, shift, _) in SOURCES {
                    if reg == offset && value & (0x08 << shift) == 0 {
                        self.intc.acknowledge(src);
                    }
                }
            }
            INPUT_PORT => self.report(PeripheralFault::ReadOnly {
                offset: offset as u32,
                value,
            }),
            COMM_PORT => self.shared.set_comm(value),
            _ => self.sfr[offset] = value,
        }
    }

    fn read_video(&self, offset: usize) -> u8 {
        match offset {
            VIDEO_SCANLINE => self.line.min(0xFF) as u8,
            VIDEO_STATUS => {
                let status = self.video[offset] & !STATUS_VBLANK;
                if self.vblank { status | STATUS_VBLANK } else { status }
            }
            _ => self.video[offset],
        }
    }

    fn write_video(&mut self, offset: usize, value: u8) {
        match offset {
            VIDEO_SCANLINE => self.report(PeripheralFault::ReadOnly {
                offset: VIDEO_BASE + offset as u32,
                value,
            }),
            _ => self.video[offset] = value,
        }
    }

    fn write_window(&mut self, window: u8, offset: u32, value: u8) {
        if self.banked() && offset % PAGE_SIZE == PAGE_SIZE - 1 {
            let page = value as u32 % self.cart.page_count(PAGE_SIZE);
            self.map.set_bank_window(window, page);
        } else {
            tracing::trace!(window, offset, value, "cartridge write ignored");
        }
    }

    // --- Save state ---

    fn save_fields(&self, w: &mut StateWriter) {
        w.put_slice(&self.work_ram[..]);
        w.put_slice(&self.video[..]);
        w.put_slice(&self.sfr);
        self.timers.save(w);
        self.shared.save(w);
        self.intc.save(w);
        w.put_u16(self.line);
        w.put_bool(self.vblank);
        w.put_u8(self.input);
        w.put_u32(self.requests);
        for &page in self.map.save_pages() {
            w.put_u32(page);
        }
    }

    fn load_fields(&mut self, r: &mut StateReader<'_>) -> Result<(), StateError> {
        r.copy_to(&mut self.work_ram[..])?;
        r.copy_to(&mut self.video[..])?;
        r.copy_to(&mut self.sfr)?;
        self.timers.load(r)?;
        self.shared.load(r)?;
        self.intc.load(r)?;
        self.line = r.get_u16()?;
        if self.line as u64 >= SCANLINES_PER_FRAME {
            return Err(StateError::InvalidField {
                field: "scanline",
                value: self.line as u32,
            });
        }
        self.vblank = r.get_bool()?;
        self.input = r.get_u8()?;
        self.requests = r.get_u32()?;
        let pages = self.cart.page_count(PAGE_SIZE);
        let mut saved = [0u32; 2];
        for slot in &mut saved {
            *slot = r.get_u32()?;
            if self.banked() && *slot >= pages {
                return Err(StateError::InvalidField {
                    field: "bank page",
                    value: *slot,
                });
            }
        }
        self.map.restore_pages(&saved);
        Ok(())
    }
}

impl Bus for NgpBoard {
    type Address = u32;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u32) -> u8 {
        let Some(mapped) = self.map.resolve(addr) else {
            tracing::trace!(addr, "open bus read");
            return 0xFF;
        };
        let offset = mapped.offset as usize;
        match mapped.backing {
            Backing::Ram(_) => self.work_ram[offset],
            Backing::Rom(_) => self.bios[offset],
            Backing::Window(_) => self.cart.byte(mapped.offset).unwrap_or(0xFF),
            Backing::Io(IO_SFR) => self.read_sfr(offset),
            Backing::Io(IO_SHARED) => self.shared.read(mapped.offset),
            Backing::Io(IO_VIDEO) => self.read_video(offset),
            Backing::Io(_) => 0xFF,
        }
    }

    fn write(&mut self, _master: BusMaster, addr: u32, data: u8) {
        let Some(mapped) = self.map.resolve(addr) else {
            tracing::trace!(addr, data, "open bus write");
            return;
        };
        let offset = mapped.offset as usize;
        match mapped.backing {
            Backing::Ram(_) => self.work_ram[offset] = data,
            Backing::Rom(_) => {}
            Backing::Window(window) => self.write_window(window, mapped.offset, data),
            Backing::Io(IO_SFR) => self.write_sfr(offset, data),
            Backing::Io(IO_SHARED) => {
                if let Err(fault) = self.shared.write(mapped.offset, data) {
                    self.report(fault);
                }
            }
            Backing::Io(IO_VIDEO) => self.write_video(offset, data),
            Backing::Io(_) => {}
        }
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            highest: select_highest(
                self.intc
                    .pending_sources()
                    .filter_map(|source| self.resolve(source)),
            ),
        }
    }

    fn acknowledge_interrupt(&mut self, _target: BusMaster, source: u8) {
        self.intc.acknowledge(source);
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// SNK Neo Geo Pocket / Pocket Color.
///
/// Hardware: Toshiba TLCS-900/H @ 6.144 MHz with on-chip timers and
/// micro-DMA, Z80 sound CPU behind shared RAM (not emulated), K1GE/K2GE
/// video (registers only; no rendering).
#[derive(Clone, Debug)]
pub struct NgpSystem {
    cpu: Tlcs900h,
    board: NgpBoard,
    scheduler: Scheduler,
    /// Cycles the last instruction of the previous run went past its target.
    overrun: u64,
    boot: BootMode,
    color: bool,
}

impl NgpSystem {
    /// Build a powered-on system. `bios` is the raw BIOS image, if any.
    pub fn new(
        cart: Cartridge,
        bios: Option<&[u8]>,
        config: &MachineConfig,
    ) -> Result<Self, CartridgeError> {
        let bios = bios.map(load_bios).transpose()?;
        let color = config.color.unwrap_or(cart.header().color);
        let mut scheduler = Scheduler::new();
        scheduler.add_periodic(TickKind::Scanline, CYCLES_PER_SCANLINE);
        scheduler.add_periodic(TickKind::Frame, CYCLES_PER_FRAME);

        let mut sys = Self {
            cpu: Tlcs900h::new(),
            board: NgpBoard::new(cart, bios, config.ram_fill),
            scheduler,
            overrun: 0,
            boot: config.boot,
            color,
        };
        sys.reset();
        Ok(sys)
    }

    pub fn register_snapshot(&self) -> Tlcs900hState {
        self.cpu.snapshot()
    }

    pub fn cpu(&self) -> &Tlcs900h {
        &self.cpu
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.board.cart
    }

    pub fn is_color(&self) -> bool {
        self.color
    }

    /// Total CPU cycles since reset.
    pub fn clock(&self) -> u64 {
        self.scheduler.now()
    }

    pub fn scanline(&self) -> u16 {
        self.board.line
    }

    pub fn in_vblank(&self) -> bool {
        self.board.vblank
    }

    pub fn bank_page(&self, window: u8) -> Option<u32> {
        self.board.map.bank_page(window)
    }

    pub fn interrupts(&self) -> &InterruptController {
        &self.board.intc
    }

    /// Raise `source` from outside the board (e.g. the sound CPU or RTC
    /// alarm). Serviced at the next instruction boundary.
    pub fn raise_interrupt(&mut self, source: u8) {
        self.board.request(source);
    }

    fn boots_from_bios(&self) -> bool {
        self.boot == BootMode::Bios && self.board.real_bios
    }

    fn state_header(&self) -> StateHeader {
        StateHeader {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            cartridge_crc: self.board.cart.crc32(),
        }
    }

    /// Feed `cycles` to the timers and the scheduler.
    fn clock_hardware(&mut self, cycles: u64) {
        let board = &mut self.board;
        board.timers.advance(u32::try_from(cycles).unwrap_or(u32::MAX));
        self.scheduler.advance(cycles, |kind| board.on_tick(kind));
        board.collect_timer_matches();
    }

    /// Turn raised sources into micro-DMA transfers or latched interrupts.
    /// Returns the cycles the transfers took.
    fn service_requests(&mut self) -> u64 {
        let mut stall = 0;
        while self.board.requests != 0 {
            let src = self.board.requests.trailing_zeros() as u8;
            self.board.requests &= !(1 << src);

            let Some(channel) = self.board.dma_channel_for(src) else {
                self.board.latch(src);
                continue;
            };
            match self.cpu.micro_dma(&mut self.board, channel) {
                Ok(transfer) => {
                    stall += transfer.cycles as u64;
                    if transfer.finished {
                        self.board.sfr[DMA_START_VECTOR + channel] = 0;
                        self.board.latch(source::DMA_END0 + channel as u8);
                    }
                }
                Err(fault) => self.board.report(fault),
            }
        }
        stall
    }

    fn save_body(&self, w: &mut StateWriter) {
        self.cpu.save(w);
        self.board.save_fields(w);
        self.scheduler.save(w);
        w.put_u64(self.overrun);
    }
}

impl Bus for NgpSystem {
    type Address = u32;
    type Data = u8;

    fn read(&mut self, master: BusMaster, addr: u32) -> u8 {
        self.board.read(master, addr)
    }

    fn write(&mut self, master: BusMaster, addr: u32, data: u8) {
        self.board.write(master, addr, data);
    }

    fn check_interrupts(&self, target: BusMaster) -> InterruptState {
        self.board.check_interrupts(target)
    }

    fn acknowledge_interrupt(&mut self, target: BusMaster, source: u8) {
        self.board.acknowledge_interrupt(target, source);
    }
}

impl Machine for NgpSystem {
    fn cycles_per_frame(&self) -> u64 {
        CYCLES_PER_FRAME
    }

    fn run_cycles(&mut self, cycles: u64) -> RunReport {
        let mut report = RunReport::default();
        let mut done = self.overrun.min(cycles);
        self.overrun -= done;

        while done < cycles {
            let step = match self.cpu.step(&mut self.board, BusMaster::Cpu(0)) {
                Ok(step) => step,
                Err(fault) => {
                    report.stop = Some(fault);
                    break;
                }
            };
            let spent = match step {
                // Skip to the next scanline or frame boundary.
                Step::Halted => self
                    .scheduler
                    .cycles_until_next()
                    .unwrap_or(cycles - done)
                    .min(cycles - done),
                other => other.cycles() as u64,
            };
            self.clock_hardware(spent);
            let stall = self.service_requests();
            if stall > 0 {
                self.clock_hardware(stall);
            }
            done += spent + stall;
        }

        if report.stop.is_none() {
            self.overrun += done - cycles;
            report.consumed = cycles;
        } else {
            report.consumed = done;
        }
        report.faults.append(&mut self.board.faults);
        report
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        if button > INPUT_OPTION {
            return;
        }
        if pressed {
            self.board.input |= 1 << button;
        } else {
            self.board.input &= !(1 << button);
        }
    }

    fn input_map(&self) -> &[InputButton] {
        NGP_INPUT_MAP
    }

    fn reset(&mut self) {
        self.board.reset();
        self.scheduler.reset();
        self.overrun = 0;

        if self.boots_from_bios() {
            let pc = self.board.load(BusMaster::Cpu(0), RESET_VECTOR, Width::Long);
            self.cpu.boot(pc, BOOT_STACK);
            tracing::debug!(pc, "reset through BIOS vector");
        } else {
            self.board.hle_setup(self.color);
            let entry = self.board.cart.header().entry_point;
            self.cpu.boot(entry, BOOT_STACK);
            tracing::debug!(pc = entry, color = self.color, "reset to cartridge entry point");
        }
    }

    fn save_state(&self) -> Vec<u8> {
        let mut w = StateWriter::new();
        w.put_header(&self.state_header());
        self.save_body(&mut w);
        w.into_bytes()
    }

    fn load_state(&mut self, blob: &[u8]) -> Result<(), StateError> {
        let result = self.try_load_state(blob);
        if let Err(ref err) = result {
            tracing::warn!(%err, "save state rejected");
        }
        result
    }
}

impl NgpSystem {
    fn try_load_state(&mut self, blob: &[u8]) -> Result<(), StateError> {
        let mut r = StateReader::new(blob);
        r.expect_header(&self.state_header())?;

        let mut expected = StateWriter::new();
        self.save_body(&mut expected);
        if r.remaining() != expected.len() {
            return Err(StateError::SizeMismatch {
                expected: StateHeader::SIZE + expected.len(),
                actual: blob.len(),
            });
        }

        // Decode into copies and commit only once every field is valid.
        let mut cpu = self.cpu.clone();
        let mut board = self.board.clone();
        let mut scheduler = self.scheduler.clone();
        cpu.load(&mut r)?;
        board.load_fields(&mut r)?;
        scheduler.load(&mut r)?;
        let overrun = r.get_u64()?;

        self.cpu = cpu;
        self.board = board;
        self.scheduler = scheduler;
        self.overrun = overrun;
        Ok(())
    }
}
