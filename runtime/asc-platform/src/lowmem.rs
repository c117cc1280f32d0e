//! Classic Mac OS low-memory backend
//!
//! Device bases and the VIA2 dispatch table come from low-memory globals
//! set up by the ROM. Interrupt masking goes through the 68k status
//! register. Only one handler can be installed at a time: the trampoline
//! placed in the dispatch slot forwards to whatever `install` recorded.

use core::arch::asm;
use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::bus::{RegisterBus, Window};
use crate::irq::{CriticalSection, ExchangeCell, HandlerFn, InterruptSlot, IrqToken, SavedHandler};
use crate::machine::{MachineInfo, SystemVersion, TickSource};
use crate::regs::{asc, via2};
use crate::{PlatformError, Result};

/// Tick counter, incremented by the vertical-blanking task
const TICKS: usize = 0x16A;
/// Packed BCD system version
const SYS_VERSION: usize = 0x15A;
/// Pointer to the VIA2 (or pseudo-VIA) window
const VIA2_BASE: usize = 0xCEC;
/// Platform identifier byte
const BOX_FLAG: usize = 0xCB3;
/// Pointer to the ASC window
const ASC_BASE: usize = 0xCC0;
/// VIA2 dispatch table: one handler pointer per interrupt flag bit
const VIA2_DT: usize = 0xD70;

/// Interrupt priority mask bits in SR
const SR_IPL_MASK: u16 = 0x0700;

/// Handler and cell the trampoline forwards to; zero when idle
static ACTIVE_ENTRY: AtomicUsize = AtomicUsize::new(0);
static ACTIVE_CELL: AtomicUsize = AtomicUsize::new(0);

/// Low-memory backed platform
pub struct LowMem {
    asc: usize,
    via2: usize,
}

impl LowMem {
    /// Locate both device windows from low memory
    ///
    /// # Safety
    /// Must run on a classic Mac OS machine with low memory intact.
    pub unsafe fn from_globals() -> Result<Self> {
        let asc = read_volatile(ASC_BASE as *const usize);
        if asc == 0 {
            return Err(PlatformError::MissingWindow { window: Window::Asc });
        }

        let via2 = read_volatile(VIA2_BASE as *const usize);
        if via2 == 0 {
            return Err(PlatformError::MissingWindow { window: Window::Via2 });
        }

        Ok(Self { asc, via2 })
    }

    fn base(&self, window: Window) -> usize {
        match window {
            Window::Asc => self.asc,
            Window::Via2 => self.via2,
        }
    }

    fn slot_address() -> *mut usize {
        (VIA2_DT as *mut usize).wrapping_add(via2::ASC_SLOT)
    }
}

impl RegisterBus for LowMem {
    fn read(&mut self, window: Window, offset: u16) -> u8 {
        debug_assert!(window != Window::Asc || offset < asc::WINDOW_SIZE);
        // SAFETY: base came from the ROM-initialized globals
        unsafe { read_volatile((self.base(window) + offset as usize) as *const u8) }
    }

    fn write(&mut self, window: Window, offset: u16, value: u8) {
        debug_assert!(window != Window::Asc || offset < asc::WINDOW_SIZE);
        // SAFETY: base came from the ROM-initialized globals
        unsafe { write_volatile((self.base(window) + offset as usize) as *mut u8, value) }
    }
}

impl CriticalSection for LowMem {
    fn enter(&mut self) -> IrqToken {
        let sr: u16;
        // SAFETY: supervisor mode is the normal state for classic Mac OS applications
        unsafe {
            asm!(
                "move.w %sr, {0}",
                "ori.w #0x0700, %sr",
                out(reg_data) sr,
            );
        }
        IrqToken::from_raw(sr & SR_IPL_MASK)
    }

    fn exit(&mut self, token: IrqToken) {
        // SAFETY: only the IPL bits are touched
        unsafe {
            let mut sr: u16;
            asm!("move.w %sr, {0}", out(reg_data) sr);
            sr = (sr & !SR_IPL_MASK) | (token.raw() & SR_IPL_MASK);
            asm!("move.w {0}, %sr", in(reg_data) sr);
        }
    }
}

impl TickSource for LowMem {
    fn now(&mut self) -> u32 {
        // SAFETY: fixed low-memory global
        unsafe { read_volatile(TICKS as *const u32) }
    }
}

impl MachineInfo for LowMem {
    fn box_flag(&mut self) -> u8 {
        // SAFETY: fixed low-memory global
        unsafe { read_volatile(BOX_FLAG as *const u8) }
    }

    fn system_version(&mut self) -> SystemVersion {
        // SAFETY: fixed low-memory global
        SystemVersion::from_bcd(unsafe { read_volatile(SYS_VERSION as *const u16) })
    }
}

/// Dispatch-slot entry; forwards to the installed [`HandlerFn`]
extern "C" fn asc_trampoline() {
    let entry = ACTIVE_ENTRY.load(Ordering::Acquire);
    let cell = ACTIVE_CELL.load(Ordering::Acquire);
    if entry == 0 || cell == 0 {
        return;
    }

    // SAFETY: both words were stored together by `install` and stay valid
    // until `restore` clears them with interrupts masked
    unsafe {
        let Ok(mut bus) = LowMem::from_globals() else {
            return;
        };
        let handler: HandlerFn = core::mem::transmute::<usize, HandlerFn>(entry);
        handler(&mut bus, &*(cell as *const ExchangeCell));
    }
}

impl InterruptSlot for LowMem {
    unsafe fn install(&mut self, entry: HandlerFn, cell: *const ExchangeCell) -> SavedHandler {
        let slot = Self::slot_address();
        let previous = read_volatile(slot);
        let saved = SavedHandler::from_raw(
            previous,
            [
                ACTIVE_ENTRY.load(Ordering::Relaxed),
                ACTIVE_CELL.load(Ordering::Relaxed),
            ],
        );

        ACTIVE_ENTRY.store(entry as usize, Ordering::Release);
        ACTIVE_CELL.store(cell as usize, Ordering::Release);
        write_volatile(slot, asc_trampoline as usize);
        saved
    }

    unsafe fn restore(&mut self, saved: SavedHandler) {
        write_volatile(Self::slot_address(), saved.vector());
        let [entry, cell] = saved.context();
        ACTIVE_ENTRY.store(entry, Ordering::Release);
        ACTIVE_CELL.store(cell, Ordering::Release);
    }
}
