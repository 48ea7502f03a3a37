// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The [`Core`] struct: architectural state plus the fetch-decode-execute loop.

use crate::dispatch::dispatch_table;
use crate::handlers::HandlerFn;
use crate::interrupt::IrqHandle;
use crate::memory::{CpuTiming, IrqAcknowledge, Mc68000Timing, MemoryAccess};
use crate::registers::{RegisterId, Registers};
use crate::utils::IsEven;
use crate::vector::Vector;

/// One emulated 68000 core. Not a process-wide singleton: every `Core` instance owns its own
/// register file and cycle accounting; only the dispatch table is shared (it is immutable and
/// carries no per-instance state).
///
/// The per-vector interrupt timing table ([`CpuTiming`]) is held as a trait object rather than a
/// generic parameter: handlers are plain `fn` pointers shared by every `Core` through one
/// process-wide dispatch table (see [`crate::dispatch`]), so `Core` itself cannot be monomorphized
/// per timing implementation without also duplicating that table. [`Core::new`] defaults to
/// [`Mc68000Timing`], which reproduces the flat 56-cycle cost used by real 68000 hardware.
pub struct Core {
    pub regs: Registers,
    dispatch: &'static [HandlerFn; 65536],
    irq: IrqHandle,
    timing: Box<dyn CpuTiming>,

    initial_cycles: u32,
    remaining_cycles: i64,
    interrupt_cycles: u32,

    /// Set by the STOP instruction, cleared by any taken interrupt.
    pub stopped: bool,
    /// Most recently asserted IPL level (0-7), used for the NMI 0-to-7 edge check.
    int_level: u8,
    /// Host-requested halt, polled once per loop iteration (`spcflags & DEBUGGER`).
    debugger_halt: bool,
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Core {
    /// Creates a new core with all registers zeroed and [`Mc68000Timing`] as its timing table.
    /// Call [`Core::pulse_reset`] before running it.
    pub fn new() -> Self {
        Self::with_timing(Mc68000Timing)
    }

    pub fn with_timing(timing: impl CpuTiming + 'static) -> Self {
        Self {
            regs: Registers::default(),
            dispatch: dispatch_table(),
            irq: IrqHandle::new(),
            timing: Box::new(timing),
            initial_cycles: 0,
            remaining_cycles: 0,
            interrupt_cycles: 0,
            stopped: false,
            int_level: 0,
            debugger_halt: false,
        }
    }

    /// Returns a cloneable handle for requesting an interrupt from another thread.
    pub fn irq_handle(&self) -> IrqHandle {
        self.irq.clone()
    }

    /// Resets architectural state: `intmask=7`, supervisor mode, SSP and PC loaded from vector 0
    /// and 1 of the vector table, prefetch refilled. Building the dispatch table happens lazily
    /// and only once per process regardless of how many times this is called.
    pub fn pulse_reset(&mut self, memory: &mut dyn MemoryAccess) {
        self.regs = Registers::default();
        self.regs.sr.s = true;
        self.regs.sr.intmask = 7;
        self.stopped = false;
        self.int_level = 0;
        self.initial_cycles = 0;
        self.remaining_cycles = 0;
        self.interrupt_cycles = 0;

        let ssp = memory.get_long(Vector::ResetSspPc.as_u8() as u32 * 4).unwrap_or(0);
        let pc = memory.get_long(Vector::ResetSspPc.as_u8() as u32 * 4 + 4).unwrap_or(0);
        self.regs.ssp = ssp;
        self.jump(pc, memory);
    }

    /// Runs the core for at least `num_cycles` cycles (the last instruction dispatched always
    /// completes). Returns the number of cycles actually consumed by this call.
    pub fn execute(&mut self, num_cycles: u32, memory: &mut dyn MemoryAccess, ack: &mut dyn IrqAcknowledge) -> u32 {
        if let Some(level) = self.irq.take() {
            self.set_irq2(level, memory, ack);
        }

        if self.stopped {
            return num_cycles;
        }

        self.initial_cycles = num_cycles;
        self.remaining_cycles = num_cycles as i64 - self.interrupt_cycles as i64;
        self.interrupt_cycles = 0;

        while self.remaining_cycles > 0 {
            if self.debugger_halt {
                let used = (self.initial_cycles as i64 - self.remaining_cycles).max(0) as u32;
                self.remaining_cycles = 0;
                self.interrupt_cycles = 0;
                return used;
            }

            if let Some(level) = self.irq.take() {
                self.set_irq2(level, memory, ack);
            }

            let opcode = self.fetch_opcode(memory);
            let handler = self.dispatch[opcode as usize];
            let cycles = handler(self, memory, opcode);
            self.remaining_cycles -= cycles as i64;
        }

        self.remaining_cycles -= self.interrupt_cycles as i64;
        self.interrupt_cycles = 0;
        (self.initial_cycles as i64 - self.remaining_cycles).max(0) as u32
    }

    /// Same-thread convenience mirroring the original interface's "deliver synchronously if
    /// stopped" shortcut. Prefer [`Core::irq_handle`] for requests made from another thread.
    pub fn set_irq(&mut self, level: u8, memory: &mut dyn MemoryAccess, ack: &mut dyn IrqAcknowledge) {
        if self.stopped {
            self.set_irq2(level, memory, ack);
        } else {
            self.irq.request(level);
        }
    }

    pub fn modify_timeslice(&mut self, n: u32) {
        self.remaining_cycles = n as i64;
    }

    pub fn end_timeslice(&mut self) {
        self.initial_cycles = (self.initial_cycles as i64 - self.remaining_cycles).max(0) as u32;
        self.remaining_cycles = 0;
    }

    pub fn debug_halt(&mut self) {
        self.debugger_halt = true;
    }

    pub fn debug_resume(&mut self) {
        self.debugger_halt = false;
    }

    pub fn cycles_run(&self) -> u32 {
        (self.initial_cycles as i64 - self.remaining_cycles).max(0) as u32
    }

    pub fn cycles_remaining(&self) -> u32 {
        self.remaining_cycles.max(0) as u32
    }

    pub fn get_reg(&self, id: RegisterId) -> u32 {
        match id {
            RegisterId::D(n) => self.regs.d[n as usize & 7],
            RegisterId::A(n) => self.regs.a(n & 7),
            RegisterId::Pc => self.regs.pc,
            RegisterId::Sr => self.regs.sr.to_u16() as u32,
            RegisterId::Sp => self.regs.sp(),
        }
    }

    pub fn set_reg(&mut self, id: RegisterId, value: u32) {
        match id {
            RegisterId::D(n) => self.regs.d[n as usize & 7] = value,
            RegisterId::A(n) => self.regs.set_a(n & 7, value),
            RegisterId::Pc => self.regs.pc = value,
            RegisterId::Sr => self.regs.sr = crate::registers::StatusRegister::from_u16(value as u16),
            RegisterId::Sp => *self.regs.sp_mut() = value,
        }
    }

    pub fn is_valid_instruction(&self, opcode: u16) -> bool {
        crate::dispatch::is_valid_instruction(opcode)
    }

    /// Delivers `level` on the thread that owns `&mut self`: the edge-triggered NMI check plus
    /// the masked-interrupt comparison. Returns the cycle cost charged, 0 if nothing was taken.
    pub(crate) fn set_irq2(&mut self, level: u8, memory: &mut dyn MemoryAccess, ack: &mut dyn IrqAcknowledge) -> u32 {
        let old_level = self.int_level;
        self.int_level = level;

        if old_level != 7 && level == 7 {
            self.exception_interrupt(7, memory, ack)
        } else if level > self.regs.sr.intmask {
            self.exception_interrupt(level, memory, ack)
        } else {
            0
        }
    }

    /// Sets PC and rehydrates the two-word prefetch queue from memory. Used by every
    /// control-flow-changing handler and by exception processing, where the target is already
    /// known to be even (reset/exception vector entries, PC advancing by fetched opcode words).
    pub(crate) fn jump(&mut self, pc: u32, memory: &mut dyn MemoryAccess) {
        self.regs.pc = pc;
        self.regs.prefetch[0] = memory.get_word(pc).unwrap_or(0);
        self.regs.prefetch[1] = memory.get_word(pc.wrapping_add(2)).unwrap_or(0);
    }

    /// Like [`Core::jump`], but for targets computed from a register, displacement, or the stack
    /// (i.e. anywhere a program could hand the core an odd address). Raises an Address Error and
    /// returns its cycle cost instead of jumping when `pc` is not word-aligned.
    pub(crate) fn jump_checked(&mut self, pc: u32, memory: &mut dyn MemoryAccess) -> Option<u32> {
        if !pc.is_even() {
            return Some(self.exception_synchronous(Vector::AddressError, memory));
        }
        self.jump(pc, memory);
        None
    }

    /// Consumes the opcode word at the head of the prefetch queue, advancing PC and refilling the
    /// queue's tail from memory.
    pub(crate) fn fetch_opcode(&mut self, memory: &mut dyn MemoryAccess) -> u16 {
        let opcode = self.regs.prefetch[0];
        self.regs.prefetch[0] = self.regs.prefetch[1];
        self.regs.pc = self.regs.pc.wrapping_add(2);
        self.regs.prefetch[1] = memory.get_word(self.regs.pc.wrapping_add(2)).unwrap_or(0);
        opcode
    }

    /// Same mechanics as [`Core::fetch_opcode`], for handlers that consume an instruction
    /// extension word (e.g. DBcc's branch displacement).
    pub(crate) fn fetch_extension_word(&mut self, memory: &mut dyn MemoryAccess) -> Option<u16> {
        Some(self.fetch_opcode(memory))
    }

    pub(crate) fn pop_word(&mut self, memory: &mut dyn MemoryAccess) -> Option<u16> {
        let sp = self.regs.sp();
        let value = memory.get_word(sp)?;
        *self.regs.sp_mut() = sp.wrapping_add(2);
        Some(value)
    }

    pub(crate) fn pop_long(&mut self, memory: &mut dyn MemoryAccess) -> Option<u32> {
        let sp = self.regs.sp();
        let value = memory.get_long(sp)?;
        *self.regs.sp_mut() = sp.wrapping_add(4);
        Some(value)
    }

    pub(crate) fn push_word(&mut self, memory: &mut dyn MemoryAccess, value: u16) -> Option<()> {
        let sp = self.regs.sp().wrapping_sub(2);
        memory.set_word(sp, value)?;
        *self.regs.sp_mut() = sp;
        Some(())
    }

    pub(crate) fn push_long(&mut self, memory: &mut dyn MemoryAccess, value: u32) -> Option<()> {
        let sp = self.regs.sp().wrapping_sub(4);
        memory.set_long(sp, value)?;
        *self.regs.sp_mut() = sp;
        Some(())
    }

    pub(crate) fn vector_cycles(&self, vector: u8) -> u32 {
        self.timing.vector_cycles(vector)
    }

    pub(crate) fn charge_interrupt_cycles(&mut self, cycles: u32) {
        self.interrupt_cycles += cycles;
    }
}

#[cfg(test)]
impl Core {
    /// Bare core for unit-testing individual handlers: supervisor mode on, everything else zeroed.
    pub(crate) fn for_test() -> Self {
        let mut core = Self::new();
        core.regs.sr.s = true;
        core
    }
}
