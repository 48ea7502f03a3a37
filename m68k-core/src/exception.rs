// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exception processing: vector resolution, the 3-word stack frame, and the supervisor switch.

use crate::cpu::Core;
use crate::memory::{IrqAcknowledge, MemoryAccess, AUTOVECTOR, SPURIOUS};
use crate::vector::{Vector, AUTOVECTOR_BASE};

impl Core {
    /// Raises a synchronous exception for a named vector (illegal opcode, Line-A, Line-F, a
    /// `TRAP #n`, TRAPV). Always costs 4 cycles, matching the representative handlers that call it.
    pub(crate) fn exception_synchronous(&mut self, vector: Vector, memory: &mut dyn MemoryAccess) -> u32 {
        self.exception_synchronous_raw(vector.as_u8(), memory)
    }

    /// Same as [`Core::exception_synchronous`] but for a raw vector number, used by `TRAP #n`
    /// whose vector (32-47) does not fit a single named [`Vector`] variant.
    pub(crate) fn exception_synchronous_raw(&mut self, vector: u8, memory: &mut dyn MemoryAccess) -> u32 {
        self.push_exception_frame(memory, vector);
        4
    }

    /// Full interrupt vector resolution and dispatch (§4.5 of the engine's interrupt contract):
    /// autovector/spurious/user-vector distinction, supervisor switch, `intmask` update, 3-word
    /// frame push, and the uninitialized-interrupt fallback when the vector table entry is zero.
    ///
    /// Returns the number of cycles charged to `interrupt_cycles` (0 if the host acknowledge
    /// callback reported a value this core cannot use).
    pub(crate) fn exception_interrupt(&mut self, level: u8, memory: &mut dyn MemoryAccess, ack: &mut dyn IrqAcknowledge) -> u32 {
        self.stopped = false;

        let candidate = ack.irq_ack(level);
        let vector = if candidate == AUTOVECTOR {
            AUTOVECTOR_BASE + level
        } else if candidate == SPURIOUS {
            Vector::SpuriousInterrupt.as_u8()
        } else if candidate > 255 {
            return 0;
        } else {
            candidate as u8
        };

        self.regs.sr.intmask = level;
        self.push_exception_frame(memory, vector);

        let cycles = self.vector_cycles(vector);
        self.charge_interrupt_cycles(cycles);
        cycles
    }

    /// Shared tail of both exception paths: switch to supervisor mode, push the saved PC/SR,
    /// and reload PC from the vector table (falling back to the uninitialized-interrupt vector
    /// if the table entry is zero).
    fn push_exception_frame(&mut self, memory: &mut dyn MemoryAccess, vector: u8) {
        let sr_saved = self.regs.sr.to_u16();
        let pc_saved = self.regs.pc;

        self.regs.sr.s = true;

        let _ = self.push_long(memory, pc_saved);
        let _ = self.push_word(memory, sr_saved);

        let mut new_pc = memory.get_long(vector as u32 * 4).unwrap_or(0);
        if new_pc == 0 {
            new_pc = memory.get_long(Vector::UninitializedInterrupt.as_u8() as u32 * 4).unwrap_or(0);
        }

        self.jump(new_pc, memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FlatMemory, AUTOVECTOR, SPURIOUS};

    struct Ack(u32);
    impl IrqAcknowledge for Ack {
        fn irq_ack(&mut self, _level: u8) -> u32 {
            self.0
        }
    }

    fn mem_with_vector(vector: u8, target: u32) -> FlatMemory {
        let mut mem = FlatMemory::new(0x200);
        mem.set_long(vector as u32 * 4, target).unwrap();
        mem
    }

    #[test]
    fn nmi_uses_autovector_31() {
        let mut mem = mem_with_vector(31, 0x1000);
        let mut core = Core::for_test();
        core.regs.sr.intmask = 7;
        core.stopped = true;
        let mut ack = Ack(AUTOVECTOR);

        core.exception_interrupt(7, &mut mem, &mut ack);

        assert_eq!(core.regs.pc, 0x1000);
        assert!(!core.stopped);
        assert_eq!(core.regs.sr.intmask, 7);
    }

    #[test]
    fn autovector_vs_user_vector() {
        let mut mem = mem_with_vector(0x42, 0x3000);
        let mut core = Core::for_test();
        let mut ack = Ack(0x42);

        core.exception_interrupt(2, &mut mem, &mut ack);

        assert_eq!(core.regs.pc, 0x3000);
        assert_eq!(core.regs.sr.intmask, 2);
    }

    #[test]
    fn spurious_uses_vector_24() {
        let mut mem = mem_with_vector(24, 0x4000);
        let mut core = Core::for_test();
        let mut ack = Ack(SPURIOUS);

        core.exception_interrupt(4, &mut mem, &mut ack);

        assert_eq!(core.regs.pc, 0x4000);
    }

    #[test]
    fn zero_vector_falls_back_to_uninitialized_interrupt() {
        let mut mem = mem_with_vector(15, 0x5000);
        // Vector entry for 31 is left at 0.
        let mut core = Core::for_test();
        let mut ack = Ack(AUTOVECTOR);

        core.exception_interrupt(7, &mut mem, &mut ack);

        assert_eq!(core.regs.pc, 0x5000);
    }

    #[test]
    fn exception_pushes_saved_pc_and_sr() {
        let mut mem = mem_with_vector(4, 0x6000);
        let mut core = Core::for_test();
        core.regs.ssp = 0x2000;
        core.regs.pc = 0xABCD_0000;
        let saved_sr = core.regs.sr.to_u16();

        core.exception_synchronous(Vector::IllegalInstruction, &mut mem);

        assert_eq!(core.regs.a(7), 0x2000 - 6);
        assert_eq!(mem.get_long(0x2000 - 4), Some(0xABCD_0000));
        assert_eq!(mem.get_word(0x2000 - 6), Some(saved_sr));
        assert_eq!(core.regs.pc, 0x6000);
    }
}
