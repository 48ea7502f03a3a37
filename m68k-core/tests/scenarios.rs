// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenario tests exercising the full reset / execute / interrupt path against
//! [`FlatMemory`], the way `m68000`'s own `tests/operators.rs` drives a whole `M68000` core
//! rather than individual handler functions.

use m68k_core::{Core, FlatMemory, IrqAcknowledge, MemoryAccess, RegisterId, AUTOVECTOR, SPURIOUS};

struct FixedAck(u32);
impl IrqAcknowledge for FixedAck {
    fn irq_ack(&mut self, _level: u8) -> u32 {
        self.0
    }
}

fn mem_with_reset(ssp: u32, pc: u32) -> FlatMemory {
    let mut mem = FlatMemory::new(0x10000);
    mem.set_long(0, ssp).unwrap();
    mem.set_long(4, pc).unwrap();
    mem
}

#[test]
fn reset_loads_ssp_and_pc() {
    let mut mem = mem_with_reset(0x00FF_FF00, 0x0000_0400);
    let mut core = Core::new();

    core.pulse_reset(&mut mem);

    assert_eq!(core.get_reg(RegisterId::A(7)), 0x00FF_FF00);
    assert_eq!(core.get_reg(RegisterId::Pc), 0x0000_0400);
}

#[test]
fn nmi_is_taken_even_when_stopped() {
    let mut mem = mem_with_reset(0x2000, 0x1000);
    mem.set_long(31 * 4, 0x0000_1000).unwrap(); // autovector 31 target
    let mut core = Core::new();
    core.pulse_reset(&mut mem);
    core.stopped = true;

    let mut ack = FixedAck(AUTOVECTOR);
    core.set_irq(7, &mut mem, &mut ack);

    assert_eq!(core.get_reg(RegisterId::Pc), 0x1000);
    assert!(!core.stopped);
}

#[test]
fn masked_irq_below_intmask_is_not_taken() {
    let mut mem = mem_with_reset(0x2000, 0x1000);
    let mut core = Core::new();
    core.pulse_reset(&mut mem);
    core.set_reg(RegisterId::Sr, 0x2500); // s=1, intmask=5
    core.stopped = true;
    let pc_before = core.get_reg(RegisterId::Pc);

    let mut ack = FixedAck(AUTOVECTOR);
    core.set_irq(3, &mut mem, &mut ack);

    assert_eq!(core.get_reg(RegisterId::Pc), pc_before);
}

#[test]
fn irq_above_intmask_is_taken() {
    let mut mem = mem_with_reset(0x2000, 0x1000);
    mem.set_long(30 * 4, 0x0000_3000).unwrap(); // autovector 24+6
    let mut core = Core::new();
    core.pulse_reset(&mut mem);
    core.set_reg(RegisterId::Sr, 0x2500); // intmask=5
    core.stopped = true;

    let mut ack = FixedAck(AUTOVECTOR);
    core.set_irq(6, &mut mem, &mut ack);

    assert_eq!(core.get_reg(RegisterId::Pc), 0x3000);
}

#[test]
fn autovector_vs_user_vector() {
    let mut mem = mem_with_reset(0x2000, 0x1000);
    mem.set_long(0x42 * 4, 0x0000_3000).unwrap();
    let mut core = Core::new();
    core.pulse_reset(&mut mem);
    core.stopped = true;

    let mut ack = FixedAck(0x42);
    core.set_irq(2, &mut mem, &mut ack);

    assert_eq!(core.get_reg(RegisterId::Pc), 0x3000);
}

#[test]
fn spurious_interrupt_uses_vector_24() {
    let mut mem = mem_with_reset(0x2000, 0x1000);
    mem.set_long(24 * 4, 0x0000_4000).unwrap();
    let mut core = Core::new();
    core.pulse_reset(&mut mem);
    core.stopped = true;

    let mut ack = FixedAck(SPURIOUS);
    core.set_irq(4, &mut mem, &mut ack);

    assert_eq!(core.get_reg(RegisterId::Pc), 0x4000);
}

#[test]
fn illegal_opcode_raises_line_f_exception() {
    let mut mem = mem_with_reset(0x2000, 0x1000);
    mem.set_word(0x1000, 0xF000).unwrap(); // Line-F
    mem.set_long(11 * 4, 0x0000_5000).unwrap();
    let mut core = Core::new();
    core.pulse_reset(&mut mem);

    let mut ack = FixedAck(AUTOVECTOR);
    let used = core.execute(4, &mut mem, &mut ack);

    assert_eq!(used, 4);
    assert_eq!(core.get_reg(RegisterId::Pc), 0x5000);
    assert_eq!(mem.get_long(0x2000 - 4), Some(0x1002)); // saved PC past the opcode word
}

#[test]
fn execute_zero_returns_zero_and_advances_nothing() {
    let mut mem = mem_with_reset(0x2000, 0x1000);
    let mut core = Core::new();
    core.pulse_reset(&mut mem);
    let pc_before = core.get_reg(RegisterId::Pc);

    let mut ack = FixedAck(AUTOVECTOR);
    assert_eq!(core.execute(0, &mut mem, &mut ack), 0);
    assert_eq!(core.get_reg(RegisterId::Pc), pc_before);
}

#[test]
fn zero_vector_falls_back_to_uninitialized_interrupt() {
    let mut mem = mem_with_reset(0x2000, 0x1000);
    mem.set_long(15 * 4, 0x0000_6000).unwrap();
    // Vector entry for 24+7=31 left at 0.
    let mut core = Core::new();
    core.pulse_reset(&mut mem);
    core.stopped = true;

    let mut ack = FixedAck(AUTOVECTOR);
    core.set_irq(7, &mut mem, &mut ack);

    assert_eq!(core.get_reg(RegisterId::Pc), 0x6000);
}

#[test]
fn set_reg_get_reg_round_trip_all_named_registers() {
    let mut core = Core::new();
    for n in 0..7 {
        core.set_reg(RegisterId::D(n), 0x1000_0000 + n as u32);
        assert_eq!(core.get_reg(RegisterId::D(n)), 0x1000_0000 + n as u32);
        core.set_reg(RegisterId::A(n), 0x2000_0000 + n as u32);
        assert_eq!(core.get_reg(RegisterId::A(n)), 0x2000_0000 + n as u32);
    }
    core.set_reg(RegisterId::Pc, 0x1234);
    assert_eq!(core.get_reg(RegisterId::Pc), 0x1234);
    core.set_reg(RegisterId::Sr, 0x2700);
    assert_eq!(core.get_reg(RegisterId::Sr), 0x2700);
}

#[test]
fn is_valid_instruction_distinguishes_moveq_family_from_unassigned() {
    assert!(m68k_core::is_valid_instruction(0x7000)); // MOVEQ #0, D0
    assert!(m68k_core::is_valid_instruction(0x7E00)); // MOVEQ #0, D7
    assert!(!m68k_core::is_valid_instruction(0xFFFF));
}
