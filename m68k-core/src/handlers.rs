// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The representative instruction subset: the handler bodies a real opcode-table generator would
//! otherwise emit (see the crate root docs for why these are hand-written here instead).
//!
//! Every handler has the same shape: mutate [`Core`] state (and optionally `memory`), and return
//! the cycle cost of the instruction. A handler that needs to raise a synchronous exception calls
//! [`Core::exception_synchronous`] itself and returns its result directly; the dispatch loop never
//! inspects anything beyond the returned cycle count.

use crate::cpu::Core;
use crate::memory::MemoryAccess;
use crate::vector::Vector;

/// One instruction. `Illegal` is the sentinel the dispatch table starts filled with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mnemonic {
    Illegal,
    Nop,
    ResetInstruction,
    Stop,
    Rte,
    Rtr,
    Rts,
    Trapv,
    Moveq,
    Trap,
    Exg,
    Swap,
    Clr,
    Tst,
    Addq,
    Subq,
    Bra,
    Bsr,
    Bcc,
    Dbcc,
    Jmp,
    Lea,
}

/// Signature shared by every entry of the dispatch table.
pub type HandlerFn = fn(&mut Core, &mut dyn MemoryAccess, u16) -> u32;

/// The compact table: canonical opcode -> handler. Non-canonical opcodes reach their handler
/// through the decode metadata's merge pass instead of appearing here directly.
pub const COMPACT_TABLE: &[(u16, HandlerFn)] = &[
    (0x4E71, nop),
    (0x4E70, reset_instruction),
    (0x4E72, stop),
    (0x4E73, rte),
    (0x4E77, rtr),
    (0x4E75, rts),
    (0x4E76, trapv),
    (0x7000, moveq),
    (0x4E40, trap),
    (0xC140, exg),
    (0x4840, swap),
    (0x4200, clr),
    (0x4A00, tst),
    (0x5280, addq),
    (0x5380, subq),
    (0x6000, bra),
    (0x6100, bsr),
    (0x6200, bcc),
    (0x50C8, dbcc),
    (0x4ED0, jmp),
    (0x41D0, lea),
];

/// Shared by every opcode the decode table leaves unassigned, plus Line-A and Line-F.
pub fn illegal_opcode(core: &mut Core, memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let vector = if opcode & 0xF000 == 0xF000 {
        Vector::LineF
    } else if opcode & 0xF000 == 0xA000 {
        Vector::LineA
    } else {
        Vector::IllegalInstruction
    };
    core.exception_synchronous(vector, memory)
}

fn nop(_core: &mut Core, _memory: &mut dyn MemoryAccess, _opcode: u16) -> u32 {
    4
}

/// Pulses the external reset line. The bus/peripheral side of a reset is out of scope (see the
/// crate root docs); only the instruction's own cycle cost is modeled.
fn reset_instruction(_core: &mut Core, _memory: &mut dyn MemoryAccess, _opcode: u16) -> u32 {
    132
}

/// `STOP #data`. A full implementation reads the immediate extension word and loads it into SR;
/// this representative handler only sets the `stopped` latch, since addressing/extension-word
/// fetch is out of scope for this crate's handler subset.
fn stop(core: &mut Core, _memory: &mut dyn MemoryAccess, _opcode: u16) -> u32 {
    core.stopped = true;
    4
}

fn rte(core: &mut Core, memory: &mut dyn MemoryAccess, _opcode: u16) -> u32 {
    let sr = match core.pop_word(memory) {
        Some(sr) => sr,
        None => return core.exception_synchronous(Vector::AccessError, memory),
    };
    let pc = match core.pop_long(memory) {
        Some(pc) => pc,
        None => return core.exception_synchronous(Vector::AccessError, memory),
    };
    core.regs.sr = crate::registers::StatusRegister::from_u16(sr);
    if let Some(cycles) = core.jump_checked(pc, memory) {
        return cycles;
    }
    20
}

fn rtr(core: &mut Core, memory: &mut dyn MemoryAccess, _opcode: u16) -> u32 {
    let ccr = match core.pop_word(memory) {
        Some(ccr) => ccr,
        None => return core.exception_synchronous(Vector::AccessError, memory),
    };
    let pc = match core.pop_long(memory) {
        Some(pc) => pc,
        None => return core.exception_synchronous(Vector::AccessError, memory),
    };
    core.regs.sr.set_ccr(ccr);
    if let Some(cycles) = core.jump_checked(pc, memory) {
        return cycles;
    }
    20
}

fn rts(core: &mut Core, memory: &mut dyn MemoryAccess, _opcode: u16) -> u32 {
    let pc = match core.pop_long(memory) {
        Some(pc) => pc,
        None => return core.exception_synchronous(Vector::AccessError, memory),
    };
    if let Some(cycles) = core.jump_checked(pc, memory) {
        return cycles;
    }
    16
}

fn trapv(core: &mut Core, memory: &mut dyn MemoryAccess, _opcode: u16) -> u32 {
    if core.regs.sr.v {
        core.exception_synchronous(Vector::TrapVInstruction, memory)
    } else {
        4
    }
}

fn moveq(core: &mut Core, _memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let reg = (opcode >> 9 & 0b111) as u8;
    let data = opcode as u8 as i8;
    core.regs.d[reg as usize] = data as u32;

    core.regs.sr.n = data < 0;
    core.regs.sr.z = data == 0;
    core.regs.sr.v = false;
    core.regs.sr.c = false;
    4
}

fn trap(core: &mut Core, memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let n = (opcode & 0xF) as u8;
    let vector = Vector::Trap0 as u8 + n;
    core.exception_synchronous_raw(vector, memory)
}

fn exg(core: &mut Core, _memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let rx = (opcode >> 9 & 0b111) as u8;
    let opmode = (opcode >> 3 & 0b1_1111) as u8;
    let ry = (opcode & 0b111) as u8;

    match opmode {
        0b01000 => core.regs.d.swap(rx as usize, ry as usize),
        0b01001 => {
            let y = core.regs.a(ry);
            core.regs.set_a(ry, core.regs.a(rx));
            core.regs.set_a(rx, y);
        },
        _ => {
            let y = core.regs.a(ry);
            core.regs.set_a(ry, core.regs.d[rx as usize]);
            core.regs.d[rx as usize] = y;
        },
    }
    6
}

fn swap(core: &mut Core, _memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let reg = (opcode & 0b111) as usize;
    core.regs.d[reg] = core.regs.d[reg].rotate_left(16);

    core.regs.sr.n = core.regs.d[reg] & 0x8000_0000 != 0;
    core.regs.sr.z = core.regs.d[reg] == 0;
    core.regs.sr.v = false;
    core.regs.sr.c = false;
    4
}

fn clr(core: &mut Core, _memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let size = opcode >> 6 & 0b11;
    let reg = (opcode & 0b111) as u8;

    match size {
        0b00 => core.regs.set_d_byte(reg, 0),
        0b01 => core.regs.set_d_word(reg, 0),
        _ => core.regs.d[reg as usize] = 0,
    }

    core.regs.sr.n = false;
    core.regs.sr.z = true;
    core.regs.sr.v = false;
    core.regs.sr.c = false;
    4
}

fn tst(core: &mut Core, _memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let size = opcode >> 6 & 0b11;
    let reg = (opcode & 0b111) as usize;

    let (negative, zero) = match size {
        0b00 => {
            let v = core.regs.d[reg] as u8;
            (v & 0x80 != 0, v == 0)
        },
        0b01 => {
            let v = core.regs.d[reg] as u16;
            (v & 0x8000 != 0, v == 0)
        },
        _ => {
            let v = core.regs.d[reg];
            (v & 0x8000_0000 != 0, v == 0)
        },
    };

    core.regs.sr.n = negative;
    core.regs.sr.z = zero;
    core.regs.sr.v = false;
    core.regs.sr.c = false;
    4
}

fn addq(core: &mut Core, _memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let data = (opcode >> 9 & 0b111) as u32;
    let data = if data == 0 { 8 } else { data };
    let reg = (opcode & 0b111) as usize;

    let dst = core.regs.d[reg];
    let res = dst.wrapping_add(data);
    core.regs.d[reg] = res;

    core.regs.sr.x = res < dst;
    core.regs.sr.c = res < dst;
    core.regs.sr.n = res & 0x8000_0000 != 0;
    core.regs.sr.z = res == 0;
    core.regs.sr.v = (dst ^ res) & (data ^ res) & 0x8000_0000 != 0;
    8
}

fn subq(core: &mut Core, _memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let data = (opcode >> 9 & 0b111) as u32;
    let data = if data == 0 { 8 } else { data };
    let reg = (opcode & 0b111) as usize;

    let dst = core.regs.d[reg];
    let res = dst.wrapping_sub(data);
    core.regs.d[reg] = res;

    core.regs.sr.x = dst < data;
    core.regs.sr.c = dst < data;
    core.regs.sr.n = res & 0x8000_0000 != 0;
    core.regs.sr.z = res == 0;
    core.regs.sr.v = (dst ^ data) & (dst ^ res) & 0x8000_0000 != 0;
    8
}

fn bra(core: &mut Core, memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let disp = opcode as u8 as i8 as i32;
    let target = core.regs.pc.wrapping_add(disp as u32);
    if let Some(cycles) = core.jump_checked(target, memory) {
        return cycles;
    }
    10
}

fn bsr(core: &mut Core, memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let disp = opcode as u8 as i8 as i32;
    let return_pc = core.regs.pc;
    let target = return_pc.wrapping_add(disp as u32);
    if core.push_long(memory, return_pc).is_none() {
        return core.exception_synchronous(Vector::AccessError, memory);
    }
    if let Some(cycles) = core.jump_checked(target, memory) {
        return cycles;
    }
    18
}

fn bcc(core: &mut Core, memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let cc = (opcode >> 8 & 0b1111) as u8;
    let disp = opcode as u8 as i8 as i32;

    if core.regs.sr.condition(cc) {
        let target = core.regs.pc.wrapping_add(disp as u32);
        if let Some(cycles) = core.jump_checked(target, memory) {
            return cycles;
        }
        10
    } else {
        8
    }
}

fn dbcc(core: &mut Core, memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let cc = (opcode >> 8 & 0b1111) as u8;
    let reg = (opcode & 0b111) as u8;

    if core.regs.sr.condition(cc) {
        return 12;
    }

    let counter = (core.regs.d[reg as usize] as u16).wrapping_sub(1);
    core.regs.set_d_word(reg, counter);

    if counter != 0xFFFF {
        // The branch displacement is the extension word immediately following the opcode.
        let disp = core.fetch_extension_word(memory).unwrap_or(0) as i16 as i32;
        let target = core.regs.pc.wrapping_sub(2).wrapping_add(disp as u32);
        if let Some(cycles) = core.jump_checked(target, memory) {
            return cycles;
        }
        10
    } else {
        let _ = core.fetch_extension_word(memory);
        14
    }
}

fn jmp(core: &mut Core, memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let reg = (opcode & 0b111) as u8;
    let target = core.regs.a(reg);
    if let Some(cycles) = core.jump_checked(target, memory) {
        return cycles;
    }
    8
}

fn lea(core: &mut Core, _memory: &mut dyn MemoryAccess, opcode: u16) -> u32 {
    let dst = (opcode >> 9 & 0b111) as u8;
    let src = (opcode & 0b111) as u8;
    let address = core.regs.a(src);
    core.regs.set_a(dst, address);
    4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;

    #[test]
    fn moveq_sets_negative_flag_on_high_bit() {
        let mut core = Core::for_test();
        let mut mem = FlatMemory::new(64);
        moveq(&mut core, &mut mem, 0x70FF);
        assert_eq!(core.regs.d[0], 0xFFFF_FFFF);
        assert!(core.regs.sr.n);
        assert!(!core.regs.sr.z);
    }

    #[test]
    fn swap_exchanges_halves() {
        let mut core = Core::for_test();
        let mut mem = FlatMemory::new(64);
        core.regs.d[0] = 0x1234_5678;
        swap(&mut core, &mut mem, 0x4840);
        assert_eq!(core.regs.d[0], 0x5678_1234);
    }

    #[test]
    fn exg_data_registers() {
        let mut core = Core::for_test();
        let mut mem = FlatMemory::new(64);
        core.regs.d[0] = 1;
        core.regs.d[1] = 2;
        exg(&mut core, &mut mem, 0xC141);
        assert_eq!(core.regs.d[0], 2);
        assert_eq!(core.regs.d[1], 1);
    }

    #[test]
    fn addq_sets_carry_on_overflow() {
        let mut core = Core::for_test();
        let mut mem = FlatMemory::new(64);
        core.regs.d[0] = u32::MAX;
        addq(&mut core, &mut mem, 0x5280); // data field 0 means 8
        assert_eq!(core.regs.d[0], 7);
        assert!(core.regs.sr.c);
        assert!(core.regs.sr.x);
    }

    #[test]
    fn trap_raises_vector_from_low_nibble() {
        let mut core = Core::for_test();
        let mut mem = FlatMemory::new(256);
        mem.set_long((Vector::Trap0 as u32 + 3) * 4, 0x2000).unwrap();
        trap(&mut core, &mut mem, 0x4E43);
        assert_eq!(core.regs.pc, 0x2000);
        assert!(core.regs.sr.s);
    }

    #[test]
    fn jmp_to_odd_address_raises_address_error() {
        let mut core = Core::for_test();
        let mut mem = FlatMemory::new(256);
        mem.set_long(Vector::AddressError.as_u8() as u32 * 4, 0x3000).unwrap();
        core.regs.a[0] = 0x1001;

        jmp(&mut core, &mut mem, 0x4ED0); // JMP (A0)

        assert_eq!(core.regs.pc, 0x3000);
        assert!(core.regs.sr.s);
    }

    #[test]
    fn jmp_to_even_address_does_not_raise() {
        let mut core = Core::for_test();
        let mut mem = FlatMemory::new(256);
        core.regs.a[0] = 0x1000;

        let cycles = jmp(&mut core, &mut mem, 0x4ED0);

        assert_eq!(core.regs.pc, 0x1000);
        assert_eq!(cycles, 8);
    }

    #[test]
    fn bra_to_odd_target_raises_address_error() {
        let mut core = Core::for_test();
        let mut mem = FlatMemory::new(256);
        mem.set_long(Vector::AddressError.as_u8() as u32 * 4, 0x4000).unwrap();
        core.regs.pc = 0x1000;

        bra(&mut core, &mut mem, 0x6001); // BRA.s +1, odd target

        assert_eq!(core.regs.pc, 0x4000);
    }
}
