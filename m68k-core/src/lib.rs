// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core fetch-decode-execute engine of a Motorola 68000 interpreter.
//!
//! This crate is the dispatch table, execution loop, and exception processor of a 68000
//! emulator — the part of an interpreter that stays the same no matter which instructions it
//! executes. The actual instruction set is represented here by a small, explicitly
//! non-exhaustive handler subset (see [`handlers`]) standing in for the full ISA a real opcode
//! table generator would emit; it exists to exercise the machinery below, not to be a complete
//! 68000.
//!
//! Out of scope: the memory bus implementation ([`MemoryAccess`] is a contract, not a bus
//! model), the interrupt-acknowledge device side ([`IrqAcknowledge`] is the same), a
//! disassembler, and a debugger front-end.
//!
//! ```
//! use m68k_core::{Core, FlatMemory, MemoryAccess};
//!
//! struct AutovectorAck;
//! impl m68k_core::IrqAcknowledge for AutovectorAck {
//!     fn irq_ack(&mut self, _level: u8) -> u32 {
//!         m68k_core::AUTOVECTOR
//!     }
//! }
//!
//! let mut memory = FlatMemory::new(0x10000);
//! memory.set_long(0, 0x0000_2000).unwrap(); // initial SSP
//! memory.set_long(4, 0x0000_1000).unwrap(); // initial PC
//!
//! let mut core = Core::new();
//! core.pulse_reset(&mut memory);
//! assert_eq!(core.regs.pc, 0x1000);
//!
//! let mut ack = AutovectorAck;
//! core.execute(100, &mut memory, &mut ack);
//! ```

mod cpu;
mod decode;
mod dispatch;
mod exception;
mod handlers;
mod interrupt;
mod memory;
mod registers;
mod utils;
mod vector;

pub use cpu::Core;
pub use decode::DecodeEntry;
pub use dispatch::is_valid_instruction;
pub use handlers::{HandlerFn, Mnemonic};
pub use interrupt::IrqHandle;
pub use memory::{CpuTiming, FlatMemory, IrqAcknowledge, MemoryAccess, Mc68000Timing, AUTOVECTOR, SPURIOUS};
pub use registers::{RegisterId, Registers, StatusRegister};
pub use vector::{Vector, AUTOVECTOR_BASE, TRAP_BASE};
