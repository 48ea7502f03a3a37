// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The C interface of m68k-core, to use the engine from other languages.
//!
//! The functions and structures defined here should not be used in a Rust program; use
//! [`m68k_core::Core`] directly instead.
//!
//! Allocate a new core with [`m68k_new`]. When done, free it with [`m68k_delete`].
//!
//! ## Memory callback
//!
//! Build a [`m68k_callbacks_t`] with a function pointer for every access width and direction, and
//! pass it to every interpreter function. Each callback returns a [`m68k_memory_result_t`]: set
//! `exception` to 0 and `data` to the read value on success, or `exception` to a nonzero vector
//! number (2, Access Error, for an out-of-range address) on failure.
//!
//! ## Interrupt acknowledge
//!
//! Build a [`m68k_irq_ack_callback_t`] and pass it to [`m68k_execute`] / [`m68k_set_irq`]. Return
//! [`M68K_AUTOVECTOR`] for a standard autovectored interrupt, [`M68K_SPURIOUS`] for a spurious one,
//! or a raw vector number (0-255) for a user vector.
//!
//! Unlike the teacher crate this binds a single, fixed CPU type (the 68000 only, see the engine's
//! own non-goals), so there is no per-CPU-type function family here — one `m68k_*` name per
//! operation is enough.

use m68k_core::{Core, IrqAcknowledge, MemoryAccess, RegisterId, Registers};

use std::ffi::c_void;

pub const M68K_AUTOVECTOR: u32 = m68k_core::AUTOVECTOR;
pub const M68K_SPURIOUS: u32 = m68k_core::SPURIOUS;

/// Return type of the memory callback functions.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct m68k_memory_result_t {
    /// The value to be returned. Only the low order bytes are read depending on the access width.
    /// Unused on write callbacks.
    pub data: u32,
    /// 0 if the access succeeded, a nonzero exception vector otherwise (2, Access Error, for an
    /// out-of-range address).
    pub exception: u8,
}

/// Memory callbacks passed to every interpreter function.
///
/// `user_data` is opaque to this crate and passed back unmodified to every callback; it typically
/// holds a pointer to the host's own memory map or bus object.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct m68k_callbacks_t {
    pub get_byte: extern "C" fn(addr: u32, user_data: *mut c_void) -> m68k_memory_result_t,
    pub get_word: extern "C" fn(addr: u32, user_data: *mut c_void) -> m68k_memory_result_t,
    pub get_long: extern "C" fn(addr: u32, user_data: *mut c_void) -> m68k_memory_result_t,

    pub set_byte: extern "C" fn(addr: u32, data: u8, user_data: *mut c_void) -> m68k_memory_result_t,
    pub set_word: extern "C" fn(addr: u32, data: u16, user_data: *mut c_void) -> m68k_memory_result_t,
    pub set_long: extern "C" fn(addr: u32, data: u32, user_data: *mut c_void) -> m68k_memory_result_t,

    pub user_data: *mut c_void,
}

impl MemoryAccess for m68k_callbacks_t {
    fn get_byte(&mut self, addr: u32) -> Option<u8> {
        let res = (self.get_byte)(addr, self.user_data);
        (res.exception == 0).then_some(res.data as u8)
    }

    fn get_word(&mut self, addr: u32) -> Option<u16> {
        let res = (self.get_word)(addr, self.user_data);
        (res.exception == 0).then_some(res.data as u16)
    }

    fn get_long(&mut self, addr: u32) -> Option<u32> {
        let res = (self.get_long)(addr, self.user_data);
        (res.exception == 0).then_some(res.data)
    }

    fn set_byte(&mut self, addr: u32, value: u8) -> Option<()> {
        let res = (self.set_byte)(addr, value, self.user_data);
        (res.exception == 0).then_some(())
    }

    fn set_word(&mut self, addr: u32, value: u16) -> Option<()> {
        let res = (self.set_word)(addr, value, self.user_data);
        (res.exception == 0).then_some(())
    }

    fn set_long(&mut self, addr: u32, value: u32) -> Option<()> {
        let res = (self.set_long)(addr, value, self.user_data);
        (res.exception == 0).then_some(())
    }
}

/// Interrupt-acknowledge callback passed to [`m68k_execute`] and [`m68k_set_irq`].
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct m68k_irq_ack_callback_t {
    pub irq_ack: extern "C" fn(level: u8, user_data: *mut c_void) -> u32,
    pub user_data: *mut c_void,
}

impl IrqAcknowledge for m68k_irq_ack_callback_t {
    fn irq_ack(&mut self, level: u8) -> u32 {
        (self.irq_ack)(level, self.user_data)
    }
}

/// Allocates a new core and returns a pointer to it. Call [`m68k_pulse_reset`] before running it.
///
/// Not managed by Rust; free it with [`m68k_delete`] when done.
#[no_mangle]
pub extern "C" fn m68k_new() -> *mut Core {
    Box::into_raw(Box::new(Core::new()))
}

/// Frees the memory of the given core.
///
/// # Safety
/// `core` must be a pointer previously returned by [`m68k_new`] and not already freed.
#[no_mangle]
pub extern "C" fn m68k_delete(core: *mut Core) {
    unsafe {
        drop(Box::from_raw(core));
    }
}

/// Resets architectural state and loads the initial SSP/PC from the vector table.
///
/// # Safety
/// `core` and `memory` must be valid, non-null pointers.
#[no_mangle]
pub extern "C" fn m68k_pulse_reset(core: *mut Core, memory: *mut m68k_callbacks_t) {
    unsafe {
        (*core).pulse_reset(&mut *memory);
    }
}

/// Runs the core for at least `cycles` cycles. Returns the number of cycles actually consumed.
///
/// # Safety
/// `core`, `memory` and `irq_ack` must be valid, non-null pointers.
#[no_mangle]
pub extern "C" fn m68k_execute(
    core: *mut Core,
    memory: *mut m68k_callbacks_t,
    irq_ack: *mut m68k_irq_ack_callback_t,
    cycles: u32,
) -> u32 {
    unsafe { (*core).execute(cycles, &mut *memory, &mut *irq_ack) }
}

/// Requests the core to process an interrupt at `level` (0-7). Thread-safe in spirit, but the
/// same-thread convenience of the Rust API: prefer [`m68k_irq_handle`] from another thread.
///
/// # Safety
/// `core`, `memory` and `irq_ack` must be valid, non-null pointers.
#[no_mangle]
pub extern "C" fn m68k_set_irq(
    core: *mut Core,
    memory: *mut m68k_callbacks_t,
    irq_ack: *mut m68k_irq_ack_callback_t,
    level: u8,
) {
    unsafe {
        (*core).set_irq(level, &mut *memory, &mut *irq_ack);
    }
}

/// Requests an interrupt from another thread; lossy (last writer wins), matching the engine's own
/// [`m68k_core::IrqHandle::request`] semantics.
///
/// # Safety
/// `core` must be a valid, non-null pointer. The returned handle outlives the call but must not be
/// used after `core` is freed with [`m68k_delete`].
#[no_mangle]
pub extern "C" fn m68k_request_irq(core: *mut Core, level: u8) {
    unsafe {
        (*core).irq_handle().request(level);
    }
}

/// Overwrites `remaining_cycles` with `n`, for host schedulers adjusting the budget mid-flight.
///
/// # Safety
/// `core` must be a valid, non-null pointer.
#[no_mangle]
pub extern "C" fn m68k_modify_timeslice(core: *mut Core, n: u32) {
    unsafe {
        (*core).modify_timeslice(n);
    }
}

/// Forces the current [`m68k_execute`] loop to exit at the next iteration boundary.
///
/// # Safety
/// `core` must be a valid, non-null pointer.
#[no_mangle]
pub extern "C" fn m68k_end_timeslice(core: *mut Core) {
    unsafe {
        (*core).end_timeslice();
    }
}

/// Sets the host-requested debugger halt flag, polled once per loop iteration.
///
/// # Safety
/// `core` must be a valid, non-null pointer.
#[no_mangle]
pub extern "C" fn m68k_debug_halt(core: *mut Core) {
    unsafe {
        (*core).debug_halt();
    }
}

/// Clears the host-requested debugger halt flag.
///
/// # Safety
/// `core` must be a valid, non-null pointer.
#[no_mangle]
pub extern "C" fn m68k_debug_resume(core: *mut Core) {
    unsafe {
        (*core).debug_resume();
    }
}

/// Returns a copy of the registers of the given core.
///
/// # Safety
/// `core` must be a valid, non-null pointer.
#[no_mangle]
pub extern "C" fn m68k_get_registers(core: *const Core) -> Registers {
    unsafe { (*core).regs.clone() }
}

/// Sets the registers of the core to the given value.
///
/// # Safety
/// `core` must be a valid, non-null pointer.
#[no_mangle]
pub extern "C" fn m68k_set_registers(core: *mut Core, regs: Registers) {
    unsafe {
        (*core).regs = regs;
    }
}

/// Identifiers for [`m68k_get_reg`] / [`m68k_set_reg`], mirroring [`RegisterId`].
#[allow(non_camel_case_types)]
#[repr(C)]
pub enum m68k_register_id_t {
    D0, D1, D2, D3, D4, D5, D6, D7,
    A0, A1, A2, A3, A4, A5, A6, A7,
    Pc,
    Sr,
    Sp,
}

fn to_register_id(id: m68k_register_id_t) -> RegisterId {
    use m68k_register_id_t::*;
    match id {
        D0 => RegisterId::D(0), D1 => RegisterId::D(1), D2 => RegisterId::D(2), D3 => RegisterId::D(3),
        D4 => RegisterId::D(4), D5 => RegisterId::D(5), D6 => RegisterId::D(6), D7 => RegisterId::D(7),
        A0 => RegisterId::A(0), A1 => RegisterId::A(1), A2 => RegisterId::A(2), A3 => RegisterId::A(3),
        A4 => RegisterId::A(4), A5 => RegisterId::A(5), A6 => RegisterId::A(6), A7 => RegisterId::A(7),
        Pc => RegisterId::Pc,
        Sr => RegisterId::Sr,
        Sp => RegisterId::Sp,
    }
}

/// Reads a single named register.
///
/// # Safety
/// `core` must be a valid, non-null pointer.
#[no_mangle]
pub extern "C" fn m68k_get_reg(core: *const Core, id: m68k_register_id_t) -> u32 {
    unsafe { (*core).get_reg(to_register_id(id)) }
}

/// Writes a single named register.
///
/// # Safety
/// `core` must be a valid, non-null pointer.
#[no_mangle]
pub extern "C" fn m68k_set_reg(core: *mut Core, id: m68k_register_id_t, value: u32) {
    unsafe {
        (*core).set_reg(to_register_id(id), value);
    }
}

/// Returns whether `opcode` decodes to anything other than the illegal-opcode handler.
#[no_mangle]
pub extern "C" fn m68k_is_valid_instruction(opcode: u16) -> bool {
    m68k_core::is_valid_instruction(opcode)
}
