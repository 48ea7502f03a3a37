// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builds the 65,536-entry opcode dispatch table once and caches it for the life of the process.

use std::sync::OnceLock;

use crate::decode::build_decode_metadata;
use crate::handlers::{illegal_opcode, HandlerFn, Mnemonic, COMPACT_TABLE};

static DISPATCH_TABLE: OnceLock<Box<[HandlerFn; 65536]>> = OnceLock::new();

/// Returns the process-wide dispatch table, building it on first use.
pub fn dispatch_table() -> &'static [HandlerFn; 65536] {
    DISPATCH_TABLE.get_or_init(build_dispatch_table)
}

/// Three-step build: fill with the illegal-opcode handler, apply the compact table, then run the
/// merge pass over the decode metadata.
fn build_dispatch_table() -> Box<[HandlerFn; 65536]> {
    let metadata = build_decode_metadata();

    let boxed_slice: Box<[HandlerFn]> = vec![illegal_opcode as HandlerFn; 65536].into_boxed_slice();
    let mut table: Box<[HandlerFn; 65536]> = boxed_slice.try_into().unwrap_or_else(|_| unreachable!());

    for &(opcode, handler) in COMPACT_TABLE {
        table[opcode as usize] = handler;
    }

    for opcode in 0..=u16::MAX {
        let entry = &metadata[opcode as usize];
        if entry.mnemonic == Mnemonic::Illegal || entry.clev > 0 {
            continue;
        }
        if let Some(src) = entry.handler {
            let resolved = table[src as usize];
            assert!(
                resolved != illegal_opcode,
                "decode table inconsistent: opcode {opcode:#06X} merges onto {src:#06X}, which has no handler",
            );
            table[opcode as usize] = resolved;
        }
    }

    let assigned = table.iter().filter(|&&h| h != illegal_opcode).count();
    log::debug!("dispatch table built: {assigned}/65536 opcodes assigned, {} compact entries", COMPACT_TABLE.len());

    table
    // `opcode == u16::MAX` is handled by the inclusive range; no wraparound.
}

/// Whether `opcode` decodes to anything other than the illegal-opcode handler.
pub fn is_valid_instruction(opcode: u16) -> bool {
    dispatch_table()[opcode as usize] != illegal_opcode
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_and_merged_opcodes_are_valid() {
        assert!(is_valid_instruction(0x7000)); // MOVEQ #0, D0
        assert!(is_valid_instruction(0x7200)); // MOVEQ #0, D1 (merged)
        assert!(is_valid_instruction(0x4E71)); // NOP
    }

    #[test]
    fn unassigned_opcode_is_invalid() {
        assert!(!is_valid_instruction(0xFFFF));
    }

    #[test]
    fn dispatch_table_is_stable_across_calls() {
        let a = dispatch_table() as *const _;
        let b = dispatch_table() as *const _;
        assert_eq!(a, b);
    }
}
