// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Address arithmetic for register blocks.
//!
//! Peripherals are described by a base address and the byte offset of each
//! register inside the block. These helpers are the only place such
//! arithmetic happens so that the const tables in the chip crates read the
//! same way as the reference manual: `BUS_BASE + 0x4400`.

use crate::StaticRef;

/// Absolute address of the register `offset` bytes into the block at `base`.
pub const fn offset_address(base: usize, offset: usize) -> usize {
    base + offset
}

/// Place a register block of type `T` at `address`.
///
/// ## Safety
///
/// `address` must be the aligned base of a block laid out as `T` that stays
/// valid for the whole program (memory-mapped I/O or static memory).
pub const unsafe fn register_ptr<T>(address: usize) -> StaticRef<T> {
    unsafe { StaticRef::new(address as *const T) }
}

/// Absolute address of the register `offset` bytes into `block`.
pub fn register_address<T>(block: StaticRef<T>, offset: usize) -> usize {
    offset_address(block.address(), offset)
}

/// Offset of `address` relative to `base`, or `None` if `address` lies
/// before the block.
pub const fn block_offset(base: usize, address: usize) -> Option<usize> {
    address.checked_sub(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_add_to_base() {
        assert_eq!(offset_address(0x5802_0000, 0x4400), 0x5802_4400);
        assert_eq!(offset_address(0xE000_E000, 0xDF0), 0xE000_EDF0);
    }

    #[test]
    fn block_offset_is_inverse() {
        assert_eq!(block_offset(0x5802_4400, 0x5802_4410), Some(0x10));
        assert_eq!(block_offset(0x5802_4400, 0x5802_4400), Some(0));
        assert_eq!(block_offset(0x5802_4400, 0x5802_43FC), None);
    }

    #[test]
    fn register_address_follows_static_ref() {
        // SAFETY: the reference is never dereferenced.
        let block: StaticRef<u32> = unsafe { register_ptr(0x4000_1000) };
        assert_eq!(block.address(), 0x4000_1000);
        assert_eq!(register_address(block, 0x24), 0x4000_1024);
    }
}
