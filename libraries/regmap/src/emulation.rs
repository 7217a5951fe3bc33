// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Plain memory standing in for a peripheral.
//!
//! A [`RegisterFile`] is a zero-initialised, word-aligned array that can be
//! viewed as any register block no larger than itself. Drivers written
//! against `StaticRef<Block>` then run unchanged on a host: the test
//! presets status words with [`RegisterFile::set_word`], calls the driver,
//! and inspects what it wrote with [`RegisterFile::word`].
//!
//! The file behaves like RAM, not like the peripheral: write-one-to-clear
//! bits, read-only flags and self-clearing bits keep whatever was last
//! written.
//!
//! ```rust
//! use regmap::emulation::RegisterFile;
//!
//! let file: &'static RegisterFile<4> = Box::leak(Box::new(RegisterFile::new()));
//! file.set_word(0x4, 0xA5);
//! assert_eq!(file.word(0x4), 0xA5);
//! ```

use core::cell::UnsafeCell;
use core::mem::{align_of, size_of};

use crate::access::MemoryAccess;
use crate::{ErrorCode, StaticRef};

/// `N` 32-bit words of backing storage.
#[repr(C, align(8))]
pub struct RegisterFile<const N: usize> {
    words: UnsafeCell<[u32; N]>,
}

impl<const N: usize> RegisterFile<N> {
    pub const fn new() -> RegisterFile<N> {
        RegisterFile {
            words: UnsafeCell::new([0; N]),
        }
    }

    /// Size of the file in bytes.
    pub const fn len_bytes(&self) -> usize {
        N * 4
    }

    fn check_overlay<T>() {
        assert!(size_of::<T>() <= N * 4, "register block larger than file");
        assert!(align_of::<T>() <= 8, "register block alignment above 8");
    }

    /// View the file as the register block `T`.
    pub fn registers<T>(&self) -> &T {
        Self::check_overlay::<T>();
        // SAFETY: the storage is large and aligned enough for `T`, and `T`
        // is a block of volatile register cells for which every bit pattern
        // is valid.
        unsafe { &*(self.words.get() as *const T) }
    }

    /// A `StaticRef` to the file viewed as `T`, for drivers that keep one.
    pub fn static_ref<T>(&'static self) -> StaticRef<T> {
        Self::check_overlay::<T>();
        // SAFETY: as for `registers`; the file lives for the program.
        unsafe { StaticRef::new(self.words.get() as *const T) }
    }

    fn word_ptr(&self, offset: usize) -> *mut u32 {
        assert!(offset % 4 == 0 && offset / 4 < N, "offset outside file");
        // SAFETY: the offset was checked against the storage bounds.
        unsafe { (self.words.get() as *mut u32).add(offset / 4) }
    }

    /// Current value of the word `offset` bytes into the file.
    pub fn word(&self, offset: usize) -> u32 {
        // SAFETY: `word_ptr` only returns in-bounds pointers.
        unsafe { core::ptr::read_volatile(self.word_ptr(offset)) }
    }

    /// Overwrite the word `offset` bytes into the file.
    pub fn set_word(&self, offset: usize, value: u32) {
        // SAFETY: `word_ptr` only returns in-bounds pointers.
        unsafe { core::ptr::write_volatile(self.word_ptr(offset), value) }
    }
}

impl<const N: usize> Default for RegisterFile<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Addresses are byte offsets into the file.
impl<const N: usize> MemoryAccess for RegisterFile<N> {
    fn read_word(&self, address: u32) -> Result<u32, ErrorCode> {
        let offset = address as usize;
        if offset % 4 != 0 {
            return Err(ErrorCode::INVAL);
        }
        if offset / 4 >= N {
            return Err(ErrorCode::NOACK);
        }
        Ok(self.word(offset))
    }

    fn write_word(&self, address: u32, value: u32) -> Result<(), ErrorCode> {
        let offset = address as usize;
        if offset % 4 != 0 {
            return Err(ErrorCode::INVAL);
        }
        if offset / 4 >= N {
            return Err(ErrorCode::NOACK);
        }
        self.set_word(offset, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::interfaces::{Readable, Writeable};
    use crate::registers::{register_structs, ReadOnly, ReadWrite};
    use std::boxed::Box;

    register_structs! {
        Block {
            (0x00 => control: ReadWrite<u32>),
            (0x04 => _reserved0),
            (0x08 => status: ReadOnly<u32>),
            (0x0C => @END),
        }
    }

    fn leak<const N: usize>() -> &'static RegisterFile<N> {
        Box::leak(Box::new(RegisterFile::new()))
    }

    #[test]
    fn overlay_sees_raw_words() {
        let file = leak::<3>();
        let block: &Block = file.registers();
        file.set_word(0x08, 0x55);
        assert_eq!(block.status.get(), 0x55);
        block.control.set(0xC0FF_EE00);
        assert_eq!(file.word(0x00), 0xC0FF_EE00);
        assert_eq!(file.word(0x04), 0);
    }

    #[test]
    fn static_ref_points_at_file() {
        let file = leak::<3>();
        let block: StaticRef<Block> = file.static_ref();
        block.control.set(7);
        assert_eq!(file.word(0), 7);
    }

    #[test]
    #[should_panic(expected = "register block larger than file")]
    fn rejects_oversized_block() {
        let file = leak::<2>();
        let _block: &Block = file.registers();
    }

    #[test]
    fn memory_access_checks_bounds() {
        let file = leak::<2>();
        assert_eq!(file.write_word(4, 9), Ok(()));
        assert_eq!(file.read_word(4), Ok(9));
        assert_eq!(file.read_word(2), Err(ErrorCode::INVAL));
        assert_eq!(file.read_word(8), Err(ErrorCode::NOACK));
        assert_eq!(file.read_words::<2>(0), Ok([0, 9]));
    }
}
