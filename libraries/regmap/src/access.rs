// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Word-level access to an address space.
//!
//! Register blocks are normally reached through a [`StaticRef`]. Code that
//! has to *discover* where blocks live (walking a CoreSight ROM table, for
//! example) instead reads individual words at computed addresses. Routing
//! those reads through [`MemoryAccess`] lets the same code run on the
//! target, through a debug probe, or against a fake memory map in tests.
//!
//! [`StaticRef`]: crate::StaticRef

use crate::ErrorCode;

/// Implementation required to read and write 32-bit words of an address
/// space.
///
/// Addresses must be word aligned; implementations return
/// `ErrorCode::INVAL` otherwise. An address with nothing behind it should
/// produce `ErrorCode::NOACK`.
pub trait MemoryAccess {
    fn read_word(&self, address: u32) -> Result<u32, ErrorCode>;

    fn write_word(&self, address: u32, value: u32) -> Result<(), ErrorCode>;

    /// Read `N` consecutive words starting at `address`.
    fn read_words<const N: usize>(&self, address: u32) -> Result<[u32; N], ErrorCode>
    where
        Self: Sized,
    {
        let mut words = [0; N];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.read_word(address.wrapping_add(4 * i as u32))?;
        }
        Ok(words)
    }
}

/// Volatile access to the local address space of the running core.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// ## Safety
    ///
    /// Every address later passed to `read_word`/`write_word` must be a valid
    /// memory-mapped location for the current core; reading an unmapped
    /// address raises a bus fault.
    pub const unsafe fn new() -> Mmio {
        Mmio { _private: () }
    }
}

impl MemoryAccess for Mmio {
    fn read_word(&self, address: u32) -> Result<u32, ErrorCode> {
        if address % 4 != 0 {
            return Err(ErrorCode::INVAL);
        }
        // SAFETY: validity of the address is guaranteed by the caller of
        // `Mmio::new`.
        Ok(unsafe { core::ptr::read_volatile(address as usize as *const u32) })
    }

    fn write_word(&self, address: u32, value: u32) -> Result<(), ErrorCode> {
        if address % 4 != 0 {
            return Err(ErrorCode::INVAL);
        }
        // SAFETY: see `read_word`.
        unsafe { core::ptr::write_volatile(address as usize as *mut u32, value) };
        Ok(())
    }
}
