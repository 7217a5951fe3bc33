// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Generic helpers shared by the register description crates.
//!
//! Every peripheral in this workspace is described as a `#[repr(C)]`
//! register block overlaid on its base address. This crate provides the
//! handful of pieces those descriptions have in common:
//!
//! - [`StaticRef`], the typed pointer used to place a block at a fixed
//!   address,
//! - [`address`] arithmetic for base + offset computations,
//! - [`field`] accessors that get and set a bit-field inside a raw word,
//! - [`layout`] checks that validate a register's fields against the
//!   datasheet rules (contiguous widths, no overlaps),
//! - [`ErrorCode`], the error type returned by every fallible operation,
//! - [`access`] and [`emulation`], which let discovery code and drivers run
//!   against ordinary memory on a host.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod access;
pub mod address;
pub mod emulation;
pub mod errorcode;
pub mod field;
pub mod layout;
pub mod poll;

mod static_ref;
pub use self::errorcode::ErrorCode;
pub use self::static_ref::StaticRef;

/// The Tock Register Interface.
///
/// This is a re-export of the `tock-registers` crate provided for
/// convenience, so that register descriptions only need to depend on this
/// crate.
pub mod registers {
    pub use tock_registers::fields::{Field, FieldValue};
    pub use tock_registers::interfaces;
    pub use tock_registers::registers::InMemoryRegister;
    pub use tock_registers::registers::{Aliased, ReadOnly, ReadWrite, WriteOnly};
    pub use tock_registers::{register_bitfields, register_structs};
    pub use tock_registers::{LocalRegisterCopy, RegisterLongName};
}
