// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Bit-field access on raw register words.
//!
//! Register blocks are normally manipulated through `Readable::read` and
//! `ReadWriteable::modify`. These functions cover the remaining case: a
//! word that was captured from hardware (or is about to be written to it)
//! and needs a field extracted or replaced without touching the others.
//! They accept the same `Field` constants generated by `register_bitfields!`
//! and are `const`, so they can be used to build register images at compile
//! time.

use tock_registers::fields::Field;
use tock_registers::RegisterLongName;

/// Bit position of the least significant bit of `field`.
pub const fn field_offset<R: RegisterLongName>(field: Field<u32, R>) -> usize {
    field.shift
}

/// Number of bits in `field`.
pub const fn field_width<R: RegisterLongName>(field: Field<u32, R>) -> u32 {
    field.mask.count_ones()
}

/// Mask of `field` shifted into its position in the register.
pub const fn field_mask<R: RegisterLongName>(field: Field<u32, R>) -> u32 {
    field.mask << field.shift
}

/// Extract `field` from `word`.
pub const fn get_field<R: RegisterLongName>(word: u32, field: Field<u32, R>) -> u32 {
    (word >> field.shift) & field.mask
}

/// Replace `field` in `word` with `value`.
///
/// Bits of `value` above the width of the field are discarded and every
/// other field of `word` is preserved.
pub const fn set_field<R: RegisterLongName>(word: u32, field: Field<u32, R>, value: u32) -> u32 {
    (word & !(field.mask << field.shift)) | ((value & field.mask) << field.shift)
}
