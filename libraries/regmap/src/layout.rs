// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2025.

//! Validation of register field layouts.
//!
//! A register description is only useful if it matches the reference
//! manual bit for bit. `register_structs!` already rejects overlapping or
//! misplaced registers at compile time; this module covers the other half,
//! the fields inside a register:
//!
//! - every field is a non-empty, contiguous run of bits,
//! - every field fits inside the 32-bit register,
//! - no two fields claim the same bit, unless the pair is listed as an
//!   intentional alias (for example a write-only key that shares bits with
//!   read-only status flags).
//!
//! ```rust
//! use regmap::field_specs;
//! use regmap::layout::check_register;
//! use regmap::registers::register_bitfields;
//!
//! register_bitfields![u32,
//!     CTRL [
//!         ENABLE OFFSET(0) NUMBITS(1) [],
//!         MODE OFFSET(1) NUMBITS(2) []
//!     ]
//! ];
//!
//! assert_eq!(check_register(&field_specs!(CTRL [ENABLE, MODE])), Ok(()));
//! ```

use tock_registers::fields::Field;
use tock_registers::RegisterLongName;

/// Name, position and unshifted mask of a single register field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shift: usize,
    pub mask: u32,
}

impl FieldSpec {
    /// Capture a field generated by `register_bitfields!`.
    pub const fn of<R: RegisterLongName>(name: &'static str, field: Field<u32, R>) -> FieldSpec {
        FieldSpec {
            name,
            shift: field.shift,
            mask: field.mask,
        }
    }

    pub const fn width(&self) -> u32 {
        self.mask.count_ones()
    }

    /// The field mask in register position, widened so that a field running
    /// off the top of the register is still visible.
    pub const fn shifted_mask(&self) -> u64 {
        if self.shift >= 64 {
            0
        } else {
            (self.mask as u64) << self.shift
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// The field has no bits.
    Empty(&'static str),
    /// The field mask has holes: `mask >> offset` is not a run of ones.
    Discontiguous(&'static str),
    /// `offset + width` is beyond bit 31.
    OutOfRange(&'static str),
    /// Two fields claim the same bit.
    Overlap(&'static str, &'static str),
}

/// Check a single field in isolation.
pub fn check_field(field: &FieldSpec) -> Result<(), LayoutError> {
    if field.mask == 0 {
        return Err(LayoutError::Empty(field.name));
    }
    if field.mask & field.mask.wrapping_add(1) != 0 {
        return Err(LayoutError::Discontiguous(field.name));
    }
    if field.shift + field.width() as usize > 32 {
        return Err(LayoutError::OutOfRange(field.name));
    }
    Ok(())
}

/// Check every field of a register and verify that none overlap.
pub fn check_register(fields: &[FieldSpec]) -> Result<(), LayoutError> {
    check_register_with_aliases(fields, &[])
}

/// Like [`check_register`], but overlaps between the named pairs are
/// accepted. Pairs match in either order.
pub fn check_register_with_aliases(
    fields: &[FieldSpec],
    aliases: &[(&str, &str)],
) -> Result<(), LayoutError> {
    for field in fields {
        check_field(field)?;
    }

    for (i, first) in fields.iter().enumerate() {
        for second in &fields[i + 1..] {
            if first.shifted_mask() & second.shifted_mask() == 0 {
                continue;
            }
            let aliased = aliases.iter().any(|&(a, b)| {
                (a == first.name && b == second.name) || (a == second.name && b == first.name)
            });
            if !aliased {
                return Err(LayoutError::Overlap(first.name, second.name));
            }
        }
    }
    Ok(())
}

/// Union of all bits claimed by `fields`.
pub fn occupied_bits(fields: &[FieldSpec]) -> u32 {
    fields
        .iter()
        .fold(0, |bits, field| bits | field.shifted_mask() as u32)
}

/// Build an array of [`FieldSpec`]s from a bitfield module and a list of its
/// fields: `field_specs!(CR [HSION, HSIRDY])`.
#[macro_export]
macro_rules! field_specs {
    ($register:ident [ $($field:ident),+ $(,)? ]) => {
        [ $( $crate::layout::FieldSpec::of(stringify!($field), $register::$field) ),+ ]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_registers::register_bitfields;

    register_bitfields![u32,
        STATUS [
            READY OFFSET(0) NUMBITS(1) [],
            LEVEL OFFSET(4) NUMBITS(4) [],
            KEY OFFSET(16) NUMBITS(16) [],
            FLAG OFFSET(17) NUMBITS(1) []
        ]
    ];

    #[test]
    fn disjoint_fields_pass() {
        let fields = field_specs!(STATUS[READY, LEVEL, KEY]);
        assert_eq!(check_register(&fields), Ok(()));
        assert_eq!(occupied_bits(&fields), 0xFFFF_00F1);
    }

    #[test]
    fn overlap_is_reported_in_declaration_order() {
        let fields = field_specs!(STATUS[READY, KEY, FLAG]);
        assert_eq!(
            check_register(&fields),
            Err(LayoutError::Overlap("KEY", "FLAG"))
        );
    }

    #[test]
    fn aliases_accept_overlap_in_either_order() {
        let fields = field_specs!(STATUS[KEY, FLAG]);
        assert_eq!(
            check_register_with_aliases(&fields, &[("FLAG", "KEY")]),
            Ok(())
        );
    }

    #[test]
    fn malformed_fields() {
        let empty = FieldSpec {
            name: "EMPTY",
            shift: 3,
            mask: 0,
        };
        let holes = FieldSpec {
            name: "HOLES",
            shift: 0,
            mask: 0b101,
        };
        let beyond = FieldSpec {
            name: "BEYOND",
            shift: 30,
            mask: 0b111,
        };
        assert_eq!(check_field(&empty), Err(LayoutError::Empty("EMPTY")));
        assert_eq!(check_field(&holes), Err(LayoutError::Discontiguous("HOLES")));
        assert_eq!(check_field(&beyond), Err(LayoutError::OutOfRange("BEYOND")));
    }

    #[test]
    fn mask_reproduces_width() {
        let spec = FieldSpec::of("LEVEL", STATUS::LEVEL);
        assert_eq!(spec.width(), 4);
        assert_eq!(spec.shifted_mask() >> spec.shift, 0xF);
    }
}
